use axum::{
    Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::models::{
    contrato::{Contrato, CreateContrato, EstadisticasContratos},
    factura::Factura,
};
use deployment::Deployment;
use utils::response::ApiResponse;

use super::CambioEstado;
use crate::{DeploymentImpl, error::ApiError};

pub async fn list_contratos(
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<Vec<Contrato>>>, ApiError> {
    let contratos = deployment.contracts().list().await?;
    Ok(ResponseJson(ApiResponse::success(contratos)))
}

pub async fn get_contrato(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<i64>,
) -> Result<ResponseJson<ApiResponse<Contrato>>, ApiError> {
    let contrato = deployment.contracts().get(id).await?;
    Ok(ResponseJson(ApiResponse::success(contrato)))
}

/// Active and not yet past their end date.
pub async fn activos(
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<Vec<Contrato>>>, ApiError> {
    let contratos = deployment.contracts().activos().await?;
    Ok(ResponseJson(ApiResponse::success(contratos)))
}

pub async fn estadisticas(
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<EstadisticasContratos>>, ApiError> {
    let stats = deployment.contracts().estadisticas().await?;
    Ok(ResponseJson(ApiResponse::success(stats)))
}

pub async fn generar_codigo(
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<String>>, ApiError> {
    let codigo = deployment.contracts().generar_codigo().await?;
    Ok(ResponseJson(ApiResponse::success(codigo)))
}

/// The client's open invoices that no contract references yet.
pub async fn facturas_cliente(
    State(deployment): State<DeploymentImpl>,
    Path(cliente_id): Path<i64>,
) -> Result<ResponseJson<ApiResponse<Vec<Factura>>>, ApiError> {
    let facturas = deployment.contracts().facturas_cliente(cliente_id).await?;
    Ok(ResponseJson(ApiResponse::success(facturas)))
}

pub async fn create_contrato(
    State(deployment): State<DeploymentImpl>,
    ResponseJson(payload): ResponseJson<CreateContrato>,
) -> Result<ResponseJson<ApiResponse<Contrato>>, ApiError> {
    let contrato = deployment.contracts().create(&payload).await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        contrato,
        "Contrato creado exitosamente",
    )))
}

pub async fn update_contrato(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<i64>,
    ResponseJson(payload): ResponseJson<CreateContrato>,
) -> Result<ResponseJson<ApiResponse<Contrato>>, ApiError> {
    let contrato = deployment.contracts().update(id, &payload).await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        contrato,
        "Contrato actualizado exitosamente",
    )))
}

pub async fn cambiar_estado(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<i64>,
    ResponseJson(payload): ResponseJson<CambioEstado>,
) -> Result<ResponseJson<ApiResponse<Contrato>>, ApiError> {
    let contrato = deployment
        .contracts()
        .cambiar_estado(id, &payload.estado)
        .await?;
    let message = format!("Estado del contrato actualizado a {}", contrato.estado);
    Ok(ResponseJson(ApiResponse::success_with_message(contrato, message)))
}

pub async fn delete_contrato(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<i64>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    deployment.contracts().delete(id).await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        (),
        "Contrato eliminado exitosamente",
    )))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new().nest(
        "/contratos",
        Router::new()
            .route("/", get(list_contratos).post(create_contrato))
            .route("/activos", get(activos))
            .route("/estadisticas", get(estadisticas))
            .route("/generar-codigo", get(generar_codigo))
            .route("/facturas-cliente/{cliente_id}", get(facturas_cliente))
            .route(
                "/{id}",
                get(get_contrato)
                    .put(update_contrato)
                    .delete(delete_contrato),
            )
            .route("/{id}/estado", post(cambiar_estado)),
    )
}
