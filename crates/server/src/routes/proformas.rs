use axum::{
    Extension, Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::models::{
    proforma::{CreateProforma, Proforma, ProformaConDetalles},
    usuario::Usuario,
};
use deployment::Deployment;
use utils::response::ApiResponse;

use super::CambioEstado;
use crate::{DeploymentImpl, error::ApiError};

/// Newest first. Overdue quotes are expired before listing.
pub async fn list_proformas(
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<Vec<ProformaConDetalles>>>, ApiError> {
    let proformas = deployment.proformas().list().await?;
    Ok(ResponseJson(ApiResponse::success(proformas)))
}

pub async fn get_proforma(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<i64>,
) -> Result<ResponseJson<ApiResponse<ProformaConDetalles>>, ApiError> {
    let proforma = deployment.proformas().get(id).await?;
    Ok(ResponseJson(ApiResponse::success(proforma)))
}

pub async fn get_by_codigo(
    State(deployment): State<DeploymentImpl>,
    Path(codigo): Path<String>,
) -> Result<ResponseJson<ApiResponse<ProformaConDetalles>>, ApiError> {
    let proforma = deployment
        .proformas()
        .get_aprobada_por_codigo(&codigo)
        .await?;
    Ok(ResponseJson(ApiResponse::success(proforma)))
}

pub async fn create_proforma(
    State(deployment): State<DeploymentImpl>,
    Extension(usuario): Extension<Usuario>,
    ResponseJson(payload): ResponseJson<CreateProforma>,
) -> Result<ResponseJson<ApiResponse<ProformaConDetalles>>, ApiError> {
    let proforma = deployment.proformas().create(usuario.id, &payload).await?;
    let message = format!("Proforma {} creada correctamente", proforma.proforma.codigo);
    Ok(ResponseJson(ApiResponse::success_with_message(proforma, message)))
}

pub async fn update_proforma(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<i64>,
    ResponseJson(payload): ResponseJson<CreateProforma>,
) -> Result<ResponseJson<ApiResponse<ProformaConDetalles>>, ApiError> {
    let proforma = deployment.proformas().update(id, &payload).await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        proforma,
        "Proforma actualizada correctamente",
    )))
}

pub async fn delete_proforma(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<i64>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    deployment.proformas().delete(id).await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        (),
        "Proforma eliminada correctamente",
    )))
}

pub async fn cambiar_estado(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<i64>,
    ResponseJson(payload): ResponseJson<CambioEstado>,
) -> Result<ResponseJson<ApiResponse<Proforma>>, ApiError> {
    let proforma = deployment
        .proformas()
        .cambiar_estado(id, &payload.estado)
        .await?;
    let message = format!("Proforma marcada como {}", proforma.estado);
    Ok(ResponseJson(ApiResponse::success_with_message(proforma, message)))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new().nest(
        "/proformas",
        Router::new()
            .route("/", get(list_proformas).post(create_proforma))
            .route("/codigo/{codigo}", get(get_by_codigo))
            .route(
                "/{id}",
                get(get_proforma)
                    .put(update_proforma)
                    .delete(delete_proforma),
            )
            .route("/{id}/aprobar", post(cambiar_estado)),
    )
}
