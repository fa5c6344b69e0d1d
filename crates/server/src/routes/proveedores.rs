use axum::{
    Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::models::proveedor::{CreateProveedor, Proveedor};
use deployment::Deployment;
use utils::response::ApiResponse;

use crate::{DeploymentImpl, error::ApiError};

pub async fn list_proveedores(
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<Vec<Proveedor>>>, ApiError> {
    let proveedores = deployment.catalog().list_proveedores().await?;
    Ok(ResponseJson(ApiResponse::success(proveedores)))
}

pub async fn get_proveedor(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<i64>,
) -> Result<ResponseJson<ApiResponse<Proveedor>>, ApiError> {
    let proveedor = deployment.catalog().get_proveedor(id).await?;
    Ok(ResponseJson(ApiResponse::success(proveedor)))
}

pub async fn create_proveedor(
    State(deployment): State<DeploymentImpl>,
    ResponseJson(payload): ResponseJson<CreateProveedor>,
) -> Result<ResponseJson<ApiResponse<Proveedor>>, ApiError> {
    let proveedor = deployment.catalog().create_proveedor(&payload).await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        proveedor,
        "Proveedor registrado correctamente",
    )))
}

pub async fn update_proveedor(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<i64>,
    ResponseJson(payload): ResponseJson<CreateProveedor>,
) -> Result<ResponseJson<ApiResponse<Proveedor>>, ApiError> {
    let proveedor = deployment.catalog().update_proveedor(id, &payload).await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        proveedor,
        "Proveedor actualizado correctamente",
    )))
}

pub async fn set_estado(
    State(deployment): State<DeploymentImpl>,
    Path((id, estado)): Path<(i64, i64)>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    deployment.catalog().set_proveedor_estado(id, estado).await?;
    let message = if estado == 1 {
        "Proveedor activado correctamente"
    } else {
        "Proveedor desactivado correctamente"
    };
    Ok(ResponseJson(ApiResponse::success_with_message((), message)))
}

pub async fn delete_proveedor(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<i64>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    deployment.catalog().delete_proveedor(id).await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        (),
        "Proveedor eliminado correctamente",
    )))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new().nest(
        "/proveedores",
        Router::new()
            .route("/", get(list_proveedores).post(create_proveedor))
            .route(
                "/{id}",
                get(get_proveedor)
                    .put(update_proveedor)
                    .delete(delete_proveedor),
            )
            .route("/{id}/estado/{estado}", post(set_estado)),
    )
}
