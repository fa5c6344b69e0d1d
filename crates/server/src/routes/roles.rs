use axum::{
    Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::get,
};
use db::models::rol::{CreateRol, Rol};
use deployment::Deployment;
use utils::response::ApiResponse;

use crate::{DeploymentImpl, error::ApiError};

pub async fn list_roles(
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<Vec<Rol>>>, ApiError> {
    let roles = deployment.users().list_roles().await?;
    Ok(ResponseJson(ApiResponse::success(roles)))
}

pub async fn get_rol(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<i64>,
) -> Result<ResponseJson<ApiResponse<Rol>>, ApiError> {
    let rol = deployment.users().get_rol(id).await?;
    Ok(ResponseJson(ApiResponse::success(rol)))
}

pub async fn create_rol(
    State(deployment): State<DeploymentImpl>,
    ResponseJson(payload): ResponseJson<CreateRol>,
) -> Result<ResponseJson<ApiResponse<Rol>>, ApiError> {
    let rol = deployment.users().create_rol(&payload).await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        rol,
        "Rol creado correctamente",
    )))
}

pub async fn update_rol(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<i64>,
    ResponseJson(payload): ResponseJson<CreateRol>,
) -> Result<ResponseJson<ApiResponse<Rol>>, ApiError> {
    let rol = deployment.users().update_rol(id, &payload).await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        rol,
        "Rol actualizado correctamente",
    )))
}

pub async fn delete_rol(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<i64>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    deployment.users().delete_rol(id).await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        (),
        "Rol eliminado correctamente",
    )))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new().nest(
        "/roles",
        Router::new()
            .route("/", get(list_roles).post(create_rol))
            .route("/{id}", get(get_rol).put(update_rol).delete(delete_rol)),
    )
}
