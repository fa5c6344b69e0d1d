use axum::{
    Extension, Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::get,
};
use db::models::usuario::{CreateUsuario, UpdateUsuario, Usuario};
use deployment::Deployment;
use utils::response::ApiResponse;

use crate::{DeploymentImpl, error::ApiError};

pub async fn list_usuarios(
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<Vec<Usuario>>>, ApiError> {
    let usuarios = deployment.users().list().await?;
    Ok(ResponseJson(ApiResponse::success(usuarios)))
}

pub async fn get_usuario(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<i64>,
) -> Result<ResponseJson<ApiResponse<Usuario>>, ApiError> {
    let usuario = deployment.users().get(id).await?;
    Ok(ResponseJson(ApiResponse::success(usuario)))
}

pub async fn create_usuario(
    State(deployment): State<DeploymentImpl>,
    ResponseJson(payload): ResponseJson<CreateUsuario>,
) -> Result<ResponseJson<ApiResponse<Usuario>>, ApiError> {
    let usuario = deployment.users().create(&payload).await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        usuario,
        "Usuario creado correctamente",
    )))
}

pub async fn update_usuario(
    State(deployment): State<DeploymentImpl>,
    Extension(actual): Extension<Usuario>,
    Path(id): Path<i64>,
    ResponseJson(payload): ResponseJson<UpdateUsuario>,
) -> Result<ResponseJson<ApiResponse<Usuario>>, ApiError> {
    let usuario = deployment.users().update(id, &payload, actual.id).await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        usuario,
        "Usuario actualizado correctamente",
    )))
}

/// Soft delete. The signed-in user cannot deactivate their own account.
pub async fn delete_usuario(
    State(deployment): State<DeploymentImpl>,
    Extension(actual): Extension<Usuario>,
    Path(id): Path<i64>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    deployment.users().deactivate(id, actual.id).await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        (),
        "Usuario desactivado correctamente",
    )))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new().nest(
        "/usuarios",
        Router::new()
            .route("/", get(list_usuarios).post(create_usuario))
            .route(
                "/{id}",
                get(get_usuario).put(update_usuario).delete(delete_usuario),
            ),
    )
}
