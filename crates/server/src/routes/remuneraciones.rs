use axum::{
    Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::get,
};
use db::models::remuneracion::{CreateRemuneracion, Remuneracion};
use deployment::Deployment;
use utils::response::ApiResponse;

use crate::{DeploymentImpl, error::ApiError};

pub async fn list_remuneraciones(
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<Vec<Remuneracion>>>, ApiError> {
    let remuneraciones = deployment.payroll().list_remuneraciones().await?;
    Ok(ResponseJson(ApiResponse::success(remuneraciones)))
}

pub async fn get_remuneracion(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<i64>,
) -> Result<ResponseJson<ApiResponse<Remuneracion>>, ApiError> {
    let remuneracion = deployment.payroll().get_remuneracion(id).await?;
    Ok(ResponseJson(ApiResponse::success(remuneracion)))
}

pub async fn create_remuneracion(
    State(deployment): State<DeploymentImpl>,
    ResponseJson(payload): ResponseJson<CreateRemuneracion>,
) -> Result<ResponseJson<ApiResponse<Remuneracion>>, ApiError> {
    let remuneracion = deployment.payroll().create_remuneracion(&payload).await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        remuneracion,
        "Remuneración registrada correctamente",
    )))
}

pub async fn update_remuneracion(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<i64>,
    ResponseJson(payload): ResponseJson<CreateRemuneracion>,
) -> Result<ResponseJson<ApiResponse<Remuneracion>>, ApiError> {
    let remuneracion = deployment
        .payroll()
        .update_remuneracion(id, &payload)
        .await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        remuneracion,
        "Remuneración actualizada correctamente",
    )))
}

pub async fn delete_remuneracion(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<i64>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    deployment.payroll().delete_remuneracion(id).await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        (),
        "Remuneración eliminada correctamente",
    )))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new().nest(
        "/remuneraciones",
        Router::new()
            .route("/", get(list_remuneraciones).post(create_remuneracion))
            .route(
                "/{id}",
                get(get_remuneracion)
                    .put(update_remuneracion)
                    .delete(delete_remuneracion),
            ),
    )
}
