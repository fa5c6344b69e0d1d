use axum::{
    Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::get,
};
use db::models::empleado::{CreateEmpleado, Empleado};
use deployment::Deployment;
use utils::response::ApiResponse;

use crate::{DeploymentImpl, error::ApiError};

pub async fn list_empleados(
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<Vec<Empleado>>>, ApiError> {
    let empleados = deployment.staff().list().await?;
    Ok(ResponseJson(ApiResponse::success(empleados)))
}

pub async fn get_empleado(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<i64>,
) -> Result<ResponseJson<ApiResponse<Empleado>>, ApiError> {
    let empleado = deployment.staff().get(id).await?;
    Ok(ResponseJson(ApiResponse::success(empleado)))
}

pub async fn create_empleado(
    State(deployment): State<DeploymentImpl>,
    ResponseJson(payload): ResponseJson<CreateEmpleado>,
) -> Result<ResponseJson<ApiResponse<Empleado>>, ApiError> {
    let empleado = deployment.staff().create(&payload).await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        empleado,
        "Empleado registrado correctamente",
    )))
}

pub async fn update_empleado(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<i64>,
    ResponseJson(payload): ResponseJson<CreateEmpleado>,
) -> Result<ResponseJson<ApiResponse<Empleado>>, ApiError> {
    let empleado = deployment.staff().update(id, &payload).await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        empleado,
        "Empleado actualizado correctamente",
    )))
}

pub async fn delete_empleado(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<i64>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    deployment.staff().delete(id).await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        (),
        "Empleado eliminado correctamente",
    )))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new().nest(
        "/empleados",
        Router::new()
            .route("/", get(list_empleados).post(create_empleado))
            .route(
                "/{id}",
                get(get_empleado).put(update_empleado).delete(delete_empleado),
            ),
    )
}
