use axum::{
    Router,
    extract::{Path, Query, State},
    response::Json as ResponseJson,
    routing::get,
};
use db::models::cliente::{Cliente, CreateCliente};
use deployment::Deployment;
use serde::Deserialize;
use utils::response::ApiResponse;

use crate::{DeploymentImpl, error::ApiError};

#[derive(Debug, Default, Deserialize)]
pub struct BusquedaCliente {
    pub buscar: Option<String>,
}

pub async fn list_clientes(
    State(deployment): State<DeploymentImpl>,
    Query(query): Query<BusquedaCliente>,
) -> Result<ResponseJson<ApiResponse<Vec<Cliente>>>, ApiError> {
    let clientes = deployment
        .catalog()
        .search_clientes(query.buscar.as_deref())
        .await?;
    Ok(ResponseJson(ApiResponse::success(clientes)))
}

pub async fn get_cliente(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<i64>,
) -> Result<ResponseJson<ApiResponse<Cliente>>, ApiError> {
    let cliente = deployment.catalog().get_cliente(id).await?;
    Ok(ResponseJson(ApiResponse::success(cliente)))
}

pub async fn create_cliente(
    State(deployment): State<DeploymentImpl>,
    ResponseJson(payload): ResponseJson<CreateCliente>,
) -> Result<ResponseJson<ApiResponse<Cliente>>, ApiError> {
    let cliente = deployment.catalog().create_cliente(&payload).await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        cliente,
        "Cliente creado correctamente",
    )))
}

pub async fn update_cliente(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<i64>,
    ResponseJson(payload): ResponseJson<CreateCliente>,
) -> Result<ResponseJson<ApiResponse<Cliente>>, ApiError> {
    let cliente = deployment.catalog().update_cliente(id, &payload).await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        cliente,
        "Cliente actualizado correctamente",
    )))
}

pub async fn delete_cliente(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<i64>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    deployment.catalog().deactivate_cliente(id).await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        (),
        "Cliente eliminado correctamente",
    )))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new().nest(
        "/clientes",
        Router::new()
            .route("/", get(list_clientes).post(create_cliente))
            .route(
                "/{id}",
                get(get_cliente).put(update_cliente).delete(delete_cliente),
            ),
    )
}
