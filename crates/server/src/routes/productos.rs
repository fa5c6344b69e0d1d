use axum::{
    Router,
    extract::{Path, Query, State},
    response::Json as ResponseJson,
    routing::get,
};
use db::models::producto::{CreateProducto, Producto, ProductoResumen};
use deployment::Deployment;
use serde::Deserialize;
use utils::response::ApiResponse;

use crate::{DeploymentImpl, error::ApiError};

#[derive(Debug, Default, Deserialize)]
pub struct BusquedaProducto {
    pub buscar: Option<String>,
    pub codigo: Option<String>,
}

pub async fn list_productos(
    State(deployment): State<DeploymentImpl>,
    Query(query): Query<BusquedaProducto>,
) -> Result<ResponseJson<ApiResponse<Vec<Producto>>>, ApiError> {
    let productos = deployment
        .catalog()
        .search_productos(query.buscar.as_deref(), query.codigo.as_deref())
        .await?;
    Ok(ResponseJson(ApiResponse::success(productos)))
}

/// Compact rows for line-item pickers.
pub async fn list_productos_compact(
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<Vec<ProductoResumen>>>, ApiError> {
    let productos = deployment.catalog().list_productos_compact().await?;
    Ok(ResponseJson(ApiResponse::success(productos)))
}

pub async fn get_producto(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<i64>,
) -> Result<ResponseJson<ApiResponse<Producto>>, ApiError> {
    let producto = deployment.catalog().get_producto(id).await?;
    Ok(ResponseJson(ApiResponse::success(producto)))
}

pub async fn create_producto(
    State(deployment): State<DeploymentImpl>,
    ResponseJson(payload): ResponseJson<CreateProducto>,
) -> Result<ResponseJson<ApiResponse<Producto>>, ApiError> {
    let producto = deployment.catalog().create_producto(&payload).await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        producto,
        "Producto creado correctamente",
    )))
}

pub async fn update_producto(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<i64>,
    ResponseJson(payload): ResponseJson<CreateProducto>,
) -> Result<ResponseJson<ApiResponse<Producto>>, ApiError> {
    let producto = deployment.catalog().update_producto(id, &payload).await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        producto,
        "Producto actualizado correctamente",
    )))
}

pub async fn delete_producto(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<i64>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    deployment.catalog().deactivate_producto(id).await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        (),
        "Producto eliminado correctamente",
    )))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new().nest(
        "/productos",
        Router::new()
            .route("/", get(list_productos).post(create_producto))
            .route("/api/listar", get(list_productos_compact))
            .route(
                "/{id}",
                get(get_producto).put(update_producto).delete(delete_producto),
            ),
    )
}
