//! Invoices: direct or from an approved proforma, line edits, status changes and the
//! lookups used while building one. Every write keeps the derived sale in step.

use axum::{
    Extension, Router,
    extract::{Path, Query, State},
    response::Json as ResponseJson,
    routing::{delete, get, post, put},
};
use db::models::{
    factura::{
        AgregarProducto, CambiarEstadoFactura, CreateFactura, EstadisticasFacturas, Factura,
        FacturaConDetalles, FacturaDesdeProforma, UpdateFactura,
    },
    proforma::ProformaConDetalles,
    usuario::Usuario,
};
use deployment::Deployment;
use serde::Deserialize;
use services::services::invoicing::PuedeEliminar;
use utils::response::ApiResponse;

use crate::{DeploymentImpl, error::ApiError};

#[derive(Debug, Default, Deserialize)]
pub struct BusquedaFactura {
    #[serde(default)]
    pub q: String,
}

pub async fn list_facturas(
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<Vec<Factura>>>, ApiError> {
    let facturas = deployment.invoices().list().await?;
    Ok(ResponseJson(ApiResponse::success(facturas)))
}

pub async fn get_factura(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<i64>,
) -> Result<ResponseJson<ApiResponse<FacturaConDetalles>>, ApiError> {
    let factura = deployment.invoices().get(id).await?;
    Ok(ResponseJson(ApiResponse::success(factura)))
}

pub async fn buscar(
    State(deployment): State<DeploymentImpl>,
    Query(query): Query<BusquedaFactura>,
) -> Result<ResponseJson<ApiResponse<Vec<Factura>>>, ApiError> {
    let facturas = deployment.invoices().search(&query.q).await?;
    Ok(ResponseJson(ApiResponse::success(facturas)))
}

pub async fn estadisticas(
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<EstadisticasFacturas>>, ApiError> {
    let stats = deployment.invoices().estadisticas().await?;
    Ok(ResponseJson(ApiResponse::success(stats)))
}

pub async fn buscar_proforma(
    State(deployment): State<DeploymentImpl>,
    Path(codigo): Path<String>,
) -> Result<ResponseJson<ApiResponse<ProformaConDetalles>>, ApiError> {
    let proforma = deployment.invoices().buscar_proforma(&codigo).await?;
    Ok(ResponseJson(ApiResponse::success(proforma)))
}

pub async fn create_factura(
    State(deployment): State<DeploymentImpl>,
    Extension(usuario): Extension<Usuario>,
    ResponseJson(payload): ResponseJson<CreateFactura>,
) -> Result<ResponseJson<ApiResponse<FacturaConDetalles>>, ApiError> {
    let factura = deployment.invoices().create(usuario.id, &payload).await?;
    let message = format!("Factura {} creada correctamente", factura.codigo);
    Ok(ResponseJson(ApiResponse::success_with_message(factura, message)))
}

pub async fn desde_proforma(
    State(deployment): State<DeploymentImpl>,
    Extension(usuario): Extension<Usuario>,
    Path(proforma_id): Path<i64>,
    ResponseJson(payload): ResponseJson<FacturaDesdeProforma>,
) -> Result<ResponseJson<ApiResponse<FacturaConDetalles>>, ApiError> {
    let factura = deployment
        .invoices()
        .desde_proforma(usuario.id, proforma_id, &payload)
        .await?;
    let message = format!(
        "Factura {} generada desde la proforma correctamente",
        factura.codigo
    );
    Ok(ResponseJson(ApiResponse::success_with_message(factura, message)))
}

pub async fn update_factura(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<i64>,
    ResponseJson(payload): ResponseJson<UpdateFactura>,
) -> Result<ResponseJson<ApiResponse<FacturaConDetalles>>, ApiError> {
    let factura = deployment.invoices().update(id, &payload).await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        factura,
        "Factura actualizada correctamente",
    )))
}

pub async fn agregar_producto(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<i64>,
    ResponseJson(payload): ResponseJson<AgregarProducto>,
) -> Result<ResponseJson<ApiResponse<FacturaConDetalles>>, ApiError> {
    let factura = deployment.invoices().agregar_producto(id, &payload).await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        factura,
        "Producto agregado correctamente",
    )))
}

pub async fn eliminar_producto(
    State(deployment): State<DeploymentImpl>,
    Path((id, detalle_id)): Path<(i64, i64)>,
) -> Result<ResponseJson<ApiResponse<FacturaConDetalles>>, ApiError> {
    let factura = deployment
        .invoices()
        .eliminar_producto(id, detalle_id)
        .await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        factura,
        "Producto eliminado correctamente",
    )))
}

pub async fn puede_eliminar(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<i64>,
) -> Result<ResponseJson<ApiResponse<PuedeEliminar>>, ApiError> {
    let impacto = deployment.invoices().puede_eliminar(id).await?;
    Ok(ResponseJson(ApiResponse::success(impacto)))
}

pub async fn delete_factura(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<i64>,
) -> Result<ResponseJson<ApiResponse<PuedeEliminar>>, ApiError> {
    let impacto = deployment.invoices().delete(id).await?;
    let message = if impacto.ventas > 0 || impacto.contratos > 0 {
        format!("Factura eliminada exitosamente. {}", impacto.message)
    } else {
        "Factura eliminada exitosamente".to_string()
    };
    Ok(ResponseJson(ApiResponse::success_with_message(impacto, message)))
}

pub async fn cambiar_estado(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<i64>,
    ResponseJson(payload): ResponseJson<CambiarEstadoFactura>,
) -> Result<ResponseJson<ApiResponse<Factura>>, ApiError> {
    let factura = deployment
        .invoices()
        .cambiar_estado(id, &payload.estado)
        .await?;
    let message = format!("Factura marcada como {}", factura.estado);
    Ok(ResponseJson(ApiResponse::success_with_message(factura, message)))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new().nest(
        "/facturas",
        Router::new()
            .route("/", get(list_facturas).post(create_factura))
            .route("/buscar", get(buscar))
            .route("/estadisticas", get(estadisticas))
            .route("/buscar-proforma/{codigo}", get(buscar_proforma))
            .route("/desde-proforma/{proforma_id}", post(desde_proforma))
            .route(
                "/{id}",
                get(get_factura).put(update_factura).delete(delete_factura),
            )
            .route("/{id}/productos", post(agregar_producto))
            .route("/{id}/productos/{detalle_id}", delete(eliminar_producto))
            .route("/{id}/puede-eliminar", get(puede_eliminar))
            .route("/{id}/estado", put(cambiar_estado)),
    )
}
