//! Read-only dashboard figures. Proforma figures see expired quotes and sales figures see
//! every invoice; the report service prepares both before querying.

use axum::{Router, extract::State, response::Json as ResponseJson, routing::get};
use db::models::reporte::{
    DiagnosticoVentas, Kpis, ProformaVencida, ProformasPorCliente, ProformasPorEstado,
    ProformasPorMes, TopCliente, TopClienteVentas, VentasPorMes,
};
use deployment::Deployment;
use utils::response::ApiResponse;

use crate::{DeploymentImpl, error::ApiError};

pub async fn proformas_por_mes(
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<Vec<ProformasPorMes>>>, ApiError> {
    let rows = deployment.reports().proformas_por_mes().await?;
    Ok(ResponseJson(ApiResponse::success(rows)))
}

pub async fn proformas_por_estado(
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<Vec<ProformasPorEstado>>>, ApiError> {
    let rows = deployment.reports().proformas_por_estado().await?;
    Ok(ResponseJson(ApiResponse::success(rows)))
}

pub async fn top_clientes(
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<Vec<TopCliente>>>, ApiError> {
    let rows = deployment.reports().top_clientes().await?;
    Ok(ResponseJson(ApiResponse::success(rows)))
}

pub async fn proformas_por_cliente(
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<Vec<ProformasPorCliente>>>, ApiError> {
    let rows = deployment.reports().proformas_por_cliente().await?;
    Ok(ResponseJson(ApiResponse::success(rows)))
}

pub async fn kpis(
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<Kpis>>, ApiError> {
    let kpis = deployment.reports().kpis().await?;
    Ok(ResponseJson(ApiResponse::success(kpis)))
}

pub async fn ventas_por_mes(
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<Vec<VentasPorMes>>>, ApiError> {
    let rows = deployment.reports().ventas_por_mes().await?;
    Ok(ResponseJson(ApiResponse::success(rows)))
}

pub async fn top_clientes_ventas(
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<Vec<TopClienteVentas>>>, ApiError> {
    let rows = deployment.reports().top_clientes_ventas().await?;
    Ok(ResponseJson(ApiResponse::success(rows)))
}

pub async fn diagnostico_venta(
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<DiagnosticoVentas>>, ApiError> {
    let diagnostico = deployment.reports().diagnostico_ventas().await?;
    Ok(ResponseJson(ApiResponse::success(diagnostico)))
}

pub async fn proformas_vencidas(
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<Vec<ProformaVencida>>>, ApiError> {
    let rows = deployment.reports().proformas_vencidas().await?;
    Ok(ResponseJson(ApiResponse::success(rows)))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new().nest(
        "/reportes",
        Router::new()
            .route("/proformas-por-mes", get(proformas_por_mes))
            .route("/proformas-por-estado", get(proformas_por_estado))
            .route("/estadisticas-proformas", get(proformas_por_estado))
            .route("/top-clientes", get(top_clientes))
            .route("/proformas-por-cliente", get(proformas_por_cliente))
            .route("/kpis", get(kpis))
            .route("/ventas-por-mes", get(ventas_por_mes))
            .route("/top-clientes-ventas", get(top_clientes_ventas))
            .route("/diagnostico-venta", get(diagnostico_venta))
            .route("/proformas-vencidas", get(proformas_vencidas)),
    )
}
