//! Weekly payroll payments and the hour summaries used to prepare them.

use axum::{
    Router,
    extract::{Path, Query, State},
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::models::pago::{CreatePago, Pago};
use deployment::Deployment;
use services::services::{
    attendance::RangoEmpleado,
    payroll::{CalcularPago, CalculoHoras, CalculoPago, HorasReales, ResumenAsistencias},
};
use utils::response::ApiResponse;

use crate::{DeploymentImpl, error::ApiError};

pub async fn list_pagos(
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<Vec<Pago>>>, ApiError> {
    let pagos = deployment.payroll().list().await?;
    Ok(ResponseJson(ApiResponse::success(pagos)))
}

pub async fn get_pago(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<i64>,
) -> Result<ResponseJson<ApiResponse<Pago>>, ApiError> {
    let pago = deployment.payroll().get(id).await?;
    Ok(ResponseJson(ApiResponse::success(pago)))
}

pub async fn create_pago(
    State(deployment): State<DeploymentImpl>,
    ResponseJson(payload): ResponseJson<CreatePago>,
) -> Result<ResponseJson<ApiResponse<Pago>>, ApiError> {
    let pago = deployment.payroll().create(&payload).await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        pago,
        "Pago registrado correctamente",
    )))
}

pub async fn update_pago(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<i64>,
    ResponseJson(payload): ResponseJson<CreatePago>,
) -> Result<ResponseJson<ApiResponse<Pago>>, ApiError> {
    let pago = deployment.payroll().update(id, &payload).await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        pago,
        "Pago actualizado correctamente",
    )))
}

pub async fn delete_pago(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<i64>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    deployment.payroll().delete(id).await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        (),
        "Pago eliminado correctamente",
    )))
}

pub async fn calcular(
    State(deployment): State<DeploymentImpl>,
    ResponseJson(payload): ResponseJson<CalcularPago>,
) -> Result<ResponseJson<ApiResponse<CalculoPago>>, ApiError> {
    let calculo = deployment.payroll().calcular(&payload).await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        calculo,
        "Pago calculado correctamente",
    )))
}

pub async fn horas_trabajadas(
    State(deployment): State<DeploymentImpl>,
    Query(rango): Query<RangoEmpleado>,
) -> Result<ResponseJson<ApiResponse<HorasReales>>, ApiError> {
    let horas = deployment.payroll().horas_trabajadas(&rango).await?;
    Ok(ResponseJson(ApiResponse::success(horas)))
}

pub async fn resumen_asistencias(
    State(deployment): State<DeploymentImpl>,
    Query(rango): Query<RangoEmpleado>,
) -> Result<ResponseJson<ApiResponse<ResumenAsistencias>>, ApiError> {
    let resumen = deployment.payroll().resumen_asistencias(&rango).await?;
    Ok(ResponseJson(ApiResponse::success(resumen)))
}

/// An empty period is a well-formed answer reported with `success = false`.
pub async fn calcular_horas(
    State(deployment): State<DeploymentImpl>,
    Query(rango): Query<RangoEmpleado>,
) -> Result<ResponseJson<ApiResponse<CalculoHoras>>, ApiError> {
    let calculo = deployment.payroll().calcular_horas(&rango).await?;
    if calculo.encontrado() {
        Ok(ResponseJson(ApiResponse::success(calculo)))
    } else {
        let mensaje = calculo.mensaje.clone();
        Ok(ResponseJson(ApiResponse::failure_with_data(calculo, mensaje)))
    }
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new().nest(
        "/pagos",
        Router::new()
            .route("/", get(list_pagos).post(create_pago))
            .route("/calcular", post(calcular))
            .route("/horas-trabajadas", get(horas_trabajadas))
            .route("/resumen-asistencias", get(resumen_asistencias))
            .route("/calcular-horas", get(calcular_horas))
            .route("/{id}", get(get_pago).put(update_pago).delete(delete_pago)),
    )
}
