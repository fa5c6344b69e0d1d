use axum::{
    Router,
    extract::{Path, Query, State},
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::models::{
    asistencia::{Asistencia, CreateAsistencia, ResumenHoras, ResumenSemanal},
    empleado::Empleado,
};
use deployment::Deployment;
use serde::Deserialize;
use services::services::attendance::{RangoEmpleado, RegistroMultiple, ResultadoRegistro};
use utils::response::ApiResponse;

use crate::{DeploymentImpl, error::ApiError};

#[derive(Debug, Default, Deserialize)]
pub struct SemanaQuery {
    pub anio: Option<i64>,
    pub semana: Option<i64>,
}

pub async fn list_asistencias(
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<Vec<Asistencia>>>, ApiError> {
    let asistencias = deployment.attendance().list().await?;
    Ok(ResponseJson(ApiResponse::success(asistencias)))
}

pub async fn get_asistencia(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<i64>,
) -> Result<ResponseJson<ApiResponse<Asistencia>>, ApiError> {
    let asistencia = deployment.attendance().get(id).await?;
    Ok(ResponseJson(ApiResponse::success(asistencia)))
}

pub async fn empleados_activos(
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<Vec<Empleado>>>, ApiError> {
    let empleados = deployment.attendance().empleados_activos().await?;
    Ok(ResponseJson(ApiResponse::success(empleados)))
}

pub async fn create_asistencia(
    State(deployment): State<DeploymentImpl>,
    ResponseJson(payload): ResponseJson<CreateAsistencia>,
) -> Result<ResponseJson<ApiResponse<Asistencia>>, ApiError> {
    let asistencia = deployment.attendance().create(&payload).await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        asistencia,
        "Asistencia registrada correctamente",
    )))
}

pub async fn update_asistencia(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<i64>,
    ResponseJson(payload): ResponseJson<CreateAsistencia>,
) -> Result<ResponseJson<ApiResponse<Asistencia>>, ApiError> {
    let asistencia = deployment.attendance().update(id, &payload).await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        asistencia,
        "Asistencia actualizada correctamente",
    )))
}

pub async fn delete_asistencia(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<i64>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    deployment.attendance().delete(id).await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        (),
        "Asistencia eliminada correctamente",
    )))
}

/// Quick registration: creates or replaces the record for the employee and date.
pub async fn registrar(
    State(deployment): State<DeploymentImpl>,
    ResponseJson(payload): ResponseJson<CreateAsistencia>,
) -> Result<ResponseJson<ApiResponse<Asistencia>>, ApiError> {
    let asistencia = deployment.attendance().registrar(&payload).await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        asistencia,
        "Asistencia registrada correctamente",
    )))
}

pub async fn registrar_multiple(
    State(deployment): State<DeploymentImpl>,
    ResponseJson(payload): ResponseJson<RegistroMultiple>,
) -> Result<ResponseJson<ApiResponse<Vec<ResultadoRegistro>>>, ApiError> {
    let resultados = deployment
        .attendance()
        .registrar_multiple(&payload.asistencias)
        .await?;
    Ok(ResponseJson(ApiResponse::success(resultados)))
}

pub async fn horas_trabajadas(
    State(deployment): State<DeploymentImpl>,
    Query(rango): Query<RangoEmpleado>,
) -> Result<ResponseJson<ApiResponse<ResumenHoras>>, ApiError> {
    let resumen = deployment.attendance().horas_trabajadas(&rango).await?;
    Ok(ResponseJson(ApiResponse::success(resumen)))
}

pub async fn resumen_semanal(
    State(deployment): State<DeploymentImpl>,
    Query(query): Query<SemanaQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<ResumenSemanal>>>, ApiError> {
    let resumen = deployment
        .attendance()
        .resumen_semanal(query.anio, query.semana)
        .await?;
    Ok(ResponseJson(ApiResponse::success(resumen)))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new().nest(
        "/asistencia",
        Router::new()
            .route("/", get(list_asistencias).post(create_asistencia))
            .route("/empleados", get(empleados_activos))
            .route("/horas-trabajadas", get(horas_trabajadas))
            .route("/resumen-semanal", get(resumen_semanal))
            .route("/registrar", post(registrar))
            .route("/registrar-multiple", post(registrar_multiple))
            .route(
                "/{id}",
                get(get_asistencia)
                    .put(update_asistencia)
                    .delete(delete_asistencia),
            ),
    )
}
