use axum::{
    Json,
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use deployment::DeploymentError;
use services::services::{
    attendance::AttendanceError, auth::AuthError, catalog::CatalogError,
    contracts::ContratoError, invoicing::FacturaError, payroll::PayrollError,
    proformas::ProformaError, reports::ReportError, staff::StaffError, users::UserError,
};
use thiserror::Error;
use utils::response::ApiResponse;

const INTERNAL_MESSAGE: &str = "Error interno del servidor";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    User(#[from] UserError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Staff(#[from] StaffError),
    #[error(transparent)]
    Attendance(#[from] AttendanceError),
    #[error(transparent)]
    Payroll(#[from] PayrollError),
    #[error(transparent)]
    Proforma(#[from] ProformaError),
    #[error(transparent)]
    Factura(#[from] FacturaError),
    #[error(transparent)]
    Contrato(#[from] ContratoError),
    #[error(transparent)]
    Report(#[from] ReportError),
    #[error(transparent)]
    Deployment(#[from] DeploymentError),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Multipart(#[from] MultipartError),
    #[error("{0}")]
    BadRequest(String),
}

fn attendance_status(err: &AttendanceError) -> StatusCode {
    match err {
        AttendanceError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        AttendanceError::Validation(_) => StatusCode::BAD_REQUEST,
        AttendanceError::NotFound(_) => StatusCode::NOT_FOUND,
        AttendanceError::Conflict(_) => StatusCode::CONFLICT,
    }
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Auth(err) => match err {
                AuthError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
                AuthError::Validation(_) => StatusCode::BAD_REQUEST,
                AuthError::InvalidCredentials | AuthError::Unauthorized => StatusCode::UNAUTHORIZED,
                AuthError::NotFound(_) => StatusCode::NOT_FOUND,
            },
            ApiError::User(err) => match err {
                UserError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
                UserError::Validation(_) => StatusCode::BAD_REQUEST,
                UserError::NotFound(_) => StatusCode::NOT_FOUND,
                UserError::Conflict(_) => StatusCode::CONFLICT,
            },
            ApiError::Catalog(err) => match err {
                CatalogError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
                CatalogError::Validation(_) => StatusCode::BAD_REQUEST,
                CatalogError::NotFound(_) => StatusCode::NOT_FOUND,
                CatalogError::Conflict(_) => StatusCode::CONFLICT,
            },
            ApiError::Staff(err) => match err {
                StaffError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
                StaffError::Validation(_) => StatusCode::BAD_REQUEST,
                StaffError::NotFound => StatusCode::NOT_FOUND,
                StaffError::Conflict(_) => StatusCode::CONFLICT,
            },
            ApiError::Attendance(err) => attendance_status(err),
            ApiError::Payroll(err) => match err {
                PayrollError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
                PayrollError::Attendance(inner) => attendance_status(inner),
                PayrollError::Validation(_) => StatusCode::BAD_REQUEST,
                PayrollError::NotFound(_) => StatusCode::NOT_FOUND,
                PayrollError::Conflict(_) => StatusCode::CONFLICT,
            },
            ApiError::Proforma(err) => match err {
                ProformaError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
                ProformaError::Validation(_) => StatusCode::BAD_REQUEST,
                ProformaError::NotFound(_) => StatusCode::NOT_FOUND,
                ProformaError::Conflict(_) => StatusCode::CONFLICT,
            },
            ApiError::Factura(err) => match err {
                FacturaError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
                FacturaError::Validation(_) => StatusCode::BAD_REQUEST,
                FacturaError::NotFound(_) => StatusCode::NOT_FOUND,
                FacturaError::Conflict(_) => StatusCode::CONFLICT,
            },
            ApiError::Contrato(err) => match err {
                ContratoError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
                ContratoError::Validation(_) => StatusCode::BAD_REQUEST,
                ContratoError::NotFound(_) => StatusCode::NOT_FOUND,
                ContratoError::Conflict(_) => StatusCode::CONFLICT,
            },
            ApiError::Report(_) | ApiError::Deployment(_) | ApiError::Database(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::Multipart(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        // Internal failures are logged in full but never shown to the client
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "Request failed");
            INTERNAL_MESSAGE.to_string()
        } else {
            tracing::debug!(status = %status, error = %self, "Request rejected");
            self.to_string()
        };
        (status, Json(ApiResponse::<()>::error(&message))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_errors_map_to_status_codes() {
        assert_eq!(
            ApiError::from(AuthError::Unauthorized).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::from(CatalogError::Conflict("dup".into())).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(StaffError::NotFound).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(PayrollError::Attendance(AttendanceError::Validation("x".into())))
                .status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(sqlx::Error::RowNotFound).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn internal_errors_hide_details() {
        let response = ApiError::from(sqlx::Error::RowNotFound).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
