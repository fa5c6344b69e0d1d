//! Login, logout, the current session and password recovery.

use axum::{
    Extension, Router,
    extract::State,
    response::Json as ResponseJson,
    routing::{get, post},
};
use axum_extra::extract::cookie::CookieJar;
use db::models::usuario::Usuario;
use deployment::Deployment;
use serde::Deserialize;
use services::services::auth::RecoveryToken;
use ts_rs::TS;
use utils::response::ApiResponse;

use crate::{
    DeploymentImpl,
    error::ApiError,
    middleware::session::{expired_cookie, session_cookie, session_id},
};

#[derive(Debug, Deserialize, TS)]
pub struct LoginRequest {
    #[serde(default)]
    pub correo: String,
    #[serde(default)]
    pub clave: String,
}

#[derive(Debug, Deserialize, TS)]
pub struct RecuperarRequest {
    #[serde(default)]
    pub correo: String,
}

#[derive(Debug, Deserialize, TS)]
pub struct NuevaClaveRequest {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub nueva_clave: String,
}

pub async fn login(
    State(deployment): State<DeploymentImpl>,
    jar: CookieJar,
    ResponseJson(payload): ResponseJson<LoginRequest>,
) -> Result<(CookieJar, ResponseJson<ApiResponse<Usuario>>), ApiError> {
    let (sesion, usuario) = deployment.auth().login(&payload.correo, &payload.clave).await?;
    let message = format!("Bienvenido, {}", usuario.nombre_completo());
    Ok((
        jar.add(session_cookie(sesion.id)),
        ResponseJson(ApiResponse::success_with_message(usuario, message)),
    ))
}

pub async fn logout(
    State(deployment): State<DeploymentImpl>,
    jar: CookieJar,
) -> Result<(CookieJar, ResponseJson<ApiResponse<()>>), ApiError> {
    if let Some(sesion_id) = session_id(&jar) {
        deployment.auth().logout(sesion_id).await?;
    }
    Ok((
        jar.remove(expired_cookie()),
        ResponseJson(ApiResponse::success_with_message((), "Sesión cerrada")),
    ))
}

pub async fn current_session(
    Extension(usuario): Extension<Usuario>,
) -> ResponseJson<ApiResponse<Usuario>> {
    ResponseJson(ApiResponse::success(usuario))
}

/// Issues a one-time recovery token. Delivery to the user happens outside this service.
pub async fn recover_password(
    State(deployment): State<DeploymentImpl>,
    ResponseJson(payload): ResponseJson<RecuperarRequest>,
) -> Result<ResponseJson<ApiResponse<RecoveryToken>>, ApiError> {
    let token = deployment.auth().request_recovery(&payload.correo).await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        token,
        "Se generó el enlace de recuperación",
    )))
}

pub async fn reset_password(
    State(deployment): State<DeploymentImpl>,
    ResponseJson(payload): ResponseJson<NuevaClaveRequest>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    deployment
        .auth()
        .reset_password(&payload.token, &payload.nueva_clave)
        .await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        (),
        "Contraseña actualizada correctamente",
    )))
}

/// Routes reachable without a session.
pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new()
        .route("/login", post(login))
        .route("/logout", get(logout).post(logout))
        .route("/recuperar", post(recover_password))
        .route("/nueva-clave", post(reset_password))
}

pub fn session_router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new().route("/sesion", get(current_session))
}
