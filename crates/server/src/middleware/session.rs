//! Cookie-backed sessions. Protected routers are wrapped in [`require_session`], which
//! resolves the `sid` cookie to the active [`Usuario`] and stores it in the request
//! extensions for handlers to pick up with `Extension<Usuario>`.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use db::models::usuario::Usuario;
use deployment::Deployment;
use services::services::auth::AuthError;
use uuid::Uuid;

use crate::{DeploymentImpl, error::ApiError};

pub const SESSION_COOKIE: &str = "sid";

pub fn session_cookie(sesion_id: Uuid) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, sesion_id.to_string()))
        .http_only(true)
        .same_site(SameSite::Lax)
        .path("/")
        .build()
}

/// Cookie carrying the same name and path, used to drop the session on the client.
pub fn expired_cookie() -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE).path("/").build()
}

pub fn session_id(jar: &CookieJar) -> Option<Uuid> {
    jar.get(SESSION_COOKIE)
        .and_then(|cookie| Uuid::parse_str(cookie.value()).ok())
}

pub async fn require_session(
    State(deployment): State<DeploymentImpl>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let sesion_id = session_id(&jar).ok_or(AuthError::Unauthorized)?;
    let usuario: Usuario = deployment.auth().authenticate(sesion_id).await?;
    tracing::trace!(usuario_id = usuario.id, path = %request.uri().path(), "Session accepted");
    request.extensions_mut().insert(usuario);
    Ok(next.run(request).await)
}
