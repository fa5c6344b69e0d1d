use axum::{
    Router,
    middleware::from_fn_with_state,
};
use serde::Deserialize;
use tower_http::trace::TraceLayer;
use ts_rs::TS;

use crate::{DeploymentImpl, middleware::session::require_session};

pub mod asistencia;
pub mod auth;
pub mod clientes;
pub mod contratos;
pub mod empleados;
pub mod empresa;
pub mod facturas;
pub mod health;
pub mod menu;
pub mod pagos;
pub mod productos;
pub mod proformas;
pub mod proveedores;
pub mod remuneraciones;
pub mod reportes;
pub mod roles;
pub mod usuarios;

/// `{estado}` body shared by the status-change endpoints.
#[derive(Debug, Clone, Deserialize, TS)]
pub struct CambioEstado {
    pub estado: String,
}

pub fn router(deployment: DeploymentImpl) -> Router {
    let protected = Router::new()
        .merge(auth::session_router(&deployment))
        .merge(menu::router(&deployment))
        .merge(clientes::router(&deployment))
        .merge(productos::router(&deployment))
        .merge(roles::router(&deployment))
        .merge(usuarios::router(&deployment))
        .merge(empleados::router(&deployment))
        .merge(empresa::router(&deployment))
        .merge(proveedores::router(&deployment))
        .merge(asistencia::router(&deployment))
        .merge(pagos::router(&deployment))
        .merge(remuneraciones::router(&deployment))
        .merge(proformas::router(&deployment))
        .merge(facturas::router(&deployment))
        .merge(contratos::router(&deployment))
        .merge(reportes::router(&deployment))
        .route_layer(from_fn_with_state(deployment.clone(), require_session));

    Router::new()
        .merge(health::router(&deployment))
        .merge(auth::router(&deployment))
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .with_state(deployment)
}
