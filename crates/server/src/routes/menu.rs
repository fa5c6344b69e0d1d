use axum::{Router, extract::State, response::Json as ResponseJson, routing::get};
use deployment::Deployment;
use services::services::reports::EstadisticasMenu;
use utils::response::ApiResponse;

use crate::{DeploymentImpl, error::ApiError};

pub async fn get_menu(
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<EstadisticasMenu>>, ApiError> {
    let stats = deployment.reports().menu().await?;
    Ok(ResponseJson(ApiResponse::success(stats)))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new().route("/menu", get(get_menu))
}
