use anyhow::Context;
use deployment::Deployment;
use server::{DeploymentImpl, router};
use tracing::info;
use utils::log::init_tracing;

const DEFAULT_LOG_FILTER: &str = "info,server=debug,services=debug";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is normal outside development
    let _ = dotenvy::dotenv();
    init_tracing(DEFAULT_LOG_FILTER);

    let deployment = DeploymentImpl::new()
        .await
        .context("failed to initialize deployment")?;
    let background = deployment.spawn_background_tasks().await;
    info!(tasks = background.len(), "Background services started");

    let addr = (deployment.config().host, deployment.config().port);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}:{}", addr.0, addr.1))?;
    info!("Server listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router(deployment))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    for handle in background {
        handle.abort();
    }
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}
