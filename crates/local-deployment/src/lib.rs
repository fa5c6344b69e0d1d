use std::sync::Arc;

use async_trait::async_trait;
use db::DBService;
use deployment::{Deployment, DeploymentError};
use services::services::{
    config::Config, database_validator::DatabaseValidator,
    proforma_expiry::ProformaExpiryService,
};
use tokio::task::JoinHandle;
use tracing::info;

/// Single-process deployment over a local SQLite file.
#[derive(Clone)]
pub struct LocalDeployment {
    config: Arc<Config>,
    db: DBService,
}

impl LocalDeployment {
    /// Opens the database, checks the schema and creates the bootstrap administrator if
    /// configured and no user exists yet.
    pub async fn from_config(config: Config) -> Result<Self, DeploymentError> {
        let db = DBService::new(&config.database_url, config.db_max_connections).await?;
        DatabaseValidator::new(db.pool.clone()).validate().await?;

        let deployment = Self {
            config: Arc::new(config),
            db,
        };
        if let Some(admin) = &deployment.config.admin {
            if let Some(usuario) = deployment.auth().bootstrap_admin(admin).await? {
                info!(correo = %usuario.correo, "Administrator account ready");
            }
        }
        Ok(deployment)
    }
}

#[async_trait]
impl Deployment for LocalDeployment {
    async fn new() -> Result<Self, DeploymentError> {
        Self::from_config(Config::from_env()?).await
    }

    fn config(&self) -> &Config {
        &self.config
    }

    fn db(&self) -> &DBService {
        &self.db
    }

    async fn spawn_background_tasks(&self) -> Vec<JoinHandle<()>> {
        vec![ProformaExpiryService::spawn(self.db.clone(), self.config.expiry_sweep_interval).await]
    }
}

#[cfg(test)]
mod tests {
    use secrecy::SecretString;
    use services::services::config::AdminBootstrap;

    use super::*;

    #[tokio::test]
    async fn bootstraps_admin_once() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            database_url: format!("sqlite://{}", dir.path().join("backoffice.db").display()),
            admin: Some(AdminBootstrap {
                correo: "admin@acme.pe".to_string(),
                clave: SecretString::from("secreto1".to_string()),
            }),
            ..Config::default()
        };

        let deployment = LocalDeployment::from_config(config.clone()).await.unwrap();
        let (_, usuario) = deployment.auth().login("admin@acme.pe", "secreto1").await.unwrap();
        assert_eq!(usuario.rol.as_deref(), Some("ADMINISTRADOR"));
        drop(deployment);

        let again = LocalDeployment::from_config(config).await.unwrap();
        assert_eq!(again.users().list().await.unwrap().len(), 1);
    }
}
