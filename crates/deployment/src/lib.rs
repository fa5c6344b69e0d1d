use async_trait::async_trait;
use db::DBService;
use services::services::{
    attendance::AttendanceService,
    auth::{AuthError, AuthService},
    catalog::CatalogService,
    config::{Config, ConfigError},
    contracts::ContractService,
    database_validator::DatabaseValidationError,
    invoicing::InvoiceService,
    payroll::PayrollService,
    proformas::ProformaService,
    reports::ReportService,
    staff::StaffService,
    users::UserService,
};
use thiserror::Error;
use tokio::task::JoinHandle;

#[derive(Debug, Error)]
pub enum DeploymentError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    DatabaseValidation(#[from] DatabaseValidationError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Everything the HTTP layer needs: configuration, the database and the domain services
/// built over it. Services are cheap handles around the shared pool.
#[async_trait]
pub trait Deployment: Clone + Send + Sync + 'static {
    async fn new() -> Result<Self, DeploymentError>;

    fn config(&self) -> &Config;

    fn db(&self) -> &DBService;

    /// Starts periodic maintenance. Handles are returned so callers may abort them.
    async fn spawn_background_tasks(&self) -> Vec<JoinHandle<()>>;

    fn auth(&self) -> AuthService {
        AuthService::new(self.db().pool.clone(), self.config().session_ttl)
    }

    fn users(&self) -> UserService {
        UserService::new(self.db().pool.clone())
    }

    fn catalog(&self) -> CatalogService {
        CatalogService::new(self.db().pool.clone())
    }

    fn staff(&self) -> StaffService {
        StaffService::new(self.db().pool.clone())
    }

    fn attendance(&self) -> AttendanceService {
        AttendanceService::new(self.db().pool.clone())
    }

    fn payroll(&self) -> PayrollService {
        PayrollService::new(self.db().pool.clone())
    }

    fn proformas(&self) -> ProformaService {
        ProformaService::new(self.db().pool.clone())
    }

    fn invoices(&self) -> InvoiceService {
        InvoiceService::new(self.db().pool.clone())
    }

    fn contracts(&self) -> ContractService {
        ContractService::new(self.db().pool.clone())
    }

    fn reports(&self) -> ReportService {
        ReportService::new(self.db().pool.clone())
    }
}
