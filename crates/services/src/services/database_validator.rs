//! Startup check that migrations ran and every back-office table is present.

use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{info, warn};

pub const REQUIRED_TABLES: &[&str] = &[
    "roles",
    "usuarios",
    "sesiones",
    "recuperaciones_clave",
    "clientes",
    "productos",
    "proveedores",
    "empresas",
    "empleados",
    "asistencias",
    "pagos",
    "remuneraciones",
    "proformas",
    "proforma_detalles",
    "facturas",
    "factura_detalles",
    "ventas",
    "contratos",
];

#[derive(Debug, Error)]
pub enum DatabaseValidationError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("database not initialized")]
    NotInitialized,
    #[error("missing tables: {}", .0.join(", "))]
    MissingTables(Vec<String>),
}

pub struct DatabaseValidator {
    pool: SqlitePool,
}

impl DatabaseValidator {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn table_exists(&self, table: &str) -> Result<bool, DatabaseValidationError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = $1",
        )
        .bind(table)
        .fetch_one(&self.pool)
        .await?;
        Ok(count > 0)
    }

    /// Fails when migrations never ran or a required table is missing.
    pub async fn validate(&self) -> Result<ValidationResult, DatabaseValidationError> {
        if !self.table_exists("_sqlx_migrations").await? {
            warn!("Database not initialized - _sqlx_migrations table does not exist");
            return Err(DatabaseValidationError::NotInitialized);
        }

        let migrations_applied = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM _sqlx_migrations WHERE success = 1",
        )
        .fetch_one(&self.pool)
        .await?;

        let missing = self.validate_tables(REQUIRED_TABLES).await?;
        if !missing.is_empty() {
            warn!(missing = ?missing, "Database is missing required tables");
            return Err(DatabaseValidationError::MissingTables(missing));
        }

        let result = ValidationResult {
            migrations_applied: migrations_applied as usize,
            latest_migration: self.get_latest_migration().await?,
            tables_checked: REQUIRED_TABLES.len(),
        };
        info!(
            migrations_applied = result.migrations_applied,
            latest = ?result.latest_migration,
            "{}",
            result.summary()
        );
        Ok(result)
    }

    /// Names from `required_tables` that do not exist.
    pub async fn validate_tables(
        &self,
        required_tables: &[&str],
    ) -> Result<Vec<String>, DatabaseValidationError> {
        let mut missing_tables = Vec::new();
        for table in required_tables {
            if !self.table_exists(table).await? {
                missing_tables.push(table.to_string());
            }
        }
        Ok(missing_tables)
    }

    pub async fn get_latest_migration(&self) -> Result<Option<String>, DatabaseValidationError> {
        let migration = sqlx::query_scalar::<_, String>(
            "SELECT description FROM _sqlx_migrations WHERE success = 1 ORDER BY version DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(migration)
    }
}

#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub migrations_applied: usize,
    pub latest_migration: Option<String>,
    pub tables_checked: usize,
}

impl ValidationResult {
    pub fn summary(&self) -> String {
        format!(
            "Database OK - {} migrations applied, {} tables present",
            self.migrations_applied, self.tables_checked
        )
    }
}

#[cfg(test)]
mod tests {
    use sqlx::sqlite::SqlitePoolOptions;

    use super::*;
    use crate::services::test_support;

    #[tokio::test]
    async fn migrated_database_passes() {
        let validator = DatabaseValidator::new(test_support::pool().await);
        let result = validator.validate().await.unwrap();
        assert_eq!(result.migrations_applied, 3);
        assert_eq!(result.tables_checked, REQUIRED_TABLES.len());
        assert_eq!(result.latest_migration.as_deref(), Some("quotes invoices contracts"));
    }

    #[tokio::test]
    async fn empty_database_is_not_initialized() {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let err = DatabaseValidator::new(pool).validate().await.unwrap_err();
        assert!(matches!(err, DatabaseValidationError::NotInitialized));
    }

    #[tokio::test]
    async fn dropped_table_is_reported() {
        let pool = test_support::pool().await;
        sqlx::query("DROP TABLE ventas").execute(&pool).await.unwrap();
        let err = DatabaseValidator::new(pool).validate().await.unwrap_err();
        assert_eq!(err.to_string(), "missing tables: ventas");
    }
}
