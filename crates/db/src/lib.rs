use std::{str::FromStr, time::Duration};

use sqlx::{
    Error, Pool, Sqlite, SqlitePool,
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
};
use tracing::info;

pub mod models;

#[derive(Clone)]
pub struct DBService {
    pub pool: Pool<Sqlite>,
}

impl DBService {
    /// Open (creating if missing) the database at `database_url` and apply pending migrations.
    pub async fn new(database_url: &str, max_connections: u32) -> Result<DBService, Error> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        info!(database_url, "Database ready");
        Ok(DBService { pool })
    }

    /// Private in-memory database. A single connection keeps every query on the same database.
    pub async fn new_in_memory() -> Result<DBService, Error> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        let pool: SqlitePool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(DBService { pool })
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::NaiveDate;
    use sqlx::SqlitePool;

    use crate::DBService;

    pub async fn pool() -> SqlitePool {
        DBService::new_in_memory().await.unwrap().pool
    }

    pub fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    /// Inserts a user (rol 1) and returns its id.
    pub async fn usuario(pool: &SqlitePool, correo: &str) -> i64 {
        sqlx::query_scalar(
            "INSERT INTO usuarios (nombres, apellidos, numero_documento, correo, clave, rol_id)
             VALUES ('Ana', 'Quispe', $1, $1, 'x', 1) RETURNING id",
        )
        .bind(correo)
        .fetch_one(pool)
        .await
        .unwrap()
    }

    pub async fn cliente(pool: &SqlitePool, razon_social: &str) -> i64 {
        sqlx::query_scalar(
            "INSERT INTO clientes (documento, razon_social) VALUES ($1, $1) RETURNING id",
        )
        .bind(razon_social)
        .fetch_one(pool)
        .await
        .unwrap()
    }

    pub async fn empresa(pool: &SqlitePool) -> i64 {
        sqlx::query_scalar(
            "INSERT INTO empresas (nombre, ruc, direccion) VALUES ('Acme', '20100000001', 'Lima') RETURNING id",
        )
        .fetch_one(pool)
        .await
        .unwrap()
    }

    pub async fn producto(pool: &SqlitePool, codigo: &str, precio: f64) -> i64 {
        sqlx::query_scalar(
            "INSERT INTO productos (codigo, nombre, precio_unitario) VALUES ($1, $1, $2) RETURNING id",
        )
        .bind(codigo)
        .bind(precio)
        .fetch_one(pool)
        .await
        .unwrap()
    }

    pub async fn empleado(pool: &SqlitePool, correo: &str, sueldo_base: f64) -> i64 {
        let usuario_id = usuario(pool, correo).await;
        sqlx::query_scalar(
            "INSERT INTO empleados (usuario_id, cargo, fecha_contratacion, sueldo_base)
             VALUES ($1, 'Técnico', '2024-01-02', $2) RETURNING id",
        )
        .bind(usuario_id)
        .bind(sueldo_base)
        .fetch_one(pool)
        .await
        .unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn migrations_create_a_usable_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("backoffice.db").display());
        let db = DBService::new(&url, 2).await.unwrap();
        let roles: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM roles")
            .fetch_one(&db.pool)
            .await
            .unwrap();
        assert_eq!(roles, 3);

        // Reopening does not re-run applied migrations
        drop(db);
        DBService::new(&url, 2).await.unwrap();
    }
}
