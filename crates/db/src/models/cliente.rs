use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use ts_rs::TS;

const SELECT_CLIENTE: &str = r#"SELECT id, documento, razon_social, direccion, telefono, celular,
        email, contacto, activo, fecha_registro
    FROM clientes"#;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Cliente {
    pub id: i64,
    pub documento: String,
    pub razon_social: String,
    pub direccion: Option<String>,
    pub telefono: Option<String>,
    pub celular: Option<String>,
    pub email: Option<String>,
    pub contacto: Option<String>,
    pub activo: bool,
    pub fecha_registro: DateTime<Utc>,
}

/// Payload for create and update.
#[derive(Debug, Clone, Default, Deserialize, TS)]
pub struct CreateCliente {
    pub documento: String,
    pub razon_social: String,
    pub direccion: Option<String>,
    pub telefono: Option<String>,
    pub celular: Option<String>,
    pub email: Option<String>,
    pub contacto: Option<String>,
}

impl Cliente {
    /// Active clients whose document or name contains `term`; all active ones for an empty term.
    pub async fn search(pool: &SqlitePool, term: &str) -> Result<Vec<Self>, sqlx::Error> {
        let pattern = format!("%{}%", term.trim());
        sqlx::query_as::<_, Cliente>(&format!(
            "{SELECT_CLIENTE} WHERE activo = 1 AND (documento LIKE $1 OR razon_social LIKE $1) ORDER BY razon_social"
        ))
        .bind(pattern)
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Cliente>(&format!("{SELECT_CLIENTE} WHERE id = $1"))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn count_active(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM clientes WHERE activo = 1")
            .fetch_one(pool)
            .await
    }

    pub async fn create(pool: &SqlitePool, data: &CreateCliente) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Cliente>(
            r#"INSERT INTO clientes (documento, razon_social, direccion, telefono, celular, email, contacto)
               VALUES ($1, $2, $3, $4, $5, $6, $7)
               RETURNING id, documento, razon_social, direccion, telefono, celular,
                         email, contacto, activo, fecha_registro"#,
        )
        .bind(&data.documento)
        .bind(&data.razon_social)
        .bind(&data.direccion)
        .bind(&data.telefono)
        .bind(&data.celular)
        .bind(&data.email)
        .bind(&data.contacto)
        .fetch_one(pool)
        .await
    }

    pub async fn update(
        pool: &SqlitePool,
        id: i64,
        data: &CreateCliente,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Cliente>(
            r#"UPDATE clientes
               SET documento = $2, razon_social = $3, direccion = $4, telefono = $5,
                   celular = $6, email = $7, contacto = $8
               WHERE id = $1
               RETURNING id, documento, razon_social, direccion, telefono, celular,
                         email, contacto, activo, fecha_registro"#,
        )
        .bind(id)
        .bind(&data.documento)
        .bind(&data.razon_social)
        .bind(&data.direccion)
        .bind(&data.telefono)
        .bind(&data.celular)
        .bind(&data.email)
        .bind(&data.contacto)
        .fetch_optional(pool)
        .await
    }

    /// Soft delete.
    pub async fn deactivate(pool: &SqlitePool, id: i64) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("UPDATE clientes SET activo = 0 WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
