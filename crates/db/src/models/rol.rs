use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use ts_rs::TS;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Rol {
    pub id: i64,
    pub descripcion: String,
    pub fecha_registro: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, TS)]
pub struct CreateRol {
    pub descripcion: String,
}

impl Rol {
    pub async fn find_all(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Rol>(
            "SELECT id, descripcion, fecha_registro FROM roles ORDER BY descripcion",
        )
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Rol>("SELECT id, descripcion, fecha_registro FROM roles WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn exists_descripcion(
        pool: &SqlitePool,
        descripcion: &str,
        exclude_id: Option<i64>,
    ) -> Result<bool, sqlx::Error> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM roles WHERE descripcion = $1 AND ($2 IS NULL OR id != $2)",
        )
        .bind(descripcion)
        .bind(exclude_id)
        .fetch_one(pool)
        .await?;
        Ok(count > 0)
    }

    pub async fn create(pool: &SqlitePool, descripcion: &str) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Rol>(
            "INSERT INTO roles (descripcion) VALUES ($1) RETURNING id, descripcion, fecha_registro",
        )
        .bind(descripcion)
        .fetch_one(pool)
        .await
    }

    pub async fn update(
        pool: &SqlitePool,
        id: i64,
        descripcion: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Rol>(
            "UPDATE roles SET descripcion = $2 WHERE id = $1 RETURNING id, descripcion, fecha_registro",
        )
        .bind(id)
        .bind(descripcion)
        .fetch_optional(pool)
        .await
    }

    /// Users still assigned to this role.
    pub async fn count_usuarios(pool: &SqlitePool, id: i64) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM usuarios WHERE rol_id = $1")
            .bind(id)
            .fetch_one(pool)
            .await
    }

    pub async fn delete(pool: &SqlitePool, id: i64) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM roles WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support;

    #[tokio::test]
    async fn seeded_roles_and_duplicate_check() {
        let pool = test_support::pool().await;
        let roles = Rol::find_all(&pool).await.unwrap();
        assert_eq!(roles.len(), 3);

        assert!(Rol::exists_descripcion(&pool, "VENDEDOR", None).await.unwrap());
        let vendedor = roles.iter().find(|r| r.descripcion == "VENDEDOR").unwrap();
        assert!(!Rol::exists_descripcion(&pool, "VENDEDOR", Some(vendedor.id)).await.unwrap());
    }

    #[tokio::test]
    async fn delete_reports_rows_affected() {
        let pool = test_support::pool().await;
        let rol = Rol::create(&pool, "CONTADOR").await.unwrap();
        assert_eq!(Rol::delete(&pool, rol.id).await.unwrap(), 1);
        assert_eq!(Rol::delete(&pool, rol.id).await.unwrap(), 0);
    }
}
