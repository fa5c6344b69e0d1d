use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use ts_rs::TS;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Proveedor {
    pub id: i64,
    pub ruc: String,
    pub razon_social: String,
    pub direccion: Option<String>,
    pub telefono: Option<String>,
    pub celular: Option<String>,
    pub email: Option<String>,
    pub contacto: Option<String>,
    pub activo: bool,
    pub fecha_registro: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize, TS)]
pub struct CreateProveedor {
    pub ruc: String,
    pub razon_social: String,
    pub direccion: Option<String>,
    pub telefono: Option<String>,
    pub celular: Option<String>,
    pub email: Option<String>,
    pub contacto: Option<String>,
}

impl Proveedor {
    pub async fn find_all(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Proveedor>("SELECT * FROM proveedores ORDER BY razon_social")
            .fetch_all(pool)
            .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Proveedor>("SELECT * FROM proveedores WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn exists_ruc(
        pool: &SqlitePool,
        ruc: &str,
        exclude_id: Option<i64>,
    ) -> Result<bool, sqlx::Error> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM proveedores WHERE ruc = $1 AND ($2 IS NULL OR id != $2)",
        )
        .bind(ruc)
        .bind(exclude_id)
        .fetch_one(pool)
        .await?;
        Ok(count > 0)
    }

    pub async fn create(pool: &SqlitePool, data: &CreateProveedor) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Proveedor>(
            r#"INSERT INTO proveedores (ruc, razon_social, direccion, telefono, celular, email, contacto)
               VALUES ($1, $2, $3, $4, $5, $6, $7)
               RETURNING *"#,
        )
        .bind(data.ruc.trim())
        .bind(data.razon_social.trim())
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
        data: &CreateProveedor,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Proveedor>(
            r#"UPDATE proveedores
               SET ruc = $2, razon_social = $3, direccion = $4, telefono = $5,
                   celular = $6, email = $7, contacto = $8
               WHERE id = $1
               RETURNING *"#,
        )
        .bind(id)
        .bind(data.ruc.trim())
        .bind(data.razon_social.trim())
        .bind(&data.direccion)
        .bind(&data.telefono)
        .bind(&data.celular)
        .bind(&data.email)
        .bind(&data.contacto)
        .fetch_optional(pool)
        .await
    }

    pub async fn set_activo(pool: &SqlitePool, id: i64, activo: bool) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("UPDATE proveedores SET activo = $2 WHERE id = $1")
            .bind(id)
            .bind(activo)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn delete(pool: &SqlitePool, id: i64) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM proveedores WHERE id = $1")
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
    async fn toggle_and_delete() {
        let pool = test_support::pool().await;
        let proveedor = Proveedor::create(
            &pool,
            &CreateProveedor {
                ruc: "20600000001".into(),
                razon_social: "Distribuidora Sur".into(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert!(proveedor.activo);

        Proveedor::set_activo(&pool, proveedor.id, false).await.unwrap();
        let reloaded = Proveedor::find_by_id(&pool, proveedor.id).await.unwrap().unwrap();
        assert!(!reloaded.activo);

        assert_eq!(Proveedor::delete(&pool, proveedor.id).await.unwrap(), 1);
        assert!(Proveedor::find_all(&pool).await.unwrap().is_empty());
    }
}
