use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqliteExecutor, SqlitePool};
use ts_rs::TS;

pub const UNIDAD_POR_DEFECTO: &str = "UNID";

const SELECT_PRODUCTO: &str = r#"SELECT id, codigo, nombre, descripcion, marca, modelo, tipo,
        unidad_medida, precio_unitario, activo, fecha_registro
    FROM productos"#;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Producto {
    pub id: i64,
    pub codigo: String,
    pub nombre: String,
    pub descripcion: Option<String>,
    pub marca: Option<String>,
    pub modelo: Option<String>,
    pub tipo: Option<String>,
    pub unidad_medida: String,
    pub precio_unitario: f64,
    pub activo: bool,
    pub fecha_registro: DateTime<Utc>,
}

/// Compact row for line-item pickers.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct ProductoResumen {
    pub id: i64,
    pub codigo: String,
    pub nombre: String,
    pub unidad_medida: String,
    pub precio_unitario: f64,
}

#[derive(Debug, Clone, Default, Deserialize, TS)]
pub struct CreateProducto {
    pub codigo: String,
    pub nombre: String,
    pub descripcion: Option<String>,
    pub marca: Option<String>,
    pub modelo: Option<String>,
    pub tipo: Option<String>,
    pub unidad_medida: Option<String>,
    pub precio_unitario: Option<f64>,
}

impl CreateProducto {
    fn unidad(&self) -> &str {
        self.unidad_medida
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .unwrap_or(UNIDAD_POR_DEFECTO)
    }
}

impl Producto {
    /// Active products. `codigo` filters by exact code, `buscar` matches code or name.
    pub async fn search(
        pool: &SqlitePool,
        buscar: Option<&str>,
        codigo: Option<&str>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let pattern = buscar.map(|b| format!("%{}%", b.trim()));
        sqlx::query_as::<_, Producto>(&format!(
            r#"{SELECT_PRODUCTO}
               WHERE activo = 1
                 AND ($1 IS NULL OR codigo = $1)
                 AND ($2 IS NULL OR codigo LIKE $2 OR nombre LIKE $2)
               ORDER BY nombre"#
        ))
        .bind(codigo)
        .bind(pattern)
        .fetch_all(pool)
        .await
    }

    pub async fn list_compact(pool: &SqlitePool) -> Result<Vec<ProductoResumen>, sqlx::Error> {
        sqlx::query_as::<_, ProductoResumen>(
            "SELECT id, codigo, nombre, unidad_medida, precio_unitario FROM productos WHERE activo = 1 ORDER BY nombre",
        )
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_id<'e, E>(executor: E, id: i64) -> Result<Option<Self>, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query_as::<_, Producto>(&format!("{SELECT_PRODUCTO} WHERE id = $1"))
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    pub async fn exists_codigo(
        pool: &SqlitePool,
        codigo: &str,
        exclude_id: Option<i64>,
    ) -> Result<bool, sqlx::Error> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM productos WHERE codigo = $1 AND ($2 IS NULL OR id != $2)",
        )
        .bind(codigo)
        .bind(exclude_id)
        .fetch_one(pool)
        .await?;
        Ok(count > 0)
    }

    pub async fn count_active(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM productos WHERE activo = 1")
            .fetch_one(pool)
            .await
    }

    pub async fn create(pool: &SqlitePool, data: &CreateProducto) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Producto>(
            r#"INSERT INTO productos (codigo, nombre, descripcion, marca, modelo, tipo, unidad_medida, precio_unitario)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
               RETURNING id, codigo, nombre, descripcion, marca, modelo, tipo,
                         unidad_medida, precio_unitario, activo, fecha_registro"#,
        )
        .bind(data.codigo.trim())
        .bind(data.nombre.trim())
        .bind(&data.descripcion)
        .bind(&data.marca)
        .bind(&data.modelo)
        .bind(&data.tipo)
        .bind(data.unidad())
        .bind(data.precio_unitario.unwrap_or(0.0))
        .fetch_one(pool)
        .await
    }

    pub async fn update(
        pool: &SqlitePool,
        id: i64,
        data: &CreateProducto,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Producto>(
            r#"UPDATE productos
               SET codigo = $2, nombre = $3, descripcion = $4, marca = $5, modelo = $6,
                   tipo = $7, unidad_medida = $8, precio_unitario = $9
               WHERE id = $1
               RETURNING id, codigo, nombre, descripcion, marca, modelo, tipo,
                         unidad_medida, precio_unitario, activo, fecha_registro"#,
        )
        .bind(id)
        .bind(data.codigo.trim())
        .bind(data.nombre.trim())
        .bind(&data.descripcion)
        .bind(&data.marca)
        .bind(&data.modelo)
        .bind(&data.tipo)
        .bind(data.unidad())
        .bind(data.precio_unitario.unwrap_or(0.0))
        .fetch_optional(pool)
        .await
    }

    /// Soft delete.
    pub async fn deactivate(pool: &SqlitePool, id: i64) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("UPDATE productos SET activo = 0 WHERE id = $1")
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
    async fn defaults_and_filters() {
        let pool = test_support::pool().await;
        let cable = Producto::create(
            &pool,
            &CreateProducto {
                codigo: "CAB-01".into(),
                nombre: "Cable UTP".into(),
                unidad_medida: Some("".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(cable.unidad_medida, "UNID");
        assert_eq!(cable.precio_unitario, 0.0);

        Producto::create(
            &pool,
            &CreateProducto {
                codigo: "CAM-02".into(),
                nombre: "Cámara IP".into(),
                precio_unitario: Some(250.0),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let exact = Producto::search(&pool, None, Some("CAB-01")).await.unwrap();
        assert_eq!(exact.len(), 1);
        let partial = Producto::search(&pool, Some("CA"), None).await.unwrap();
        assert_eq!(partial.len(), 2);
        assert!(Producto::exists_codigo(&pool, "CAB-01", None).await.unwrap());
        assert!(!Producto::exists_codigo(&pool, "CAB-01", Some(cable.id)).await.unwrap());
    }
}
