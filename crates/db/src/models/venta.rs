use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqliteExecutor, SqlitePool};
use ts_rs::TS;

use super::factura::EstadoFactura;

pub const ESTADO_COMPLETADA: &str = "COMPLETADA";

/// Sale derived from an invoice, kept for reporting.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Venta {
    pub id: i64,
    pub factura_id: i64,
    pub fecha_venta: NaiveDate,
    pub total: f64,
    pub estado: String,
    pub fecha_registro: DateTime<Utc>,
}

/// Sale state mirrored from the invoice state.
pub fn estado_venta(estado: EstadoFactura) -> String {
    match estado {
        EstadoFactura::Pagada => ESTADO_COMPLETADA.to_string(),
        other => other.to_string(),
    }
}

impl Venta {
    pub async fn find_by_factura<'e, E>(
        executor: E,
        factura_id: i64,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query_as::<_, Venta>("SELECT * FROM ventas WHERE factura_id = $1")
            .bind(factura_id)
            .fetch_optional(executor)
            .await
    }

    pub async fn insert<'e, E>(
        executor: E,
        factura_id: i64,
        fecha_venta: NaiveDate,
        total: f64,
        estado: &str,
    ) -> Result<i64, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query_scalar(
            "INSERT INTO ventas (factura_id, fecha_venta, total, estado) VALUES ($1, $2, $3, $4) RETURNING id",
        )
        .bind(factura_id)
        .bind(fecha_venta)
        .bind(total)
        .bind(estado)
        .fetch_one(executor)
        .await
    }

    /// Inserts or rewrites the sale of an invoice.
    pub async fn upsert<'e, E>(
        executor: E,
        factura_id: i64,
        fecha_venta: NaiveDate,
        total: f64,
        estado: &str,
    ) -> Result<(), sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query(
            r#"INSERT INTO ventas (factura_id, fecha_venta, total, estado) VALUES ($1, $2, $3, $4)
               ON CONFLICT(factura_id) DO UPDATE SET
                   fecha_venta = excluded.fecha_venta,
                   total = excluded.total,
                   estado = excluded.estado"#,
        )
        .bind(factura_id)
        .bind(fecha_venta)
        .bind(total)
        .bind(estado)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn update_for_factura<'e, E>(
        executor: E,
        factura_id: i64,
        total: f64,
        estado: &str,
    ) -> Result<u64, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let result = sqlx::query("UPDATE ventas SET total = $2, estado = $3 WHERE factura_id = $1")
            .bind(factura_id)
            .bind(total)
            .bind(estado)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn delete_for_factura<'e, E>(executor: E, factura_id: i64) -> Result<u64, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let result = sqlx::query("DELETE FROM ventas WHERE factura_id = $1")
            .bind(factura_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn count_for_factura<'e, E>(executor: E, factura_id: i64) -> Result<i64, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query_scalar("SELECT COUNT(*) FROM ventas WHERE factura_id = $1")
            .bind(factura_id)
            .fetch_one(executor)
            .await
    }

    /// Creates the missing sale of every invoice. Safe to run repeatedly.
    pub async fn backfill(pool: &SqlitePool) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"INSERT INTO ventas (factura_id, fecha_venta, total, estado)
               SELECT f.id, f.fecha_emision, f.total,
                      CASE WHEN f.estado = 'PAGADA' THEN 'COMPLETADA' ELSE f.estado END
               FROM facturas f
               WHERE NOT EXISTS (SELECT 1 FROM ventas v WHERE v.factura_id = f.id)"#,
        )
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{self, date};

    async fn factura(pool: &SqlitePool, estado: &str) -> i64 {
        let usuario_id = test_support::usuario(pool, &format!("{estado}@acme.pe")).await;
        let cliente_id = test_support::cliente(pool, "Minera Andes").await;
        let empresa_id = test_support::empresa(pool).await;
        sqlx::query_scalar(
            r#"INSERT INTO facturas (codigo, usuario_id, cliente_id, empresa_id, fecha_emision, total, estado)
               VALUES ($1, $2, $3, $4, '2025-02-10', 118, $5) RETURNING id"#,
        )
        .bind(format!("F-{estado}"))
        .bind(usuario_id)
        .bind(cliente_id)
        .bind(empresa_id)
        .bind(estado)
        .fetch_one(pool)
        .await
        .unwrap()
    }

    #[test]
    fn paid_invoices_map_to_completed_sales() {
        assert_eq!(estado_venta(EstadoFactura::Pagada), "COMPLETADA");
        assert_eq!(estado_venta(EstadoFactura::Anulada), "ANULADA");
    }

    #[tokio::test]
    async fn backfill_is_idempotent() {
        let pool = test_support::pool().await;
        let pagada = factura(&pool, "PAGADA").await;
        let pendiente = factura(&pool, "PENDIENTE").await;
        Venta::insert(&pool, pendiente, date("2025-02-10"), 118.0, "PENDIENTE")
            .await
            .unwrap();

        assert_eq!(Venta::backfill(&pool).await.unwrap(), 1);
        assert_eq!(Venta::backfill(&pool).await.unwrap(), 0);

        let venta = Venta::find_by_factura(&pool, pagada).await.unwrap().unwrap();
        assert_eq!(venta.estado, ESTADO_COMPLETADA);
        assert_eq!(venta.total, 118.0);
        assert_eq!(venta.fecha_venta, date("2025-02-10"));
    }

    #[tokio::test]
    async fn upsert_rewrites_existing_sale() {
        let pool = test_support::pool().await;
        let id = factura(&pool, "PENDIENTE").await;
        Venta::upsert(&pool, id, date("2025-02-10"), 100.0, "PENDIENTE").await.unwrap();
        Venta::upsert(&pool, id, date("2025-02-10"), 150.0, ESTADO_COMPLETADA).await.unwrap();
        assert_eq!(Venta::count_for_factura(&pool, id).await.unwrap(), 1);

        let venta = Venta::find_by_factura(&pool, id).await.unwrap().unwrap();
        assert_eq!(venta.total, 150.0);

        assert_eq!(Venta::delete_for_factura(&pool, id).await.unwrap(), 1);
        assert!(Venta::find_by_factura(&pool, id).await.unwrap().is_none());
    }
}
