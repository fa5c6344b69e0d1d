//! Keeps the `ventas` table in step with invoice changes.

use db::models::{
    factura::{EstadoFactura, Factura},
    venta::{ESTADO_COMPLETADA, Venta, estado_venta},
};
use sqlx::SqliteConnection;
use tracing::debug;

/// Records the sale of a freshly inserted invoice.
pub async fn registrar(conn: &mut SqliteConnection, factura: &Factura) -> Result<(), sqlx::Error> {
    Venta::insert(
        &mut *conn,
        factura.id,
        factura.fecha_emision,
        factura.total,
        &estado_venta(factura.estado),
    )
    .await?;
    debug!(factura_id = factura.id, "Sale recorded");
    Ok(())
}

/// Applies an invoice update. A first transition to PAGADA creates or completes the sale;
/// any other change only refreshes an existing one.
pub async fn sincronizar(
    conn: &mut SqliteConnection,
    estado_anterior: EstadoFactura,
    factura: &Factura,
) -> Result<(), sqlx::Error> {
    if factura.estado == EstadoFactura::Pagada && estado_anterior != EstadoFactura::Pagada {
        Venta::upsert(
            &mut *conn,
            factura.id,
            factura.fecha_emision,
            factura.total,
            ESTADO_COMPLETADA,
        )
        .await?;
        debug!(factura_id = factura.id, "Sale completed");
    } else {
        Venta::update_for_factura(
            &mut *conn,
            factura.id,
            factura.total,
            &estado_venta(factura.estado),
        )
        .await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support;

    async fn factura(pool: &sqlx::SqlitePool, estado: &str) -> Factura {
        let usuario_id = test_support::usuario(pool, "caja@acme.pe").await;
        let cliente_id = test_support::cliente(pool, "Hotel Plaza").await;
        let empresa_id = test_support::empresa(pool).await;
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO facturas (codigo, usuario_id, cliente_id, empresa_id, fecha_emision, total, estado)
             VALUES ('F2025-000001', $1, $2, $3, '2025-06-01', 118, $4) RETURNING id",
        )
        .bind(usuario_id)
        .bind(cliente_id)
        .bind(empresa_id)
        .bind(estado)
        .fetch_one(pool)
        .await
        .unwrap();
        Factura::find_by_id(pool, id).await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn paying_an_invoice_completes_its_sale() {
        let pool = test_support::pool().await;
        let mut f = factura(&pool, "PENDIENTE").await;
        let mut conn = pool.acquire().await.unwrap();

        registrar(&mut conn, &f).await.unwrap();
        let venta = Venta::find_by_factura(&pool, f.id).await.unwrap().unwrap();
        assert_eq!(venta.estado, "PENDIENTE");

        f.estado = EstadoFactura::Pagada;
        f.total = 236.0;
        sincronizar(&mut conn, EstadoFactura::Pendiente, &f).await.unwrap();
        let venta = Venta::find_by_factura(&pool, f.id).await.unwrap().unwrap();
        assert_eq!(venta.estado, ESTADO_COMPLETADA);
        assert_eq!(venta.total, 236.0);

        f.estado = EstadoFactura::Anulada;
        sincronizar(&mut conn, EstadoFactura::Pagada, &f).await.unwrap();
        let venta = Venta::find_by_factura(&pool, f.id).await.unwrap().unwrap();
        assert_eq!(venta.estado, "ANULADA");
    }

    #[tokio::test]
    async fn non_paid_update_without_sale_creates_nothing() {
        let pool = test_support::pool().await;
        let mut f = factura(&pool, "PENDIENTE").await;
        let mut conn = pool.acquire().await.unwrap();
        f.estado = EstadoFactura::Vencida;
        sincronizar(&mut conn, EstadoFactura::Pendiente, &f).await.unwrap();
        assert!(Venta::find_by_factura(&pool, f.id).await.unwrap().is_none());
    }
}
