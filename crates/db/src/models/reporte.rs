//! Read-only aggregates behind the reporting endpoints.
//!
//! Proforma figures assume the expiry sweep already ran and sales figures assume the
//! venta backfill already ran; the reports service takes care of both.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use ts_rs::TS;

use super::proforma::EstadoProforma;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct ProformasPorMes {
    pub mes: String,
    pub cantidad: i64,
    pub total: f64,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct ProformasPorEstado {
    pub estado: EstadoProforma,
    pub cantidad: i64,
    pub total_monto: f64,
    pub porcentaje: f64,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct TopCliente {
    pub cliente_id: i64,
    pub razon_social: String,
    pub total_proformas: i64,
    pub total_monto: f64,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct ProformasPorCliente {
    pub cliente: String,
    pub cantidad: i64,
    pub total_ventas: f64,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct VentasPorMes {
    pub mes: String,
    pub cantidad: i64,
    pub total_ventas: f64,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct TopClienteVentas {
    pub razon_social: String,
    pub total_ventas: i64,
    pub total_monto: f64,
    pub promedio_venta: f64,
}

#[derive(Debug, Clone, Default, FromRow, Serialize, Deserialize, TS)]
pub struct KpisProformas {
    pub total: i64,
    pub pendientes: i64,
    pub aprobadas: i64,
    pub vencidas: i64,
    pub convertidas: i64,
    pub promedio: f64,
}

#[derive(Debug, Clone, Default, FromRow, Serialize, Deserialize, TS)]
pub struct KpisVentas {
    pub total_ventas: i64,
    pub ventas_mes: f64,
    pub cantidad_ventas_mes: i64,
    pub completadas: i64,
    pub pendientes: i64,
    pub total_ventas_completadas: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
pub struct Kpis {
    pub proformas: KpisProformas,
    pub ventas: KpisVentas,
    /// Share of proformas that ended in an invoice with a sale, in percent.
    pub tasa_conversion: f64,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct VentasCliente {
    pub razon_social: String,
    pub cantidad: i64,
    pub total: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct DiagnosticoVentas {
    pub total_ventas: i64,
    pub total_facturas: i64,
    pub facturas_sin_venta: i64,
    pub distribucion_mensual: Vec<VentasPorMes>,
    pub ventas_por_cliente: Vec<VentasCliente>,
    pub generado_en: DateTime<Utc>,
}

/// Uninvoiced proforma that is, or is about to be, past its validity window.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct ProformaVencida {
    pub id: i64,
    pub codigo: String,
    pub cliente_razon_social: Option<String>,
    pub usuario_nombre: Option<String>,
    pub fecha_emision: NaiveDate,
    pub validez_oferta: i64,
    pub total: f64,
    pub estado: EstadoProforma,
    pub dias_transcurridos: i64,
    pub dias_vencidos: i64,
}

pub struct Reporte;

impl Reporte {
    /// Month buckets for the last twelve months, oldest first.
    pub async fn proformas_por_mes(pool: &SqlitePool) -> Result<Vec<ProformasPorMes>, sqlx::Error> {
        sqlx::query_as::<_, ProformasPorMes>(
            r#"SELECT strftime('%Y-%m', fecha_emision) AS mes,
                      COUNT(*) AS cantidad,
                      CAST(COALESCE(SUM(total), 0) AS REAL) AS total
               FROM proformas
               WHERE fecha_emision >= date('now', 'localtime', '-12 months')
               GROUP BY mes
               ORDER BY mes ASC"#,
        )
        .fetch_all(pool)
        .await
    }

    pub async fn proformas_por_estado(
        pool: &SqlitePool,
    ) -> Result<Vec<ProformasPorEstado>, sqlx::Error> {
        sqlx::query_as::<_, ProformasPorEstado>(
            r#"SELECT estado,
                      COUNT(*) AS cantidad,
                      CAST(COALESCE(SUM(total), 0) AS REAL) AS total_monto,
                      ROUND(COUNT(*) * 100.0 / (SELECT COUNT(*) FROM proformas), 2) AS porcentaje
               FROM proformas
               GROUP BY estado
               ORDER BY cantidad DESC, estado ASC"#,
        )
        .fetch_all(pool)
        .await
    }

    pub async fn top_clientes(pool: &SqlitePool) -> Result<Vec<TopCliente>, sqlx::Error> {
        sqlx::query_as::<_, TopCliente>(
            r#"SELECT c.id AS cliente_id, c.razon_social,
                      COUNT(p.id) AS total_proformas,
                      CAST(COALESCE(SUM(p.total), 0) AS REAL) AS total_monto
               FROM clientes c
               JOIN proformas p ON p.cliente_id = c.id
               GROUP BY c.id, c.razon_social
               ORDER BY total_proformas DESC, total_monto DESC
               LIMIT 10"#,
        )
        .fetch_all(pool)
        .await
    }

    pub async fn proformas_por_cliente(
        pool: &SqlitePool,
    ) -> Result<Vec<ProformasPorCliente>, sqlx::Error> {
        sqlx::query_as::<_, ProformasPorCliente>(
            r#"SELECT c.razon_social AS cliente,
                      COUNT(p.id) AS cantidad,
                      CAST(COALESCE(SUM(p.total), 0) AS REAL) AS total_ventas
               FROM clientes c
               JOIN proformas p ON p.cliente_id = c.id
               GROUP BY c.id, c.razon_social
               ORDER BY cantidad DESC, total_ventas DESC
               LIMIT 8"#,
        )
        .fetch_all(pool)
        .await
    }

    pub async fn kpis(pool: &SqlitePool) -> Result<Kpis, sqlx::Error> {
        let proformas = sqlx::query_as::<_, KpisProformas>(
            r#"SELECT
                   COUNT(*) AS total,
                   COALESCE(SUM(CASE WHEN estado = 'PENDIENTE' THEN 1 ELSE 0 END), 0) AS pendientes,
                   COALESCE(SUM(CASE WHEN estado = 'APROBADA' THEN 1 ELSE 0 END), 0) AS aprobadas,
                   COALESCE(SUM(CASE WHEN estado = 'VENCIDA' THEN 1 ELSE 0 END), 0) AS vencidas,
                   COALESCE(SUM(CASE WHEN estado = 'CONVERTIDA' THEN 1 ELSE 0 END), 0) AS convertidas,
                   CAST(COALESCE(ROUND(AVG(total), 2), 0) AS REAL) AS promedio
               FROM proformas"#,
        )
        .fetch_one(pool)
        .await?;

        let ventas = sqlx::query_as::<_, KpisVentas>(
            r#"SELECT
                   COUNT(*) AS total_ventas,
                   CAST(COALESCE(SUM(CASE WHEN strftime('%Y-%m', fecha_venta) = strftime('%Y-%m', 'now', 'localtime')
                                          THEN total END), 0) AS REAL) AS ventas_mes,
                   COALESCE(SUM(CASE WHEN strftime('%Y-%m', fecha_venta) = strftime('%Y-%m', 'now', 'localtime')
                                     THEN 1 ELSE 0 END), 0) AS cantidad_ventas_mes,
                   COALESCE(SUM(CASE WHEN estado = 'COMPLETADA' THEN 1 ELSE 0 END), 0) AS completadas,
                   COALESCE(SUM(CASE WHEN estado != 'COMPLETADA' THEN 1 ELSE 0 END), 0) AS pendientes,
                   CAST(COALESCE(SUM(CASE WHEN estado = 'COMPLETADA' THEN total END), 0) AS REAL) AS total_ventas_completadas
               FROM ventas"#,
        )
        .fetch_one(pool)
        .await?;

        let convertidas: i64 = sqlx::query_scalar(
            r#"SELECT COUNT(DISTINCT p.id)
               FROM proformas p
               JOIN facturas f ON f.proforma_id = p.id
               JOIN ventas v ON v.factura_id = f.id"#,
        )
        .fetch_one(pool)
        .await?;

        let tasa_conversion = utils::money::percentage(convertidas as f64, proformas.total as f64);
        Ok(Kpis {
            proformas,
            ventas,
            tasa_conversion,
        })
    }

    /// Sales per month, oldest first. Months without sales are absent.
    pub async fn ventas_por_mes(pool: &SqlitePool) -> Result<Vec<VentasPorMes>, sqlx::Error> {
        sqlx::query_as::<_, VentasPorMes>(
            r#"SELECT strftime('%Y-%m', fecha_venta) AS mes,
                      COUNT(*) AS cantidad,
                      CAST(COALESCE(SUM(total), 0) AS REAL) AS total_ventas
               FROM ventas
               GROUP BY mes
               ORDER BY mes ASC"#,
        )
        .fetch_all(pool)
        .await
    }

    pub async fn top_clientes_ventas(
        pool: &SqlitePool,
    ) -> Result<Vec<TopClienteVentas>, sqlx::Error> {
        sqlx::query_as::<_, TopClienteVentas>(
            r#"SELECT c.razon_social,
                      COUNT(v.id) AS total_ventas,
                      CAST(COALESCE(SUM(v.total), 0) AS REAL) AS total_monto,
                      CAST(COALESCE(ROUND(AVG(v.total), 2), 0) AS REAL) AS promedio_venta
               FROM clientes c
               JOIN facturas f ON f.cliente_id = c.id
               JOIN ventas v ON v.factura_id = f.id
               GROUP BY c.id, c.razon_social
               ORDER BY total_monto DESC
               LIMIT 10"#,
        )
        .fetch_all(pool)
        .await
    }

    pub async fn diagnostico_ventas(pool: &SqlitePool) -> Result<DiagnosticoVentas, sqlx::Error> {
        let total_ventas: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM ventas")
            .fetch_one(pool)
            .await?;
        let total_facturas: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM facturas")
            .fetch_one(pool)
            .await?;
        let facturas_sin_venta: i64 = sqlx::query_scalar(
            r#"SELECT COUNT(*) FROM facturas f
               WHERE NOT EXISTS (SELECT 1 FROM ventas v WHERE v.factura_id = f.id)"#,
        )
        .fetch_one(pool)
        .await?;
        let ventas_por_cliente = sqlx::query_as::<_, VentasCliente>(
            r#"SELECT c.razon_social,
                      COUNT(v.id) AS cantidad,
                      CAST(COALESCE(SUM(v.total), 0) AS REAL) AS total
               FROM clientes c
               JOIN facturas f ON f.cliente_id = c.id
               JOIN ventas v ON v.factura_id = f.id
               GROUP BY c.id, c.razon_social
               ORDER BY total DESC
               LIMIT 10"#,
        )
        .fetch_all(pool)
        .await?;

        Ok(DiagnosticoVentas {
            total_ventas,
            total_facturas,
            facturas_sin_venta,
            distribucion_mensual: Self::ventas_por_mes(pool).await?,
            ventas_por_cliente,
            generado_en: Utc::now(),
        })
    }

    pub async fn proformas_vencidas(pool: &SqlitePool) -> Result<Vec<ProformaVencida>, sqlx::Error> {
        sqlx::query_as::<_, ProformaVencida>(
            r#"SELECT p.id, p.codigo, c.razon_social AS cliente_razon_social,
                      u.nombres || ' ' || u.apellidos AS usuario_nombre,
                      p.fecha_emision, p.validez_oferta, p.total, p.estado,
                      CAST(julianday(date('now', 'localtime')) - julianday(p.fecha_emision) AS INTEGER) AS dias_transcurridos,
                      MAX(0, CAST(julianday(date('now', 'localtime')) - julianday(p.fecha_emision) AS INTEGER) - p.validez_oferta) AS dias_vencidos
               FROM proformas p
               LEFT JOIN clientes c ON c.id = p.cliente_id
               LEFT JOIN usuarios u ON u.id = p.usuario_id
               WHERE p.estado IN ('PENDIENTE', 'APROBADA', 'VENCIDA')
                 AND NOT EXISTS (SELECT 1 FROM facturas f WHERE f.proforma_id = p.id)
               ORDER BY p.fecha_emision DESC"#,
        )
        .fetch_all(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Days, Local};

    use super::*;
    use crate::test_support;

    async fn proforma(pool: &SqlitePool, cliente_id: i64, codigo: &str, estado: &str, total: f64, hace: u64) -> i64 {
        let usuario_id = test_support::usuario(pool, &format!("{codigo}@acme.pe")).await;
        let empresa_id = test_support::empresa(pool).await;
        let fecha = Local::now().date_naive().checked_sub_days(Days::new(hace)).unwrap();
        sqlx::query_scalar(
            r#"INSERT INTO proformas (codigo, usuario_id, cliente_id, empresa_id, fecha_emision, total, estado)
               VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING id"#,
        )
        .bind(codigo)
        .bind(usuario_id)
        .bind(cliente_id)
        .bind(empresa_id)
        .bind(fecha)
        .bind(total)
        .bind(estado)
        .fetch_one(pool)
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn empty_database_reports_are_empty() {
        let pool = test_support::pool().await;
        assert!(Reporte::ventas_por_mes(&pool).await.unwrap().is_empty());
        assert!(Reporte::proformas_por_estado(&pool).await.unwrap().is_empty());
        let kpis = Reporte::kpis(&pool).await.unwrap();
        assert_eq!(kpis.proformas.total, 0);
        assert_eq!(kpis.proformas.promedio, 0.0);
        assert_eq!(kpis.tasa_conversion, 0.0);
    }

    #[tokio::test]
    async fn state_breakdown_and_conversion_rate() {
        let pool = test_support::pool().await;
        let cliente = test_support::cliente(&pool, "Minera Andes").await;
        let convertida = proforma(&pool, cliente, "P1", "CONVERTIDA", 100.0, 1).await;
        proforma(&pool, cliente, "P2", "PENDIENTE", 200.0, 1).await;
        proforma(&pool, cliente, "P3", "PENDIENTE", 300.0, 30).await;

        let usuario = test_support::usuario(&pool, "f@acme.pe").await;
        let empresa = test_support::empresa(&pool).await;
        let factura: i64 = sqlx::query_scalar(
            r#"INSERT INTO facturas (codigo, proforma_id, usuario_id, cliente_id, empresa_id, fecha_emision, total, estado)
               VALUES ('F1', $1, $2, $3, $4, date('now', 'localtime'), 118, 'PAGADA') RETURNING id"#,
        )
        .bind(convertida)
        .bind(usuario)
        .bind(cliente)
        .bind(empresa)
        .fetch_one(&pool)
        .await
        .unwrap();
        sqlx::query("INSERT INTO ventas (factura_id, fecha_venta, total, estado) VALUES ($1, date('now', 'localtime'), 118, 'COMPLETADA')")
            .bind(factura)
            .execute(&pool)
            .await
            .unwrap();

        let por_estado = Reporte::proformas_por_estado(&pool).await.unwrap();
        assert_eq!(por_estado[0].estado, EstadoProforma::Pendiente);
        assert_eq!(por_estado[0].cantidad, 2);
        assert_eq!(por_estado[0].porcentaje, 66.67);

        let kpis = Reporte::kpis(&pool).await.unwrap();
        assert_eq!(kpis.proformas.total, 3);
        assert_eq!(kpis.proformas.promedio, 200.0);
        assert_eq!(kpis.ventas.completadas, 1);
        assert_eq!(kpis.ventas.ventas_mes, 118.0);
        assert_eq!(kpis.tasa_conversion, 33.33);

        let top = Reporte::top_clientes_ventas(&pool).await.unwrap();
        assert_eq!(top[0].razon_social, "Minera Andes");
        assert_eq!(top[0].promedio_venta, 118.0);

        let vencidas = Reporte::proformas_vencidas(&pool).await.unwrap();
        assert_eq!(vencidas.len(), 2);
        let vieja = vencidas.iter().find(|p| p.codigo == "P3").unwrap();
        assert_eq!(vieja.dias_transcurridos, 30);
        assert_eq!(vieja.dias_vencidos, 20);

        let diagnostico = Reporte::diagnostico_ventas(&pool).await.unwrap();
        assert_eq!(diagnostico.total_facturas, 1);
        assert_eq!(diagnostico.facturas_sin_venta, 0);
    }
}
