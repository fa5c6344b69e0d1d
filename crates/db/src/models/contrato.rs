use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;

use super::factura::Factura;

#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, TS, EnumString, Display, Default,
)]
#[sqlx(type_name = "estado_contrato", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum EstadoContrato {
    #[default]
    Activo,
    Finalizado,
    Suspendido,
    Cancelado,
}

const SELECT_CONTRATO: &str = r#"SELECT
        ct.id, ct.codigo, ct.cliente_id, ct.factura_id, ct.numero_cuenta_banco, ct.fecha_inicio,
        ct.fecha_fin, ct.pago_semanal, ct.estado, ct.terminos, ct.fecha_registro,
        c.razon_social AS cliente_razon_social, c.documento AS cliente_documento,
        f.codigo AS factura_codigo, f.total AS factura_total, f.estado AS factura_estado
    FROM contratos ct
    LEFT JOIN clientes c ON c.id = ct.cliente_id
    LEFT JOIN facturas f ON f.id = ct.factura_id"#;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Contrato {
    pub id: i64,
    pub codigo: String,
    pub cliente_id: i64,
    pub factura_id: Option<i64>,
    pub numero_cuenta_banco: Option<String>,
    pub fecha_inicio: NaiveDate,
    pub fecha_fin: Option<NaiveDate>,
    pub pago_semanal: Option<f64>,
    pub estado: EstadoContrato,
    pub terminos: Option<String>,
    pub fecha_registro: DateTime<Utc>,
    pub cliente_razon_social: Option<String>,
    pub cliente_documento: Option<String>,
    pub factura_codigo: Option<String>,
    pub factura_total: Option<f64>,
    pub factura_estado: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, TS)]
pub struct CreateContrato {
    pub codigo: String,
    pub cliente_id: Option<i64>,
    pub factura_id: Option<i64>,
    pub numero_cuenta_banco: Option<String>,
    pub fecha_inicio: Option<NaiveDate>,
    pub fecha_fin: Option<NaiveDate>,
    pub pago_semanal: Option<f64>,
    pub estado: Option<EstadoContrato>,
    pub terminos: Option<String>,
}

/// Validated contract row.
#[derive(Debug, Clone, PartialEq)]
pub struct ContratoRecord {
    pub codigo: String,
    pub cliente_id: i64,
    pub factura_id: Option<i64>,
    pub numero_cuenta_banco: Option<String>,
    pub fecha_inicio: NaiveDate,
    pub fecha_fin: Option<NaiveDate>,
    pub pago_semanal: Option<f64>,
    pub estado: EstadoContrato,
    pub terminos: Option<String>,
}

#[derive(Debug, Clone, Default, FromRow, Serialize, Deserialize, TS)]
pub struct EstadisticasContratos {
    pub total: i64,
    pub activos: i64,
    pub finalizados: i64,
    pub suspendidos: i64,
    pub cancelados: i64,
    pub promedio_pago_semanal: f64,
    pub suma_pago_semanal: f64,
}

impl Contrato {
    pub async fn find_all(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Contrato>(&format!(
            "{SELECT_CONTRATO} ORDER BY ct.fecha_registro DESC, ct.id DESC"
        ))
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Contrato>(&format!("{SELECT_CONTRATO} WHERE ct.id = $1"))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// ACTIVO contracts that have not reached their end date.
    pub async fn find_vigentes(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Contrato>(&format!(
            r#"{SELECT_CONTRATO}
               WHERE ct.estado = 'ACTIVO'
                 AND (ct.fecha_fin IS NULL OR ct.fecha_fin >= date('now', 'localtime'))
               ORDER BY ct.fecha_inicio DESC"#
        ))
        .fetch_all(pool)
        .await
    }

    pub async fn exists_codigo(
        pool: &SqlitePool,
        codigo: &str,
        exclude_id: Option<i64>,
    ) -> Result<bool, sqlx::Error> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM contratos WHERE codigo = $1 AND ($2 IS NULL OR id != $2)",
        )
        .bind(codigo)
        .bind(exclude_id)
        .fetch_one(pool)
        .await?;
        Ok(count > 0)
    }

    pub async fn count_registered_in_year(pool: &SqlitePool, anio: i32) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM contratos WHERE CAST(strftime('%Y', fecha_registro) AS INTEGER) = $1",
        )
        .bind(anio)
        .fetch_one(pool)
        .await
    }

    /// The client's PAGADA or PENDIENTE invoices that no contract references yet.
    pub async fn facturas_disponibles(
        pool: &SqlitePool,
        cliente_id: i64,
    ) -> Result<Vec<Factura>, sqlx::Error> {
        let ids: Vec<i64> = sqlx::query_scalar(
            r#"SELECT f.id FROM facturas f
               WHERE f.cliente_id = $1
                 AND f.estado IN ('PAGADA', 'PENDIENTE')
                 AND NOT EXISTS (SELECT 1 FROM contratos ct WHERE ct.factura_id = f.id)
               ORDER BY f.fecha_emision DESC, f.id DESC"#,
        )
        .bind(cliente_id)
        .fetch_all(pool)
        .await?;

        let mut facturas = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(factura) = Factura::find_by_id(pool, id).await? {
                facturas.push(factura);
            }
        }
        Ok(facturas)
    }

    pub async fn create(pool: &SqlitePool, record: &ContratoRecord) -> Result<Self, sqlx::Error> {
        let id: i64 = sqlx::query_scalar(
            r#"INSERT INTO contratos (codigo, cliente_id, factura_id, numero_cuenta_banco, fecha_inicio,
                                      fecha_fin, pago_semanal, estado, terminos)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
               RETURNING id"#,
        )
        .bind(&record.codigo)
        .bind(record.cliente_id)
        .bind(record.factura_id)
        .bind(&record.numero_cuenta_banco)
        .bind(record.fecha_inicio)
        .bind(record.fecha_fin)
        .bind(record.pago_semanal)
        .bind(record.estado)
        .bind(&record.terminos)
        .fetch_one(pool)
        .await?;

        Self::find_by_id(pool, id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    pub async fn update(
        pool: &SqlitePool,
        id: i64,
        record: &ContratoRecord,
    ) -> Result<Option<Self>, sqlx::Error> {
        let result = sqlx::query(
            r#"UPDATE contratos
               SET codigo = $2, cliente_id = $3, factura_id = $4, numero_cuenta_banco = $5,
                   fecha_inicio = $6, fecha_fin = $7, pago_semanal = $8, estado = $9, terminos = $10
               WHERE id = $1"#,
        )
        .bind(id)
        .bind(&record.codigo)
        .bind(record.cliente_id)
        .bind(record.factura_id)
        .bind(&record.numero_cuenta_banco)
        .bind(record.fecha_inicio)
        .bind(record.fecha_fin)
        .bind(record.pago_semanal)
        .bind(record.estado)
        .bind(&record.terminos)
        .execute(pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        Self::find_by_id(pool, id).await
    }

    pub async fn set_estado(
        pool: &SqlitePool,
        id: i64,
        estado: EstadoContrato,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("UPDATE contratos SET estado = $2 WHERE id = $1")
            .bind(id)
            .bind(estado)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn delete(pool: &SqlitePool, id: i64) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM contratos WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn estadisticas(pool: &SqlitePool) -> Result<EstadisticasContratos, sqlx::Error> {
        sqlx::query_as::<_, EstadisticasContratos>(
            r#"SELECT
                   COUNT(*) AS total,
                   COALESCE(SUM(CASE WHEN estado = 'ACTIVO' THEN 1 ELSE 0 END), 0) AS activos,
                   COALESCE(SUM(CASE WHEN estado = 'FINALIZADO' THEN 1 ELSE 0 END), 0) AS finalizados,
                   COALESCE(SUM(CASE WHEN estado = 'SUSPENDIDO' THEN 1 ELSE 0 END), 0) AS suspendidos,
                   COALESCE(SUM(CASE WHEN estado = 'CANCELADO' THEN 1 ELSE 0 END), 0) AS cancelados,
                   CAST(COALESCE(ROUND(AVG(pago_semanal), 2), 0) AS REAL) AS promedio_pago_semanal,
                   CAST(COALESCE(SUM(pago_semanal), 0) AS REAL) AS suma_pago_semanal
               FROM contratos"#,
        )
        .fetch_one(pool)
        .await
    }
}
