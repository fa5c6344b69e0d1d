use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;

#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, TS, EnumString, Display, Default,
)]
#[sqlx(type_name = "estado_pago", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum EstadoPago {
    #[default]
    Pendiente,
    Pagado,
    Anulado,
}

#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, TS, EnumString, Display, Default,
)]
#[sqlx(type_name = "metodo_pago", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum MetodoPago {
    #[default]
    Transferencia,
    Efectivo,
    Deposito,
}

const SELECT_PAGO: &str = r#"SELECT
        p.id, p.empleado_id, u.nombres || ' ' || u.apellidos AS nombre_empleado,
        p.semana, p.anio, p.fecha_inicio, p.fecha_fin, p.horas_trabajadas, p.sueldo_semanal,
        p.bonificaciones, p.descuentos, p.total_pago, p.estado, p.fecha_pago, p.metodo_pago,
        p.comentarios, p.fecha_registro
    FROM pagos p
    LEFT JOIN empleados e ON e.id = p.empleado_id
    LEFT JOIN usuarios u ON u.id = e.usuario_id"#;

/// Weekly payroll entry for one employee.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Pago {
    pub id: i64,
    pub empleado_id: i64,
    pub nombre_empleado: Option<String>,
    pub semana: i64,
    pub anio: i64,
    pub fecha_inicio: NaiveDate,
    pub fecha_fin: NaiveDate,
    pub horas_trabajadas: f64,
    pub sueldo_semanal: f64,
    pub bonificaciones: f64,
    pub descuentos: f64,
    pub total_pago: f64,
    pub estado: EstadoPago,
    pub fecha_pago: Option<NaiveDate>,
    pub metodo_pago: MetodoPago,
    pub comentarios: Option<String>,
    pub fecha_registro: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, TS)]
pub struct CreatePago {
    pub empleado_id: i64,
    pub semana: i64,
    pub anio: i64,
    pub fecha_inicio: NaiveDate,
    pub fecha_fin: NaiveDate,
    pub sueldo_semanal: f64,
    pub bonificaciones: Option<f64>,
    pub descuentos: Option<f64>,
    pub estado: Option<EstadoPago>,
    pub fecha_pago: Option<NaiveDate>,
    pub metodo_pago: Option<MetodoPago>,
    pub comentarios: Option<String>,
}

/// Row values after hours and totals have been derived.
#[derive(Debug, Clone, PartialEq)]
pub struct PagoRecord {
    pub empleado_id: i64,
    pub semana: i64,
    pub anio: i64,
    pub fecha_inicio: NaiveDate,
    pub fecha_fin: NaiveDate,
    pub horas_trabajadas: f64,
    pub sueldo_semanal: f64,
    pub bonificaciones: f64,
    pub descuentos: f64,
    pub total_pago: f64,
    pub estado: EstadoPago,
    pub fecha_pago: Option<NaiveDate>,
    pub metodo_pago: MetodoPago,
    pub comentarios: Option<String>,
}

impl Pago {
    pub async fn find_all(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Pago>(&format!(
            "{SELECT_PAGO} ORDER BY p.anio DESC, p.semana DESC, p.fecha_inicio DESC"
        ))
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Pago>(&format!("{SELECT_PAGO} WHERE p.id = $1"))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// The non-annulled payment for an employee's week, if any.
    pub async fn find_for_week(
        pool: &SqlitePool,
        empleado_id: i64,
        semana: i64,
        anio: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Pago>(&format!(
            r#"{SELECT_PAGO}
               WHERE p.empleado_id = $1 AND p.semana = $2 AND p.anio = $3 AND p.estado != 'ANULADO'
               ORDER BY p.id DESC LIMIT 1"#
        ))
        .bind(empleado_id)
        .bind(semana)
        .bind(anio)
        .fetch_optional(pool)
        .await
    }

    pub async fn create(pool: &SqlitePool, record: &PagoRecord) -> Result<Self, sqlx::Error> {
        let id: i64 = sqlx::query_scalar(
            r#"INSERT INTO pagos (empleado_id, semana, anio, fecha_inicio, fecha_fin, horas_trabajadas,
                                  sueldo_semanal, bonificaciones, descuentos, total_pago, estado,
                                  fecha_pago, metodo_pago, comentarios)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
               RETURNING id"#,
        )
        .bind(record.empleado_id)
        .bind(record.semana)
        .bind(record.anio)
        .bind(record.fecha_inicio)
        .bind(record.fecha_fin)
        .bind(record.horas_trabajadas)
        .bind(record.sueldo_semanal)
        .bind(record.bonificaciones)
        .bind(record.descuentos)
        .bind(record.total_pago)
        .bind(record.estado)
        .bind(record.fecha_pago)
        .bind(record.metodo_pago)
        .bind(&record.comentarios)
        .fetch_one(pool)
        .await?;

        Self::find_by_id(pool, id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    pub async fn update(
        pool: &SqlitePool,
        id: i64,
        record: &PagoRecord,
    ) -> Result<Option<Self>, sqlx::Error> {
        let result = sqlx::query(
            r#"UPDATE pagos
               SET empleado_id = $2, semana = $3, anio = $4, fecha_inicio = $5, fecha_fin = $6,
                   horas_trabajadas = $7, sueldo_semanal = $8, bonificaciones = $9,
                   descuentos = $10, total_pago = $11, estado = $12, fecha_pago = $13,
                   metodo_pago = $14, comentarios = $15
               WHERE id = $1"#,
        )
        .bind(id)
        .bind(record.empleado_id)
        .bind(record.semana)
        .bind(record.anio)
        .bind(record.fecha_inicio)
        .bind(record.fecha_fin)
        .bind(record.horas_trabajadas)
        .bind(record.sueldo_semanal)
        .bind(record.bonificaciones)
        .bind(record.descuentos)
        .bind(record.total_pago)
        .bind(record.estado)
        .bind(record.fecha_pago)
        .bind(record.metodo_pago)
        .bind(&record.comentarios)
        .execute(pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        Self::find_by_id(pool, id).await
    }

    pub async fn delete(pool: &SqlitePool, id: i64) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM pagos WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Σ total_pago over PAGADO rows paid in the current month.
    pub async fn total_pagado_mes(pool: &SqlitePool) -> Result<f64, sqlx::Error> {
        sqlx::query_scalar(
            r#"SELECT CAST(COALESCE(SUM(total_pago), 0) AS REAL) FROM pagos
               WHERE estado = 'PAGADO'
                 AND strftime('%Y-%m', COALESCE(fecha_pago, fecha_fin)) = strftime('%Y-%m', 'now', 'localtime')"#,
        )
        .fetch_one(pool)
        .await
    }
}
