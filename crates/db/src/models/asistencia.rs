use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;

#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, TS, EnumString, Display, Default,
)]
#[sqlx(type_name = "estado_asistencia", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum EstadoAsistencia {
    #[default]
    Presente,
    Tardanza,
    Ausente,
}

#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, TS, EnumString, Display, Default,
)]
#[sqlx(type_name = "tipo_asistencia", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum TipoAsistencia {
    #[default]
    Regular,
    Extra,
    Feriado,
}

#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, TS, EnumString, Display, Default,
)]
#[sqlx(type_name = "jornada_laboral", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum JornadaLaboral {
    #[default]
    Completa,
    Media,
}

const SELECT_ASISTENCIA: &str = r#"SELECT
        a.id, a.empleado_id, a.fecha, a.hora_entrada, a.hora_salida, a.horas_trabajadas,
        a.estado, a.tipo_asistencia, a.jornada_laboral, a.observaciones, a.fecha_registro,
        u.nombres || ' ' || u.apellidos AS nombre_completo, e.cargo, e.area
    FROM asistencias a
    LEFT JOIN empleados e ON e.id = a.empleado_id
    LEFT JOIN usuarios u ON u.id = e.usuario_id"#;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Asistencia {
    pub id: i64,
    pub empleado_id: i64,
    pub fecha: NaiveDate,
    pub hora_entrada: Option<NaiveTime>,
    pub hora_salida: Option<NaiveTime>,
    pub horas_trabajadas: f64,
    pub estado: EstadoAsistencia,
    pub tipo_asistencia: TipoAsistencia,
    pub jornada_laboral: JornadaLaboral,
    pub observaciones: Option<String>,
    pub fecha_registro: DateTime<Utc>,
    pub nombre_completo: Option<String>,
    pub cargo: Option<String>,
    pub area: Option<String>,
}

/// Attendance as submitted; missing values are resolved by the attendance service.
#[derive(Debug, Clone, Deserialize, TS)]
pub struct CreateAsistencia {
    pub empleado_id: i64,
    pub fecha: NaiveDate,
    pub hora_entrada: Option<NaiveTime>,
    pub hora_salida: Option<NaiveTime>,
    pub estado: Option<EstadoAsistencia>,
    pub tipo_asistencia: Option<TipoAsistencia>,
    pub jornada_laboral: Option<JornadaLaboral>,
    pub observaciones: Option<String>,
}

/// Fully resolved row ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct AsistenciaRecord {
    pub empleado_id: i64,
    pub fecha: NaiveDate,
    pub hora_entrada: Option<NaiveTime>,
    pub hora_salida: Option<NaiveTime>,
    pub horas_trabajadas: f64,
    pub estado: EstadoAsistencia,
    pub tipo_asistencia: TipoAsistencia,
    pub jornada_laboral: JornadaLaboral,
    pub observaciones: Option<String>,
}

/// Worked-time summary over a date range. Only PRESENTE and TARDANZA rows are counted.
#[derive(Debug, Clone, Default, FromRow, Serialize, Deserialize, TS)]
pub struct ResumenHoras {
    pub total_horas: f64,
    pub total_dias: i64,
    pub dias_presente: i64,
    pub dias_tardanza: i64,
    pub dias_ausente: i64,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct ResumenSemanal {
    pub anio: i64,
    pub semana: i64,
    pub empleado_id: i64,
    pub nombre_empleado: String,
    pub dias_registrados: i64,
    pub total_horas: f64,
    pub dias_presente: i64,
    pub dias_tardanza: i64,
    pub dias_ausente: i64,
}

impl Asistencia {
    pub async fn find_all(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Asistencia>(&format!(
            "{SELECT_ASISTENCIA} ORDER BY a.fecha DESC, a.fecha_registro DESC"
        ))
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Asistencia>(&format!("{SELECT_ASISTENCIA} WHERE a.id = $1"))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Rows for one employee in `[desde, hasta]`, oldest first. `solo_trabajados` keeps
    /// PRESENTE and TARDANZA only.
    pub async fn find_in_range(
        pool: &SqlitePool,
        empleado_id: i64,
        desde: NaiveDate,
        hasta: NaiveDate,
        solo_trabajados: bool,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Asistencia>(&format!(
            r#"{SELECT_ASISTENCIA}
               WHERE a.empleado_id = $1 AND a.fecha BETWEEN $2 AND $3
                 AND ($4 = 0 OR a.estado IN ('PRESENTE', 'TARDANZA'))
               ORDER BY a.fecha ASC"#
        ))
        .bind(empleado_id)
        .bind(desde)
        .bind(hasta)
        .bind(solo_trabajados)
        .fetch_all(pool)
        .await
    }

    pub async fn exists_for_day(
        pool: &SqlitePool,
        empleado_id: i64,
        fecha: NaiveDate,
        exclude_id: Option<i64>,
    ) -> Result<bool, sqlx::Error> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM asistencias WHERE empleado_id = $1 AND fecha = $2 AND ($3 IS NULL OR id != $3)",
        )
        .bind(empleado_id)
        .bind(fecha)
        .bind(exclude_id)
        .fetch_one(pool)
        .await?;
        Ok(count > 0)
    }

    pub async fn create(pool: &SqlitePool, record: &AsistenciaRecord) -> Result<Self, sqlx::Error> {
        let id: i64 = sqlx::query_scalar(
            r#"INSERT INTO asistencias (empleado_id, fecha, hora_entrada, hora_salida, horas_trabajadas,
                                        estado, tipo_asistencia, jornada_laboral, observaciones)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
               RETURNING id"#,
        )
        .bind(record.empleado_id)
        .bind(record.fecha)
        .bind(record.hora_entrada)
        .bind(record.hora_salida)
        .bind(record.horas_trabajadas)
        .bind(record.estado)
        .bind(record.tipo_asistencia)
        .bind(record.jornada_laboral)
        .bind(&record.observaciones)
        .fetch_one(pool)
        .await?;

        Self::find_by_id(pool, id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    /// Insert or overwrite the employee's row for that date.
    pub async fn upsert(pool: &SqlitePool, record: &AsistenciaRecord) -> Result<Self, sqlx::Error> {
        let id: i64 = sqlx::query_scalar(
            r#"INSERT INTO asistencias (empleado_id, fecha, hora_entrada, hora_salida, horas_trabajadas,
                                        estado, tipo_asistencia, jornada_laboral, observaciones)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
               ON CONFLICT(empleado_id, fecha) DO UPDATE SET
                   hora_entrada = excluded.hora_entrada,
                   hora_salida = excluded.hora_salida,
                   horas_trabajadas = excluded.horas_trabajadas,
                   estado = excluded.estado,
                   tipo_asistencia = excluded.tipo_asistencia,
                   jornada_laboral = excluded.jornada_laboral,
                   observaciones = excluded.observaciones
               RETURNING id"#,
        )
        .bind(record.empleado_id)
        .bind(record.fecha)
        .bind(record.hora_entrada)
        .bind(record.hora_salida)
        .bind(record.horas_trabajadas)
        .bind(record.estado)
        .bind(record.tipo_asistencia)
        .bind(record.jornada_laboral)
        .bind(&record.observaciones)
        .fetch_one(pool)
        .await?;

        Self::find_by_id(pool, id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    pub async fn update(
        pool: &SqlitePool,
        id: i64,
        record: &AsistenciaRecord,
    ) -> Result<Option<Self>, sqlx::Error> {
        let result = sqlx::query(
            r#"UPDATE asistencias
               SET empleado_id = $2, fecha = $3, hora_entrada = $4, hora_salida = $5,
                   horas_trabajadas = $6, estado = $7, tipo_asistencia = $8,
                   jornada_laboral = $9, observaciones = $10
               WHERE id = $1"#,
        )
        .bind(id)
        .bind(record.empleado_id)
        .bind(record.fecha)
        .bind(record.hora_entrada)
        .bind(record.hora_salida)
        .bind(record.horas_trabajadas)
        .bind(record.estado)
        .bind(record.tipo_asistencia)
        .bind(record.jornada_laboral)
        .bind(&record.observaciones)
        .execute(pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        Self::find_by_id(pool, id).await
    }

    pub async fn delete(pool: &SqlitePool, id: i64) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM asistencias WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn resumen_rango(
        pool: &SqlitePool,
        empleado_id: i64,
        desde: NaiveDate,
        hasta: NaiveDate,
    ) -> Result<ResumenHoras, sqlx::Error> {
        sqlx::query_as::<_, ResumenHoras>(
            r#"SELECT
                   CAST(COALESCE(SUM(horas_trabajadas), 0) AS REAL) AS total_horas,
                   COUNT(*) AS total_dias,
                   COALESCE(SUM(CASE WHEN estado = 'PRESENTE' THEN 1 ELSE 0 END), 0) AS dias_presente,
                   COALESCE(SUM(CASE WHEN estado = 'TARDANZA' THEN 1 ELSE 0 END), 0) AS dias_tardanza,
                   COALESCE(SUM(CASE WHEN estado = 'AUSENTE' THEN 1 ELSE 0 END), 0) AS dias_ausente
               FROM asistencias
               WHERE empleado_id = $1
                 AND fecha BETWEEN $2 AND $3
                 AND estado IN ('PRESENTE', 'TARDANZA')"#,
        )
        .bind(empleado_id)
        .bind(desde)
        .bind(hasta)
        .fetch_one(pool)
        .await
    }

    pub async fn resumen_semanal(
        pool: &SqlitePool,
        anio: Option<i64>,
        semana: Option<i64>,
    ) -> Result<Vec<ResumenSemanal>, sqlx::Error> {
        sqlx::query_as::<_, ResumenSemanal>(
            r#"SELECT anio, semana, empleado_id, nombre_empleado, dias_registrados, total_horas,
                      dias_presente, dias_tardanza, dias_ausente
               FROM vista_asistencia_semanal
               WHERE ($1 IS NULL OR anio = $1) AND ($2 IS NULL OR semana = $2)
               ORDER BY anio DESC, semana DESC, nombre_empleado ASC"#,
        )
        .bind(anio)
        .bind(semana)
        .fetch_all(pool)
        .await
    }
}
