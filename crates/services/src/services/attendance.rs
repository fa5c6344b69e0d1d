//! Attendance registration and worked-hours summaries.

use chrono::{NaiveDate, NaiveTime};
use db::models::{
    asistencia::{
        Asistencia, AsistenciaRecord, CreateAsistencia, EstadoAsistencia, ResumenHoras,
        ResumenSemanal,
    },
    empleado::Empleado,
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{debug, warn};
use ts_rs::TS;
use utils::{money::round2, validation::non_blank};

/// Latest clock-in that still counts as on time.
pub fn hora_limite_puntual() -> NaiveTime {
    NaiveTime::from_hms_opt(8, 15, 0).unwrap_or_default()
}

#[derive(Debug, Error)]
pub enum AttendanceError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(&'static str),
    #[error("{0}")]
    Conflict(String),
}

/// `empleado_id`, `fecha_inicio`, `fecha_fin` query parameters shared by the hour summaries.
#[derive(Debug, Clone, Default, Deserialize, TS)]
pub struct RangoEmpleado {
    pub empleado_id: Option<i64>,
    pub fecha_inicio: Option<NaiveDate>,
    pub fecha_fin: Option<NaiveDate>,
}

impl RangoEmpleado {
    pub fn require(&self) -> Result<(i64, NaiveDate, NaiveDate), AttendanceError> {
        let (Some(empleado_id), Some(desde), Some(hasta)) =
            (self.empleado_id, self.fecha_inicio, self.fecha_fin)
        else {
            return Err(AttendanceError::Validation(
                "Faltan parámetros: empleado_id, fecha_inicio y fecha_fin son requeridos"
                    .to_string(),
            ));
        };
        if hasta < desde {
            return Err(AttendanceError::Validation(
                "La fecha fin debe ser posterior o igual a la fecha inicio".to_string(),
            ));
        }
        Ok((empleado_id, desde, hasta))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, TS)]
#[serde(rename_all = "lowercase")]
pub enum EstadoRegistro {
    Success,
    Error,
}

/// Outcome of one item of a bulk registration.
#[derive(Debug, Clone, Serialize, TS)]
pub struct ResultadoRegistro {
    pub empleado_id: i64,
    pub fecha: NaiveDate,
    pub status: EstadoRegistro,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize, TS)]
pub struct RegistroMultiple {
    pub asistencias: Vec<CreateAsistencia>,
}

/// Hours between clock-in and clock-out, two decimals.
pub fn horas_entre(entrada: NaiveTime, salida: NaiveTime) -> f64 {
    round2((salida - entrada).num_seconds() as f64 / 3600.0)
}

/// Applies the attendance rules to a submitted row.
pub fn resolve(data: &CreateAsistencia) -> Result<AsistenciaRecord, AttendanceError> {
    let estado = data.estado.unwrap_or(match data.hora_entrada {
        None => EstadoAsistencia::Ausente,
        Some(entrada) if entrada > hora_limite_puntual() => EstadoAsistencia::Tardanza,
        Some(_) => EstadoAsistencia::Presente,
    });
    let observaciones = non_blank(data.observaciones.clone());
    if estado == EstadoAsistencia::Ausente && observaciones.is_none() {
        return Err(AttendanceError::Validation(
            "Debe indicar el motivo de la ausencia en observaciones".to_string(),
        ));
    }

    let horas_trabajadas = match (data.hora_entrada, data.hora_salida) {
        (Some(entrada), Some(salida)) if salida <= entrada => {
            return Err(AttendanceError::Validation(
                "La hora de salida debe ser posterior a la hora de entrada".to_string(),
            ));
        }
        (Some(entrada), Some(salida)) if estado != EstadoAsistencia::Ausente => {
            horas_entre(entrada, salida)
        }
        _ => 0.0,
    };

    Ok(AsistenciaRecord {
        empleado_id: data.empleado_id,
        fecha: data.fecha,
        hora_entrada: data.hora_entrada,
        hora_salida: data.hora_salida,
        horas_trabajadas,
        estado,
        tipo_asistencia: data.tipo_asistencia.unwrap_or_default(),
        jornada_laboral: data.jornada_laboral.unwrap_or_default(),
        observaciones,
    })
}

pub struct AttendanceService {
    pool: SqlitePool,
}

impl AttendanceService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn list(&self) -> Result<Vec<Asistencia>, AttendanceError> {
        Ok(Asistencia::find_all(&self.pool).await?)
    }

    pub async fn get(&self, id: i64) -> Result<Asistencia, AttendanceError> {
        Asistencia::find_by_id(&self.pool, id)
            .await?
            .ok_or(AttendanceError::NotFound("Asistencia no encontrada"))
    }

    pub async fn empleados_activos(&self) -> Result<Vec<Empleado>, AttendanceError> {
        Ok(Empleado::find_activos(&self.pool).await?)
    }

    async fn check_empleado(&self, empleado_id: i64) -> Result<(), AttendanceError> {
        if Empleado::find_by_id(&self.pool, empleado_id).await?.is_none() {
            return Err(AttendanceError::NotFound("Empleado no encontrado"));
        }
        Ok(())
    }

    async fn check_unique(&self, record: &AsistenciaRecord, exclude_id: Option<i64>) -> Result<(), AttendanceError> {
        if Asistencia::exists_for_day(&self.pool, record.empleado_id, record.fecha, exclude_id).await? {
            return Err(AttendanceError::Conflict(
                "Ya existe un registro de asistencia para este empleado en esta fecha".to_string(),
            ));
        }
        Ok(())
    }

    pub async fn create(&self, data: &CreateAsistencia) -> Result<Asistencia, AttendanceError> {
        let record = resolve(data)?;
        self.check_empleado(record.empleado_id).await?;
        self.check_unique(&record, None).await?;
        Ok(Asistencia::create(&self.pool, &record).await?)
    }

    pub async fn update(&self, id: i64, data: &CreateAsistencia) -> Result<Asistencia, AttendanceError> {
        let record = resolve(data)?;
        self.check_empleado(record.empleado_id).await?;
        self.check_unique(&record, Some(id)).await?;
        Asistencia::update(&self.pool, id, &record)
            .await?
            .ok_or(AttendanceError::NotFound("Asistencia no encontrada"))
    }

    pub async fn delete(&self, id: i64) -> Result<(), AttendanceError> {
        if Asistencia::delete(&self.pool, id).await? == 0 {
            return Err(AttendanceError::NotFound("Asistencia no encontrada"));
        }
        Ok(())
    }

    /// Quick registration: creates or overwrites the employee's row for that day.
    pub async fn registrar(&self, data: &CreateAsistencia) -> Result<Asistencia, AttendanceError> {
        let record = resolve(data)?;
        self.check_empleado(record.empleado_id).await?;
        let asistencia = Asistencia::upsert(&self.pool, &record).await?;
        debug!(empleado_id = record.empleado_id, fecha = %record.fecha, estado = %record.estado, "Attendance registered");
        Ok(asistencia)
    }

    /// Registers every item independently; failures are reported per item.
    pub async fn registrar_multiple(
        &self,
        items: &[CreateAsistencia],
    ) -> Result<Vec<ResultadoRegistro>, AttendanceError> {
        if items.is_empty() {
            return Err(AttendanceError::Validation(
                "No se recibieron asistencias para registrar".to_string(),
            ));
        }
        let mut resultados = Vec::with_capacity(items.len());
        for item in items {
            let (status, message) = match self.registrar(item).await {
                Ok(_) => (EstadoRegistro::Success, None),
                Err(AttendanceError::Database(e)) => {
                    warn!(empleado_id = item.empleado_id, error = %e, "Bulk attendance item failed");
                    (EstadoRegistro::Error, Some("Error al registrar la asistencia".to_string()))
                }
                Err(e) => (EstadoRegistro::Error, Some(e.to_string())),
            };
            resultados.push(ResultadoRegistro {
                empleado_id: item.empleado_id,
                fecha: item.fecha,
                status,
                message,
            });
        }
        Ok(resultados)
    }

    pub async fn horas_trabajadas(&self, rango: &RangoEmpleado) -> Result<ResumenHoras, AttendanceError> {
        let (empleado_id, desde, hasta) = rango.require()?;
        Ok(Asistencia::resumen_rango(&self.pool, empleado_id, desde, hasta).await?)
    }

    pub async fn resumen_semanal(
        &self,
        anio: Option<i64>,
        semana: Option<i64>,
    ) -> Result<Vec<ResumenSemanal>, AttendanceError> {
        Ok(Asistencia::resumen_semanal(&self.pool, anio, semana).await?)
    }
}

#[cfg(test)]
mod tests {
    use db::DBService;

    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn marca(empleado_id: i64, fecha: &str, entrada: Option<NaiveTime>, salida: Option<NaiveTime>) -> CreateAsistencia {
        CreateAsistencia {
            empleado_id,
            fecha: d(fecha),
            hora_entrada: entrada,
            hora_salida: salida,
            estado: None,
            tipo_asistencia: None,
            jornada_laboral: None,
            observaciones: None,
        }
    }

    async fn setup() -> (AttendanceService, i64) {
        let pool = DBService::new_in_memory().await.unwrap().pool;
        let usuario_id: i64 = sqlx::query_scalar(
            "INSERT INTO usuarios (nombres, apellidos, numero_documento, correo, clave, rol_id)
             VALUES ('Jorge', 'Paredes', '41', 'jorge@acme.pe', 'x', 3) RETURNING id",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        let empleado_id: i64 = sqlx::query_scalar(
            "INSERT INTO empleados (usuario_id, cargo, fecha_contratacion, sueldo_base)
             VALUES ($1, 'Técnico', '2024-01-02', 2400) RETURNING id",
        )
        .bind(usuario_id)
        .fetch_one(&pool)
        .await
        .unwrap();
        (AttendanceService::new(pool), empleado_id)
    }

    #[test]
    fn estado_is_derived_from_clock_in() {
        let puntual = resolve(&marca(1, "2025-03-03", Some(t(8, 15)), Some(t(17, 45)))).unwrap();
        assert_eq!(puntual.estado, EstadoAsistencia::Presente);
        assert_eq!(puntual.horas_trabajadas, 9.5);

        let tarde = resolve(&marca(1, "2025-03-03", Some(t(8, 16)), None)).unwrap();
        assert_eq!(tarde.estado, EstadoAsistencia::Tardanza);
        assert_eq!(tarde.horas_trabajadas, 0.0);

        let mut ausente = marca(1, "2025-03-03", None, None);
        assert!(resolve(&ausente).is_err());
        ausente.observaciones = Some("Descanso médico".into());
        assert_eq!(resolve(&ausente).unwrap().estado, EstadoAsistencia::Ausente);
    }

    #[test]
    fn salida_must_follow_entrada() {
        assert!(matches!(
            resolve(&marca(1, "2025-03-03", Some(t(9, 0)), Some(t(8, 0)))),
            Err(AttendanceError::Validation(_))
        ));
        assert_eq!(horas_entre(t(8, 0), t(12, 20)), 4.33);
    }

    #[tokio::test]
    async fn one_record_per_day_and_upsert_registration() {
        let (service, empleado_id) = setup().await;
        let primera = service
            .create(&marca(empleado_id, "2025-03-03", Some(t(8, 0)), Some(t(16, 0))))
            .await
            .unwrap();
        assert!(matches!(
            service.create(&marca(empleado_id, "2025-03-03", Some(t(9, 0)), None)).await,
            Err(AttendanceError::Conflict(_))
        ));
        // Updating the same row keeps its own date
        service
            .update(primera.id, &marca(empleado_id, "2025-03-03", Some(t(8, 30)), Some(t(16, 0))))
            .await
            .unwrap();

        let registrada = service
            .registrar(&marca(empleado_id, "2025-03-03", Some(t(7, 55)), Some(t(17, 55))))
            .await
            .unwrap();
        assert_eq!(registrada.id, primera.id);
        assert_eq!(registrada.horas_trabajadas, 10.0);
    }

    #[tokio::test]
    async fn bulk_registration_reports_each_item() {
        let (service, empleado_id) = setup().await;
        let resultados = service
            .registrar_multiple(&[
                marca(empleado_id, "2025-03-03", Some(t(8, 0)), Some(t(16, 0))),
                marca(empleado_id, "2025-03-04", None, None),
                marca(999, "2025-03-04", Some(t(8, 0)), None),
                marca(empleado_id, "2025-03-05", Some(t(8, 0)), Some(t(12, 0))),
            ])
            .await
            .unwrap();
        let status: Vec<_> = resultados.iter().map(|r| r.status).collect();
        assert_eq!(
            status,
            vec![
                EstadoRegistro::Success,
                EstadoRegistro::Error,
                EstadoRegistro::Error,
                EstadoRegistro::Success
            ]
        );
        assert_eq!(resultados[2].message.as_deref(), Some("Empleado no encontrado"));

        let resumen = service
            .horas_trabajadas(&RangoEmpleado {
                empleado_id: Some(empleado_id),
                fecha_inicio: Some(d("2025-03-01")),
                fecha_fin: Some(d("2025-03-07")),
            })
            .await
            .unwrap();
        assert_eq!(resumen.total_horas, 12.0);
        assert_eq!(resumen.total_dias, 2);
        assert!(service.horas_trabajadas(&RangoEmpleado::default()).await.is_err());
    }
}
