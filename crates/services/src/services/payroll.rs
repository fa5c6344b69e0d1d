//! Weekly payroll computed from attendance, plus per-user remunerations.

use chrono::{NaiveDate, NaiveTime};
use db::models::{
    asistencia::{Asistencia, EstadoAsistencia, JornadaLaboral, ResumenHoras, TipoAsistencia},
    empleado::Empleado,
    pago::{CreatePago, EstadoPago, MetodoPago, Pago, PagoRecord},
    remuneracion::{CreateRemuneracion, Remuneracion},
    usuario::Usuario,
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::info;
use ts_rs::TS;
use utils::{
    money::{round1, round2},
    validation::non_blank,
};

use super::attendance::{AttendanceError, RangoEmpleado};

/// Payroll month used to derive an hourly rate from a monthly salary.
pub const DIAS_MES: f64 = 30.0;
pub const HORAS_DIA: f64 = 8.0;
/// Monday-based week numbers as SQLite's `%W` yields them; days before the
/// year's first Monday fall in week 0.
const SEMANAS: std::ops::RangeInclusive<i64> = 0..=53;

pub const SIN_ASISTENCIAS: &str =
    "No se encontraron asistencias registradas para el período seleccionado";

#[derive(Debug, Error)]
pub enum PayrollError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Attendance(#[from] AttendanceError),
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(&'static str),
    #[error("{0}")]
    Conflict(String),
}

pub fn tarifa_hora(sueldo_base: f64) -> f64 {
    sueldo_base / DIAS_MES / HORAS_DIA
}

fn check_periodo(desde: NaiveDate, hasta: NaiveDate) -> Result<(), PayrollError> {
    if hasta < desde {
        return Err(PayrollError::Validation(
            "La fecha fin debe ser posterior o igual a la fecha inicio".to_string(),
        ));
    }
    Ok(())
}

fn check_montos(montos: &[(&str, f64)]) -> Result<(), PayrollError> {
    match montos.iter().find(|(_, monto)| *monto < 0.0) {
        Some((label, _)) => Err(PayrollError::Validation(format!(
            "El campo {label} no puede ser negativo"
        ))),
        None => Ok(()),
    }
}

#[derive(Debug, Clone, Deserialize, TS)]
pub struct CalcularPago {
    pub empleado_id: i64,
    pub semana: i64,
    pub anio: i64,
    pub fecha_inicio: NaiveDate,
    pub fecha_fin: NaiveDate,
    pub bonificaciones: Option<f64>,
    pub descuentos: Option<f64>,
}

#[derive(Debug, Clone, Serialize, TS)]
pub struct CalculoPago {
    pub horas_calculadas: f64,
    pub sueldo_calculado: f64,
    pub pago: Pago,
}

#[derive(Debug, Clone, Serialize, TS)]
pub struct HorasReales {
    pub horas_reales: f64,
    pub dias_trabajados: i64,
    pub dias_presente: i64,
    pub dias_tardanza: i64,
    pub dias_ausente: i64,
}

impl From<ResumenHoras> for HorasReales {
    fn from(r: ResumenHoras) -> Self {
        Self {
            horas_reales: r.total_horas,
            dias_trabajados: r.total_dias,
            dias_presente: r.dias_presente,
            dias_tardanza: r.dias_tardanza,
            dias_ausente: r.dias_ausente,
        }
    }
}

#[derive(Debug, Clone, Serialize, TS)]
pub struct Periodo {
    pub fecha_inicio: NaiveDate,
    pub fecha_fin: NaiveDate,
}

#[derive(Debug, Clone, Serialize, TS)]
pub struct ResumenAsistencias {
    pub asistencias_detalle: Vec<Asistencia>,
    pub resumen: ResumenHoras,
    pub periodo: Periodo,
}

#[derive(Debug, Clone, Serialize, TS)]
pub struct DesgloseDia {
    pub fecha: NaiveDate,
    /// Short weekday name, e.g. `Mon`.
    pub dia_semana: String,
    pub jornada: JornadaLaboral,
    pub hora_entrada: Option<NaiveTime>,
    pub hora_salida: Option<NaiveTime>,
    pub horas: f64,
    pub estado: EstadoAsistencia,
    pub tipo: TipoAsistencia,
}

#[derive(Debug, Clone, Serialize, TS)]
pub struct EstadisticasHoras {
    pub dias_trabajados: i64,
    pub dias_en_periodo: i64,
    pub promedio_horas_por_dia: f64,
    /// Worked days over calendar days, percent with one decimal.
    pub eficiencia: f64,
}

#[derive(Debug, Clone, Serialize, TS)]
pub struct CalculoHoras {
    pub horas_trabajadas: f64,
    pub desglose: Vec<DesgloseDia>,
    pub estadisticas: Option<EstadisticasHoras>,
    pub mensaje: String,
}

impl CalculoHoras {
    pub fn encontrado(&self) -> bool {
        !self.desglose.is_empty()
    }
}

pub struct PayrollService {
    pool: SqlitePool,
}

impl PayrollService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn empleado(&self, empleado_id: i64) -> Result<Empleado, PayrollError> {
        Empleado::find_by_id(&self.pool, empleado_id)
            .await?
            .ok_or(PayrollError::NotFound("Empleado no encontrado"))
    }

    async fn horas_periodo(
        &self,
        empleado_id: i64,
        desde: NaiveDate,
        hasta: NaiveDate,
    ) -> Result<f64, PayrollError> {
        let resumen = Asistencia::resumen_rango(&self.pool, empleado_id, desde, hasta).await?;
        Ok(round2(resumen.total_horas))
    }

    pub async fn list(&self) -> Result<Vec<Pago>, PayrollError> {
        Ok(Pago::find_all(&self.pool).await?)
    }

    pub async fn get(&self, id: i64) -> Result<Pago, PayrollError> {
        Pago::find_by_id(&self.pool, id)
            .await?
            .ok_or(PayrollError::NotFound("Pago no encontrado"))
    }

    /// Validates the payload and derives hours from attendance and the total.
    async fn record(&self, data: &CreatePago) -> Result<PagoRecord, PayrollError> {
        check_periodo(data.fecha_inicio, data.fecha_fin)?;
        let bonificaciones = data.bonificaciones.unwrap_or(0.0);
        let descuentos = data.descuentos.unwrap_or(0.0);
        check_montos(&[
            ("sueldo_semanal", data.sueldo_semanal),
            ("bonificaciones", bonificaciones),
            ("descuentos", descuentos),
        ])?;
        if !SEMANAS.contains(&data.semana) {
            return Err(PayrollError::Validation("Semana no válida".to_string()));
        }
        self.empleado(data.empleado_id).await?;

        let horas_trabajadas = self
            .horas_periodo(data.empleado_id, data.fecha_inicio, data.fecha_fin)
            .await?;
        Ok(PagoRecord {
            empleado_id: data.empleado_id,
            semana: data.semana,
            anio: data.anio,
            fecha_inicio: data.fecha_inicio,
            fecha_fin: data.fecha_fin,
            horas_trabajadas,
            sueldo_semanal: round2(data.sueldo_semanal),
            bonificaciones: round2(bonificaciones),
            descuentos: round2(descuentos),
            total_pago: round2(data.sueldo_semanal + bonificaciones - descuentos),
            estado: data.estado.unwrap_or_default(),
            fecha_pago: data.fecha_pago,
            metodo_pago: data.metodo_pago.unwrap_or_default(),
            comentarios: non_blank(data.comentarios.clone()),
        })
    }

    pub async fn create(&self, data: &CreatePago) -> Result<Pago, PayrollError> {
        let record = self.record(data).await?;
        let pago = Pago::create(&self.pool, &record).await?;
        info!(pago_id = pago.id, empleado_id = pago.empleado_id, total = pago.total_pago, "Payment created");
        Ok(pago)
    }

    pub async fn update(&self, id: i64, data: &CreatePago) -> Result<Pago, PayrollError> {
        let record = self.record(data).await?;
        Pago::update(&self.pool, id, &record)
            .await?
            .ok_or(PayrollError::NotFound("Pago no encontrado"))
    }

    pub async fn delete(&self, id: i64) -> Result<(), PayrollError> {
        if Pago::delete(&self.pool, id).await? == 0 {
            return Err(PayrollError::NotFound("Pago no encontrado"));
        }
        Ok(())
    }

    /// Computes the week's salary from attendance and stores it as the PENDIENTE payment.
    pub async fn calcular(&self, data: &CalcularPago) -> Result<CalculoPago, PayrollError> {
        check_periodo(data.fecha_inicio, data.fecha_fin)?;
        let empleado = self.empleado(data.empleado_id).await?;
        let existente = Pago::find_for_week(&self.pool, data.empleado_id, data.semana, data.anio).await?;
        if existente.as_ref().is_some_and(|p| p.estado == EstadoPago::Pagado) {
            return Err(PayrollError::Conflict(
                "El pago de esta semana ya fue realizado".to_string(),
            ));
        }

        let horas = self
            .horas_periodo(data.empleado_id, data.fecha_inicio, data.fecha_fin)
            .await?;
        let sueldo = round2(horas * tarifa_hora(empleado.sueldo_base));
        let payload = CreatePago {
            empleado_id: data.empleado_id,
            semana: data.semana,
            anio: data.anio,
            fecha_inicio: data.fecha_inicio,
            fecha_fin: data.fecha_fin,
            sueldo_semanal: sueldo,
            bonificaciones: data.bonificaciones,
            descuentos: data.descuentos,
            estado: Some(EstadoPago::Pendiente),
            fecha_pago: None,
            metodo_pago: Some(
                existente
                    .as_ref()
                    .map(|p| p.metodo_pago)
                    .unwrap_or(MetodoPago::Transferencia),
            ),
            comentarios: existente.as_ref().and_then(|p| p.comentarios.clone()),
        };
        let pago = match existente {
            Some(pendiente) => self.update(pendiente.id, &payload).await?,
            None => self.create(&payload).await?,
        };
        info!(
            empleado_id = data.empleado_id,
            semana = data.semana,
            anio = data.anio,
            horas,
            sueldo,
            "Weekly payment calculated"
        );

        Ok(CalculoPago {
            horas_calculadas: horas,
            sueldo_calculado: sueldo,
            pago,
        })
    }

    pub async fn horas_trabajadas(&self, rango: &RangoEmpleado) -> Result<HorasReales, PayrollError> {
        let (empleado_id, desde, hasta) = rango.require()?;
        Ok(Asistencia::resumen_rango(&self.pool, empleado_id, desde, hasta)
            .await?
            .into())
    }

    pub async fn resumen_asistencias(
        &self,
        rango: &RangoEmpleado,
    ) -> Result<ResumenAsistencias, PayrollError> {
        let (empleado_id, desde, hasta) = rango.require()?;
        let asistencias_detalle =
            Asistencia::find_in_range(&self.pool, empleado_id, desde, hasta, false).await?;
        let resumen = Asistencia::resumen_rango(&self.pool, empleado_id, desde, hasta).await?;
        Ok(ResumenAsistencias {
            asistencias_detalle,
            resumen,
            periodo: Periodo {
                fecha_inicio: desde,
                fecha_fin: hasta,
            },
        })
    }

    /// Day-by-day breakdown of worked hours. An empty breakdown means no attendance in range.
    pub async fn calcular_horas(&self, rango: &RangoEmpleado) -> Result<CalculoHoras, PayrollError> {
        let (empleado_id, desde, hasta) = rango.require()?;
        let asistencias = Asistencia::find_in_range(&self.pool, empleado_id, desde, hasta, true).await?;
        if asistencias.is_empty() {
            return Ok(CalculoHoras {
                horas_trabajadas: 0.0,
                desglose: Vec::new(),
                estadisticas: None,
                mensaje: SIN_ASISTENCIAS.to_string(),
            });
        }

        let desglose: Vec<DesgloseDia> = asistencias
            .into_iter()
            .map(|a| DesgloseDia {
                dia_semana: a.fecha.format("%a").to_string(),
                fecha: a.fecha,
                jornada: a.jornada_laboral,
                hora_entrada: a.hora_entrada,
                hora_salida: a.hora_salida,
                horas: a.horas_trabajadas,
                estado: a.estado,
                tipo: a.tipo_asistencia,
            })
            .collect();
        let horas_trabajadas = round2(desglose.iter().map(|d| d.horas).sum());
        let dias_trabajados = desglose.len() as i64;
        let dias_en_periodo = (hasta - desde).num_days() + 1;
        let promedio = horas_trabajadas / dias_trabajados as f64;

        let mut mensaje = format!("Se encontraron {dias_trabajados} día(s) de asistencia en el período.");
        if horas_trabajadas > 0.0 {
            mensaje.push_str(&format!(" Promedio: {promedio:.1}h/día."));
        }

        Ok(CalculoHoras {
            horas_trabajadas,
            desglose,
            estadisticas: Some(EstadisticasHoras {
                dias_trabajados,
                dias_en_periodo,
                promedio_horas_por_dia: round2(promedio),
                eficiencia: round1(dias_trabajados as f64 / dias_en_periodo as f64 * 100.0),
            }),
            mensaje,
        })
    }

    // Remunerations

    pub async fn list_remuneraciones(&self) -> Result<Vec<Remuneracion>, PayrollError> {
        Ok(Remuneracion::find_all(&self.pool).await?)
    }

    pub async fn get_remuneracion(&self, id: i64) -> Result<Remuneracion, PayrollError> {
        Remuneracion::find_by_id(&self.pool, id)
            .await?
            .ok_or(PayrollError::NotFound("Remuneración no encontrada"))
    }

    async fn check_remuneracion(&self, data: &CreateRemuneracion) -> Result<(), PayrollError> {
        if data.periodo.trim().is_empty() {
            return Err(PayrollError::Validation("El periodo es requerido".to_string()));
        }
        check_periodo(data.fecha_inicio, data.fecha_fin)?;
        check_montos(&[
            ("sueldo_base", data.sueldo_base),
            ("bonificaciones", data.bonificaciones.unwrap_or(0.0)),
            ("descuentos", data.descuentos.unwrap_or(0.0)),
            ("horas_trabajadas", data.horas_trabajadas.unwrap_or(0.0)),
        ])?;
        if Usuario::find_by_id(&self.pool, data.usuario_id).await?.is_none() {
            return Err(PayrollError::NotFound("Usuario no encontrado"));
        }
        Ok(())
    }

    pub async fn create_remuneracion(&self, data: &CreateRemuneracion) -> Result<Remuneracion, PayrollError> {
        self.check_remuneracion(data).await?;
        Ok(Remuneracion::create(&self.pool, data).await?)
    }

    pub async fn update_remuneracion(
        &self,
        id: i64,
        data: &CreateRemuneracion,
    ) -> Result<Remuneracion, PayrollError> {
        self.check_remuneracion(data).await?;
        Remuneracion::update(&self.pool, id, data)
            .await?
            .ok_or(PayrollError::NotFound("Remuneración no encontrada"))
    }

    pub async fn delete_remuneracion(&self, id: i64) -> Result<(), PayrollError> {
        if Remuneracion::delete(&self.pool, id).await? == 0 {
            return Err(PayrollError::NotFound("Remuneración no encontrada"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use db::DBService;

    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    /// Employee earning 2400/month (10/hour) with 8h on Monday and 4h on Tuesday.
    async fn setup() -> (PayrollService, i64) {
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
        sqlx::query(
            "INSERT INTO asistencias (empleado_id, fecha, hora_entrada, hora_salida, horas_trabajadas, estado, jornada_laboral)
             VALUES ($1, '2025-03-03', '08:00:00', '16:00:00', 8, 'PRESENTE', 'COMPLETA'),
                    ($1, '2025-03-04', '08:30:00', '12:30:00', 4, 'TARDANZA', 'MEDIA'),
                    ($1, '2025-03-05', NULL, NULL, 0, 'AUSENTE', 'COMPLETA')",
        )
        .bind(empleado_id)
        .execute(&pool)
        .await
        .unwrap();
        (PayrollService::new(pool), empleado_id)
    }

    fn semana_marzo(empleado_id: i64) -> CalcularPago {
        CalcularPago {
            empleado_id,
            semana: 9,
            anio: 2025,
            fecha_inicio: d("2025-03-03"),
            fecha_fin: d("2025-03-09"),
            bonificaciones: Some(20.0),
            descuentos: Some(5.0),
        }
    }

    #[test]
    fn hourly_rate_uses_thirty_eight_hour_days() {
        assert_eq!(tarifa_hora(2400.0), 10.0);
    }

    #[tokio::test]
    async fn calcular_upserts_pending_week_and_refuses_paid_one() {
        let (payroll, empleado_id) = setup().await;
        let calculo = payroll.calcular(&semana_marzo(empleado_id)).await.unwrap();
        assert_eq!(calculo.horas_calculadas, 12.0);
        assert_eq!(calculo.sueldo_calculado, 120.0);
        assert_eq!(calculo.pago.total_pago, 135.0);
        assert_eq!(calculo.pago.estado, EstadoPago::Pendiente);

        let again = payroll.calcular(&semana_marzo(empleado_id)).await.unwrap();
        assert_eq!(again.pago.id, calculo.pago.id);
        assert_eq!(payroll.list().await.unwrap().len(), 1);

        sqlx::query("UPDATE pagos SET estado = 'PAGADO' WHERE id = $1")
            .bind(calculo.pago.id)
            .execute(&payroll.pool)
            .await
            .unwrap();
        assert!(matches!(
            payroll.calcular(&semana_marzo(empleado_id)).await,
            Err(PayrollError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn days_before_first_monday_are_paid_as_week_zero() {
        let (payroll, empleado_id) = setup().await;
        sqlx::query(
            "INSERT INTO asistencias (empleado_id, fecha, hora_entrada, hora_salida, horas_trabajadas, estado, jornada_laboral)
             VALUES ($1, '2025-01-02', '08:00:00', '16:00:00', 8, 'PRESENTE', 'COMPLETA')",
        )
        .bind(empleado_id)
        .execute(&payroll.pool)
        .await
        .unwrap();
        let semana: i64 = sqlx::query_scalar(
            "SELECT semana FROM vista_asistencia_semanal WHERE anio = 2025 AND empleado_id = $1 ORDER BY semana LIMIT 1",
        )
        .bind(empleado_id)
        .fetch_one(&payroll.pool)
        .await
        .unwrap();
        assert_eq!(semana, 0);

        let enero = CalcularPago {
            semana,
            fecha_inicio: d("2025-01-01"),
            fecha_fin: d("2025-01-05"),
            bonificaciones: None,
            descuentos: None,
            ..semana_marzo(empleado_id)
        };
        let calculo = payroll.calcular(&enero).await.unwrap();
        assert_eq!(calculo.horas_calculadas, 8.0);
        assert_eq!(calculo.pago.semana, 0);

        let fuera = CalcularPago { semana: 54, ..enero };
        assert!(matches!(
            payroll.calcular(&fuera).await,
            Err(PayrollError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn manual_payment_recomputes_hours() {
        let (payroll, empleado_id) = setup().await;
        let data = CreatePago {
            empleado_id,
            semana: 9,
            anio: 2025,
            fecha_inicio: d("2025-03-03"),
            fecha_fin: d("2025-03-03"),
            sueldo_semanal: 300.0,
            bonificaciones: None,
            descuentos: Some(50.0),
            estado: None,
            fecha_pago: None,
            metodo_pago: Some(MetodoPago::Efectivo),
            comentarios: Some("  ".into()),
        };
        let pago = payroll.create(&data).await.unwrap();
        assert_eq!(pago.horas_trabajadas, 8.0);
        assert_eq!(pago.total_pago, 250.0);
        assert!(pago.comentarios.is_none());

        let mut invertido = data.clone();
        invertido.fecha_fin = d("2025-03-01");
        assert!(matches!(
            payroll.create(&invertido).await,
            Err(PayrollError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn calcular_horas_breakdown_and_empty_period() {
        let (payroll, empleado_id) = setup().await;
        let rango = RangoEmpleado {
            empleado_id: Some(empleado_id),
            fecha_inicio: Some(d("2025-03-03")),
            fecha_fin: Some(d("2025-03-09")),
        };
        let calculo = payroll.calcular_horas(&rango).await.unwrap();
        assert!(calculo.encontrado());
        assert_eq!(calculo.horas_trabajadas, 12.0);
        assert_eq!(calculo.desglose[0].dia_semana, "Mon");
        let stats = calculo.estadisticas.unwrap();
        assert_eq!(stats.dias_en_periodo, 7);
        assert_eq!(stats.eficiencia, 28.6);
        assert_eq!(stats.promedio_horas_por_dia, 6.0);

        let vacio = RangoEmpleado {
            fecha_inicio: Some(d("2025-04-01")),
            fecha_fin: Some(d("2025-04-07")),
            ..rango.clone()
        };
        let sin_datos = payroll.calcular_horas(&vacio).await.unwrap();
        assert!(!sin_datos.encontrado());
        assert_eq!(sin_datos.mensaje, SIN_ASISTENCIAS);

        let horas = payroll.horas_trabajadas(&rango).await.unwrap();
        assert_eq!(horas.dias_trabajados, 2);
        assert_eq!(horas.dias_ausente, 0);
        let resumen = payroll.resumen_asistencias(&rango).await.unwrap();
        assert_eq!(resumen.asistencias_detalle.len(), 3);

        assert!(matches!(
            payroll.horas_trabajadas(&RangoEmpleado::default()).await,
            Err(PayrollError::Attendance(AttendanceError::Validation(_)))
        ));
    }

    #[tokio::test]
    async fn remuneracion_total_and_validation() {
        let (payroll, _) = setup().await;
        let data = CreateRemuneracion {
            usuario_id: 1,
            periodo: "2025-03".into(),
            fecha_inicio: d("2025-03-01"),
            fecha_fin: d("2025-03-31"),
            horas_trabajadas: Some(160.0),
            sueldo_base: 2400.0,
            bonificaciones: Some(100.0),
            descuentos: Some(50.5),
            estado: None,
            fecha_pago: None,
        };
        let remuneracion = payroll.create_remuneracion(&data).await.unwrap();
        assert_eq!(remuneracion.total, 2449.5);
        assert_eq!(remuneracion.nombre_usuario.as_deref(), Some("Jorge Paredes"));

        let sin_usuario = CreateRemuneracion {
            usuario_id: 999,
            ..data
        };
        assert!(matches!(
            payroll.create_remuneracion(&sin_usuario).await,
            Err(PayrollError::NotFound(_))
        ));
    }
}
