use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;

#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, TS, EnumString, Display, Default,
)]
#[sqlx(type_name = "estado_remuneracion", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum EstadoRemuneracion {
    #[default]
    Pendiente,
    Pagado,
}

const SELECT_REMUNERACION: &str = r#"SELECT
        r.id, r.usuario_id, u.nombres || ' ' || u.apellidos AS nombre_usuario,
        r.periodo, r.fecha_inicio, r.fecha_fin, r.horas_trabajadas, r.sueldo_base,
        r.bonificaciones, r.descuentos, r.total, r.estado, r.fecha_pago, r.fecha_registro
    FROM remuneraciones r
    LEFT JOIN usuarios u ON u.id = r.usuario_id"#;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Remuneracion {
    pub id: i64,
    pub usuario_id: i64,
    pub nombre_usuario: Option<String>,
    pub periodo: String,
    pub fecha_inicio: NaiveDate,
    pub fecha_fin: NaiveDate,
    pub horas_trabajadas: f64,
    pub sueldo_base: f64,
    pub bonificaciones: f64,
    pub descuentos: f64,
    pub total: f64,
    pub estado: EstadoRemuneracion,
    pub fecha_pago: Option<NaiveDate>,
    pub fecha_registro: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, TS)]
pub struct CreateRemuneracion {
    pub usuario_id: i64,
    pub periodo: String,
    pub fecha_inicio: NaiveDate,
    pub fecha_fin: NaiveDate,
    pub horas_trabajadas: Option<f64>,
    pub sueldo_base: f64,
    pub bonificaciones: Option<f64>,
    pub descuentos: Option<f64>,
    pub estado: Option<EstadoRemuneracion>,
    pub fecha_pago: Option<NaiveDate>,
}

impl CreateRemuneracion {
    /// sueldo_base + bonificaciones − descuentos, rounded to cents.
    pub fn total(&self) -> f64 {
        utils::money::round2(
            self.sueldo_base + self.bonificaciones.unwrap_or(0.0) - self.descuentos.unwrap_or(0.0),
        )
    }
}

impl Remuneracion {
    pub async fn find_all(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Remuneracion>(&format!(
            "{SELECT_REMUNERACION} ORDER BY r.fecha_inicio DESC, r.id DESC"
        ))
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Remuneracion>(&format!("{SELECT_REMUNERACION} WHERE r.id = $1"))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn create(pool: &SqlitePool, data: &CreateRemuneracion) -> Result<Self, sqlx::Error> {
        let id: i64 = sqlx::query_scalar(
            r#"INSERT INTO remuneraciones (usuario_id, periodo, fecha_inicio, fecha_fin, horas_trabajadas,
                                           sueldo_base, bonificaciones, descuentos, total, estado, fecha_pago)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
               RETURNING id"#,
        )
        .bind(data.usuario_id)
        .bind(data.periodo.trim())
        .bind(data.fecha_inicio)
        .bind(data.fecha_fin)
        .bind(data.horas_trabajadas.unwrap_or(0.0))
        .bind(data.sueldo_base)
        .bind(data.bonificaciones.unwrap_or(0.0))
        .bind(data.descuentos.unwrap_or(0.0))
        .bind(data.total())
        .bind(data.estado.unwrap_or_default())
        .bind(data.fecha_pago)
        .fetch_one(pool)
        .await?;

        Self::find_by_id(pool, id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    pub async fn update(
        pool: &SqlitePool,
        id: i64,
        data: &CreateRemuneracion,
    ) -> Result<Option<Self>, sqlx::Error> {
        let result = sqlx::query(
            r#"UPDATE remuneraciones
               SET usuario_id = $2, periodo = $3, fecha_inicio = $4, fecha_fin = $5,
                   horas_trabajadas = $6, sueldo_base = $7, bonificaciones = $8,
                   descuentos = $9, total = $10, estado = $11, fecha_pago = $12
               WHERE id = $1"#,
        )
        .bind(id)
        .bind(data.usuario_id)
        .bind(data.periodo.trim())
        .bind(data.fecha_inicio)
        .bind(data.fecha_fin)
        .bind(data.horas_trabajadas.unwrap_or(0.0))
        .bind(data.sueldo_base)
        .bind(data.bonificaciones.unwrap_or(0.0))
        .bind(data.descuentos.unwrap_or(0.0))
        .bind(data.total())
        .bind(data.estado.unwrap_or_default())
        .bind(data.fecha_pago)
        .execute(pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        Self::find_by_id(pool, id).await
    }

    pub async fn delete(pool: &SqlitePool, id: i64) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM remuneraciones WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{self, date};

    #[tokio::test]
    async fn total_is_derived_and_name_joined() {
        let pool = test_support::pool().await;
        let usuario = test_support::usuario(&pool, "a@acme.pe").await;
        let mut data = CreateRemuneracion {
            usuario_id: usuario,
            periodo: " 2025-03 ".into(),
            fecha_inicio: date("2025-03-01"),
            fecha_fin: date("2025-03-31"),
            horas_trabajadas: None,
            sueldo_base: 1500.0,
            bonificaciones: Some(100.5),
            descuentos: Some(50.25),
            estado: None,
            fecha_pago: None,
        };

        let created = Remuneracion::create(&pool, &data).await.unwrap();
        assert_eq!(created.total, 1550.25);
        assert_eq!(created.periodo, "2025-03");
        assert_eq!(created.estado, EstadoRemuneracion::Pendiente);
        assert_eq!(created.nombre_usuario.as_deref(), Some("Ana Quispe"));

        data.estado = Some(EstadoRemuneracion::Pagado);
        data.descuentos = None;
        let updated = Remuneracion::update(&pool, created.id, &data).await.unwrap().unwrap();
        assert_eq!(updated.total, 1600.5);
        assert_eq!(updated.estado, EstadoRemuneracion::Pagado);

        assert!(Remuneracion::update(&pool, 999, &data).await.unwrap().is_none());
        assert_eq!(Remuneracion::delete(&pool, created.id).await.unwrap(), 1);
    }
}
