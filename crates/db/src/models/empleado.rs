use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;

#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, TS, EnumString, Display, Default,
)]
#[sqlx(type_name = "estado_empleado", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum EstadoEmpleado {
    #[default]
    Activo,
    Inactivo,
    Vacaciones,
    Licencia,
}

const SELECT_EMPLEADO: &str = r#"SELECT
        e.id, e.usuario_id, u.nombres, u.apellidos,
        u.nombres || ' ' || u.apellidos AS nombre_completo,
        e.cargo, e.area, e.fecha_contratacion, e.tipo_contrato, e.sueldo_base,
        e.banco, e.numero_cuenta, e.tipo_cuenta, e.estado, e.fecha_registro
    FROM empleados e
    JOIN usuarios u ON u.id = e.usuario_id"#;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Empleado {
    pub id: i64,
    pub usuario_id: i64,
    pub nombres: String,
    pub apellidos: String,
    pub nombre_completo: String,
    pub cargo: String,
    pub area: Option<String>,
    pub fecha_contratacion: NaiveDate,
    pub tipo_contrato: Option<String>,
    /// Monthly base salary.
    pub sueldo_base: f64,
    pub banco: Option<String>,
    pub numero_cuenta: Option<String>,
    pub tipo_cuenta: Option<String>,
    pub estado: EstadoEmpleado,
    pub fecha_registro: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, TS)]
pub struct CreateEmpleado {
    pub usuario_id: i64,
    pub cargo: String,
    pub area: Option<String>,
    pub fecha_contratacion: NaiveDate,
    pub tipo_contrato: Option<String>,
    pub sueldo_base: f64,
    pub banco: Option<String>,
    pub numero_cuenta: Option<String>,
    pub tipo_cuenta: Option<String>,
    pub estado: Option<EstadoEmpleado>,
}

impl Empleado {
    pub async fn find_all(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Empleado>(&format!("{SELECT_EMPLEADO} ORDER BY u.apellidos, u.nombres"))
            .fetch_all(pool)
            .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Empleado>(&format!("{SELECT_EMPLEADO} WHERE e.id = $1"))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Employees that can clock in: ACTIVO with an active user account.
    pub async fn find_activos(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Empleado>(&format!(
            "{SELECT_EMPLEADO} WHERE e.estado = 'ACTIVO' AND u.activo = 1 ORDER BY u.apellidos, u.nombres"
        ))
        .fetch_all(pool)
        .await
    }

    pub async fn exists_for_usuario(
        pool: &SqlitePool,
        usuario_id: i64,
        exclude_id: Option<i64>,
    ) -> Result<bool, sqlx::Error> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM empleados WHERE usuario_id = $1 AND ($2 IS NULL OR id != $2)",
        )
        .bind(usuario_id)
        .bind(exclude_id)
        .fetch_one(pool)
        .await?;
        Ok(count > 0)
    }

    pub async fn count_activos(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM empleados WHERE estado = 'ACTIVO'")
            .fetch_one(pool)
            .await
    }

    /// Attendance and payment rows that reference the employee.
    pub async fn count_dependents(pool: &SqlitePool, id: i64) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            r#"SELECT (SELECT COUNT(*) FROM asistencias WHERE empleado_id = $1)
                    + (SELECT COUNT(*) FROM pagos WHERE empleado_id = $1)"#,
        )
        .bind(id)
        .fetch_one(pool)
        .await
    }

    pub async fn create(pool: &SqlitePool, data: &CreateEmpleado) -> Result<Self, sqlx::Error> {
        let id: i64 = sqlx::query_scalar(
            r#"INSERT INTO empleados (usuario_id, cargo, area, fecha_contratacion, tipo_contrato,
                                      sueldo_base, banco, numero_cuenta, tipo_cuenta, estado)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
               RETURNING id"#,
        )
        .bind(data.usuario_id)
        .bind(data.cargo.trim())
        .bind(&data.area)
        .bind(data.fecha_contratacion)
        .bind(&data.tipo_contrato)
        .bind(data.sueldo_base)
        .bind(&data.banco)
        .bind(&data.numero_cuenta)
        .bind(&data.tipo_cuenta)
        .bind(data.estado.unwrap_or_default())
        .fetch_one(pool)
        .await?;

        Self::find_by_id(pool, id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    pub async fn update(
        pool: &SqlitePool,
        id: i64,
        data: &CreateEmpleado,
    ) -> Result<Option<Self>, sqlx::Error> {
        let result = sqlx::query(
            r#"UPDATE empleados
               SET usuario_id = $2, cargo = $3, area = $4, fecha_contratacion = $5,
                   tipo_contrato = $6, sueldo_base = $7, banco = $8, numero_cuenta = $9,
                   tipo_cuenta = $10, estado = $11
               WHERE id = $1"#,
        )
        .bind(id)
        .bind(data.usuario_id)
        .bind(data.cargo.trim())
        .bind(&data.area)
        .bind(data.fecha_contratacion)
        .bind(&data.tipo_contrato)
        .bind(data.sueldo_base)
        .bind(&data.banco)
        .bind(&data.numero_cuenta)
        .bind(&data.tipo_cuenta)
        .bind(data.estado.unwrap_or_default())
        .execute(pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        Self::find_by_id(pool, id).await
    }

    pub async fn delete(pool: &SqlitePool, id: i64) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM empleados WHERE id = $1")
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
    async fn active_listing_requires_active_user_and_state() {
        let pool = test_support::pool().await;
        let a = test_support::empleado(&pool, "a@acme.pe", 1200.0).await;
        let b = test_support::empleado(&pool, "b@acme.pe", 1500.0).await;

        let empleado_b = Empleado::find_by_id(&pool, b).await.unwrap().unwrap();
        assert_eq!(empleado_b.nombre_completo, "Ana Quispe");
        assert_eq!(empleado_b.estado, EstadoEmpleado::Activo);

        sqlx::query("UPDATE empleados SET estado = 'VACACIONES' WHERE id = $1")
            .bind(b)
            .execute(&pool)
            .await
            .unwrap();

        let activos = Empleado::find_activos(&pool).await.unwrap();
        assert_eq!(activos.len(), 1);
        assert_eq!(activos[0].id, a);
        assert_eq!(Empleado::count_activos(&pool).await.unwrap(), 1);
        assert_eq!(Empleado::count_dependents(&pool, a).await.unwrap(), 0);
    }
}
