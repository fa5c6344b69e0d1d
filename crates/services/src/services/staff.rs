use db::models::{
    empleado::{CreateEmpleado, Empleado},
    usuario::Usuario,
};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum StaffError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("{0}")]
    Validation(String),
    #[error("Empleado no encontrado")]
    NotFound,
    #[error("{0}")]
    Conflict(String),
}

pub struct StaffService {
    pool: SqlitePool,
}

impl StaffService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn list(&self) -> Result<Vec<Empleado>, StaffError> {
        Ok(Empleado::find_all(&self.pool).await?)
    }

    pub async fn get(&self, id: i64) -> Result<Empleado, StaffError> {
        Empleado::find_by_id(&self.pool, id)
            .await?
            .ok_or(StaffError::NotFound)
    }

    async fn check(&self, data: &CreateEmpleado, exclude_id: Option<i64>) -> Result<(), StaffError> {
        if data.cargo.trim().is_empty() {
            return Err(StaffError::Validation("El cargo es requerido".to_string()));
        }
        if data.sueldo_base < 0.0 {
            return Err(StaffError::Validation(
                "El sueldo base no puede ser negativo".to_string(),
            ));
        }
        if Usuario::find_by_id(&self.pool, data.usuario_id).await?.is_none() {
            return Err(StaffError::Validation(
                "El usuario seleccionado no existe".to_string(),
            ));
        }
        if Empleado::exists_for_usuario(&self.pool, data.usuario_id, exclude_id).await? {
            return Err(StaffError::Conflict(
                "El usuario ya está registrado como empleado".to_string(),
            ));
        }
        Ok(())
    }

    pub async fn create(&self, data: &CreateEmpleado) -> Result<Empleado, StaffError> {
        self.check(data, None).await?;
        let empleado = Empleado::create(&self.pool, data).await?;
        info!(empleado_id = empleado.id, usuario_id = empleado.usuario_id, "Employee created");
        Ok(empleado)
    }

    pub async fn update(&self, id: i64, data: &CreateEmpleado) -> Result<Empleado, StaffError> {
        self.check(data, Some(id)).await?;
        Empleado::update(&self.pool, id, data)
            .await?
            .ok_or(StaffError::NotFound)
    }

    /// Employees with attendance or payments are kept.
    pub async fn delete(&self, id: i64) -> Result<(), StaffError> {
        if Empleado::count_dependents(&self.pool, id).await? > 0 {
            return Err(StaffError::Conflict(
                "No se puede eliminar el empleado porque tiene asistencias o pagos registrados"
                    .to_string(),
            ));
        }
        if Empleado::delete(&self.pool, id).await? == 0 {
            return Err(StaffError::NotFound);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use db::DBService;

    use super::*;

    async fn usuario(pool: &SqlitePool, correo: &str) -> i64 {
        sqlx::query_scalar(
            "INSERT INTO usuarios (nombres, apellidos, numero_documento, correo, clave, rol_id)
             VALUES ('Jorge', 'Paredes', $1, $1, 'x', 3) RETURNING id",
        )
        .bind(correo)
        .fetch_one(pool)
        .await
        .unwrap()
    }

    fn nuevo(usuario_id: i64) -> CreateEmpleado {
        CreateEmpleado {
            usuario_id,
            cargo: "Técnico instalador".into(),
            area: Some("Operaciones".into()),
            fecha_contratacion: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            tipo_contrato: None,
            sueldo_base: 2400.0,
            banco: None,
            numero_cuenta: None,
            tipo_cuenta: None,
            estado: None,
        }
    }

    #[tokio::test]
    async fn one_employee_per_user() {
        let pool = DBService::new_in_memory().await.unwrap().pool;
        let staff = StaffService::new(pool.clone());
        let usuario_id = usuario(&pool, "jorge@acme.pe").await;

        let empleado = staff.create(&nuevo(usuario_id)).await.unwrap();
        assert_eq!(empleado.nombre_completo, "Jorge Paredes");
        assert!(matches!(
            staff.create(&nuevo(usuario_id)).await,
            Err(StaffError::Conflict(_))
        ));
        assert!(matches!(staff.create(&nuevo(999)).await, Err(StaffError::Validation(_))));

        let mut cambio = nuevo(usuario_id);
        cambio.sueldo_base = 2600.0;
        assert_eq!(staff.update(empleado.id, &cambio).await.unwrap().sueldo_base, 2600.0);
    }

    #[tokio::test]
    async fn delete_refuses_employees_with_attendance() {
        let pool = DBService::new_in_memory().await.unwrap().pool;
        let staff = StaffService::new(pool.clone());
        let empleado = staff.create(&nuevo(usuario(&pool, "jorge@acme.pe").await)).await.unwrap();
        sqlx::query("INSERT INTO asistencias (empleado_id, fecha) VALUES ($1, '2025-03-03')")
            .bind(empleado.id)
            .execute(&pool)
            .await
            .unwrap();

        assert!(matches!(staff.delete(empleado.id).await, Err(StaffError::Conflict(_))));

        let libre = staff.create(&nuevo(usuario(&pool, "otro@acme.pe").await)).await.unwrap();
        staff.delete(libre.id).await.unwrap();
        assert!(matches!(staff.get(libre.id).await, Err(StaffError::NotFound)));
    }
}
