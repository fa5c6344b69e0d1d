//! User accounts and roles.

use db::models::{
    rol::{CreateRol, Rol},
    sesion::Sesion,
    usuario::{CreateUsuario, UpdateUsuario, Usuario},
};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::info;
use utils::validation::{is_blank, is_valid_email};

use super::auth::{MIN_PASSWORD_LEN, hash_password};

#[derive(Debug, Error)]
pub enum UserError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
}

fn usuario_no_encontrado() -> UserError {
    UserError::NotFound("Usuario no encontrado".to_string())
}

fn rol_no_encontrado() -> UserError {
    UserError::NotFound("Rol no encontrado".to_string())
}

fn check_password(clave: &str) -> Result<(), UserError> {
    if clave.chars().count() < MIN_PASSWORD_LEN {
        return Err(UserError::Validation(format!(
            "La contraseña debe tener al menos {MIN_PASSWORD_LEN} caracteres"
        )));
    }
    Ok(())
}

/// New password requested by an update, if any.
fn password_change(data: &UpdateUsuario) -> Result<Option<&str>, UserError> {
    let clave = data.clave.as_deref().filter(|c| !c.is_empty());
    let confirmar = data.confirmar_clave.as_deref().filter(|c| !c.is_empty());
    match (clave, confirmar) {
        (None, None) => Ok(None),
        (Some(clave), Some(confirmar)) => {
            if clave != confirmar {
                return Err(UserError::Validation(
                    "Las contraseñas no coinciden".to_string(),
                ));
            }
            check_password(clave)?;
            Ok(Some(clave))
        }
        _ => Err(UserError::Validation(
            "Debe ingresar la contraseña y su confirmación".to_string(),
        )),
    }
}

pub struct UserService {
    pool: SqlitePool,
}

impl UserService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn list(&self) -> Result<Vec<Usuario>, UserError> {
        Ok(Usuario::find_all(&self.pool).await?)
    }

    pub async fn get(&self, id: i64) -> Result<Usuario, UserError> {
        Usuario::find_by_id(&self.pool, id)
            .await?
            .ok_or_else(usuario_no_encontrado)
    }

    async fn check_identity(
        &self,
        fields: [(&str, &str); 4],
        numero_documento: &str,
        correo: &str,
        rol_id: i64,
        exclude_id: Option<i64>,
    ) -> Result<(), UserError> {
        if let Some((label, _)) = fields.iter().find(|(_, value)| is_blank(Some(*value))) {
            return Err(UserError::Validation(format!("El campo {label} es requerido")));
        }
        if !is_valid_email(correo.trim()) {
            return Err(UserError::Validation(
                "El formato del correo no es válido".to_string(),
            ));
        }
        if Usuario::exists_numero_documento(&self.pool, numero_documento.trim(), exclude_id).await? {
            return Err(UserError::Conflict(
                "Ya existe un usuario con ese número de documento".to_string(),
            ));
        }
        if Usuario::exists_correo(&self.pool, correo.trim(), exclude_id).await? {
            return Err(UserError::Conflict(
                "Ya existe un usuario con ese correo".to_string(),
            ));
        }
        if Rol::find_by_id(&self.pool, rol_id).await?.is_none() {
            return Err(UserError::Validation("El rol seleccionado no existe".to_string()));
        }
        Ok(())
    }

    pub async fn create(&self, data: &CreateUsuario) -> Result<Usuario, UserError> {
        self.check_identity(
            [
                ("nombres", data.nombres.as_str()),
                ("apellidos", data.apellidos.as_str()),
                ("numero_documento", data.numero_documento.as_str()),
                ("correo", data.correo.as_str()),
            ],
            &data.numero_documento,
            &data.correo,
            data.rol_id,
            None,
        )
        .await?;
        check_password(&data.clave)?;

        let usuario = Usuario::create(&self.pool, data, &hash_password(&data.clave)).await?;
        info!(usuario_id = usuario.id, "User created");
        Ok(usuario)
    }

    /// Header and optional password change. `current_user_id` is the caller,
    /// who cannot deactivate themself here either.
    pub async fn update(
        &self,
        id: i64,
        data: &UpdateUsuario,
        current_user_id: i64,
    ) -> Result<Usuario, UserError> {
        self.get(id).await?;
        if id == current_user_id && data.activo == Some(false) {
            return Err(UserError::Validation(
                "No puede desactivar su propio usuario".to_string(),
            ));
        }
        self.check_identity(
            [
                ("nombres", data.nombres.as_str()),
                ("apellidos", data.apellidos.as_str()),
                ("numero_documento", data.numero_documento.as_str()),
                ("correo", data.correo.as_str()),
            ],
            &data.numero_documento,
            &data.correo,
            data.rol_id,
            Some(id),
        )
        .await?;
        let nueva_clave = password_change(data)?;

        let mut tx = self.pool.begin().await?;
        if Usuario::update(&mut *tx, id, data).await? == 0 {
            return Err(usuario_no_encontrado());
        }
        if let Some(clave) = nueva_clave {
            Usuario::update_clave(&mut *tx, id, &hash_password(clave)).await?;
        }
        if data.activo == Some(false) {
            Sesion::delete_for_usuario(&mut *tx, id).await?;
        }
        tx.commit().await?;

        self.get(id).await
    }

    /// Soft delete. `current_user_id` is the caller, who cannot deactivate themself.
    pub async fn deactivate(&self, id: i64, current_user_id: i64) -> Result<(), UserError> {
        if id == current_user_id {
            return Err(UserError::Validation(
                "No puede desactivar su propio usuario".to_string(),
            ));
        }
        if Usuario::deactivate(&self.pool, id).await? == 0 {
            return Err(usuario_no_encontrado());
        }
        let sessions = Sesion::delete_for_usuario(&self.pool, id).await?;
        info!(usuario_id = id, sessions_closed = sessions, "User deactivated");
        Ok(())
    }

    pub async fn list_roles(&self) -> Result<Vec<Rol>, UserError> {
        Ok(Rol::find_all(&self.pool).await?)
    }

    pub async fn get_rol(&self, id: i64) -> Result<Rol, UserError> {
        Rol::find_by_id(&self.pool, id)
            .await?
            .ok_or_else(rol_no_encontrado)
    }

    async fn check_rol(&self, data: &CreateRol, exclude_id: Option<i64>) -> Result<String, UserError> {
        let descripcion = data.descripcion.trim();
        if descripcion.is_empty() {
            return Err(UserError::Validation("La descripción es requerida".to_string()));
        }
        if Rol::exists_descripcion(&self.pool, descripcion, exclude_id).await? {
            return Err(UserError::Conflict("Ya existe un rol con esa descripción".to_string()));
        }
        Ok(descripcion.to_string())
    }

    pub async fn create_rol(&self, data: &CreateRol) -> Result<Rol, UserError> {
        let descripcion = self.check_rol(data, None).await?;
        Ok(Rol::create(&self.pool, &descripcion).await?)
    }

    pub async fn update_rol(&self, id: i64, data: &CreateRol) -> Result<Rol, UserError> {
        let descripcion = self.check_rol(data, Some(id)).await?;
        Rol::update(&self.pool, id, &descripcion)
            .await?
            .ok_or_else(rol_no_encontrado)
    }

    pub async fn delete_rol(&self, id: i64) -> Result<(), UserError> {
        if Rol::count_usuarios(&self.pool, id).await? > 0 {
            return Err(UserError::Conflict(
                "No se puede eliminar el rol porque tiene usuarios asignados".to_string(),
            ));
        }
        if Rol::delete(&self.pool, id).await? == 0 {
            return Err(rol_no_encontrado());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use db::DBService;

    use super::*;

    async fn service() -> UserService {
        UserService::new(DBService::new_in_memory().await.unwrap().pool)
    }

    fn nuevo(correo: &str, documento: &str) -> CreateUsuario {
        CreateUsuario {
            nombres: "Rosa".into(),
            apellidos: "Huamán".into(),
            numero_documento: documento.into(),
            correo: correo.into(),
            clave: "secreto1".into(),
            rol_id: 2,
        }
    }

    fn cambio(usuario: &Usuario, clave: Option<&str>, confirmar: Option<&str>) -> UpdateUsuario {
        UpdateUsuario {
            nombres: usuario.nombres.clone(),
            apellidos: usuario.apellidos.clone(),
            numero_documento: usuario.numero_documento.clone(),
            correo: usuario.correo.clone(),
            rol_id: usuario.rol_id,
            activo: None,
            clave: clave.map(str::to_string),
            confirmar_clave: confirmar.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn create_validates_fields_and_uniqueness() {
        let users = service().await;
        let rosa = users.create(&nuevo("rosa@acme.pe", "40111222")).await.unwrap();
        assert_eq!(rosa.rol.as_deref(), Some("VENDEDOR"));
        assert!(rosa.clave.starts_with("sha256$"));

        assert!(matches!(
            users.create(&nuevo("rosa@acme.pe", "40999999")).await,
            Err(UserError::Conflict(_))
        ));
        assert!(matches!(
            users.create(&nuevo("otra@acme.pe", "40111222")).await,
            Err(UserError::Conflict(_))
        ));
        assert!(matches!(
            users.create(&nuevo("sin-dominio", "1")).await,
            Err(UserError::Validation(_))
        ));
        let mut corta = nuevo("corta@acme.pe", "2");
        corta.clave = "123".into();
        assert!(matches!(users.create(&corta).await, Err(UserError::Validation(_))));
        let mut sin_rol = nuevo("rol@acme.pe", "3");
        sin_rol.rol_id = 99;
        assert!(matches!(users.create(&sin_rol).await, Err(UserError::Validation(_))));
    }

    #[tokio::test]
    async fn password_change_requires_both_fields() {
        let users = service().await;
        let rosa = users.create(&nuevo("rosa@acme.pe", "40111222")).await.unwrap();

        assert!(matches!(
            users.update(rosa.id, &cambio(&rosa, Some("nueva123"), None), 1).await,
            Err(UserError::Validation(_))
        ));
        assert!(matches!(
            users.update(rosa.id, &cambio(&rosa, Some("nueva123"), Some("nueva124")), 1).await,
            Err(UserError::Validation(_))
        ));

        let kept = users.update(rosa.id, &cambio(&rosa, Some(""), Some("")), 1).await.unwrap();
        assert_eq!(kept.clave, rosa.clave);
        let changed = users
            .update(rosa.id, &cambio(&rosa, Some("nueva123"), Some("nueva123")), 1)
            .await
            .unwrap();
        assert_eq!(changed.id, rosa.id);
        let reloaded = users.get(rosa.id).await.unwrap();
        assert_ne!(reloaded.clave, rosa.clave);
    }

    #[tokio::test]
    async fn self_deactivation_and_role_in_use_are_refused() {
        let users = service().await;
        let rosa = users.create(&nuevo("rosa@acme.pe", "40111222")).await.unwrap();
        assert!(matches!(
            users.deactivate(rosa.id, rosa.id).await,
            Err(UserError::Validation(_))
        ));
        users.deactivate(rosa.id, 999).await.unwrap();
        assert!(!users.get(rosa.id).await.unwrap().activo);

        assert!(matches!(users.delete_rol(2).await, Err(UserError::Conflict(_))));
        let rol = users.create_rol(&CreateRol { descripcion: " SOPORTE ".into() }).await.unwrap();
        assert_eq!(rol.descripcion, "SOPORTE");
        assert!(matches!(
            users.create_rol(&CreateRol { descripcion: "SOPORTE".into() }).await,
            Err(UserError::Conflict(_))
        ));
        users.delete_rol(rol.id).await.unwrap();
        assert!(matches!(users.get_rol(rol.id).await, Err(UserError::NotFound(_))));
    }

    #[tokio::test]
    async fn update_cannot_deactivate_the_caller() {
        let users = service().await;
        let rosa = users.create(&nuevo("rosa@acme.pe", "40111222")).await.unwrap();
        let mut baja = cambio(&rosa, None, None);
        baja.activo = Some(false);

        assert!(matches!(
            users.update(rosa.id, &baja, rosa.id).await,
            Err(UserError::Validation(msg)) if msg == "No puede desactivar su propio usuario"
        ));
        assert!(users.get(rosa.id).await.unwrap().activo);

        let sesion = Sesion::create(&users.pool, rosa.id, chrono::Duration::hours(1))
            .await
            .unwrap();
        let desactivada = users.update(rosa.id, &baja, 1).await.unwrap();
        assert!(!desactivada.activo);
        assert!(Sesion::find_valid(&users.pool, sesion.id).await.unwrap().is_none());
    }
}
