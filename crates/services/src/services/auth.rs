//! Login sessions, password hashing and password recovery.

use chrono::{DateTime, Duration, Utc};
use db::models::{
    rol::Rol,
    sesion::{RecuperacionClave, Sesion},
    usuario::{CreateUsuario, Usuario},
};
use rand::{RngCore, rngs::OsRng};
use secrecy::ExposeSecret;
use serde::Serialize;
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;
use subtle::ConstantTimeEq;
use thiserror::Error;
use tracing::{debug, info, warn};
use ts_rs::TS;
use uuid::Uuid;

use super::config::AdminBootstrap;

const HASH_SCHEME: &str = "sha256";
const SALT_LEN: usize = 16;
pub const MIN_PASSWORD_LEN: usize = 6;
pub const RECOVERY_TTL_MINUTES: i64 = 30;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("{0}")]
    Validation(String),
    #[error("Correo o contraseña incorrectos.")]
    InvalidCredentials,
    #[error("Debe iniciar sesión para acceder a esta página")]
    Unauthorized,
    #[error("{0}")]
    NotFound(String),
}

/// `sha256$<salt hex>$<digest hex>` of a fresh random salt.
pub fn hash_password(clave: &str) -> String {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    format!("{HASH_SCHEME}${}${}", hex::encode(salt), hex::encode(digest(&salt, clave)))
}

pub fn verify_password(clave: &str, stored: &str) -> bool {
    let mut parts = stored.splitn(3, '$');
    let (Some(HASH_SCHEME), Some(salt), Some(expected)) = (parts.next(), parts.next(), parts.next())
    else {
        return false;
    };
    let (Ok(salt), Ok(expected)) = (hex::decode(salt), hex::decode(expected)) else {
        return false;
    };
    digest(&salt, clave).as_slice().ct_eq(&expected).into()
}

fn digest(salt: &[u8], clave: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(clave.as_bytes());
    hasher.finalize().to_vec()
}

fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// One-time token handed out by password recovery. Only its hash is stored.
#[derive(Debug, Clone, Serialize, TS)]
pub struct RecoveryToken {
    pub token: String,
    pub expira_en: DateTime<Utc>,
}

pub struct AuthService {
    pool: SqlitePool,
    session_ttl: Duration,
}

impl AuthService {
    pub fn new(pool: SqlitePool, session_ttl: Duration) -> Self {
        Self { pool, session_ttl }
    }

    pub async fn login(&self, correo: &str, clave: &str) -> Result<(Sesion, Usuario), AuthError> {
        let correo = correo.trim();
        if correo.is_empty() || clave.is_empty() {
            return Err(AuthError::Validation(
                "Por favor ingrese correo y contraseña".to_string(),
            ));
        }

        let Some(usuario) = Usuario::find_active_by_correo(&self.pool, correo).await? else {
            debug!(correo, "Login rejected: unknown or inactive user");
            return Err(AuthError::InvalidCredentials);
        };
        if !verify_password(clave, &usuario.clave) {
            warn!(usuario_id = usuario.id, "Login rejected: wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        let sesion = Sesion::create(&self.pool, usuario.id, self.session_ttl).await?;
        info!(usuario_id = usuario.id, "User logged in");
        Ok((sesion, usuario))
    }

    pub async fn logout(&self, sesion_id: Uuid) -> Result<(), AuthError> {
        Sesion::delete(&self.pool, sesion_id).await?;
        Ok(())
    }

    /// The active user behind a live session.
    pub async fn authenticate(&self, sesion_id: Uuid) -> Result<Usuario, AuthError> {
        let sesion = Sesion::find_valid(&self.pool, sesion_id)
            .await?
            .ok_or(AuthError::Unauthorized)?;
        match Usuario::find_by_id(&self.pool, sesion.usuario_id).await? {
            Some(usuario) if usuario.activo => Ok(usuario),
            _ => Err(AuthError::Unauthorized),
        }
    }

    pub async fn request_recovery(&self, correo: &str) -> Result<RecoveryToken, AuthError> {
        let correo = correo.trim();
        if correo.is_empty() {
            return Err(AuthError::Validation("El correo es requerido".to_string()));
        }
        let usuario = Usuario::find_active_by_correo(&self.pool, correo)
            .await?
            .ok_or_else(|| AuthError::NotFound("No existe un usuario con ese correo".to_string()))?;

        let mut raw = [0u8; 32];
        OsRng.fill_bytes(&mut raw);
        let token = hex::encode(raw);
        let ttl = Duration::minutes(RECOVERY_TTL_MINUTES);
        RecuperacionClave::create(&self.pool, &hash_token(&token), usuario.id, ttl).await?;
        info!(usuario_id = usuario.id, "Password recovery token issued");

        Ok(RecoveryToken {
            token,
            expira_en: Utc::now() + ttl,
        })
    }

    /// Sets a new password from a recovery token and closes the user's sessions.
    pub async fn reset_password(&self, token: &str, nueva_clave: &str) -> Result<(), AuthError> {
        if nueva_clave.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::Validation(format!(
                "La contraseña debe tener al menos {MIN_PASSWORD_LEN} caracteres"
            )));
        }
        let usuario_id = RecuperacionClave::consume(&self.pool, &hash_token(token.trim()))
            .await?
            .ok_or_else(|| {
                AuthError::Validation(
                    "El enlace de recuperación no es válido o ha expirado".to_string(),
                )
            })?;

        Usuario::update_clave(&self.pool, usuario_id, &hash_password(nueva_clave)).await?;
        let closed = Sesion::delete_for_usuario(&self.pool, usuario_id).await?;
        info!(usuario_id, sessions_closed = closed, "Password reset");
        Ok(())
    }

    /// Creates the administrator when the database has no users yet.
    pub async fn bootstrap_admin(
        &self,
        admin: &AdminBootstrap,
    ) -> Result<Option<Usuario>, AuthError> {
        if Usuario::count(&self.pool).await? > 0 {
            return Ok(None);
        }
        let rol = Rol::find_all(&self.pool)
            .await?
            .into_iter()
            .find(|r| r.descripcion == "ADMINISTRADOR")
            .ok_or_else(|| AuthError::NotFound("Rol ADMINISTRADOR no encontrado".to_string()))?;

        let data = CreateUsuario {
            nombres: "Administrador".to_string(),
            apellidos: "Sistema".to_string(),
            numero_documento: "00000000".to_string(),
            correo: admin.correo.clone(),
            clave: String::new(),
            rol_id: rol.id,
        };
        let usuario =
            Usuario::create(&self.pool, &data, &hash_password(admin.clave.expose_secret())).await?;
        info!(usuario_id = usuario.id, correo = %usuario.correo, "Bootstrap administrator created");
        Ok(Some(usuario))
    }
}
