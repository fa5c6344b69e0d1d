use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqliteExecutor, SqlitePool};
use ts_rs::TS;

const SELECT_USUARIO: &str = r#"SELECT
        u.id, u.nombres, u.apellidos, u.numero_documento, u.correo, u.clave,
        u.rol_id, r.descripcion AS rol, u.activo, u.fecha_registro
    FROM usuarios u
    LEFT JOIN roles r ON r.id = u.rol_id"#;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Usuario {
    pub id: i64,
    pub nombres: String,
    pub apellidos: String,
    pub numero_documento: String,
    pub correo: String,
    /// Salted hash; never leaves the server.
    #[serde(skip_serializing, default)]
    #[ts(skip)]
    pub clave: String,
    pub rol_id: i64,
    pub rol: Option<String>,
    pub activo: bool,
    pub fecha_registro: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, TS)]
pub struct CreateUsuario {
    pub nombres: String,
    pub apellidos: String,
    pub numero_documento: String,
    pub correo: String,
    pub clave: String,
    pub rol_id: i64,
}

#[derive(Debug, Clone, Deserialize, TS)]
pub struct UpdateUsuario {
    pub nombres: String,
    pub apellidos: String,
    pub numero_documento: String,
    pub correo: String,
    pub rol_id: i64,
    pub activo: Option<bool>,
    pub clave: Option<String>,
    pub confirmar_clave: Option<String>,
}

impl Usuario {
    pub fn nombre_completo(&self) -> String {
        format!("{} {}", self.nombres, self.apellidos)
    }

    pub async fn find_all(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Usuario>(&format!("{SELECT_USUARIO} ORDER BY u.fecha_registro DESC"))
            .fetch_all(pool)
            .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Usuario>(&format!("{SELECT_USUARIO} WHERE u.id = $1"))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Active user with this email, as used by login and password recovery.
    pub async fn find_active_by_correo(
        pool: &SqlitePool,
        correo: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Usuario>(&format!(
            "{SELECT_USUARIO} WHERE u.correo = $1 AND u.activo = 1"
        ))
        .bind(correo)
        .fetch_optional(pool)
        .await
    }

    pub async fn exists_numero_documento(
        pool: &SqlitePool,
        numero_documento: &str,
        exclude_id: Option<i64>,
    ) -> Result<bool, sqlx::Error> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM usuarios WHERE numero_documento = $1 AND ($2 IS NULL OR id != $2)",
        )
        .bind(numero_documento)
        .bind(exclude_id)
        .fetch_one(pool)
        .await?;
        Ok(count > 0)
    }

    pub async fn exists_correo(
        pool: &SqlitePool,
        correo: &str,
        exclude_id: Option<i64>,
    ) -> Result<bool, sqlx::Error> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM usuarios WHERE correo = $1 AND ($2 IS NULL OR id != $2)",
        )
        .bind(correo)
        .bind(exclude_id)
        .fetch_one(pool)
        .await?;
        Ok(count > 0)
    }

    pub async fn count(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM usuarios")
            .fetch_one(pool)
            .await
    }

    /// `clave_hash` must already be hashed.
    pub async fn create(
        pool: &SqlitePool,
        data: &CreateUsuario,
        clave_hash: &str,
    ) -> Result<Self, sqlx::Error> {
        let id: i64 = sqlx::query_scalar(
            r#"INSERT INTO usuarios (nombres, apellidos, numero_documento, correo, clave, rol_id)
               VALUES ($1, $2, $3, $4, $5, $6)
               RETURNING id"#,
        )
        .bind(data.nombres.trim())
        .bind(data.apellidos.trim())
        .bind(data.numero_documento.trim())
        .bind(data.correo.trim())
        .bind(clave_hash)
        .bind(data.rol_id)
        .fetch_one(pool)
        .await?;

        Self::find_by_id(pool, id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    /// Header update; the stored password is left alone.
    pub async fn update<'e, E>(executor: E, id: i64, data: &UpdateUsuario) -> Result<u64, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let result = sqlx::query(
            r#"UPDATE usuarios
               SET nombres = $2, apellidos = $3, numero_documento = $4, correo = $5,
                   rol_id = $6, activo = COALESCE($7, activo)
               WHERE id = $1"#,
        )
        .bind(id)
        .bind(data.nombres.trim())
        .bind(data.apellidos.trim())
        .bind(data.numero_documento.trim())
        .bind(data.correo.trim())
        .bind(data.rol_id)
        .bind(data.activo)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn update_clave<'e, E>(executor: E, id: i64, clave_hash: &str) -> Result<u64, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let result = sqlx::query("UPDATE usuarios SET clave = $2 WHERE id = $1")
            .bind(id)
            .bind(clave_hash)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    /// Soft delete.
    pub async fn deactivate(pool: &SqlitePool, id: i64) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("UPDATE usuarios SET activo = 0 WHERE id = $1")
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

    fn nuevo(correo: &str, documento: &str) -> CreateUsuario {
        CreateUsuario {
            nombres: "Luis".into(),
            apellidos: "Ramos".into(),
            numero_documento: documento.into(),
            correo: correo.into(),
            clave: "secreto".into(),
            rol_id: 1,
        }
    }

    #[tokio::test]
    async fn create_joins_role_and_hides_password() {
        let pool = test_support::pool().await;
        let usuario = Usuario::create(&pool, &nuevo("luis@acme.pe", "4455"), "hash")
            .await
            .unwrap();
        assert_eq!(usuario.rol.as_deref(), Some("ADMINISTRADOR"));
        assert!(usuario.activo);

        let json = serde_json::to_value(&usuario).unwrap();
        assert!(json.get("clave").is_none());
    }

    #[tokio::test]
    async fn deactivated_users_cannot_be_found_for_login() {
        let pool = test_support::pool().await;
        let usuario = Usuario::create(&pool, &nuevo("luis@acme.pe", "4455"), "hash")
            .await
            .unwrap();
        assert!(Usuario::find_active_by_correo(&pool, "luis@acme.pe").await.unwrap().is_some());

        Usuario::deactivate(&pool, usuario.id).await.unwrap();
        assert!(Usuario::find_active_by_correo(&pool, "luis@acme.pe").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn uniqueness_checks_exclude_self() {
        let pool = test_support::pool().await;
        let usuario = Usuario::create(&pool, &nuevo("luis@acme.pe", "4455"), "hash")
            .await
            .unwrap();
        assert!(Usuario::exists_correo(&pool, "luis@acme.pe", None).await.unwrap());
        assert!(!Usuario::exists_correo(&pool, "luis@acme.pe", Some(usuario.id)).await.unwrap());
        assert!(Usuario::exists_numero_documento(&pool, "4455", None).await.unwrap());
    }
}
