use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use sqlx::{FromRow, SqliteExecutor, SqlitePool};
use uuid::Uuid;

/// Server-side login session; the cookie carries only `id`.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Sesion {
    pub id: Uuid,
    pub usuario_id: i64,
    pub expira_en: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Sesion {
    pub async fn create(
        pool: &SqlitePool,
        usuario_id: i64,
        ttl: Duration,
    ) -> Result<Self, sqlx::Error> {
        let id = Uuid::new_v4();
        let expira_en = Utc::now() + ttl;
        sqlx::query_as::<_, Sesion>(
            r#"INSERT INTO sesiones (id, usuario_id, expira_en)
               VALUES ($1, $2, $3)
               RETURNING id, usuario_id, expira_en, created_at"#,
        )
        .bind(id)
        .bind(usuario_id)
        .bind(expira_en)
        .fetch_one(pool)
        .await
    }

    /// Session that exists and has not expired.
    pub async fn find_valid(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Sesion>(
            "SELECT id, usuario_id, expira_en, created_at FROM sesiones WHERE id = $1 AND expira_en > $2",
        )
        .bind(id)
        .bind(Utc::now())
        .fetch_optional(pool)
        .await
    }

    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM sesiones WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn delete_for_usuario<'e, E>(executor: E, usuario_id: i64) -> Result<u64, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let result = sqlx::query("DELETE FROM sesiones WHERE usuario_id = $1")
            .bind(usuario_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn purge_expired(pool: &SqlitePool) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM sesiones WHERE expira_en <= $1")
            .bind(Utc::now())
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}

/// One-time password recovery token, stored hashed.
pub struct RecuperacionClave;

impl RecuperacionClave {
    pub async fn create(
        pool: &SqlitePool,
        token_hash: &str,
        usuario_id: i64,
        ttl: Duration,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO recuperaciones_clave (token_hash, usuario_id, expira_en) VALUES ($1, $2, $3)",
        )
        .bind(token_hash)
        .bind(usuario_id)
        .bind(Utc::now() + ttl)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Marks a valid, unused token as used and returns its user. `None` when the token is
    /// unknown, expired or already spent.
    pub async fn consume(pool: &SqlitePool, token_hash: &str) -> Result<Option<i64>, sqlx::Error> {
        sqlx::query_scalar(
            r#"UPDATE recuperaciones_clave
               SET usado = 1
               WHERE token_hash = $1 AND usado = 0 AND expira_en > $2
               RETURNING usuario_id"#,
        )
        .bind(token_hash)
        .bind(Utc::now())
        .fetch_optional(pool)
        .await
    }

    pub async fn purge_expired(pool: &SqlitePool) -> Result<u64, sqlx::Error> {
        let result =
            sqlx::query("DELETE FROM recuperaciones_clave WHERE expira_en <= $1 OR usado = 1")
                .bind(Utc::now())
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
    async fn expired_sessions_are_invisible_and_purged() {
        let pool = test_support::pool().await;
        let usuario_id = test_support::usuario(&pool, "a@acme.pe").await;

        let viva = Sesion::create(&pool, usuario_id, Duration::hours(1)).await.unwrap();
        let vencida = Sesion::create(&pool, usuario_id, Duration::seconds(-5)).await.unwrap();

        assert!(Sesion::find_valid(&pool, viva.id).await.unwrap().is_some());
        assert!(Sesion::find_valid(&pool, vencida.id).await.unwrap().is_none());
        assert_eq!(Sesion::purge_expired(&pool).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn recovery_token_is_single_use() {
        let pool = test_support::pool().await;
        let usuario_id = test_support::usuario(&pool, "a@acme.pe").await;
        RecuperacionClave::create(&pool, "abc", usuario_id, Duration::minutes(30))
            .await
            .unwrap();

        assert_eq!(RecuperacionClave::consume(&pool, "abc").await.unwrap(), Some(usuario_id));
        assert_eq!(RecuperacionClave::consume(&pool, "abc").await.unwrap(), None);
    }
}
