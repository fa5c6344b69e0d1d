use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqlitePool};
use ts_rs::TS;

const SELECT_EMPRESA: &str = r#"SELECT id, nombre, ruc, direccion, telefono, celular, email,
        logo IS NOT NULL AS tiene_logo, texto_presentacion, cuenta_bancaria,
        nombre_cuenta_bancaria, activo, fecha_registro
    FROM empresas"#;

/// Company profile. The logo blob is served separately, see [`EmpresaLogo`].
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Empresa {
    pub id: i64,
    pub nombre: String,
    pub ruc: String,
    pub direccion: String,
    pub telefono: Option<String>,
    pub celular: Option<String>,
    pub email: Option<String>,
    pub tiene_logo: bool,
    pub texto_presentacion: Option<String>,
    pub cuenta_bancaria: Option<String>,
    pub nombre_cuenta_bancaria: Option<String>,
    pub activo: bool,
    pub fecha_registro: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct EmpresaLogo {
    pub logo: Vec<u8>,
    pub logo_tipo: String,
}

/// Uploaded image with its mime type.
#[derive(Debug, Clone)]
pub struct Logo {
    pub bytes: Vec<u8>,
    pub mime: String,
}

#[derive(Debug, Clone, Default, Deserialize, TS)]
pub struct CreateEmpresa {
    pub nombre: String,
    pub ruc: String,
    pub direccion: String,
    pub telefono: Option<String>,
    pub celular: Option<String>,
    pub email: Option<String>,
    pub texto_presentacion: Option<String>,
    pub cuenta_bancaria: Option<String>,
    pub nombre_cuenta_bancaria: Option<String>,
}

/// Partial update: `None` leaves the column untouched.
#[derive(Debug, Clone, Default, Deserialize, TS)]
pub struct UpdateEmpresa {
    pub nombre: Option<String>,
    pub ruc: Option<String>,
    pub direccion: Option<String>,
    pub telefono: Option<String>,
    pub celular: Option<String>,
    pub email: Option<String>,
    pub texto_presentacion: Option<String>,
    pub cuenta_bancaria: Option<String>,
    pub nombre_cuenta_bancaria: Option<String>,
    pub activo: Option<bool>,
}

impl UpdateEmpresa {
    fn text_fields(&self) -> [(&'static str, Option<&String>); 9] {
        [
            ("nombre", self.nombre.as_ref()),
            ("ruc", self.ruc.as_ref()),
            ("direccion", self.direccion.as_ref()),
            ("telefono", self.telefono.as_ref()),
            ("celular", self.celular.as_ref()),
            ("email", self.email.as_ref()),
            ("texto_presentacion", self.texto_presentacion.as_ref()),
            ("cuenta_bancaria", self.cuenta_bancaria.as_ref()),
            ("nombre_cuenta_bancaria", self.nombre_cuenta_bancaria.as_ref()),
        ]
    }

    pub fn is_empty(&self) -> bool {
        self.activo.is_none() && self.text_fields().iter().all(|(_, v)| v.is_none())
    }
}

impl Empresa {
    pub async fn find_all(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Empresa>(&format!("{SELECT_EMPRESA} ORDER BY nombre"))
            .fetch_all(pool)
            .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Empresa>(&format!("{SELECT_EMPRESA} WHERE id = $1"))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_logo(pool: &SqlitePool, id: i64) -> Result<Option<EmpresaLogo>, sqlx::Error> {
        sqlx::query_as::<_, EmpresaLogo>(
            "SELECT logo, logo_tipo FROM empresas WHERE id = $1 AND logo IS NOT NULL AND logo_tipo IS NOT NULL",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn create(
        pool: &SqlitePool,
        data: &CreateEmpresa,
        logo: Option<&Logo>,
    ) -> Result<Self, sqlx::Error> {
        let id: i64 = sqlx::query_scalar(
            r#"INSERT INTO empresas (nombre, ruc, direccion, telefono, celular, email, logo, logo_tipo,
                                     texto_presentacion, cuenta_bancaria, nombre_cuenta_bancaria)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
               RETURNING id"#,
        )
        .bind(data.nombre.trim())
        .bind(data.ruc.trim())
        .bind(data.direccion.trim())
        .bind(&data.telefono)
        .bind(&data.celular)
        .bind(&data.email)
        .bind(logo.map(|l| l.bytes.as_slice()))
        .bind(logo.map(|l| l.mime.as_str()))
        .bind(&data.texto_presentacion)
        .bind(&data.cuenta_bancaria)
        .bind(&data.nombre_cuenta_bancaria)
        .fetch_one(pool)
        .await?;

        Self::find_by_id(pool, id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    /// Applies only the provided fields; the logo is replaced only when a new one is given.
    pub async fn update(
        pool: &SqlitePool,
        id: i64,
        data: &UpdateEmpresa,
        logo: Option<&Logo>,
    ) -> Result<Option<Self>, sqlx::Error> {
        if data.is_empty() && logo.is_none() {
            return Self::find_by_id(pool, id).await;
        }

        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE empresas SET ");
        let mut set = builder.separated(", ");
        for (column, value) in data.text_fields() {
            if let Some(value) = value {
                set.push(format!("{column} = "));
                set.push_bind_unseparated(value.trim().to_string());
            }
        }
        if let Some(activo) = data.activo {
            set.push("activo = ");
            set.push_bind_unseparated(activo);
        }
        if let Some(logo) = logo {
            set.push("logo = ");
            set.push_bind_unseparated(logo.bytes.clone());
            set.push("logo_tipo = ");
            set.push_bind_unseparated(logo.mime.clone());
        }
        builder.push(" WHERE id = ");
        builder.push_bind(id);

        let result = builder.build().execute(pool).await?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }
        Self::find_by_id(pool, id).await
    }

    pub async fn delete(pool: &SqlitePool, id: i64) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM empresas WHERE id = $1")
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

    fn png() -> Logo {
        Logo {
            bytes: vec![0x89, b'P', b'N', b'G'],
            mime: "image/png".into(),
        }
    }

    #[tokio::test]
    async fn partial_update_keeps_logo_and_untouched_fields() {
        let pool = test_support::pool().await;
        let empresa = Empresa::create(
            &pool,
            &CreateEmpresa {
                nombre: "Acme".into(),
                ruc: "20100000001".into(),
                direccion: "Av. Lima 123".into(),
                telefono: Some("014445555".into()),
                ..Default::default()
            },
            Some(&png()),
        )
        .await
        .unwrap();
        assert!(empresa.tiene_logo);

        let updated = Empresa::update(
            &pool,
            empresa.id,
            &UpdateEmpresa {
                nombre: Some("Acme Perú".into()),
                ..Default::default()
            },
            None,
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(updated.nombre, "Acme Perú");
        assert_eq!(updated.telefono.as_deref(), Some("014445555"));
        assert!(updated.tiene_logo);

        let logo = Empresa::find_logo(&pool, empresa.id).await.unwrap().unwrap();
        assert_eq!(logo.logo_tipo, "image/png");
        assert_eq!(logo.logo.len(), 4);
    }

    #[test]
    fn empty_update_detected() {
        assert!(UpdateEmpresa::default().is_empty());
        assert!(!UpdateEmpresa {
            activo: Some(false),
            ..Default::default()
        }
        .is_empty());
    }
}
