use std::str::FromStr;

use chrono::{Datelike, Utc};
use db::models::{
    cliente::Cliente,
    contrato::{Contrato, ContratoRecord, CreateContrato, EstadisticasContratos, EstadoContrato},
    factura::Factura,
};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::info;
use utils::validation::non_blank;

#[derive(Debug, Error)]
pub enum ContratoError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(&'static str),
    #[error("{0}")]
    Conflict(String),
}

/// Two saves racing past the code check meet at the UNIQUE index.
fn codigo_en_uso(err: sqlx::Error) -> ContratoError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => ContratoError::Conflict(
            "El código de contrato ya existe. Por favor, use otro código".to_string(),
        ),
        _ => ContratoError::Database(err),
    }
}

pub struct ContractService {
    pool: SqlitePool,
}

impl ContractService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn list(&self) -> Result<Vec<Contrato>, ContratoError> {
        Ok(Contrato::find_all(&self.pool).await?)
    }

    pub async fn get(&self, id: i64) -> Result<Contrato, ContratoError> {
        Contrato::find_by_id(&self.pool, id)
            .await?
            .ok_or(ContratoError::NotFound("Contrato no encontrado"))
    }

    pub async fn activos(&self) -> Result<Vec<Contrato>, ContratoError> {
        Ok(Contrato::find_vigentes(&self.pool).await?)
    }

    pub async fn facturas_cliente(&self, cliente_id: i64) -> Result<Vec<Factura>, ContratoError> {
        Ok(Contrato::facturas_disponibles(&self.pool, cliente_id).await?)
    }

    pub async fn estadisticas(&self) -> Result<EstadisticasContratos, ContratoError> {
        Ok(Contrato::estadisticas(&self.pool).await?)
    }

    /// Next free `CONT-{year}-{n:04}` code.
    pub async fn generar_codigo(&self) -> Result<String, ContratoError> {
        let anio = Utc::now().year();
        let mut n = Contrato::count_registered_in_year(&self.pool, anio).await? + 1;
        loop {
            let codigo = format!("CONT-{anio}-{n:04}");
            if !Contrato::exists_codigo(&self.pool, &codigo, None).await? {
                return Ok(codigo);
            }
            n += 1;
        }
    }

    async fn validate(&self, data: &CreateContrato, id: Option<i64>) -> Result<ContratoRecord, ContratoError> {
        let codigo = data.codigo.trim();
        let (Some(cliente_id), Some(fecha_inicio)) = (data.cliente_id, data.fecha_inicio) else {
            return Err(ContratoError::Validation(
                "Todos los campos obligatorios deben ser completados".to_string(),
            ));
        };
        if codigo.is_empty() {
            return Err(ContratoError::Validation(
                "Todos los campos obligatorios deben ser completados".to_string(),
            ));
        }
        if data.fecha_fin.is_some_and(|fin| fin <= fecha_inicio) {
            return Err(ContratoError::Validation(
                "La fecha de fin debe ser posterior a la fecha de inicio".to_string(),
            ));
        }
        if data.pago_semanal.is_some_and(|p| p <= 0.0) {
            return Err(ContratoError::Validation(
                "El pago semanal debe ser un número positivo".to_string(),
            ));
        }
        if Cliente::find_by_id(&self.pool, cliente_id).await?.is_none() {
            return Err(ContratoError::Validation("El cliente seleccionado no existe".to_string()));
        }
        if let Some(factura_id) = data.factura_id {
            match Factura::find_by_id(&self.pool, factura_id).await? {
                Some(factura) if factura.cliente_id == cliente_id => {}
                Some(_) => {
                    return Err(ContratoError::Validation(
                        "La factura no pertenece al cliente seleccionado".to_string(),
                    ));
                }
                None => return Err(ContratoError::Validation("La factura no existe".to_string())),
            }
        }
        if Contrato::exists_codigo(&self.pool, codigo, id).await? {
            return Err(ContratoError::Conflict(
                "El código de contrato ya existe. Por favor, use otro código".to_string(),
            ));
        }

        Ok(ContratoRecord {
            codigo: codigo.to_string(),
            cliente_id,
            factura_id: data.factura_id,
            numero_cuenta_banco: non_blank(data.numero_cuenta_banco.clone()),
            fecha_inicio,
            fecha_fin: data.fecha_fin,
            pago_semanal: data.pago_semanal,
            estado: data.estado.unwrap_or_default(),
            terminos: non_blank(data.terminos.clone()),
        })
    }

    pub async fn create(&self, data: &CreateContrato) -> Result<Contrato, ContratoError> {
        let record = self.validate(data, None).await?;
        let contrato = Contrato::create(&self.pool, &record)
            .await
            .map_err(codigo_en_uso)?;
        info!(contrato_id = contrato.id, codigo = %contrato.codigo, "Contract created");
        Ok(contrato)
    }

    pub async fn update(&self, id: i64, data: &CreateContrato) -> Result<Contrato, ContratoError> {
        let record = self.validate(data, Some(id)).await?;
        Contrato::update(&self.pool, id, &record)
            .await
            .map_err(codigo_en_uso)?
            .ok_or(ContratoError::NotFound("Contrato no encontrado"))
    }

    pub async fn cambiar_estado(&self, id: i64, estado: &str) -> Result<Contrato, ContratoError> {
        let estado = EstadoContrato::from_str(estado.trim())
            .map_err(|_| ContratoError::Validation("Estado no válido".to_string()))?;
        if Contrato::set_estado(&self.pool, id, estado).await? == 0 {
            return Err(ContratoError::NotFound("Contrato no encontrado"));
        }
        info!(contrato_id = id, estado = %estado, "Contract status changed");
        self.get(id).await
    }

    pub async fn delete(&self, id: i64) -> Result<(), ContratoError> {
        if Contrato::delete(&self.pool, id).await? == 0 {
            return Err(ContratoError::NotFound("Contrato no encontrado"));
        }
        info!(contrato_id = id, "Contract deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::services::test_support;

    fn fecha(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    async fn setup() -> (SqlitePool, ContractService, CreateContrato) {
        let pool = test_support::pool().await;
        let cliente_id = test_support::cliente(&pool, "Condominio Las Flores").await;
        let data = CreateContrato {
            codigo: "  CONT-2025-0001 ".into(),
            cliente_id: Some(cliente_id),
            fecha_inicio: Some(fecha("2025-01-06")),
            pago_semanal: Some(350.0),
            ..Default::default()
        };
        (pool.clone(), ContractService::new(pool), data)
    }

    #[tokio::test]
    async fn create_trims_code_and_defaults_to_active() {
        let (_, service, data) = setup().await;
        let contrato = service.create(&data).await.unwrap();
        assert_eq!(contrato.codigo, "CONT-2025-0001");
        assert_eq!(contrato.estado, EstadoContrato::Activo);
        assert_eq!(contrato.cliente_razon_social.as_deref(), Some("Condominio Las Flores"));

        let err = service.create(&data).await.unwrap_err();
        assert!(matches!(err, ContratoError::Conflict(_)));
        service.update(contrato.id, &data).await.unwrap();
    }

    #[tokio::test]
    async fn code_taken_after_validation_is_a_conflict() {
        let (pool, service, data) = setup().await;
        let record = service.validate(&data, None).await.unwrap();
        service.create(&data).await.unwrap();

        let err = Contrato::create(&pool, &record).await.unwrap_err();
        assert!(matches!(codigo_en_uso(err), ContratoError::Conflict(_)));
    }

    #[tokio::test]
    async fn rejects_bad_dates_and_payments() {
        let (_, service, mut data) = setup().await;
        data.fecha_fin = Some(fecha("2025-01-06"));
        assert!(matches!(
            service.create(&data).await.unwrap_err(),
            ContratoError::Validation(_)
        ));

        data.fecha_fin = None;
        data.pago_semanal = Some(0.0);
        assert!(matches!(
            service.create(&data).await.unwrap_err(),
            ContratoError::Validation(_)
        ));

        data.pago_semanal = None;
        data.codigo = "   ".into();
        assert!(matches!(
            service.create(&data).await.unwrap_err(),
            ContratoError::Validation(_)
        ));
    }

    #[tokio::test]
    async fn linked_invoice_must_belong_to_client() {
        let (pool, service, mut data) = setup().await;
        let otro = test_support::cliente(&pool, "Otro Cliente").await;
        let usuario = test_support::usuario(&pool, "c@acme.pe").await;
        let empresa = test_support::empresa(&pool).await;
        let factura_id: i64 = sqlx::query_scalar(
            "INSERT INTO facturas (codigo, usuario_id, cliente_id, empresa_id, fecha_emision) VALUES ('F1', $1, $2, $3, '2025-01-02') RETURNING id",
        )
        .bind(usuario)
        .bind(otro)
        .bind(empresa)
        .fetch_one(&pool)
        .await
        .unwrap();

        data.factura_id = Some(factura_id);
        let err = service.create(&data).await.unwrap_err();
        assert_eq!(err.to_string(), "La factura no pertenece al cliente seleccionado");

        data.cliente_id = Some(otro);
        let contrato = service.create(&data).await.unwrap();
        assert_eq!(contrato.factura_codigo.as_deref(), Some("F1"));
        assert!(service.facturas_cliente(otro).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn generated_codes_and_status_changes() {
        let (_, service, mut data) = setup().await;
        let anio = Utc::now().year();
        let primero = service.generar_codigo().await.unwrap();
        assert_eq!(primero, format!("CONT-{anio}-0001"));

        data.codigo = primero;
        let contrato = service.create(&data).await.unwrap();
        assert_eq!(service.generar_codigo().await.unwrap(), format!("CONT-{anio}-0002"));

        assert!(matches!(
            service.cambiar_estado(contrato.id, "PAUSADO").await.unwrap_err(),
            ContratoError::Validation(_)
        ));
        let contrato = service.cambiar_estado(contrato.id, "FINALIZADO").await.unwrap();
        assert_eq!(contrato.estado, EstadoContrato::Finalizado);
        assert!(service.activos().await.unwrap().is_empty());

        service.delete(contrato.id).await.unwrap();
        assert!(matches!(
            service.delete(contrato.id).await.unwrap_err(),
            ContratoError::NotFound(_)
        ));
    }
}
