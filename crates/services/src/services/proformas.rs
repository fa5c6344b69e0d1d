//! Price quotes: transactional create/update with server-side totals, approval and expiry.

use std::str::FromStr;

use chrono::{Datelike, Local};
use db::models::{
    cliente::Cliente,
    empresa::Empresa,
    producto::{Producto, UNIDAD_POR_DEFECTO},
    proforma::{
        CreateProforma, CreateProformaDetalle, DetalleRecord, EstadoProforma, Proforma,
        ProformaConDetalles, ProformaRecord,
    },
    usuario::Usuario,
};
use sqlx::{SqliteConnection, SqlitePool};
use thiserror::Error;
use tracing::{debug, info};
use utils::{
    money::{IGV_PERCENT, Totals, line_total},
    validation::non_blank,
};

pub const VALIDEZ_POR_DEFECTO: i64 = 10;

#[derive(Debug, Error)]
pub enum ProformaError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(&'static str),
    #[error("{0}")]
    Conflict(String),
}

/// Concurrent saves that pick the same code lose on the UNIQUE index.
fn codigo_en_uso(err: sqlx::Error) -> ProformaError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => ProformaError::Conflict(
            "El código de proforma ya está en uso, intente nuevamente".to_string(),
        ),
        _ => ProformaError::Database(err),
    }
}

/// States a quote can be saved with. CONVERTIDA comes from invoicing and VENCIDA
/// from expiry; a form that sends back the current state unchanged is accepted.
fn estado_editable(
    solicitado: Option<EstadoProforma>,
    actual: Option<EstadoProforma>,
) -> Result<EstadoProforma, ProformaError> {
    match solicitado {
        None => Ok(actual.unwrap_or_default()),
        Some(e @ (EstadoProforma::Pendiente | EstadoProforma::Aprobada | EstadoProforma::Rechazada)) => Ok(e),
        Some(e) if Some(e) == actual => Ok(e),
        Some(_) => Err(ProformaError::Validation("Estado no válido".to_string())),
    }
}

/// Keeps lines with a product, positive quantity and positive price.
pub fn lineas_validas(detalles: &[CreateProformaDetalle]) -> Vec<DetalleRecord> {
    detalles
        .iter()
        .filter_map(|d| {
            let producto_id = d.producto_id?;
            let cantidad = d.cantidad.filter(|c| *c > 0.0)?;
            let precio_unitario = d.precio_unitario.filter(|p| *p > 0.0)?;
            Some(DetalleRecord {
                producto_id,
                cantidad,
                unidad_medida: non_blank(d.unidad_medida.clone())
                    .unwrap_or_else(|| UNIDAD_POR_DEFECTO.to_string()),
                precio_unitario,
                total: line_total(cantidad, precio_unitario),
                descripcion_adicional: non_blank(d.descripcion_adicional.clone()),
            })
        })
        .collect()
}

/// First free `P{year}-{n:06}` code, starting after the year's existing count.
pub async fn siguiente_codigo(conn: &mut SqliteConnection, anio: i32) -> Result<String, sqlx::Error> {
    let mut n = Proforma::count_for_year(&mut *conn, anio).await? + 1;
    loop {
        let codigo = format!("P{anio}-{n:06}");
        if !Proforma::exists_codigo(&mut *conn, &codigo, None).await? {
            return Ok(codigo);
        }
        n += 1;
    }
}

pub struct ProformaService {
    pool: SqlitePool,
}

impl ProformaService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Marks overdue quotes as VENCIDA.
    pub async fn expire_overdue(&self) -> Result<u64, ProformaError> {
        let expired = Proforma::expire_overdue(&self.pool).await?;
        if expired > 0 {
            info!(expired, "Expired overdue proformas");
        }
        Ok(expired)
    }

    async fn with_detalles(&self, proforma: Proforma) -> Result<ProformaConDetalles, ProformaError> {
        let detalles = Proforma::find_detalles(&self.pool, proforma.id).await?;
        Ok(ProformaConDetalles { proforma, detalles })
    }

    pub async fn list(&self) -> Result<Vec<ProformaConDetalles>, ProformaError> {
        self.expire_overdue().await?;
        let mut out = Vec::new();
        for proforma in Proforma::find_all(&self.pool).await? {
            out.push(self.with_detalles(proforma).await?);
        }
        Ok(out)
    }

    pub async fn get(&self, id: i64) -> Result<ProformaConDetalles, ProformaError> {
        let proforma = Proforma::find_by_id(&self.pool, id)
            .await?
            .ok_or(ProformaError::NotFound("Proforma no encontrada"))?;
        self.with_detalles(proforma).await
    }

    /// An approved quote by code, ready to be invoiced.
    pub async fn get_aprobada_por_codigo(&self, codigo: &str) -> Result<ProformaConDetalles, ProformaError> {
        match Proforma::find_by_codigo(&self.pool, codigo).await? {
            Some(proforma) if proforma.estado == EstadoProforma::Aprobada => {
                self.with_detalles(proforma).await
            }
            _ => Err(ProformaError::NotFound("Proforma no encontrada o no aprobada")),
        }
    }

    async fn check_referencias(&self, usuario_id: i64, data: &CreateProforma) -> Result<(), ProformaError> {
        if Cliente::find_by_id(&self.pool, data.cliente_id).await?.is_none() {
            return Err(ProformaError::Validation("El cliente seleccionado no existe".to_string()));
        }
        if Empresa::find_by_id(&self.pool, data.empresa_id).await?.is_none() {
            return Err(ProformaError::Validation("La empresa seleccionada no existe".to_string()));
        }
        if Usuario::find_by_id(&self.pool, usuario_id).await?.is_none() {
            return Err(ProformaError::Validation("El usuario no existe".to_string()));
        }
        if data.validez_oferta.is_some_and(|v| v < 0) {
            return Err(ProformaError::Validation(
                "La validez de la oferta no puede ser negativa".to_string(),
            ));
        }
        if data.porcentaje_igv.is_some_and(|p| !(0.0..=100.0).contains(&p)) {
            return Err(ProformaError::Validation("Porcentaje de IGV no válido".to_string()));
        }
        Ok(())
    }

    fn record(
        usuario_id: i64,
        codigo: String,
        fecha_emision: chrono::NaiveDate,
        estado: EstadoProforma,
        data: &CreateProforma,
        lineas: &[DetalleRecord],
    ) -> ProformaRecord {
        let porcentaje_igv = data.porcentaje_igv.unwrap_or(IGV_PERCENT);
        let totals = Totals::from_line_totals(lineas.iter().map(|l| l.total), porcentaje_igv);
        ProformaRecord {
            codigo,
            usuario_id,
            cliente_id: data.cliente_id,
            empresa_id: data.empresa_id,
            fecha_emision,
            referencia: non_blank(data.referencia.clone()),
            validez_oferta: data.validez_oferta.unwrap_or(VALIDEZ_POR_DEFECTO),
            tiempo_entrega: non_blank(data.tiempo_entrega.clone()),
            lugar_entrega: non_blank(data.lugar_entrega.clone()),
            garantia: non_blank(data.garantia.clone()),
            forma_pago: non_blank(data.forma_pago.clone()),
            porcentaje_igv,
            sub_total: totals.sub_total,
            total_igv: totals.total_igv,
            total: totals.total,
            estado,
            observaciones: non_blank(data.observaciones.clone()),
        }
    }

    async fn insert_lineas(
        conn: &mut SqliteConnection,
        proforma_id: i64,
        lineas: &[DetalleRecord],
    ) -> Result<(), ProformaError> {
        for linea in lineas {
            if Producto::find_by_id(&mut *conn, linea.producto_id).await?.is_none() {
                return Err(ProformaError::Validation(format!(
                    "El producto {} no existe",
                    linea.producto_id
                )));
            }
            Proforma::insert_detalle(&mut *conn, proforma_id, linea).await?;
        }
        Ok(())
    }

    pub async fn create(&self, usuario_id: i64, data: &CreateProforma) -> Result<ProformaConDetalles, ProformaError> {
        self.check_referencias(usuario_id, data).await?;
        let estado = estado_editable(data.estado, None)?;
        let lineas = lineas_validas(&data.detalles);
        let fecha_emision = data.fecha_emision.unwrap_or_else(|| Local::now().date_naive());

        let mut tx = self.pool.begin().await?;
        let codigo = match non_blank(data.codigo.clone()) {
            Some(codigo) => {
                if Proforma::exists_codigo(&mut *tx, &codigo, None).await? {
                    return Err(ProformaError::Conflict("El código de proforma ya existe".to_string()));
                }
                codigo
            }
            None => siguiente_codigo(&mut tx, fecha_emision.year()).await?,
        };
        let record = Self::record(
            usuario_id,
            codigo,
            fecha_emision,
            estado,
            data,
            &lineas,
        );
        let id = Proforma::insert(&mut *tx, &record).await.map_err(codigo_en_uso)?;
        Self::insert_lineas(&mut tx, id, &lineas).await?;
        tx.commit().await?;

        info!(proforma_id = id, codigo = %record.codigo, total = record.total, lineas = lineas.len(), "Proforma created");
        self.get(id).await
    }

    /// Rewrites the header and replaces every line.
    pub async fn update(&self, id: i64, data: &CreateProforma) -> Result<ProformaConDetalles, ProformaError> {
        let actual = Proforma::find_by_id(&self.pool, id)
            .await?
            .ok_or(ProformaError::NotFound("Proforma no encontrada"))?;
        if actual.factura_id.is_some() {
            return Err(ProformaError::Conflict(
                "No se puede modificar una proforma que ya fue facturada".to_string(),
            ));
        }
        self.check_referencias(actual.usuario_id, data).await?;
        let estado = estado_editable(data.estado, Some(actual.estado))?;
        let lineas = lineas_validas(&data.detalles);

        let mut tx = self.pool.begin().await?;
        let codigo = match non_blank(data.codigo.clone()) {
            Some(codigo) => {
                if Proforma::exists_codigo(&mut *tx, &codigo, Some(id)).await? {
                    return Err(ProformaError::Conflict("El código de proforma ya existe".to_string()));
                }
                codigo
            }
            None => actual.codigo.clone(),
        };
        let record = Self::record(
            actual.usuario_id,
            codigo,
            data.fecha_emision.unwrap_or(actual.fecha_emision),
            estado,
            data,
            &lineas,
        );
        Proforma::update_header(&mut *tx, id, &record)
            .await
            .map_err(codigo_en_uso)?;
        let removed = Proforma::delete_detalles(&mut *tx, id).await?;
        Self::insert_lineas(&mut tx, id, &lineas).await?;
        tx.commit().await?;

        debug!(proforma_id = id, removed, added = lineas.len(), "Proforma lines replaced");
        self.get(id).await
    }

    pub async fn delete(&self, id: i64) -> Result<(), ProformaError> {
        let mut tx = self.pool.begin().await?;
        if Proforma::has_factura(&mut *tx, id).await? {
            return Err(ProformaError::Conflict(
                "No se puede eliminar la proforma porque tiene una factura asociada".to_string(),
            ));
        }
        Proforma::delete_detalles(&mut *tx, id).await?;
        if Proforma::delete(&mut *tx, id).await? == 0 {
            return Err(ProformaError::NotFound("Proforma no encontrada"));
        }
        tx.commit().await?;
        info!(proforma_id = id, "Proforma deleted");
        Ok(())
    }

    /// Status change from the approval screen. Only APROBADA, RECHAZADA and PENDIENTE are accepted.
    pub async fn cambiar_estado(&self, id: i64, estado: &str) -> Result<Proforma, ProformaError> {
        let estado = match EstadoProforma::from_str(estado.trim()) {
            Ok(
                e @ (EstadoProforma::Aprobada
                | EstadoProforma::Rechazada
                | EstadoProforma::Pendiente),
            ) => e,
            _ => return Err(ProformaError::Validation("Estado no válido".to_string())),
        };
        if Proforma::has_factura(&self.pool, id).await? {
            return Err(ProformaError::Conflict("La proforma ya fue facturada".to_string()));
        }
        if Proforma::set_estado(&self.pool, id, estado).await? == 0 {
            return Err(ProformaError::NotFound("Proforma no encontrada"));
        }
        info!(proforma_id = id, estado = %estado, "Proforma status changed");
        Proforma::find_by_id(&self.pool, id)
            .await?
            .ok_or(ProformaError::NotFound("Proforma no encontrada"))
    }
}
