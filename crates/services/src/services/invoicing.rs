//! Invoices: direct or from an approved proforma, line edits, totals and the linked sale.

use std::str::FromStr;

use chrono::{Datelike, Local, Utc};
use db::models::{
    cliente::Cliente,
    empresa::Empresa,
    factura::{
        AgregarProducto, CreateFactura, CreateFacturaDetalle, EstadisticasFacturas, EstadoFactura,
        Factura, FacturaConDetalles, FacturaDesdeProforma, FacturaDetalleRecord, FacturaRecord,
        TipoDetalle, UpdateFactura,
    },
    producto::Producto,
    proforma::{EstadoProforma, Proforma, ProformaConDetalles},
    venta::Venta,
};
use serde::Serialize;
use sqlx::{SqliteConnection, SqlitePool};
use thiserror::Error;
use tracing::{debug, info};
use ts_rs::TS;
use utils::{
    money::{IGV_PERCENT, Totals, line_total},
    validation::non_blank,
};

use super::sales;

#[derive(Debug, Error)]
pub enum FacturaError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(&'static str),
    #[error("{0}")]
    Conflict(String),
}

/// What deleting an invoice touches. Deletion is always allowed.
#[derive(Debug, Clone, Serialize, TS)]
pub struct PuedeEliminar {
    pub puede_eliminar: bool,
    pub ventas: i64,
    pub contratos: i64,
    pub detalles: i64,
    pub message: String,
}

/// A concurrent invoice that took the same code loses on the UNIQUE index.
fn codigo_en_uso(err: sqlx::Error) -> FacturaError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => FacturaError::Conflict(
            "El código de factura ya está en uso, intente nuevamente".to_string(),
        ),
        _ => FacturaError::Database(err),
    }
}

/// First free `F{year}-{n:06}` code after the invoices registered that year.
pub async fn siguiente_codigo(conn: &mut SqliteConnection, anio: i32) -> Result<String, sqlx::Error> {
    let mut n = Factura::count_registered_in_year(&mut *conn, anio).await? + 1;
    loop {
        let codigo = format!("F{anio}-{n:06}");
        if !Factura::exists_codigo(&mut *conn, &codigo).await? {
            return Ok(codigo);
        }
        n += 1;
    }
}

/// Builds a line from a submitted product, defaulting price and unit from the catalog.
async fn linea(
    conn: &mut SqliteConnection,
    detalle: &CreateFacturaDetalle,
    tipo_detalle: TipoDetalle,
) -> Result<FacturaDetalleRecord, FacturaError> {
    if detalle.cantidad <= 0.0 {
        return Err(FacturaError::Validation("La cantidad debe ser mayor a 0".to_string()));
    }
    let producto = Producto::find_by_id(&mut *conn, detalle.producto_id)
        .await?
        .ok_or_else(|| {
            FacturaError::Validation(format!("El producto {} no existe", detalle.producto_id))
        })?;
    let precio_unitario = detalle.precio_unitario.unwrap_or(producto.precio_unitario);
    if precio_unitario < 0.0 {
        return Err(FacturaError::Validation(
            "El precio unitario no puede ser negativo".to_string(),
        ));
    }
    Ok(FacturaDetalleRecord {
        producto_id: producto.id,
        cantidad: detalle.cantidad,
        unidad_medida: non_blank(detalle.unidad_medida.clone()).unwrap_or(producto.unidad_medida),
        precio_unitario,
        total: line_total(detalle.cantidad, precio_unitario),
        descripcion_adicional: non_blank(detalle.descripcion_adicional.clone()),
        tipo_detalle,
        proforma_detalle_id: None,
    })
}

/// Recomputes header totals from the stored lines and returns the refreshed invoice.
async fn recalcular(conn: &mut SqliteConnection, id: i64) -> Result<Factura, FacturaError> {
    let totals = Totals::from_line_totals(Factura::line_totals(&mut *conn, id).await?, IGV_PERCENT);
    Factura::set_totals(&mut *conn, id, &totals).await?;
    Factura::find_by_id(&mut *conn, id)
        .await?
        .ok_or(FacturaError::NotFound("Factura no encontrada"))
}

/// A proforma that may still be invoiced.
async fn proforma_facturable(
    conn: &mut SqliteConnection,
    proforma_id: i64,
) -> Result<Proforma, FacturaError> {
    let proforma = Proforma::find_by_id(&mut *conn, proforma_id)
        .await?
        .ok_or(FacturaError::NotFound("Proforma no encontrada"))?;
    if Proforma::has_factura(&mut *conn, proforma_id).await? {
        return Err(FacturaError::Conflict("La proforma ya fue facturada".to_string()));
    }
    if proforma.estado != EstadoProforma::Aprobada {
        return Err(FacturaError::Validation(
            "Solo se pueden facturar proformas aprobadas".to_string(),
        ));
    }
    Ok(proforma)
}

pub struct InvoiceService {
    pool: SqlitePool,
}

impl InvoiceService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn list(&self) -> Result<Vec<Factura>, FacturaError> {
        Ok(Factura::find_all(&self.pool).await?)
    }

    pub async fn get(&self, id: i64) -> Result<FacturaConDetalles, FacturaError> {
        let factura = Factura::find_by_id(&self.pool, id)
            .await?
            .ok_or(FacturaError::NotFound("Factura no encontrada"))?;
        let detalles = Factura::find_detalles(&self.pool, id).await?;
        Ok(FacturaConDetalles { factura, detalles })
    }

    pub async fn search(&self, q: &str) -> Result<Vec<Factura>, FacturaError> {
        Ok(Factura::search(&self.pool, q).await?)
    }

    pub async fn estadisticas(&self) -> Result<EstadisticasFacturas, FacturaError> {
        Ok(Factura::estadisticas(&self.pool).await?)
    }

    /// An approved, not yet invoiced proforma by code, with its lines and totals.
    pub async fn buscar_proforma(&self, codigo: &str) -> Result<ProformaConDetalles, FacturaError> {
        let proforma = Proforma::find_by_codigo(&self.pool, codigo.trim())
            .await?
            .filter(|p| p.estado == EstadoProforma::Aprobada)
            .ok_or(FacturaError::NotFound("Proforma no encontrada o no aprobada"))?;
        if proforma.factura_id.is_some() {
            return Err(FacturaError::Conflict("La proforma ya fue facturada".to_string()));
        }
        let detalles = Proforma::find_detalles(&self.pool, proforma.id).await?;
        Ok(ProformaConDetalles { proforma, detalles })
    }

    async fn check_referencias(&self, cliente_id: i64, empresa_id: i64) -> Result<(), FacturaError> {
        if Cliente::find_by_id(&self.pool, cliente_id).await?.is_none() {
            return Err(FacturaError::Validation("El cliente seleccionado no existe".to_string()));
        }
        if Empresa::find_by_id(&self.pool, empresa_id).await?.is_none() {
            return Err(FacturaError::Validation("La empresa seleccionada no existe".to_string()));
        }
        Ok(())
    }

    /// Writes header and lines, marks the source proforma CONVERTIDA and records the sale.
    async fn emitir(
        conn: &mut SqliteConnection,
        mut record: FacturaRecord,
        lineas: &[FacturaDetalleRecord],
    ) -> Result<i64, FacturaError> {
        record.codigo = siguiente_codigo(&mut *conn, Utc::now().year()).await?;
        record.totals = Totals::from_line_totals(lineas.iter().map(|l| l.total), IGV_PERCENT);
        let id = Factura::insert(&mut *conn, &record).await.map_err(codigo_en_uso)?;
        for linea in lineas {
            Factura::insert_detalle(&mut *conn, id, linea).await?;
        }
        if let Some(proforma_id) = record.proforma_id {
            Proforma::set_estado(&mut *conn, proforma_id, EstadoProforma::Convertida).await?;
        }
        let factura = Factura::find_by_id(&mut *conn, id)
            .await?
            .ok_or(FacturaError::NotFound("Factura no encontrada"))?;
        sales::registrar(&mut *conn, &factura).await?;
        info!(
            factura_id = id,
            codigo = %factura.codigo,
            total = factura.total,
            lineas = lineas.len(),
            "Invoice issued"
        );
        Ok(id)
    }

    /// Direct invoice. With a proforma id the submitted lines count as the proforma's own.
    pub async fn create(&self, usuario_id: i64, data: &CreateFactura) -> Result<FacturaConDetalles, FacturaError> {
        self.check_referencias(data.cliente_id, data.empresa_id).await?;
        if data.detalles.is_empty() {
            return Err(FacturaError::Validation("Debe agregar al menos un producto".to_string()));
        }

        let mut tx = self.pool.begin().await?;
        let tipo_detalle = match data.proforma_id {
            Some(proforma_id) => {
                proforma_facturable(&mut tx, proforma_id).await?;
                TipoDetalle::Original
            }
            None => TipoDetalle::Adicional,
        };
        let mut lineas = Vec::with_capacity(data.detalles.len());
        for detalle in &data.detalles {
            lineas.push(linea(&mut tx, detalle, tipo_detalle).await?);
        }
        let record = FacturaRecord {
            codigo: String::new(),
            proforma_id: data.proforma_id,
            usuario_id,
            cliente_id: data.cliente_id,
            empresa_id: data.empresa_id,
            fecha_emision: data.fecha_emision.unwrap_or_else(|| Local::now().date_naive()),
            fecha_vencimiento: data.fecha_vencimiento,
            totals: Totals::from_line_totals(Vec::new(), IGV_PERCENT),
            estado: data.estado.unwrap_or_default(),
            forma_pago: non_blank(data.forma_pago.clone()),
            observaciones: non_blank(data.observaciones.clone()),
        };
        let id = Self::emitir(&mut tx, record, &lineas).await?;
        tx.commit().await?;
        self.get(id).await
    }

    /// Copies an approved proforma into a new invoice, plus optional extra lines.
    pub async fn desde_proforma(
        &self,
        usuario_id: i64,
        proforma_id: i64,
        data: &FacturaDesdeProforma,
    ) -> Result<FacturaConDetalles, FacturaError> {
        let mut tx = self.pool.begin().await?;
        let proforma = proforma_facturable(&mut tx, proforma_id).await?;

        let mut lineas: Vec<FacturaDetalleRecord> = Proforma::find_detalles(&mut *tx, proforma_id)
            .await?
            .into_iter()
            .map(|d| FacturaDetalleRecord {
                producto_id: d.producto_id,
                cantidad: d.cantidad,
                unidad_medida: d.unidad_medida,
                precio_unitario: d.precio_unitario,
                total: line_total(d.cantidad, d.precio_unitario),
                descripcion_adicional: d.descripcion_adicional,
                tipo_detalle: TipoDetalle::Original,
                proforma_detalle_id: Some(d.id),
            })
            .collect();
        for extra in &data.productos_adicionales {
            lineas.push(linea(&mut tx, extra, TipoDetalle::Adicional).await?);
        }

        let record = FacturaRecord {
            codigo: String::new(),
            proforma_id: Some(proforma_id),
            usuario_id,
            cliente_id: proforma.cliente_id,
            empresa_id: proforma.empresa_id,
            fecha_emision: data.fecha_emision.unwrap_or_else(|| Local::now().date_naive()),
            fecha_vencimiento: data.fecha_vencimiento,
            totals: Totals::from_line_totals(Vec::new(), IGV_PERCENT),
            estado: EstadoFactura::Pendiente,
            forma_pago: non_blank(data.forma_pago.clone()).or(proforma.forma_pago.clone()),
            observaciones: non_blank(data.observaciones.clone()).or(proforma.observaciones.clone()),
        };
        let id = Self::emitir(&mut tx, record, &lineas).await?;
        tx.commit().await?;
        debug!(factura_id = id, proforma_id, "Proforma converted");
        self.get(id).await
    }

    /// Header edits plus line changes. Lines copied from the proforma cannot be removed.
    pub async fn update(&self, id: i64, data: &UpdateFactura) -> Result<FacturaConDetalles, FacturaError> {
        let mut tx = self.pool.begin().await?;
        let actual = Factura::find_by_id(&mut *tx, id)
            .await?
            .ok_or(FacturaError::NotFound("Factura no encontrada"))?;

        for detalle_id in &data.eliminar {
            Self::quitar_linea(&mut tx, id, *detalle_id).await?;
        }
        for cambio in &data.modificar {
            if cambio.cantidad <= 0.0 {
                return Err(FacturaError::Validation("La cantidad debe ser mayor a 0".to_string()));
            }
            if cambio.precio_unitario < 0.0 {
                return Err(FacturaError::Validation(
                    "El precio unitario no puede ser negativo".to_string(),
                ));
            }
            let total = line_total(cambio.cantidad, cambio.precio_unitario);
            if Factura::update_detalle(&mut *tx, id, cambio, total).await? == 0 {
                return Err(FacturaError::NotFound("Detalle de factura no encontrado"));
            }
        }
        for nuevo in &data.agregar {
            let record = linea(&mut tx, nuevo, TipoDetalle::Adicional).await?;
            Factura::insert_detalle(&mut *tx, id, &record).await?;
        }

        Factura::update_header(
            &mut *tx,
            id,
            data.fecha_emision.unwrap_or(actual.fecha_emision),
            data.fecha_vencimiento.or(actual.fecha_vencimiento),
            data.estado.unwrap_or(actual.estado),
            non_blank(data.forma_pago.clone())
                .or(actual.forma_pago.clone())
                .as_deref(),
            non_blank(data.observaciones.clone())
                .or(actual.observaciones.clone())
                .as_deref(),
        )
        .await?;
        let factura = recalcular(&mut tx, id).await?;
        sales::sincronizar(&mut tx, actual.estado, &factura).await?;
        tx.commit().await?;

        info!(
            factura_id = id,
            modificados = data.modificar.len(),
            eliminados = data.eliminar.len(),
            agregados = data.agregar.len(),
            total = factura.total,
            "Invoice updated"
        );
        self.get(id).await
    }

    async fn quitar_linea(conn: &mut SqliteConnection, id: i64, detalle_id: i64) -> Result<(), FacturaError> {
        let detalle = Factura::find_detalle(&mut *conn, id, detalle_id)
            .await?
            .ok_or(FacturaError::NotFound("Detalle de factura no encontrado"))?;
        if detalle.tipo_detalle == TipoDetalle::Original {
            return Err(FacturaError::Validation(
                "No se pueden eliminar productos originales de la proforma".to_string(),
            ));
        }
        Factura::delete_detalle(&mut *conn, id, detalle_id).await?;
        Ok(())
    }

    pub async fn agregar_producto(&self, id: i64, data: &AgregarProducto) -> Result<FacturaConDetalles, FacturaError> {
        let mut tx = self.pool.begin().await?;
        let actual = Factura::find_by_id(&mut *tx, id)
            .await?
            .ok_or(FacturaError::NotFound("Factura no encontrada"))?;
        let detalle = CreateFacturaDetalle {
            producto_id: data.producto_id,
            cantidad: data.cantidad,
            precio_unitario: data.precio_unitario,
            unidad_medida: None,
            descripcion_adicional: data.descripcion_adicional.clone(),
        };
        let record = linea(&mut tx, &detalle, TipoDetalle::Adicional).await?;
        Factura::insert_detalle(&mut *tx, id, &record).await?;
        let factura = recalcular(&mut tx, id).await?;
        sales::sincronizar(&mut tx, actual.estado, &factura).await?;
        tx.commit().await?;
        debug!(factura_id = id, producto_id = data.producto_id, total = factura.total, "Invoice line added");
        self.get(id).await
    }

    pub async fn eliminar_producto(&self, id: i64, detalle_id: i64) -> Result<FacturaConDetalles, FacturaError> {
        let mut tx = self.pool.begin().await?;
        let actual = Factura::find_by_id(&mut *tx, id)
            .await?
            .ok_or(FacturaError::NotFound("Factura no encontrada"))?;
        Self::quitar_linea(&mut tx, id, detalle_id).await?;
        let factura = recalcular(&mut tx, id).await?;
        sales::sincronizar(&mut tx, actual.estado, &factura).await?;
        tx.commit().await?;
        debug!(factura_id = id, detalle_id, total = factura.total, "Invoice line removed");
        self.get(id).await
    }

    pub async fn puede_eliminar(&self, id: i64) -> Result<PuedeEliminar, FacturaError> {
        if Factura::find_by_id(&self.pool, id).await?.is_none() {
            return Err(FacturaError::NotFound("Factura no encontrada"));
        }
        let ventas = Venta::count_for_factura(&self.pool, id).await?;
        let contratos = Factura::count_contratos(&self.pool, id).await?;
        let detalles = Factura::find_detalles(&self.pool, id).await?.len() as i64;

        let mut afectados = Vec::new();
        if ventas > 0 {
            afectados.push(format!("{ventas} venta(s)"));
        }
        if contratos > 0 {
            afectados.push(format!("{contratos} contrato(s)"));
        }
        let message = if afectados.is_empty() {
            "La factura puede eliminarse sin afectar otros registros".to_string()
        } else {
            format!(
                "La factura tiene registros asociados que serán modificados: {}",
                afectados.join(", ")
            )
        };
        Ok(PuedeEliminar {
            puede_eliminar: true,
            ventas,
            contratos,
            detalles,
            message,
        })
    }

    /// Removes the invoice with its sale and lines, detaching contracts.
    /// A converted source proforma goes back to APROBADA.
    pub async fn delete(&self, id: i64) -> Result<PuedeEliminar, FacturaError> {
        let impacto = self.puede_eliminar(id).await?;

        let mut tx = self.pool.begin().await?;
        let factura = Factura::find_by_id(&mut *tx, id)
            .await?
            .ok_or(FacturaError::NotFound("Factura no encontrada"))?;
        Venta::delete_for_factura(&mut *tx, id).await?;
        Factura::unlink_contratos(&mut *tx, id).await?;
        Factura::delete_detalles(&mut *tx, id).await?;
        Factura::delete(&mut *tx, id).await?;
        if let Some(proforma_id) = factura.proforma_id {
            let convertida = Proforma::find_by_id(&mut *tx, proforma_id)
                .await?
                .is_some_and(|p| p.estado == EstadoProforma::Convertida);
            if convertida {
                Proforma::set_estado(&mut *tx, proforma_id, EstadoProforma::Aprobada).await?;
            }
        }
        tx.commit().await?;

        info!(factura_id = id, ventas = impacto.ventas, contratos = impacto.contratos, "Invoice deleted");
        Ok(impacto)
    }

    pub async fn cambiar_estado(&self, id: i64, estado: &str) -> Result<Factura, FacturaError> {
        let estado = EstadoFactura::from_str(estado.trim())
            .map_err(|_| FacturaError::Validation("Estado no válido".to_string()))?;

        let mut tx = self.pool.begin().await?;
        let actual = Factura::find_by_id(&mut *tx, id)
            .await?
            .ok_or(FacturaError::NotFound("Factura no encontrada"))?;
        Factura::set_estado(&mut *tx, id, estado).await?;
        let factura = Factura::find_by_id(&mut *tx, id)
            .await?
            .ok_or(FacturaError::NotFound("Factura no encontrada"))?;
        sales::sincronizar(&mut tx, actual.estado, &factura).await?;
        tx.commit().await?;

        info!(factura_id = id, anterior = %actual.estado, estado = %estado, "Invoice status changed");
        Ok(factura)
    }
}
