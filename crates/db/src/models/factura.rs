use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqliteExecutor, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use utils::money::Totals;

#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, TS, EnumString, Display, Default,
)]
#[sqlx(type_name = "estado_factura", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum EstadoFactura {
    #[default]
    Pendiente,
    Pagada,
    Vencida,
    Anulada,
}

/// Whether an invoice line was copied from the source proforma or added afterwards.
#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, TS, EnumString, Display, Default,
)]
#[sqlx(type_name = "tipo_detalle", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum TipoDetalle {
    Original,
    #[default]
    Adicional,
}

const SELECT_FACTURA: &str = r#"SELECT
        f.id, f.codigo, f.proforma_id, f.usuario_id, f.cliente_id, f.empresa_id, f.fecha_emision,
        f.fecha_vencimiento, f.sub_total, f.total_igv, f.total, f.estado, f.forma_pago,
        f.observaciones, f.fecha_registro,
        c.razon_social AS cliente_razon_social, c.documento AS cliente_documento,
        u.nombres || ' ' || u.apellidos AS usuario_nombre,
        em.nombre AS empresa_nombre,
        p.codigo AS proforma_codigo
    FROM facturas f
    LEFT JOIN clientes c ON c.id = f.cliente_id
    LEFT JOIN usuarios u ON u.id = f.usuario_id
    LEFT JOIN empresas em ON em.id = f.empresa_id
    LEFT JOIN proformas p ON p.id = f.proforma_id"#;

const SELECT_DETALLE: &str = r#"SELECT
        d.id, d.factura_id, d.producto_id, pr.codigo AS producto_codigo, pr.nombre AS producto_nombre,
        d.cantidad, d.unidad_medida, d.precio_unitario, d.total, d.descripcion_adicional,
        d.tipo_detalle, d.proforma_detalle_id
    FROM factura_detalles d
    LEFT JOIN productos pr ON pr.id = d.producto_id"#;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Factura {
    pub id: i64,
    pub codigo: String,
    pub proforma_id: Option<i64>,
    pub usuario_id: i64,
    pub cliente_id: i64,
    pub empresa_id: i64,
    pub fecha_emision: NaiveDate,
    pub fecha_vencimiento: Option<NaiveDate>,
    pub sub_total: f64,
    pub total_igv: f64,
    pub total: f64,
    pub estado: EstadoFactura,
    pub forma_pago: Option<String>,
    pub observaciones: Option<String>,
    pub fecha_registro: DateTime<Utc>,
    pub cliente_razon_social: Option<String>,
    pub cliente_documento: Option<String>,
    pub usuario_nombre: Option<String>,
    pub empresa_nombre: Option<String>,
    pub proforma_codigo: Option<String>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct FacturaDetalle {
    pub id: i64,
    pub factura_id: i64,
    pub producto_id: i64,
    pub producto_codigo: Option<String>,
    pub producto_nombre: Option<String>,
    pub cantidad: f64,
    pub unidad_medida: String,
    pub precio_unitario: f64,
    pub total: f64,
    pub descripcion_adicional: Option<String>,
    pub tipo_detalle: TipoDetalle,
    pub proforma_detalle_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct FacturaConDetalles {
    #[serde(flatten)]
    #[ts(flatten)]
    pub factura: Factura,
    pub detalles: Vec<FacturaDetalle>,
}

impl std::ops::Deref for FacturaConDetalles {
    type Target = Factura;
    fn deref(&self) -> &Self::Target {
        &self.factura
    }
}

#[derive(Debug, Clone, Deserialize, TS)]
pub struct CreateFacturaDetalle {
    pub producto_id: i64,
    pub cantidad: f64,
    pub precio_unitario: Option<f64>,
    pub unidad_medida: Option<String>,
    pub descripcion_adicional: Option<String>,
}

#[derive(Debug, Clone, Deserialize, TS)]
pub struct CreateFactura {
    pub proforma_id: Option<i64>,
    pub cliente_id: i64,
    pub empresa_id: i64,
    pub fecha_emision: Option<NaiveDate>,
    pub fecha_vencimiento: Option<NaiveDate>,
    pub estado: Option<EstadoFactura>,
    pub forma_pago: Option<String>,
    pub observaciones: Option<String>,
    #[serde(default)]
    pub detalles: Vec<CreateFacturaDetalle>,
}

#[derive(Debug, Clone, Default, Deserialize, TS)]
pub struct FacturaDesdeProforma {
    pub fecha_emision: Option<NaiveDate>,
    pub fecha_vencimiento: Option<NaiveDate>,
    pub forma_pago: Option<String>,
    pub observaciones: Option<String>,
    #[serde(default)]
    pub productos_adicionales: Vec<CreateFacturaDetalle>,
}

#[derive(Debug, Clone, Deserialize, TS)]
pub struct ModificarDetalle {
    pub id: i64,
    pub cantidad: f64,
    pub precio_unitario: f64,
    pub descripcion_adicional: Option<String>,
}

/// Header edits plus line changes, applied in one transaction.
#[derive(Debug, Clone, Default, Deserialize, TS)]
pub struct UpdateFactura {
    pub fecha_emision: Option<NaiveDate>,
    pub fecha_vencimiento: Option<NaiveDate>,
    pub estado: Option<EstadoFactura>,
    pub forma_pago: Option<String>,
    pub observaciones: Option<String>,
    #[serde(default)]
    pub modificar: Vec<ModificarDetalle>,
    #[serde(default)]
    pub eliminar: Vec<i64>,
    #[serde(default)]
    pub agregar: Vec<CreateFacturaDetalle>,
}

#[derive(Debug, Clone, Deserialize, TS)]
pub struct AgregarProducto {
    pub producto_id: i64,
    pub cantidad: f64,
    pub precio_unitario: Option<f64>,
    pub descripcion_adicional: Option<String>,
}

#[derive(Debug, Clone, Deserialize, TS)]
pub struct CambiarEstadoFactura {
    pub estado: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FacturaRecord {
    pub codigo: String,
    pub proforma_id: Option<i64>,
    pub usuario_id: i64,
    pub cliente_id: i64,
    pub empresa_id: i64,
    pub fecha_emision: NaiveDate,
    pub fecha_vencimiento: Option<NaiveDate>,
    pub totals: Totals,
    pub estado: EstadoFactura,
    pub forma_pago: Option<String>,
    pub observaciones: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FacturaDetalleRecord {
    pub producto_id: i64,
    pub cantidad: f64,
    pub unidad_medida: String,
    pub precio_unitario: f64,
    pub total: f64,
    pub descripcion_adicional: Option<String>,
    pub tipo_detalle: TipoDetalle,
    pub proforma_detalle_id: Option<i64>,
}

#[derive(Debug, Clone, Default, FromRow, Serialize, Deserialize, TS)]
pub struct EstadisticasFacturas {
    pub total: i64,
    pub pendientes: i64,
    pub pagadas: i64,
    pub vencidas: i64,
    pub total_ventas: f64,
    pub ventas_este_mes: f64,
}

impl Factura {
    pub async fn find_all(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Factura>(&format!(
            "{SELECT_FACTURA} ORDER BY f.fecha_emision DESC, f.id DESC"
        ))
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_id<'e, E>(executor: E, id: i64) -> Result<Option<Self>, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query_as::<_, Factura>(&format!("{SELECT_FACTURA} WHERE f.id = $1"))
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Matches code, client name or client document. Newest first, at most 50.
    pub async fn search(pool: &SqlitePool, q: &str) -> Result<Vec<Self>, sqlx::Error> {
        let pattern = format!("%{}%", q.trim());
        sqlx::query_as::<_, Factura>(&format!(
            r#"{SELECT_FACTURA}
               WHERE f.codigo LIKE $1 OR c.razon_social LIKE $1 OR c.documento LIKE $1
               ORDER BY f.fecha_emision DESC, f.id DESC
               LIMIT 50"#
        ))
        .bind(pattern)
        .fetch_all(pool)
        .await
    }

    pub async fn find_detalles<'e, E>(
        executor: E,
        factura_id: i64,
    ) -> Result<Vec<FacturaDetalle>, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query_as::<_, FacturaDetalle>(&format!(
            "{SELECT_DETALLE} WHERE d.factura_id = $1 ORDER BY d.id"
        ))
        .bind(factura_id)
        .fetch_all(executor)
        .await
    }

    pub async fn find_detalle<'e, E>(
        executor: E,
        factura_id: i64,
        detalle_id: i64,
    ) -> Result<Option<FacturaDetalle>, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query_as::<_, FacturaDetalle>(&format!(
            "{SELECT_DETALLE} WHERE d.factura_id = $1 AND d.id = $2"
        ))
        .bind(factura_id)
        .bind(detalle_id)
        .fetch_optional(executor)
        .await
    }

    pub async fn exists_codigo<'e, E>(executor: E, codigo: &str) -> Result<bool, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM facturas WHERE codigo = $1")
            .bind(codigo)
            .fetch_one(executor)
            .await?;
        Ok(count > 0)
    }

    pub async fn count_registered_in_year<'e, E>(
        executor: E,
        anio: i32,
    ) -> Result<i64, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM facturas WHERE CAST(strftime('%Y', fecha_registro) AS INTEGER) = $1",
        )
        .bind(anio)
        .fetch_one(executor)
        .await
    }

    pub async fn insert<'e, E>(executor: E, record: &FacturaRecord) -> Result<i64, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query_scalar(
            r#"INSERT INTO facturas (codigo, proforma_id, usuario_id, cliente_id, empresa_id, fecha_emision,
                                     fecha_vencimiento, sub_total, total_igv, total, estado, forma_pago,
                                     observaciones)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
               RETURNING id"#,
        )
        .bind(&record.codigo)
        .bind(record.proforma_id)
        .bind(record.usuario_id)
        .bind(record.cliente_id)
        .bind(record.empresa_id)
        .bind(record.fecha_emision)
        .bind(record.fecha_vencimiento)
        .bind(record.totals.sub_total)
        .bind(record.totals.total_igv)
        .bind(record.totals.total)
        .bind(record.estado)
        .bind(&record.forma_pago)
        .bind(&record.observaciones)
        .fetch_one(executor)
        .await
    }

    /// Header fields editable after issue. Totals are handled by [`Factura::set_totals`].
    pub async fn update_header<'e, E>(
        executor: E,
        id: i64,
        fecha_emision: NaiveDate,
        fecha_vencimiento: Option<NaiveDate>,
        estado: EstadoFactura,
        forma_pago: Option<&str>,
        observaciones: Option<&str>,
    ) -> Result<u64, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let result = sqlx::query(
            r#"UPDATE facturas
               SET fecha_emision = $2, fecha_vencimiento = $3, estado = $4, forma_pago = $5,
                   observaciones = $6
               WHERE id = $1"#,
        )
        .bind(id)
        .bind(fecha_emision)
        .bind(fecha_vencimiento)
        .bind(estado)
        .bind(forma_pago)
        .bind(observaciones)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn set_estado<'e, E>(
        executor: E,
        id: i64,
        estado: EstadoFactura,
    ) -> Result<u64, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let result = sqlx::query("UPDATE facturas SET estado = $2 WHERE id = $1")
            .bind(id)
            .bind(estado)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn set_totals<'e, E>(executor: E, id: i64, totals: &Totals) -> Result<u64, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let result = sqlx::query(
            "UPDATE facturas SET sub_total = $2, total_igv = $3, total = $4 WHERE id = $1",
        )
        .bind(id)
        .bind(totals.sub_total)
        .bind(totals.total_igv)
        .bind(totals.total)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }

    /// Stored line amounts, used to recompute header totals.
    pub async fn line_totals<'e, E>(executor: E, factura_id: i64) -> Result<Vec<f64>, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query_scalar("SELECT total FROM factura_detalles WHERE factura_id = $1 ORDER BY id")
            .bind(factura_id)
            .fetch_all(executor)
            .await
    }

    pub async fn insert_detalle<'e, E>(
        executor: E,
        factura_id: i64,
        detalle: &FacturaDetalleRecord,
    ) -> Result<i64, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query_scalar(
            r#"INSERT INTO factura_detalles (factura_id, producto_id, cantidad, unidad_medida, precio_unitario,
                                             total, descripcion_adicional, tipo_detalle, proforma_detalle_id)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
               RETURNING id"#,
        )
        .bind(factura_id)
        .bind(detalle.producto_id)
        .bind(detalle.cantidad)
        .bind(&detalle.unidad_medida)
        .bind(detalle.precio_unitario)
        .bind(detalle.total)
        .bind(&detalle.descripcion_adicional)
        .bind(detalle.tipo_detalle)
        .bind(detalle.proforma_detalle_id)
        .fetch_one(executor)
        .await
    }

    pub async fn update_detalle<'e, E>(
        executor: E,
        factura_id: i64,
        cambio: &ModificarDetalle,
        total: f64,
    ) -> Result<u64, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let result = sqlx::query(
            r#"UPDATE factura_detalles
               SET cantidad = $3, precio_unitario = $4, total = $5,
                   descripcion_adicional = COALESCE($6, descripcion_adicional)
               WHERE factura_id = $1 AND id = $2"#,
        )
        .bind(factura_id)
        .bind(cambio.id)
        .bind(cambio.cantidad)
        .bind(cambio.precio_unitario)
        .bind(total)
        .bind(&cambio.descripcion_adicional)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn delete_detalle<'e, E>(
        executor: E,
        factura_id: i64,
        detalle_id: i64,
    ) -> Result<u64, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let result = sqlx::query("DELETE FROM factura_detalles WHERE factura_id = $1 AND id = $2")
            .bind(factura_id)
            .bind(detalle_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn delete_detalles<'e, E>(executor: E, factura_id: i64) -> Result<u64, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let result = sqlx::query("DELETE FROM factura_detalles WHERE factura_id = $1")
            .bind(factura_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn delete<'e, E>(executor: E, id: i64) -> Result<u64, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let result = sqlx::query("DELETE FROM facturas WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn count_contratos<'e, E>(executor: E, id: i64) -> Result<i64, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query_scalar("SELECT COUNT(*) FROM contratos WHERE factura_id = $1")
            .bind(id)
            .fetch_one(executor)
            .await
    }

    /// Detaches contracts from an invoice about to be deleted.
    pub async fn unlink_contratos<'e, E>(executor: E, id: i64) -> Result<u64, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let result = sqlx::query("UPDATE contratos SET factura_id = NULL WHERE factura_id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn estadisticas(pool: &SqlitePool) -> Result<EstadisticasFacturas, sqlx::Error> {
        sqlx::query_as::<_, EstadisticasFacturas>(
            r#"SELECT
                   COUNT(*) AS total,
                   COALESCE(SUM(CASE WHEN estado = 'PENDIENTE' THEN 1 ELSE 0 END), 0) AS pendientes,
                   COALESCE(SUM(CASE WHEN estado = 'PAGADA' THEN 1 ELSE 0 END), 0) AS pagadas,
                   COALESCE(SUM(CASE WHEN estado = 'PENDIENTE' AND fecha_vencimiento IS NOT NULL
                                          AND fecha_vencimiento < date('now', 'localtime')
                                     THEN 1 ELSE 0 END), 0) AS vencidas,
                   CAST(COALESCE(SUM(CASE WHEN estado = 'PAGADA' THEN total ELSE 0 END), 0) AS REAL) AS total_ventas,
                   CAST(COALESCE(SUM(CASE WHEN estado = 'PAGADA'
                                               AND strftime('%Y-%m', fecha_emision) = strftime('%Y-%m', 'now', 'localtime')
                                          THEN total ELSE 0 END), 0) AS REAL) AS ventas_este_mes
               FROM facturas"#,
        )
        .fetch_one(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Datelike, Local};

    use super::*;
    use crate::test_support::{self, date};

    async fn seed(pool: &SqlitePool, estado: EstadoFactura, total: f64) -> i64 {
        let usuario_id = test_support::usuario(pool, &format!("{total}@acme.pe")).await;
        let cliente_id = test_support::cliente(pool, "Minera Andes").await;
        let empresa_id = test_support::empresa(pool).await;
        let codigo = format!("F2025-{:06}", total as i64);
        Factura::insert(
            pool,
            &FacturaRecord {
                codigo,
                proforma_id: None,
                usuario_id,
                cliente_id,
                empresa_id,
                fecha_emision: Local::now().date_naive(),
                fecha_vencimiento: Some(date("2020-01-01")),
                totals: Totals {
                    sub_total: total,
                    total_igv: 0.0,
                    total,
                },
                estado,
                forma_pago: None,
                observaciones: None,
            },
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn statistics_split_by_state_and_overdue() {
        let pool = test_support::pool().await;
        seed(&pool, EstadoFactura::Pendiente, 100.0).await;
        seed(&pool, EstadoFactura::Pagada, 250.0).await;
        seed(&pool, EstadoFactura::Pagada, 50.0).await;

        let stats = Factura::estadisticas(&pool).await.unwrap();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.pendientes, 1);
        assert_eq!(stats.pagadas, 2);
        assert_eq!(stats.vencidas, 1);
        assert_eq!(stats.total_ventas, 300.0);
        assert_eq!(stats.ventas_este_mes, 300.0);
    }

    #[tokio::test]
    async fn line_edits_and_search() {
        let pool = test_support::pool().await;
        let id = seed(&pool, EstadoFactura::Pendiente, 100.0).await;
        let producto_id = test_support::producto(&pool, "CAB-01", 10.0).await;
        let detalle = Factura::insert_detalle(
            &pool,
            id,
            &FacturaDetalleRecord {
                producto_id,
                cantidad: 3.0,
                unidad_medida: "UNID".into(),
                precio_unitario: 10.0,
                total: 30.0,
                descripcion_adicional: Some("Cat 6".into()),
                tipo_detalle: TipoDetalle::Adicional,
                proforma_detalle_id: None,
            },
        )
        .await
        .unwrap();

        Factura::update_detalle(
            &pool,
            id,
            &ModificarDetalle {
                id: detalle,
                cantidad: 4.0,
                precio_unitario: 10.0,
                descripcion_adicional: None,
            },
            40.0,
        )
        .await
        .unwrap();
        let stored = Factura::find_detalle(&pool, id, detalle).await.unwrap().unwrap();
        assert_eq!(stored.total, 40.0);
        assert_eq!(stored.descripcion_adicional.as_deref(), Some("Cat 6"));
        assert_eq!(Factura::line_totals(&pool, id).await.unwrap(), vec![40.0]);

        assert_eq!(Factura::search(&pool, "minera").await.unwrap().len(), 1);
        assert_eq!(Factura::search(&pool, "F2025-000100").await.unwrap().len(), 1);
        assert!(Factura::search(&pool, "nada").await.unwrap().is_empty());
        assert_eq!(Factura::count_registered_in_year(&pool, Local::now().year()).await.unwrap(), 1);
    }
}
