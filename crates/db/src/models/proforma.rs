use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqliteExecutor, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;

#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, TS, EnumString, Display, Default,
)]
#[sqlx(type_name = "estado_proforma", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum EstadoProforma {
    #[default]
    Pendiente,
    Aprobada,
    Rechazada,
    Vencida,
    Convertida,
}

impl EstadoProforma {
    /// States that still age out once the validity window passes.
    pub fn can_expire(self) -> bool {
        matches!(self, EstadoProforma::Pendiente | EstadoProforma::Aprobada)
    }
}

// `estado_visual` and `dias_transcurridos` are computed against the local calendar day.
const SELECT_PROFORMA: &str = r#"SELECT
        p.id, p.codigo, p.usuario_id, p.cliente_id, p.empresa_id, p.fecha_emision, p.referencia,
        p.validez_oferta, p.tiempo_entrega, p.lugar_entrega, p.garantia, p.forma_pago,
        p.porcentaje_igv, p.sub_total, p.total_igv, p.total, p.estado, p.observaciones,
        p.fecha_registro,
        CAST(julianday(date('now', 'localtime')) - julianday(p.fecha_emision) AS INTEGER) AS dias_transcurridos,
        CASE
            WHEN p.estado IN ('PENDIENTE', 'APROBADA')
                 AND julianday(date('now', 'localtime')) - julianday(p.fecha_emision) > p.validez_oferta
            THEN 'VENCIDA'
            ELSE p.estado
        END AS estado_visual,
        c.razon_social AS cliente_razon_social, c.documento AS cliente_documento,
        u.nombres || ' ' || u.apellidos AS usuario_nombre,
        em.nombre AS empresa_nombre,
        (SELECT f.id FROM facturas f WHERE f.proforma_id = p.id ORDER BY f.id DESC LIMIT 1) AS factura_id,
        (SELECT f.codigo FROM facturas f WHERE f.proforma_id = p.id ORDER BY f.id DESC LIMIT 1) AS factura_codigo,
        (SELECT f.estado FROM facturas f WHERE f.proforma_id = p.id ORDER BY f.id DESC LIMIT 1) AS factura_estado
    FROM proformas p
    LEFT JOIN clientes c ON c.id = p.cliente_id
    LEFT JOIN usuarios u ON u.id = p.usuario_id
    LEFT JOIN empresas em ON em.id = p.empresa_id"#;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Proforma {
    pub id: i64,
    pub codigo: String,
    pub usuario_id: i64,
    pub cliente_id: i64,
    pub empresa_id: i64,
    pub fecha_emision: NaiveDate,
    pub referencia: Option<String>,
    /// Validity window in days.
    pub validez_oferta: i64,
    pub tiempo_entrega: Option<String>,
    pub lugar_entrega: Option<String>,
    pub garantia: Option<String>,
    pub forma_pago: Option<String>,
    pub porcentaje_igv: f64,
    pub sub_total: f64,
    pub total_igv: f64,
    pub total: f64,
    pub estado: EstadoProforma,
    pub observaciones: Option<String>,
    pub fecha_registro: DateTime<Utc>,
    pub dias_transcurridos: i64,
    pub estado_visual: EstadoProforma,
    pub cliente_razon_social: Option<String>,
    pub cliente_documento: Option<String>,
    pub usuario_nombre: Option<String>,
    pub empresa_nombre: Option<String>,
    pub factura_id: Option<i64>,
    pub factura_codigo: Option<String>,
    pub factura_estado: Option<String>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct ProformaDetalle {
    pub id: i64,
    pub proforma_id: i64,
    pub producto_id: i64,
    pub producto_codigo: Option<String>,
    pub producto_nombre: Option<String>,
    pub cantidad: f64,
    pub unidad_medida: String,
    pub precio_unitario: f64,
    pub total: f64,
    pub descripcion_adicional: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct ProformaConDetalles {
    #[serde(flatten)]
    #[ts(flatten)]
    pub proforma: Proforma,
    pub detalles: Vec<ProformaDetalle>,
}

impl std::ops::Deref for ProformaConDetalles {
    type Target = Proforma;
    fn deref(&self) -> &Self::Target {
        &self.proforma
    }
}

/// Line as submitted. Incomplete lines are dropped before saving.
#[derive(Debug, Clone, Default, Deserialize, TS)]
pub struct CreateProformaDetalle {
    pub producto_id: Option<i64>,
    pub cantidad: Option<f64>,
    pub unidad_medida: Option<String>,
    pub precio_unitario: Option<f64>,
    pub descripcion_adicional: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, TS)]
pub struct CreateProforma {
    pub codigo: Option<String>,
    pub cliente_id: i64,
    pub empresa_id: i64,
    pub fecha_emision: Option<NaiveDate>,
    pub referencia: Option<String>,
    pub validez_oferta: Option<i64>,
    pub tiempo_entrega: Option<String>,
    pub lugar_entrega: Option<String>,
    pub garantia: Option<String>,
    pub forma_pago: Option<String>,
    pub porcentaje_igv: Option<f64>,
    pub estado: Option<EstadoProforma>,
    pub observaciones: Option<String>,
    #[serde(default)]
    pub detalles: Vec<CreateProformaDetalle>,
}

/// Header values ready to be written, totals included.
#[derive(Debug, Clone, PartialEq)]
pub struct ProformaRecord {
    pub codigo: String,
    pub usuario_id: i64,
    pub cliente_id: i64,
    pub empresa_id: i64,
    pub fecha_emision: NaiveDate,
    pub referencia: Option<String>,
    pub validez_oferta: i64,
    pub tiempo_entrega: Option<String>,
    pub lugar_entrega: Option<String>,
    pub garantia: Option<String>,
    pub forma_pago: Option<String>,
    pub porcentaje_igv: f64,
    pub sub_total: f64,
    pub total_igv: f64,
    pub total: f64,
    pub estado: EstadoProforma,
    pub observaciones: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetalleRecord {
    pub producto_id: i64,
    pub cantidad: f64,
    pub unidad_medida: String,
    pub precio_unitario: f64,
    pub total: f64,
    pub descripcion_adicional: Option<String>,
}

impl Proforma {
    pub async fn find_all(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Proforma>(&format!(
            "{SELECT_PROFORMA} ORDER BY p.fecha_emision DESC, p.id DESC"
        ))
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_id<'e, E>(executor: E, id: i64) -> Result<Option<Self>, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query_as::<_, Proforma>(&format!("{SELECT_PROFORMA} WHERE p.id = $1"))
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    pub async fn find_by_codigo(
        pool: &SqlitePool,
        codigo: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Proforma>(&format!("{SELECT_PROFORMA} WHERE p.codigo = $1"))
            .bind(codigo.trim())
            .fetch_optional(pool)
            .await
    }

    pub async fn find_detalles<'e, E>(
        executor: E,
        proforma_id: i64,
    ) -> Result<Vec<ProformaDetalle>, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query_as::<_, ProformaDetalle>(
            r#"SELECT d.id, d.proforma_id, d.producto_id, pr.codigo AS producto_codigo,
                      pr.nombre AS producto_nombre, d.cantidad, d.unidad_medida,
                      d.precio_unitario, d.total, d.descripcion_adicional
               FROM proforma_detalles d
               LEFT JOIN productos pr ON pr.id = d.producto_id
               WHERE d.proforma_id = $1
               ORDER BY d.id"#,
        )
        .bind(proforma_id)
        .fetch_all(executor)
        .await
    }

    pub async fn exists_codigo<'e, E>(
        executor: E,
        codigo: &str,
        exclude_id: Option<i64>,
    ) -> Result<bool, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM proformas WHERE codigo = $1 AND ($2 IS NULL OR id != $2)",
        )
        .bind(codigo)
        .bind(exclude_id)
        .fetch_one(executor)
        .await?;
        Ok(count > 0)
    }

    /// Proformas whose code carries the given year prefix.
    pub async fn count_for_year<'e, E>(executor: E, anio: i32) -> Result<i64, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query_scalar("SELECT COUNT(*) FROM proformas WHERE codigo LIKE $1")
            .bind(format!("P{anio}-%"))
            .fetch_one(executor)
            .await
    }

    pub async fn count(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM proformas")
            .fetch_one(pool)
            .await
    }

    pub async fn has_factura<'e, E>(executor: E, id: i64) -> Result<bool, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM facturas WHERE proforma_id = $1")
            .bind(id)
            .fetch_one(executor)
            .await?;
        Ok(count > 0)
    }

    pub async fn insert<'e, E>(executor: E, record: &ProformaRecord) -> Result<i64, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query_scalar(
            r#"INSERT INTO proformas (codigo, usuario_id, cliente_id, empresa_id, fecha_emision, referencia,
                                      validez_oferta, tiempo_entrega, lugar_entrega, garantia, forma_pago,
                                      porcentaje_igv, sub_total, total_igv, total, estado, observaciones)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
               RETURNING id"#,
        )
        .bind(&record.codigo)
        .bind(record.usuario_id)
        .bind(record.cliente_id)
        .bind(record.empresa_id)
        .bind(record.fecha_emision)
        .bind(&record.referencia)
        .bind(record.validez_oferta)
        .bind(&record.tiempo_entrega)
        .bind(&record.lugar_entrega)
        .bind(&record.garantia)
        .bind(&record.forma_pago)
        .bind(record.porcentaje_igv)
        .bind(record.sub_total)
        .bind(record.total_igv)
        .bind(record.total)
        .bind(record.estado)
        .bind(&record.observaciones)
        .fetch_one(executor)
        .await
    }

    /// Rewrites the header. `usuario_id` is kept from creation.
    pub async fn update_header<'e, E>(
        executor: E,
        id: i64,
        record: &ProformaRecord,
    ) -> Result<u64, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let result = sqlx::query(
            r#"UPDATE proformas
               SET codigo = $2, cliente_id = $3, empresa_id = $4, fecha_emision = $5, referencia = $6,
                   validez_oferta = $7, tiempo_entrega = $8, lugar_entrega = $9, garantia = $10,
                   forma_pago = $11, porcentaje_igv = $12, sub_total = $13, total_igv = $14,
                   total = $15, estado = $16, observaciones = $17
               WHERE id = $1"#,
        )
        .bind(id)
        .bind(&record.codigo)
        .bind(record.cliente_id)
        .bind(record.empresa_id)
        .bind(record.fecha_emision)
        .bind(&record.referencia)
        .bind(record.validez_oferta)
        .bind(&record.tiempo_entrega)
        .bind(&record.lugar_entrega)
        .bind(&record.garantia)
        .bind(&record.forma_pago)
        .bind(record.porcentaje_igv)
        .bind(record.sub_total)
        .bind(record.total_igv)
        .bind(record.total)
        .bind(record.estado)
        .bind(&record.observaciones)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn insert_detalle<'e, E>(
        executor: E,
        proforma_id: i64,
        detalle: &DetalleRecord,
    ) -> Result<i64, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query_scalar(
            r#"INSERT INTO proforma_detalles (proforma_id, producto_id, cantidad, unidad_medida,
                                              precio_unitario, total, descripcion_adicional)
               VALUES ($1, $2, $3, $4, $5, $6, $7)
               RETURNING id"#,
        )
        .bind(proforma_id)
        .bind(detalle.producto_id)
        .bind(detalle.cantidad)
        .bind(&detalle.unidad_medida)
        .bind(detalle.precio_unitario)
        .bind(detalle.total)
        .bind(&detalle.descripcion_adicional)
        .fetch_one(executor)
        .await
    }

    pub async fn delete_detalles<'e, E>(executor: E, proforma_id: i64) -> Result<u64, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let result = sqlx::query("DELETE FROM proforma_detalles WHERE proforma_id = $1")
            .bind(proforma_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    /// Removes the header only; lines must be gone already.
    pub async fn delete<'e, E>(executor: E, id: i64) -> Result<u64, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let result = sqlx::query("DELETE FROM proformas WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn set_estado<'e, E>(
        executor: E,
        id: i64,
        estado: EstadoProforma,
    ) -> Result<u64, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let result = sqlx::query("UPDATE proformas SET estado = $2 WHERE id = $1")
            .bind(id)
            .bind(estado)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    /// Marks as VENCIDA every open, uninvoiced proforma past its validity window.
    pub async fn expire_overdue(pool: &SqlitePool) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"UPDATE proformas
               SET estado = 'VENCIDA'
               WHERE estado IN ('PENDIENTE', 'APROBADA')
                 AND NOT EXISTS (SELECT 1 FROM facturas f WHERE f.proforma_id = proformas.id)
                 AND julianday(date('now', 'localtime')) - julianday(fecha_emision) > validez_oferta"#,
        )
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Days, Local};

    use super::*;
    use crate::test_support;

    async fn seed(pool: &SqlitePool, codigo: &str, emitida_hace: u64, validez: i64) -> i64 {
        let usuario_id = test_support::usuario(pool, &format!("{codigo}@acme.pe")).await;
        let cliente_id = test_support::cliente(pool, codigo).await;
        let empresa_id = test_support::empresa(pool).await;
        let hoy = Local::now().date_naive();
        let record = ProformaRecord {
            codigo: codigo.into(),
            usuario_id,
            cliente_id,
            empresa_id,
            fecha_emision: hoy.checked_sub_days(Days::new(emitida_hace)).unwrap(),
            referencia: None,
            validez_oferta: validez,
            tiempo_entrega: None,
            lugar_entrega: None,
            garantia: None,
            forma_pago: Some("CONTADO".into()),
            porcentaje_igv: 18.0,
            sub_total: 100.0,
            total_igv: 18.0,
            total: 118.0,
            estado: EstadoProforma::Pendiente,
            observaciones: None,
        };
        Proforma::insert(pool, &record).await.unwrap()
    }

    #[tokio::test]
    async fn visual_state_and_sweep_follow_validity_window() {
        let pool = test_support::pool().await;
        let vieja = seed(&pool, "P2025-000001", 15, 10).await;
        let vigente = seed(&pool, "P2025-000002", 3, 10).await;

        let antes = Proforma::find_by_id(&pool, vieja).await.unwrap().unwrap();
        assert_eq!(antes.estado, EstadoProforma::Pendiente);
        assert_eq!(antes.estado_visual, EstadoProforma::Vencida);
        assert_eq!(antes.dias_transcurridos, 15);

        assert_eq!(Proforma::expire_overdue(&pool).await.unwrap(), 1);
        let despues = Proforma::find_by_id(&pool, vieja).await.unwrap().unwrap();
        assert_eq!(despues.estado, EstadoProforma::Vencida);

        let abierta = Proforma::find_by_id(&pool, vigente).await.unwrap().unwrap();
        assert_eq!(abierta.estado_visual, EstadoProforma::Pendiente);
        assert!(abierta.factura_id.is_none());

        // Idempotent
        assert_eq!(Proforma::expire_overdue(&pool).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn lines_are_listed_with_product_data_and_codes_counted_per_year() {
        let pool = test_support::pool().await;
        let id = seed(&pool, "P2025-000001", 0, 10).await;
        let producto_id = test_support::producto(&pool, "CAM-01", 50.0).await;
        Proforma::insert_detalle(
            &pool,
            id,
            &DetalleRecord {
                producto_id,
                cantidad: 2.0,
                unidad_medida: "UNID".into(),
                precio_unitario: 50.0,
                total: 100.0,
                descripcion_adicional: None,
            },
        )
        .await
        .unwrap();

        let detalles = Proforma::find_detalles(&pool, id).await.unwrap();
        assert_eq!(detalles.len(), 1);
        assert_eq!(detalles[0].producto_codigo.as_deref(), Some("CAM-01"));

        assert_eq!(Proforma::count_for_year(&pool, 2025).await.unwrap(), 1);
        assert_eq!(Proforma::count_for_year(&pool, 2024).await.unwrap(), 0);
        assert!(Proforma::exists_codigo(&pool, "P2025-000001", None).await.unwrap());

        assert_eq!(Proforma::delete_detalles(&pool, id).await.unwrap(), 1);
        assert_eq!(Proforma::delete(&pool, id).await.unwrap(), 1);
    }
}
