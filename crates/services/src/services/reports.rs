//! Dashboard and reporting figures. Proforma reports sweep expired quotes first and sales
//! reports backfill missing sales first, so every figure reflects current state.

use db::models::{
    cliente::Cliente,
    empleado::Empleado,
    producto::Producto,
    proforma::Proforma,
    reporte::{
        DiagnosticoVentas, Kpis, ProformaVencida, ProformasPorCliente, ProformasPorEstado,
        ProformasPorMes, Reporte, TopCliente, TopClienteVentas, VentasPorMes,
    },
    venta::Venta,
};
use serde::Serialize;
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::info;
use ts_rs::TS;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Counters on the landing page.
#[derive(Debug, Clone, Serialize, TS)]
pub struct EstadisticasMenu {
    pub clientes_activos: i64,
    pub empleados_activos: i64,
    pub total_proformas: i64,
    pub productos_activos: i64,
}

pub struct ReportService {
    pool: SqlitePool,
}

impl ReportService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn sweep(&self) -> Result<(), ReportError> {
        let expired = Proforma::expire_overdue(&self.pool).await?;
        if expired > 0 {
            info!(expired, "Expired overdue proformas before report");
        }
        Ok(())
    }

    async fn backfill(&self) -> Result<(), ReportError> {
        let created = Venta::backfill(&self.pool).await?;
        if created > 0 {
            info!(created, "Backfilled missing sales");
        }
        Ok(())
    }

    pub async fn menu(&self) -> Result<EstadisticasMenu, ReportError> {
        Ok(EstadisticasMenu {
            clientes_activos: Cliente::count_active(&self.pool).await?,
            empleados_activos: Empleado::count_activos(&self.pool).await?,
            total_proformas: Proforma::count(&self.pool).await?,
            productos_activos: Producto::count_active(&self.pool).await?,
        })
    }

    pub async fn proformas_por_mes(&self) -> Result<Vec<ProformasPorMes>, ReportError> {
        self.sweep().await?;
        Ok(Reporte::proformas_por_mes(&self.pool).await?)
    }

    pub async fn proformas_por_estado(&self) -> Result<Vec<ProformasPorEstado>, ReportError> {
        self.sweep().await?;
        Ok(Reporte::proformas_por_estado(&self.pool).await?)
    }

    pub async fn top_clientes(&self) -> Result<Vec<TopCliente>, ReportError> {
        self.sweep().await?;
        Ok(Reporte::top_clientes(&self.pool).await?)
    }

    pub async fn proformas_por_cliente(&self) -> Result<Vec<ProformasPorCliente>, ReportError> {
        self.sweep().await?;
        Ok(Reporte::proformas_por_cliente(&self.pool).await?)
    }

    pub async fn proformas_vencidas(&self) -> Result<Vec<ProformaVencida>, ReportError> {
        self.sweep().await?;
        Ok(Reporte::proformas_vencidas(&self.pool).await?)
    }

    /// Mixes proforma and sales figures, so both preparations run.
    pub async fn kpis(&self) -> Result<Kpis, ReportError> {
        self.sweep().await?;
        self.backfill().await?;
        Ok(Reporte::kpis(&self.pool).await?)
    }

    pub async fn ventas_por_mes(&self) -> Result<Vec<VentasPorMes>, ReportError> {
        self.backfill().await?;
        Ok(Reporte::ventas_por_mes(&self.pool).await?)
    }

    pub async fn top_clientes_ventas(&self) -> Result<Vec<TopClienteVentas>, ReportError> {
        self.backfill().await?;
        Ok(Reporte::top_clientes_ventas(&self.pool).await?)
    }

    pub async fn diagnostico_ventas(&self) -> Result<DiagnosticoVentas, ReportError> {
        self.backfill().await?;
        Ok(Reporte::diagnostico_ventas(&self.pool).await?)
    }
}
