//! Background sweep that expires overdue proformas and purges stale sessions and recovery tokens.

use std::time::Duration;

use db::{
    DBService,
    models::{
        proforma::Proforma,
        sesion::{RecuperacionClave, Sesion},
    },
};
use thiserror::Error;
use tokio::time::interval;
use tracing::{debug, error, info};

#[derive(Debug, Error)]
pub enum ProformaExpiryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Counts from one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepOutcome {
    pub proformas_vencidas: u64,
    pub sesiones_purgadas: u64,
    pub tokens_purgados: u64,
}

pub struct ProformaExpiryService {
    db: DBService,
    poll_interval: Duration,
}

impl ProformaExpiryService {
    pub async fn spawn(db: DBService, poll_interval: Duration) -> tokio::task::JoinHandle<()> {
        let service = Self { db, poll_interval };
        tokio::spawn(async move {
            service.start().await;
        })
    }

    async fn start(&self) {
        info!(
            "Starting proforma expiry service with interval {:?}",
            self.poll_interval
        );

        let mut interval = interval(self.poll_interval);

        loop {
            interval.tick().await;
            if let Err(e) = self.sweep().await {
                error!("Error running proforma expiry sweep: {}", e);
            }
        }
    }

    pub async fn sweep(&self) -> Result<SweepOutcome, ProformaExpiryError> {
        let outcome = SweepOutcome {
            proformas_vencidas: Proforma::expire_overdue(&self.db.pool).await?,
            sesiones_purgadas: Sesion::purge_expired(&self.db.pool).await?,
            tokens_purgados: RecuperacionClave::purge_expired(&self.db.pool).await?,
        };

        if outcome == SweepOutcome::default() {
            debug!("Proforma expiry: nothing to do");
        } else {
            info!(
                proformas_vencidas = outcome.proformas_vencidas,
                sesiones_purgadas = outcome.sesiones_purgadas,
                tokens_purgados = outcome.tokens_purgados,
                "Proforma expiry sweep finished"
            );
        }
        Ok(outcome)
    }
}
