//! Background catalog enrichment
//!
//! Enrichment runs as a detached task with its own deadline. It is not tied
//! to the request that triggered it and its errors only reach the log.

use super::CoinService;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Deadline of one background enrichment run
pub const ENRICHMENT_TIMEOUT: Duration = Duration::from_secs(120);

impl CoinService {
    /// Spawn catalog matching for a coin and return immediately
    ///
    /// Returns `None` when no catalog is configured. The handle is only
    /// useful to tests; dropping it does not cancel the task.
    pub fn schedule_enrichment(&self, coin_id: Uuid) -> Option<JoinHandle<()>> {
        if !self.catalog_enabled() {
            warn!(coin_id = %coin_id, "Numista API key not configured, skipping enrichment");
            return None;
        }

        let service = self.clone();
        Some(tokio::spawn(async move {
            match tokio::time::timeout(ENRICHMENT_TIMEOUT, service.enrich_coin_with_numista(coin_id)).await {
                Ok(Ok(outcome)) => {
                    info!(coin_id = %coin_id, outcome = ?outcome, "Catalog enrichment finished")
                }
                Ok(Err(e)) => error!(coin_id = %coin_id, error = %e, "Catalog enrichment failed"),
                Err(_) => error!(
                    coin_id = %coin_id,
                    timeout_secs = ENRICHMENT_TIMEOUT.as_secs(),
                    "Catalog enrichment timed out"
                ),
            }
        }))
    }
}
