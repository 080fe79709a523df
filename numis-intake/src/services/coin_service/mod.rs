//! Coin service
//!
//! Entry point for every coin operation. Each operation lives in its own
//! file as an `impl CoinService` block:
//!
//! - `intake`: AddCoin (parallel side processing, soft-fail analysis, persist)
//! - `catalog_matching`: EnrichCoinWithNumista, ApplyNumistaCandidate
//! - `enrichment`: detached background scheduling of catalog matching
//! - `reanalysis`: ReanalyzeCoin (hard-fail analysis on the originals)
//! - `rotation`: RotateCoinImage
//! - `management`: get/list/update/delete coins, sales, groups
//!
//! The coin record is written at intake and again when enrichment
//! finishes. The two writes are independent and last write wins.

use crate::error::{CoinError, CoinResult};
use crate::models::{CatalogCode, Coin, CoinAnalysisResult, Grade, ValuePolicy};
use crate::services::side_processor::SideProcessor;
use crate::types::{
    BackgroundRemover, CatalogClient, CoinAnalyzer, CoinRepository, GroupRepository, ImageProcessor,
    ImageStorage,
};
use chrono::Utc;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

mod catalog_matching;
mod enrichment;
mod intake;
mod management;
mod reanalysis;
mod rotation;

pub use catalog_matching::{
    map_catalog_details, parse_face_value, MatchOutcome, AMBIGUOUS_RESULT_THRESHOLD,
    FACE_VALUE_TOLERANCE, SEARCH_RESULT_LIMIT,
};
pub use enrichment::ENRICHMENT_TIMEOUT;
pub use intake::AddCoinRequest;
pub use management::UpdateCoinParams;

/// Coin intake and enrichment service
///
/// Cheap to clone; background tasks hold their own clone.
#[derive(Clone)]
pub struct CoinService {
    coins: Arc<dyn CoinRepository>,
    groups: Arc<dyn GroupRepository>,
    storage: Arc<dyn ImageStorage>,
    images: Arc<dyn ImageProcessor>,
    side_processor: SideProcessor,
    analyzer: Arc<dyn CoinAnalyzer>,
    /// `None` when no catalog credentials are configured
    catalog: Option<Arc<dyn CatalogClient>>,
}

impl CoinService {
    pub fn new(
        coins: Arc<dyn CoinRepository>,
        groups: Arc<dyn GroupRepository>,
        storage: Arc<dyn ImageStorage>,
        remover: Arc<dyn BackgroundRemover>,
        images: Arc<dyn ImageProcessor>,
        analyzer: Arc<dyn CoinAnalyzer>,
        catalog: Option<Arc<dyn CatalogClient>>,
    ) -> Self {
        let side_processor = SideProcessor::new(storage.clone(), remover, images.clone());
        Self {
            coins,
            groups,
            storage,
            images,
            side_processor,
            analyzer,
            catalog,
        }
    }

    pub fn catalog_enabled(&self) -> bool {
        self.catalog.is_some()
    }

    fn catalog_client(&self) -> CoinResult<&Arc<dyn CatalogClient>> {
        self.catalog.as_ref().ok_or_else(|| {
            CoinError::dependency(
                "catalog enrichment unavailable",
                anyhow::anyhow!("Numista API key is not configured"),
            )
        })
    }

    async fn load_coin(&self, id: Uuid) -> CoinResult<Coin> {
        self.coins
            .get_by_id(id)
            .await
            .map_err(|e| CoinError::persistence("failed to get coin", e))?
            .ok_or_else(|| CoinError::not_found(format!("coin {} not found", id)))
    }

    /// Refresh `updated_at` and overwrite the stored coin
    async fn store_update(&self, coin: &mut Coin, context: &str) -> CoinResult<()> {
        coin.updated_at = Utc::now();
        self.coins
            .update(coin)
            .await
            .map_err(|e| CoinError::persistence(context, e))
    }

    /// Look a group up by name, creating it on first use
    ///
    /// A blank name means "no group".
    async fn resolve_group(&self, name: &str) -> CoinResult<Option<i64>> {
        let name = name.trim();
        if name.is_empty() {
            return Ok(None);
        }

        match self.groups.get_by_name(name).await {
            Ok(Some(group)) => return Ok(Some(group.id)),
            Ok(None) => {}
            Err(e) => warn!(group = name, error = %e, "Group lookup failed, trying to create it"),
        }

        let group = self
            .groups
            .create(name, "")
            .await
            .map_err(|e| CoinError::persistence("failed to create group", e))?;
        tracing::info!(group = name, group_id = group.id, "Created group");
        Ok(Some(group.id))
    }
}

/// Copy analysis fields onto a coin
///
/// `policy` decides what happens to an out-of-range year or mintage: the
/// lenient policy resets it to unknown, the strict one fails the merge
/// before anything on the coin is touched.
pub(crate) fn apply_analysis(
    coin: &mut Coin,
    analysis: &CoinAnalysisResult,
    policy: ValuePolicy,
) -> CoinResult<()> {
    let year = policy.year(analysis.year)?;
    let mintage = policy.mintage(analysis.mintage)?;

    coin.name = analysis.name.clone();
    coin.country = analysis.country.clone();
    coin.year = year;
    coin.face_value = analysis.face_value.clone();
    coin.currency = analysis.currency.clone();
    coin.material = analysis.material.clone();
    coin.description = analysis.description.clone();
    coin.km_code = CatalogCode::new(analysis.km_code.trim());
    coin.grade = Grade::normalized(&analysis.grade);
    coin.mint = analysis.mint.clone();
    coin.mintage = mintage;
    coin.weight_g = analysis.weight_g;
    coin.diameter_mm = analysis.diameter_mm;
    coin.thickness_mm = analysis.thickness_mm;
    coin.edge = analysis.edge.clone();
    coin.shape = analysis.shape.clone();
    coin.min_value = analysis.min_value;
    coin.max_value = analysis.max_value;
    coin.technical_notes = analysis.notes.clone();
    coin.gemini_details = Some(analysis.raw_details.clone());
    Ok(())
}
