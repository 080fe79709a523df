//! ReanalyzeCoin

use super::{apply_analysis, CoinService};
use crate::error::{CoinError, CoinResult};
use crate::models::{Coin, ImageType, Side, ValuePolicy};
use crate::types::AnalysisOptions;
use std::path::PathBuf;
use tracing::info;
use uuid::Uuid;

impl CoinService {
    /// Run AI analysis again on the stored originals
    ///
    /// Unlike intake, analysis failure is returned to the caller and the
    /// stored coin is left untouched. An out-of-range year or mintage from
    /// the model still ends up as unknown rather than failing the call.
    pub async fn reanalyze_coin(&self, coin_id: Uuid, options: AnalysisOptions) -> CoinResult<Coin> {
        let mut coin = self.load_coin(coin_id).await?;

        let original = |side: Side| -> Option<PathBuf> {
            coin.image(ImageType::Original, side)
                .map(|img| PathBuf::from(&img.path))
        };
        let (front, back) = match (original(Side::Front), original(Side::Back)) {
            (Some(front), Some(back)) => (front, back),
            _ => return Err(CoinError::not_found("original images not found")),
        };

        info!(coin_id = %coin_id, model = %options.model, "Re-analyzing coin");
        let analysis = self
            .analyzer
            .analyze(&front, &back, &options)
            .await
            .map_err(|e| CoinError::dependency("failed to analyze coin", e))?;

        apply_analysis(&mut coin, &analysis, ValuePolicy::LENIENT)?;
        coin.gemini_model = options.model;
        coin.gemini_temperature = f64::from(options.temperature);

        self.store_update(&mut coin, "failed to update coin").await?;
        Ok(coin)
    }
}
