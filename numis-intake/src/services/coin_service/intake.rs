//! AddCoin: turn two photographs into a persisted coin

use super::{apply_analysis, CoinService};
use crate::error::{CoinError, CoinResult};
use crate::models::{Coin, CoinAnalysisResult, ValuePolicy};
use crate::services::side_processor::{ProcessedSide, SideUpload};
use crate::types::AnalysisOptions;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

/// Input of one intake call
#[derive(Debug, Clone)]
pub struct AddCoinRequest {
    pub front: SideUpload,
    pub back: SideUpload,
    /// Group name; created on first use, blank for none
    pub group_name: String,
    pub notes: String,
    pub options: AnalysisOptions,
}

impl CoinService {
    /// Ingest a coin from its front and back photographs
    ///
    /// Fails only when group resolution, a side's image pipeline or the
    /// final write fails. An analysis failure is recorded in the
    /// description and the coin is saved anyway. Catalog matching runs
    /// afterwards in the background.
    pub async fn add_coin(&self, request: AddCoinRequest) -> CoinResult<Coin> {
        let AddCoinRequest {
            front,
            back,
            group_name,
            notes,
            options,
        } = request;

        let group_id = self.resolve_group(&group_name).await?;

        let coin_id = Uuid::new_v4();
        info!(coin_id = %coin_id, group_id = ?group_id, "Starting coin intake");

        let front_task = self.spawn_side(coin_id, front);
        let back_task = self.spawn_side(coin_id, back);
        // First failure wins; the sibling task keeps running detached.
        let (front, back) = futures::future::try_join(join_side(front_task), join_side(back_task)).await?;

        let analysis = match self
            .analyzer
            .analyze(&front.processed_path, &back.processed_path, &options)
            .await
        {
            Ok(analysis) => analysis,
            Err(e) => {
                let detail = format!("{:#}", e);
                warn!(coin_id = %coin_id, error = %detail, "Coin analysis failed, saving without it");
                CoinAnalysisResult::failed(&detail)
            }
        };

        let mut coin = Coin::new(coin_id);
        apply_analysis(&mut coin, &analysis, ValuePolicy::LENIENT)?;
        coin.group_id = group_id;
        coin.personal_notes = notes;
        coin.gemini_model = options.model.clone();
        coin.gemini_temperature = f64::from(options.temperature);
        coin.images = front.images.into_iter().chain(back.images).collect();

        self.coins
            .save(&coin)
            .await
            .map_err(|e| CoinError::persistence("failed to save coin to db", e))?;
        info!(coin_id = %coin_id, name = %coin.name, "Coin saved");

        self.schedule_enrichment(coin_id);
        Ok(coin)
    }

    fn spawn_side(&self, coin_id: Uuid, upload: SideUpload) -> JoinHandle<CoinResult<ProcessedSide>> {
        let processor = self.side_processor.clone();
        tokio::spawn(async move { processor.process(coin_id, upload).await })
    }
}

async fn join_side(task: JoinHandle<CoinResult<ProcessedSide>>) -> CoinResult<ProcessedSide> {
    task.await
        .map_err(|e| CoinError::dependency("side processing task failed", e))?
}
