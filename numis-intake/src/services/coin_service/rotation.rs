//! RotateCoinImage

use super::CoinService;
use crate::error::{CoinError, CoinResult};
use crate::models::{Coin, ImageType, Side};
use crate::services::side_processor::{image_record, THUMBNAIL_WIDTH};
use chrono::Utc;
use std::path::PathBuf;
use tracing::info;
use uuid::Uuid;

impl CoinService {
    /// Rotate the processed image of one side in place and rebuild its thumbnail
    ///
    /// `angle` is in degrees, counter-clockwise. A zero angle leaves the
    /// file alone but the thumbnail is still regenerated.
    pub async fn rotate_coin_image(&self, coin_id: Uuid, side: Side, angle: f64) -> CoinResult<Coin> {
        if !angle.is_finite() {
            return Err(CoinError::invalid_input(format!("invalid rotation angle: {}", angle)));
        }

        let mut coin = self.load_coin(coin_id).await?;
        let processed = coin
            .image(ImageType::Processed, side)
            .ok_or_else(|| CoinError::not_found(format!("processed image not found for side {}", side)))?;
        let processed_path = PathBuf::from(&processed.path);
        let original_filename = processed.original_filename.clone();

        info!(coin_id = %coin_id, side = %side, angle, path = %processed_path.display(), "Rotating image");
        if angle != 0.0 {
            self.images
                .rotate(&processed_path, angle)
                .await
                .map_err(|e| CoinError::dependency("failed to rotate image", e))?;
        }

        let thumbnail_path = self
            .images
            .generate_thumbnail(&processed_path, THUMBNAIL_WIDTH)
            .await
            .map_err(|e| CoinError::dependency("failed to regenerate thumbnail", e))?;

        let processed_meta = self
            .images
            .metadata(&processed_path)
            .await
            .map_err(|e| CoinError::dependency("failed to read metadata", e))?;
        let thumbnail_meta = self
            .images
            .metadata(&thumbnail_path)
            .await
            .map_err(|e| CoinError::dependency("failed to read metadata", e))?;

        let now = Utc::now();
        if let Some(img) = coin.image_mut(ImageType::Processed, side) {
            img.width = processed_meta.width;
            img.height = processed_meta.height;
            img.size = processed_meta.size;
            img.updated_at = now;
        }
        match coin.image_mut(ImageType::Thumbnail, side) {
            Some(img) => {
                img.path = thumbnail_path.to_string_lossy().into_owned();
                img.width = thumbnail_meta.width;
                img.height = thumbnail_meta.height;
                img.size = thumbnail_meta.size;
                img.mime_type = thumbnail_meta.mime_type;
                img.updated_at = now;
            }
            None => coin.images.push(image_record(
                coin_id,
                ImageType::Thumbnail,
                side,
                &thumbnail_path,
                thumbnail_meta,
                &original_filename,
            )),
        }

        self.store_update(&mut coin, "failed to update coin").await?;
        Ok(coin)
    }
}
