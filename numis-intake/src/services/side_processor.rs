//! Image side processing
//!
//! Turns the raw photograph of one coin side into three stored assets:
//!
//! 1. `original_<side>.<ext>` - the upload as received
//! 2. `processed_<side>.png` - background removed, cropped to content
//! 3. `processed_<side>_thumb.png` - fixed-width preview of (2)
//!
//! Steps run strictly in order and never retry. Each failure carries a
//! message naming the step and the side (e.g. "failed to crop back").

use crate::error::{CoinError, CoinResult};
use crate::models::{CoinImage, ImageType, Side};
use crate::types::{BackgroundRemover, ImageMetadata, ImageProcessor, ImageStorage};
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Thumbnail width in pixels; height follows the aspect ratio
pub const THUMBNAIL_WIDTH: u32 = 300;

/// Raw upload of one side
#[derive(Debug, Clone)]
pub struct SideUpload {
    pub side: Side,
    pub bytes: Vec<u8>,
    /// Client-side file name, kept on every image record of the side
    pub filename: String,
}

/// Result of processing one side
#[derive(Debug, Clone)]
pub struct ProcessedSide {
    pub side: Side,
    /// Original, processed and thumbnail records, in that order
    pub images: Vec<CoinImage>,
    /// Input for AI analysis
    pub processed_path: PathBuf,
}

/// Extension of the stored original, taken from the upload name
fn original_extension(filename: &str) -> String {
    Path::new(filename)
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .filter(|e| !e.is_empty() && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or_else(|| "jpg".to_string())
}

fn mime_for_extension(extension: &str) -> String {
    match extension {
        "png" => "image/png",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "heic" => "image/heic",
        _ => "image/jpeg",
    }
    .to_string()
}

/// Build an image record for a stored file
pub fn image_record(
    coin_id: Uuid,
    image_type: ImageType,
    side: Side,
    path: &Path,
    metadata: ImageMetadata,
    original_filename: &str,
) -> CoinImage {
    let now = Utc::now();
    CoinImage {
        id: Uuid::new_v4(),
        coin_id,
        image_type,
        side,
        path: path.to_string_lossy().into_owned(),
        extension: path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default(),
        size: metadata.size,
        width: metadata.width,
        height: metadata.height,
        mime_type: metadata.mime_type,
        original_filename: original_filename.to_string(),
        created_at: now,
        updated_at: now,
    }
}

/// Runs one side through storage, background removal, crop and thumbnailing
#[derive(Clone)]
pub struct SideProcessor {
    storage: Arc<dyn ImageStorage>,
    remover: Arc<dyn BackgroundRemover>,
    processor: Arc<dyn ImageProcessor>,
}

impl SideProcessor {
    pub fn new(
        storage: Arc<dyn ImageStorage>,
        remover: Arc<dyn BackgroundRemover>,
        processor: Arc<dyn ImageProcessor>,
    ) -> Self {
        Self {
            storage,
            remover,
            processor,
        }
    }

    pub async fn process(&self, coin_id: Uuid, upload: SideUpload) -> CoinResult<ProcessedSide> {
        let side = upload.side;
        info!(coin_id = %coin_id, side = %side, "Processing side");

        let extension = original_extension(&upload.filename);
        let original_path = self
            .storage
            .save(coin_id, &format!("original_{}.{}", side, extension), &upload.bytes)
            .await
            .map_err(|e| CoinError::dependency(format!("failed to save original {}", side), e))?;

        let without_background = self
            .remover
            .remove(&upload.bytes)
            .await
            .map_err(|e| CoinError::dependency(format!("failed to bg remove {}", side), e))?;

        let cropped = self
            .processor
            .crop_to_content(without_background)
            .await
            .map_err(|e| CoinError::dependency(format!("failed to crop {}", side), e))?;

        let processed_path = self
            .storage
            .save(coin_id, &format!("processed_{}.png", side), &cropped)
            .await
            .map_err(|e| CoinError::dependency(format!("failed to save processed {}", side), e))?;

        let thumbnail_path = self
            .processor
            .generate_thumbnail(&processed_path, THUMBNAIL_WIDTH)
            .await
            .map_err(|e| CoinError::dependency(format!("failed to thumb {}", side), e))?;

        let processed_meta = self.read_metadata(&processed_path, side).await?;
        let thumbnail_meta = self.read_metadata(&thumbnail_path, side).await?;
        let original_meta = self
            .processor
            .metadata(&original_path)
            .await
            .unwrap_or_else(|e| {
                warn!(coin_id = %coin_id, side = %side, error = %e, "Original image metadata unavailable");
                ImageMetadata {
                    width: 0,
                    height: 0,
                    size: upload.bytes.len() as i64,
                    mime_type: mime_for_extension(&extension),
                }
            });

        let images = vec![
            image_record(coin_id, ImageType::Original, side, &original_path, original_meta, &upload.filename),
            image_record(coin_id, ImageType::Processed, side, &processed_path, processed_meta, &upload.filename),
            image_record(coin_id, ImageType::Thumbnail, side, &thumbnail_path, thumbnail_meta, &upload.filename),
        ];

        debug!(coin_id = %coin_id, side = %side, "Side processed");
        Ok(ProcessedSide {
            side,
            images,
            processed_path,
        })
    }

    async fn read_metadata(&self, path: &Path, side: Side) -> CoinResult<ImageMetadata> {
        self.processor
            .metadata(path)
            .await
            .map_err(|e| CoinError::dependency(format!("failed to read metadata {}", side), e))
    }
}
