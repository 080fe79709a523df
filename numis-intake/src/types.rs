//! Capability traits consumed by the coin service
//!
//! Every external collaborator of the intake pipeline sits behind one of
//! these traits so that the service can be driven by fakes in tests:
//! - Persistence: [`CoinRepository`], [`GroupRepository`]
//! - Files: [`ImageStorage`]
//! - Image pipeline: [`BackgroundRemover`], [`ImageProcessor`]
//! - Enrichment: [`CoinAnalyzer`], [`CatalogClient`]
//!
//! Implementations report failures as `anyhow::Error`; the service attaches
//! the step-specific context.

use crate::models::{CatalogDetail, Coin, CoinAnalysisResult, CoinFilter, Group, TypeSearchResponse};
use anyhow::Result;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Pixel and file metadata of a stored image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageMetadata {
    pub width: u32,
    pub height: u32,
    /// File size in bytes
    pub size: i64,
    pub mime_type: String,
}

/// Model selection for one analysis call
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisOptions {
    /// Model name; empty selects the client's default
    pub model: String,
    pub temperature: f32,
    /// Prompt language ("es", "en", ...)
    pub language: String,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            model: String::new(),
            temperature: 0.4,
            language: "es".to_string(),
        }
    }
}

/// Parameters of a catalog type search
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogQuery {
    /// Free-text terms
    pub q: String,
    pub category: String,
    /// Only sent when known (> 0)
    pub year: Option<i32>,
    /// Maximum number of results per page
    pub count: u32,
}

#[async_trait::async_trait]
pub trait CoinRepository: Send + Sync {
    /// Insert the coin row and all its image rows as one write
    async fn save(&self, coin: &Coin) -> Result<()>;

    /// Overwrite the coin row and replace its image rows
    async fn update(&self, coin: &Coin) -> Result<()>;

    async fn get_by_id(&self, id: Uuid) -> Result<Option<Coin>>;

    async fn list(&self, filter: &CoinFilter) -> Result<Vec<Coin>>;

    /// Returns false when no such coin existed
    async fn delete(&self, id: Uuid) -> Result<bool>;

    /// Set the sale fields only; returns false when no such coin existed
    async fn mark_sold(
        &self,
        id: Uuid,
        sold_at: DateTime<Utc>,
        sold_price: f64,
        sale_channel: &str,
    ) -> Result<bool>;
}

#[async_trait::async_trait]
pub trait GroupRepository: Send + Sync {
    async fn get_by_name(&self, name: &str) -> Result<Option<Group>>;

    async fn create(&self, name: &str, description: &str) -> Result<Group>;

    /// `None` when no group has this id
    async fn update(&self, id: i64, name: &str, description: &str) -> Result<Option<Group>>;

    /// Coins of a deleted group keep no group. Returns false when no group had this id
    async fn delete(&self, id: i64) -> Result<bool>;

    async fn list(&self) -> Result<Vec<Group>>;
}

/// Durable per-coin file storage
#[async_trait::async_trait]
pub trait ImageStorage: Send + Sync {
    /// Write `bytes` as `name` in the coin's directory, returning the full path
    async fn save(&self, coin_id: Uuid, name: &str, bytes: &[u8]) -> Result<PathBuf>;

    async fn load(&self, path: &Path) -> Result<Vec<u8>>;

    async fn exists(&self, path: &Path) -> bool;

    fn path_for(&self, coin_id: Uuid, name: &str) -> PathBuf;

    async fn delete_coin_directory(&self, coin_id: Uuid) -> Result<()>;
}

/// Strips the background from a photograph
#[async_trait::async_trait]
pub trait BackgroundRemover: Send + Sync {
    /// Returns image bytes with a transparent background
    async fn remove(&self, bytes: &[u8]) -> Result<Vec<u8>>;
}

/// Local image transformations
#[async_trait::async_trait]
pub trait ImageProcessor: Send + Sync {
    /// Trim transparent borders and center the subject on a square canvas
    async fn crop_to_content(&self, bytes: Vec<u8>) -> Result<Vec<u8>>;

    /// Rotate the file in place by `angle` degrees, counter-clockwise
    async fn rotate(&self, path: &Path, angle: f64) -> Result<()>;

    /// Write a `width`-pixel wide preview next to `path` and return its path
    async fn generate_thumbnail(&self, path: &Path, width: u32) -> Result<PathBuf>;

    async fn metadata(&self, path: &Path) -> Result<ImageMetadata>;
}

/// Extracts coin attributes from front and back photographs
#[async_trait::async_trait]
pub trait CoinAnalyzer: Send + Sync {
    async fn analyze(
        &self,
        front_path: &Path,
        back_path: &Path,
        options: &AnalysisOptions,
    ) -> Result<CoinAnalysisResult>;
}

/// External numismatic catalog
#[async_trait::async_trait]
pub trait CatalogClient: Send + Sync {
    async fn search_types(&self, query: &CatalogQuery) -> Result<TypeSearchResponse>;

    async fn get_type(&self, id: i64) -> Result<CatalogDetail>;
}
