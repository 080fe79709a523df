//! In-memory fakes of the coin service capabilities
//!
//! Each fake records how it was called and can be told to fail.

#![allow(dead_code)]

use anyhow::{anyhow, Result};
use numis_intake::models::{
    CatalogDetail, Coin, CoinAnalysisResult, CoinFilter, Group, TypeSearchResponse,
};
use numis_intake::types::{
    AnalysisOptions, BackgroundRemover, CatalogClient, CatalogQuery, CoinAnalyzer, CoinRepository,
    GroupRepository, ImageMetadata, ImageProcessor, ImageStorage,
};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Barrier;
use uuid::Uuid;

#[derive(Default)]
pub struct FakeCoinRepository {
    pub coins: Mutex<HashMap<Uuid, Coin>>,
    pub updates: Mutex<Vec<Coin>>,
    pub fail_save: Mutex<bool>,
}

impl FakeCoinRepository {
    pub fn insert(&self, coin: Coin) {
        self.coins.lock().unwrap().insert(coin.id, coin);
    }

    pub fn stored(&self, id: Uuid) -> Option<Coin> {
        self.coins.lock().unwrap().get(&id).cloned()
    }

    pub fn update_count(&self) -> usize {
        self.updates.lock().unwrap().len()
    }

    pub fn last_update(&self) -> Option<Coin> {
        self.updates.lock().unwrap().last().cloned()
    }
}

#[async_trait::async_trait]
impl CoinRepository for FakeCoinRepository {
    async fn save(&self, coin: &Coin) -> Result<()> {
        if *self.fail_save.lock().unwrap() {
            return Err(anyhow!("database is locked"));
        }
        self.insert(coin.clone());
        Ok(())
    }

    async fn update(&self, coin: &Coin) -> Result<()> {
        self.updates.lock().unwrap().push(coin.clone());
        self.insert(coin.clone());
        Ok(())
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<Coin>> {
        Ok(self.stored(id))
    }

    async fn list(&self, _filter: &CoinFilter) -> Result<Vec<Coin>> {
        Ok(self.coins.lock().unwrap().values().cloned().collect())
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        Ok(self.coins.lock().unwrap().remove(&id).is_some())
    }

    async fn mark_sold(
        &self,
        id: Uuid,
        sold_at: DateTime<Utc>,
        sold_price: f64,
        sale_channel: &str,
    ) -> Result<bool> {
        let mut coins = self.coins.lock().unwrap();
        let Some(coin) = coins.get_mut(&id) else {
            return Ok(false);
        };
        coin.sold_at = Some(sold_at);
        coin.sold_price = sold_price;
        coin.sale_channel = sale_channel.to_string();
        coin.updated_at = sold_at;
        Ok(true)
    }
}

#[derive(Default)]
pub struct FakeGroupRepository {
    pub groups: Mutex<Vec<Group>>,
    pub fail_create: Mutex<bool>,
}

#[async_trait::async_trait]
impl GroupRepository for FakeGroupRepository {
    async fn get_by_name(&self, name: &str) -> Result<Option<Group>> {
        Ok(self
            .groups
            .lock()
            .unwrap()
            .iter()
            .find(|g| g.name == name)
            .cloned())
    }

    async fn create(&self, name: &str, description: &str) -> Result<Group> {
        if *self.fail_create.lock().unwrap() {
            return Err(anyhow!("UNIQUE constraint failed"));
        }
        let mut groups = self.groups.lock().unwrap();
        let group = Group {
            id: groups.len() as i64 + 1,
            name: name.to_string(),
            description: description.to_string(),
            created_at: Utc::now(),
        };
        groups.push(group.clone());
        Ok(group)
    }

    async fn update(&self, id: i64, name: &str, description: &str) -> Result<Option<Group>> {
        let mut groups = self.groups.lock().unwrap();
        let Some(group) = groups.iter_mut().find(|g| g.id == id) else {
            return Ok(None);
        };
        group.name = name.to_string();
        group.description = description.to_string();
        Ok(Some(group.clone()))
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let mut groups = self.groups.lock().unwrap();
        let before = groups.len();
        groups.retain(|g| g.id != id);
        Ok(groups.len() < before)
    }

    async fn list(&self) -> Result<Vec<Group>> {
        Ok(self.groups.lock().unwrap().clone())
    }
}

/// Keeps files in memory under a virtual `/store` root
#[derive(Default)]
pub struct FakeStorage {
    pub files: Mutex<HashMap<PathBuf, Vec<u8>>>,
    /// File names whose save fails
    pub fail_names: Mutex<Vec<String>>,
    pub deleted_dirs: Mutex<Vec<Uuid>>,
}

impl FakeStorage {
    pub fn saved_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .files
            .lock()
            .unwrap()
            .keys()
            .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
            .collect();
        names.sort();
        names
    }
}

#[async_trait::async_trait]
impl ImageStorage for FakeStorage {
    async fn save(&self, coin_id: Uuid, name: &str, bytes: &[u8]) -> Result<PathBuf> {
        if self.fail_names.lock().unwrap().iter().any(|n| n == name) {
            return Err(anyhow!("disk full"));
        }
        let path = self.path_for(coin_id, name);
        self.files.lock().unwrap().insert(path.clone(), bytes.to_vec());
        Ok(path)
    }

    async fn load(&self, path: &Path) -> Result<Vec<u8>> {
        self.files
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| anyhow!("no such file: {}", path.display()))
    }

    async fn exists(&self, path: &Path) -> bool {
        self.files.lock().unwrap().contains_key(path)
    }

    fn path_for(&self, coin_id: Uuid, name: &str) -> PathBuf {
        PathBuf::from("/store/coins").join(coin_id.to_string()).join(name)
    }

    async fn delete_coin_directory(&self, coin_id: Uuid) -> Result<()> {
        self.deleted_dirs.lock().unwrap().push(coin_id);
        Ok(())
    }
}

fn contains_marker(bytes: &[u8], marker: &[u8]) -> bool {
    bytes.windows(marker.len()).any(|w| w == marker)
}

/// Fails for any input containing one of `fail_markers`
///
/// With `barrier` set, every call waits on it first. Inputs matching a
/// `delays` marker sleep for the given time before answering.
#[derive(Default)]
pub struct FakeRemover {
    pub fail_markers: Mutex<Vec<Vec<u8>>>,
    pub calls: Mutex<usize>,
    pub barrier: Mutex<Option<Arc<Barrier>>>,
    pub delays: Mutex<Vec<(Vec<u8>, Duration)>>,
}

#[async_trait::async_trait]
impl BackgroundRemover for FakeRemover {
    async fn remove(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        *self.calls.lock().unwrap() += 1;

        let barrier = self.barrier.lock().unwrap().clone();
        if let Some(barrier) = barrier {
            barrier.wait().await;
        }
        let delay = self
            .delays
            .lock()
            .unwrap()
            .iter()
            .find(|(marker, _)| contains_marker(bytes, marker))
            .map(|(_, delay)| *delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let failing = self
            .fail_markers
            .lock()
            .unwrap()
            .iter()
            .any(|marker| contains_marker(bytes, marker));
        if failing {
            return Err(anyhow!("rembg returned status 500"));
        }
        let mut out = b"nobg:".to_vec();
        out.extend_from_slice(bytes);
        Ok(out)
    }
}

#[derive(Default)]
pub struct FakeImageProcessor {
    pub fail_crop_markers: Mutex<Vec<Vec<u8>>>,
    pub fail_thumbnail: Mutex<bool>,
    pub rotations: Mutex<Vec<(PathBuf, f64)>>,
    pub thumbnails: Mutex<Vec<PathBuf>>,
}

#[async_trait::async_trait]
impl ImageProcessor for FakeImageProcessor {
    async fn crop_to_content(&self, bytes: Vec<u8>) -> Result<Vec<u8>> {
        let failing = self
            .fail_crop_markers
            .lock()
            .unwrap()
            .iter()
            .any(|marker| bytes.windows(marker.len()).any(|w| w == marker.as_slice()));
        if failing {
            return Err(anyhow!("image has no decodable frames"));
        }
        Ok(bytes)
    }

    async fn rotate(&self, path: &Path, angle: f64) -> Result<()> {
        self.rotations.lock().unwrap().push((path.to_path_buf(), angle));
        Ok(())
    }

    async fn generate_thumbnail(&self, path: &Path, _width: u32) -> Result<PathBuf> {
        if *self.fail_thumbnail.lock().unwrap() {
            return Err(anyhow!("resize failed"));
        }
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let thumb = path.with_file_name(format!("{}_thumb.png", stem));
        self.thumbnails.lock().unwrap().push(thumb.clone());
        Ok(thumb)
    }

    async fn metadata(&self, path: &Path) -> Result<ImageMetadata> {
        let is_thumb = path.to_string_lossy().ends_with("_thumb.png");
        Ok(ImageMetadata {
            width: if is_thumb { 300 } else { 1000 },
            height: if is_thumb { 300 } else { 1000 },
            size: 2048,
            mime_type: "image/png".to_string(),
        })
    }
}

/// Returns a canned analysis or a canned failure
pub struct FakeAnalyzer {
    pub result: Mutex<std::result::Result<CoinAnalysisResult, String>>,
    pub calls: Mutex<Vec<(PathBuf, PathBuf, AnalysisOptions)>>,
}

impl FakeAnalyzer {
    pub fn returning(result: CoinAnalysisResult) -> Self {
        Self {
            result: Mutex::new(Ok(result)),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            result: Mutex::new(Err(message.to_string())),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl Default for FakeAnalyzer {
    fn default() -> Self {
        Self::returning(CoinAnalysisResult::default())
    }
}

#[async_trait::async_trait]
impl CoinAnalyzer for FakeAnalyzer {
    async fn analyze(
        &self,
        front_path: &Path,
        back_path: &Path,
        options: &AnalysisOptions,
    ) -> Result<CoinAnalysisResult> {
        self.calls.lock().unwrap().push((
            front_path.to_path_buf(),
            back_path.to_path_buf(),
            options.clone(),
        ));
        self.result.lock().unwrap().clone().map_err(|e| anyhow!(e))
    }
}

/// Serves one canned search response and per-id details
#[derive(Default)]
pub struct FakeCatalog {
    pub search: Mutex<Option<std::result::Result<TypeSearchResponse, String>>>,
    pub details: Mutex<HashMap<i64, std::result::Result<CatalogDetail, String>>>,
    pub queries: Mutex<Vec<CatalogQuery>>,
    pub detail_calls: Mutex<Vec<i64>>,
}

impl FakeCatalog {
    pub fn with_search(response: TypeSearchResponse) -> Self {
        let catalog = Self::default();
        *catalog.search.lock().unwrap() = Some(Ok(response));
        catalog
    }

    pub fn add_detail(&self, id: i64, detail: serde_json::Value) {
        let map = match detail {
            serde_json::Value::Object(map) => map,
            other => panic!("detail must be an object, got {}", other),
        };
        self.details.lock().unwrap().insert(id, Ok(map));
    }

    pub fn fail_detail(&self, id: i64, message: &str) {
        self.details
            .lock()
            .unwrap()
            .insert(id, Err(message.to_string()));
    }

    pub fn detail_calls(&self) -> Vec<i64> {
        self.detail_calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl CatalogClient for FakeCatalog {
    async fn search_types(&self, query: &CatalogQuery) -> Result<TypeSearchResponse> {
        self.queries.lock().unwrap().push(query.clone());
        match self.search.lock().unwrap().clone() {
            Some(Ok(response)) => Ok(response),
            Some(Err(message)) => Err(anyhow!(message)),
            None => Ok(TypeSearchResponse::default()),
        }
    }

    async fn get_type(&self, id: i64) -> Result<CatalogDetail> {
        self.detail_calls.lock().unwrap().push(id);
        match self.details.lock().unwrap().get(&id) {
            Some(Ok(detail)) => Ok(detail.clone()),
            Some(Err(message)) => Err(anyhow!(message.clone())),
            None => Err(anyhow!("type {} not found", id)),
        }
    }
}
