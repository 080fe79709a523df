//! Local filesystem image storage
//!
//! Layout: `<storage root>/coins/<coin_id>/<file name>`

use crate::types::ImageStorage;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    /// `base_path` is usually `RootFolderInitializer::storage_path()`
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn coin_directory(&self, coin_id: Uuid) -> PathBuf {
        self.base_path.join("coins").join(coin_id.to_string())
    }
}

#[async_trait::async_trait]
impl ImageStorage for LocalStorage {
    async fn save(&self, coin_id: Uuid, name: &str, bytes: &[u8]) -> Result<PathBuf> {
        let dir = self.coin_directory(coin_id);
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create directory {}", dir.display()))?;

        let path = dir.join(name);
        tokio::fs::write(&path, bytes)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;

        debug!(coin_id = %coin_id, path = %path.display(), size = bytes.len(), "Stored file");
        Ok(path)
    }

    async fn load(&self, path: &Path) -> Result<Vec<u8>> {
        tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))
    }

    async fn exists(&self, path: &Path) -> bool {
        tokio::fs::try_exists(path).await.unwrap_or(false)
    }

    fn path_for(&self, coin_id: Uuid, name: &str) -> PathBuf {
        self.coin_directory(coin_id).join(name)
    }

    async fn delete_coin_directory(&self, coin_id: Uuid) -> Result<()> {
        let dir = self.coin_directory(coin_id);
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to remove {}", dir.display())),
        }
    }
}
