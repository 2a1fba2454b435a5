//! JSON file storage implementation.
//!
//! The whole store lives in one pretty-printed JSON file. Saves go to a
//! sibling temporary file first and are renamed over the target, so a reader
//! sees either the old snapshot or the new one.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use ebs_core::Store;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use super::{Result, Storage};

/// Default snapshot file name.
pub const DEFAULT_DATA_FILE: &str = "ebs_data.json";

/// File-based JSON storage backend.
#[derive(Debug, Clone)]
pub struct JsonStorage {
    path: PathBuf,
}

impl JsonStorage {
    /// Create storage backed by the file at `path`. Nothing is touched on disk
    /// until the first save.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Snapshot file location.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| DEFAULT_DATA_FILE.into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    async fn write_and_replace(&self, tmp: &Path, json: &str) -> std::io::Result<()> {
        let mut file = fs::File::create(tmp).await?;
        file.write_all(json.as_bytes()).await?;
        file.sync_all().await?;
        drop(file);
        fs::rename(tmp, &self.path).await
    }
}

#[async_trait]
impl Storage for JsonStorage {
    async fn load_store(&self) -> Result<Store> {
        let json = match fs::read_to_string(&self.path).await {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No snapshot at {}, starting empty", self.path.display());
                return Ok(Store::default());
            }
            Err(e) => return Err(e.into()),
        };

        let store: Store = serde_json::from_str(&json)?;
        store.validate()?;
        debug!(
            tasks = store.tasks().len(),
            velocity = store.velocity(),
            "Loaded snapshot from {}",
            self.path.display()
        );
        Ok(store)
    }

    async fn save_store(&mut self, store: &Store) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_string_pretty(store)?;
        let tmp = self.temp_path();

        if let Err(e) = self.write_and_replace(&tmp, &json).await {
            if let Err(cleanup) = fs::remove_file(&tmp).await {
                debug!(error = %cleanup, "Could not remove {}", tmp.display());
            }
            return Err(e.into());
        }

        debug!(tasks = store.tasks().len(), "Saved snapshot to {}", self.path.display());
        Ok(())
    }
}
