//! Snapshot persistence backends for the queue store.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

use super::StoreError;
use crate::item::ContentItem;

/// Durable representation of the queue. The store writes the whole
/// snapshot on every mutation; a backend must make that write
/// all-or-nothing so a failed persist never leaves a torn file.
#[async_trait]
pub trait QueueBackend: Send + Sync {
    async fn load(&self) -> Result<Vec<ContentItem>, StoreError>;
    async fn persist(&self, items: &[ContentItem]) -> Result<(), StoreError>;
}

/// JSON-file backend. Writes to a temporary sibling and renames it over
/// the live file, so readers and crash recovery only ever see a complete
/// snapshot.
pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl QueueBackend for JsonFileBackend {
    async fn load(&self) -> Result<Vec<ContentItem>, StoreError> {
        if !self.path.exists() {
            tracing::info!(file = ?self.path, "no existing queue file, starting empty");
            return Ok(Vec::new());
        }
        let contents = fs::read_to_string(&self.path).await?;
        let items: Vec<ContentItem> = serde_json::from_str(&contents)?;
        tracing::info!(file = ?self.path, count = items.len(), "queue loaded");
        Ok(items)
    }

    async fn persist(&self, items: &[ContentItem]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let serialized = serde_json::to_string_pretty(items)?;
        let temp = self.path.with_extension("json.tmp");
        fs::write(&temp, serialized).await?;
        fs::rename(&temp, &self.path).await?;
        Ok(())
    }
}

/// In-memory backend for tests and ephemeral runs; nothing survives a
/// restart.
#[derive(Default)]
pub struct MemoryBackend;

#[async_trait]
impl QueueBackend for MemoryBackend {
    async fn load(&self) -> Result<Vec<ContentItem>, StoreError> {
        Ok(Vec::new())
    }

    async fn persist(&self, _items: &[ContentItem]) -> Result<(), StoreError> {
        Ok(())
    }
}
