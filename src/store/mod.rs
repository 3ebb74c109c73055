//! Durable queue of content items with atomic per-item transitions.
//!
//! The store owns the only mutable shared state in the system. All
//! lifecycle changes go through [`QueueStore::atomic_transition`], which
//! serializes concurrent callers per item id: one caller gets the event
//! applied against the pre-transition state, the other is re-evaluated
//! against the result and fails with `InvalidTransition` instead of
//! silently overwriting.

mod backend;
mod filter;

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};

use crate::item::{apply_event, ContentItem, InvalidTransition, ItemEvent, ItemState};

pub use backend::{JsonFileBackend, MemoryBackend, QueueBackend};
pub use filter::ItemFilter;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no item with id {id}")]
    NotFound { id: String },

    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),

    #[error("item {id} is already mirrored as {existing}, refusing to re-link as {requested}")]
    ExternalRefConflict {
        id: String,
        existing: String,
        requested: String,
    },

    #[error("queue I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("queue serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Queue counts by state, for status reporting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueSummary {
    pub pending_review: usize,
    pub approved: usize,
    pub rejected: usize,
    pub publishing: usize,
    pub published: usize,
    pub publish_failed: usize,
}

impl QueueSummary {
    pub fn total(&self) -> usize {
        self.pending_review
            + self.approved
            + self.rejected
            + self.publishing
            + self.published
            + self.publish_failed
    }
}

pub struct QueueStore {
    backend: Arc<dyn QueueBackend>,
    items: RwLock<HashMap<String, ContentItem>>,
    item_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    /// Serializes snapshot writes so concurrent different-item mutations
    /// cannot interleave a stale snapshot over a newer one.
    persist_lock: Mutex<()>,
}

impl QueueStore {
    /// Load the queue from the backend. A failure here is fatal to the
    /// process; nothing else can proceed without the store.
    pub async fn open(backend: Arc<dyn QueueBackend>) -> Result<Self, StoreError> {
        let loaded = backend.load().await?;
        let mut items = HashMap::with_capacity(loaded.len());
        for item in loaded {
            items.insert(item.id.clone(), item);
        }
        Ok(Self {
            backend,
            items: RwLock::new(items),
            item_locks: Mutex::new(HashMap::new()),
            persist_lock: Mutex::new(()),
        })
    }

    pub async fn in_memory() -> Self {
        // MemoryBackend::load never fails.
        Self::open(Arc::new(MemoryBackend))
            .await
            .expect("in-memory store cannot fail to open")
    }

    async fn lock_for(&self, id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.item_locks.lock().await;
        locks
            .entry(id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Persist a snapshot with `updated` applied, then commit it to the
    /// in-memory map. If the write fails, memory is untouched, so both
    /// views stay at the pre-transition record.
    async fn persist_and_commit(&self, updated: ContentItem) -> Result<(), StoreError> {
        let _guard = self.persist_lock.lock().await;
        let snapshot: Vec<ContentItem> = {
            let items = self.items.read().await;
            let mut all: Vec<ContentItem> = items
                .values()
                .filter(|i| i.id != updated.id)
                .cloned()
                .collect();
            all.push(updated.clone());
            all.sort_by(|a, b| a.created_at.cmp(&b.created_at));
            all
        };
        self.backend.persist(&snapshot).await?;
        self.items
            .write()
            .await
            .insert(updated.id.clone(), updated);
        Ok(())
    }

    pub async fn get(&self, id: &str) -> Result<ContentItem, StoreError> {
        self.items
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound { id: id.to_string() })
    }

    /// List items matching the filter, ordered by `created_at` ascending.
    pub async fn list(&self, filter: &ItemFilter) -> Vec<ContentItem> {
        let items = self.items.read().await;
        let mut matched: Vec<ContentItem> =
            items.values().filter(|i| filter.matches(i)).cloned().collect();
        matched.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        matched
    }

    pub async fn summary(&self) -> QueueSummary {
        let items = self.items.read().await;
        let mut summary = QueueSummary::default();
        for item in items.values() {
            match item.state {
                ItemState::PendingReview => summary.pending_review += 1,
                ItemState::Approved => summary.approved += 1,
                ItemState::Rejected => summary.rejected += 1,
                ItemState::Publishing => summary.publishing += 1,
                ItemState::Published => summary.published += 1,
                ItemState::PublishFailed => summary.publish_failed += 1,
            }
        }
        summary
    }

    /// Insert or replace a full record. Used for item creation; lifecycle
    /// changes must go through [`Self::atomic_transition`].
    pub async fn upsert(&self, item: ContentItem) -> Result<(), StoreError> {
        let lock = self.lock_for(&item.id).await;
        let _guard = lock.lock().await;
        self.persist_and_commit(item).await
    }

    /// Apply a lifecycle event to one item, atomically. Exactly one of
    /// two concurrent callers sees the pre-transition state; the other is
    /// evaluated against the committed result.
    pub async fn atomic_transition(
        &self,
        id: &str,
        event: &ItemEvent,
    ) -> Result<ContentItem, StoreError> {
        let lock = self.lock_for(id).await;
        let _guard = lock.lock().await;

        let mut item = self.get(id).await?;
        let changed = apply_event(&mut item, event, Utc::now())?;
        if !changed {
            // Accepted duplicate; nothing to persist.
            return Ok(item);
        }
        self.persist_and_commit(item.clone()).await?;
        Ok(item)
    }

    /// Record the external-surface correlation for an item. Once set, the
    /// ref is never cleared or reassigned; re-recording the same ref is a
    /// no-op.
    pub async fn set_external_ref(
        &self,
        id: &str,
        external_ref: &str,
    ) -> Result<ContentItem, StoreError> {
        let lock = self.lock_for(id).await;
        let _guard = lock.lock().await;

        let mut item = self.get(id).await?;
        match &item.external_ref {
            Some(existing) if existing == external_ref => return Ok(item),
            Some(existing) => {
                return Err(StoreError::ExternalRefConflict {
                    id: id.to_string(),
                    existing: existing.clone(),
                    requested: external_ref.to_string(),
                })
            }
            None => {}
        }
        item.external_ref = Some(external_ref.to_string());
        self.persist_and_commit(item.clone()).await?;
        Ok(item)
    }
}
