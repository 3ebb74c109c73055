//! The external approval surface: a record-oriented store a human edits
//! out of band, used as an alternative review channel to the local UI.

mod local;
pub mod reconciler;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::ExternalCallError;
use crate::item::ContentItem;

pub use local::LocalApprovalSurface;
pub use reconciler::{ApprovalReconciler, ReconcileReport};

/// Status field values on the external surface. Anything outside the
/// recognized set is carried verbatim and reported as an anomaly, never
/// guessed at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExternalStatus {
    Pending,
    Approved,
    Rejected,
    Published,
    Unrecognized(String),
}

impl ExternalStatus {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pending" => ExternalStatus::Pending,
            "approved" => ExternalStatus::Approved,
            "rejected" => ExternalStatus::Rejected,
            "published" => ExternalStatus::Published,
            _ => ExternalStatus::Unrecognized(raw.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ExternalStatus::Pending => "pending",
            ExternalStatus::Approved => "approved",
            ExternalStatus::Rejected => "rejected",
            ExternalStatus::Published => "published",
            ExternalStatus::Unrecognized(raw) => raw,
        }
    }
}

/// The summarized record mirrored to the surface when an item enters
/// review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordSummary {
    pub item_id: String,
    pub title: String,
    pub body: String,
    pub tags: Vec<String>,
    pub summary: String,
    pub keywords: Vec<String>,
    pub media_paths: Vec<String>,
    pub author: String,
    pub created_at: DateTime<Utc>,
}

impl RecordSummary {
    pub fn from_item(item: &ContentItem) -> Self {
        Self {
            item_id: item.id.clone(),
            title: item.title.clone(),
            body: item.body.clone(),
            tags: item.tags.clone(),
            summary: item.summary.clone(),
            keywords: item.source_keywords.iter().cloned().collect(),
            media_paths: item.media_paths.clone(),
            author: item.author.clone(),
            created_at: item.created_at,
        }
    }
}

/// Publish completion mirrored back to the surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceOutcome {
    Published { remote_id: String, share_url: String },
    PublishFailed { reason: String },
}

/// Capability interface for the approval surface. The real system talks
/// a spreadsheet-style HTTP API; any client that can push a record,
/// read its status field, and record a publish outcome fits behind this.
#[async_trait]
pub trait ApprovalSurface: Send + Sync {
    /// Mirror a summarized record; returns the surface's record id.
    async fn push_record(&self, record: &RecordSummary) -> Result<String, ExternalCallError>;

    /// Read the current value of the human-editable status field.
    async fn fetch_status(&self, external_ref: &str) -> Result<ExternalStatus, ExternalCallError>;

    /// Write the publish outcome onto the record.
    async fn record_outcome(
        &self,
        external_ref: &str,
        outcome: &SurfaceOutcome,
    ) -> Result<(), ExternalCallError>;
}
