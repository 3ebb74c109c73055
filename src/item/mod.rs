//! Content item record and lifecycle state machine.

pub mod state_machine;

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use state_machine::{apply_event, transition, Applied, InvalidTransition};

/// Lifecycle state of a content item. Changes only through
/// [`state_machine::transition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemState {
    PendingReview,
    Approved,
    Rejected,
    Publishing,
    Published,
    PublishFailed,
}

impl ItemState {
    /// Terminal states are retained for audit and never transition again
    /// (except `PublishFailed`, which permits retry or manual rejection).
    pub fn is_terminal(&self) -> bool {
        matches!(self, ItemState::Rejected | ItemState::Published)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ItemState::PendingReview => "pending_review",
            ItemState::Approved => "approved",
            ItemState::Rejected => "rejected",
            ItemState::Publishing => "publishing",
            ItemState::Published => "published",
            ItemState::PublishFailed => "publish_failed",
        }
    }
}

impl std::fmt::Display for ItemState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ItemState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending_review" | "pending" => Ok(ItemState::PendingReview),
            "approved" => Ok(ItemState::Approved),
            "rejected" => Ok(ItemState::Rejected),
            "publishing" => Ok(ItemState::Publishing),
            "published" => Ok(ItemState::Published),
            "publish_failed" | "failed" => Ok(ItemState::PublishFailed),
            other => Err(format!("unknown item state: {other}")),
        }
    }
}

/// Event driving a lifecycle transition. Payload-bearing events carry the
/// field updates that land together with the state change, so no caller
/// mutates `publish_result` or `retry_count` outside the transition path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemEvent {
    Approve,
    Reject,
    StartPublish,
    RetryPublish,
    PublishSucceeded { remote_id: String, share_url: String },
    PublishFailed { reason: String },
}

impl ItemEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ItemEvent::Approve => "approve",
            ItemEvent::Reject => "reject",
            ItemEvent::StartPublish => "start_publish",
            ItemEvent::RetryPublish => "retry_publish",
            ItemEvent::PublishSucceeded { .. } => "publish_succeeded",
            ItemEvent::PublishFailed { .. } => "publish_failed",
        }
    }
}

impl std::fmt::Display for ItemEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Outcome of the most recent publish attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum PublishRecord {
    Succeeded { remote_id: String, share_url: String },
    Failed { reason: String, failed_at: DateTime<Utc> },
}

/// A generated draft as returned by the generation capability, before it
/// becomes a tracked item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Draft {
    pub title: String,
    pub body: String,
    pub tags: Vec<String>,
    pub summary: String,
    pub source_keywords: BTreeSet<String>,
    pub media_paths: Vec<String>,
}

/// One piece of generated content tracked through the lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: String,
    pub title: String,
    pub body: String,
    pub tags: Vec<String>,
    pub summary: String,
    pub source_keywords: BTreeSet<String>,
    pub media_paths: Vec<String>,
    pub author: String,
    pub style: String,
    pub state: ItemState,
    pub created_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
    pub published_at: Option<DateTime<Utc>>,
    /// Correlates this item with its record on the external approval
    /// surface. Set at most once, never reassigned.
    pub external_ref: Option<String>,
    pub publish_result: Option<PublishRecord>,
    pub retry_count: u32,
}

impl ContentItem {
    /// Create a fresh item from a generated draft, entering review.
    pub fn from_draft(draft: Draft, author: &str, style: &str, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: draft.title,
            body: draft.body,
            tags: draft.tags,
            summary: draft.summary,
            source_keywords: draft.source_keywords,
            media_paths: draft.media_paths,
            author: author.to_string(),
            style: style.to_string(),
            state: ItemState::PendingReview,
            created_at: now,
            approved_at: None,
            published_at: None,
            external_ref: None,
            publish_result: None,
            retry_count: 0,
        }
    }

    pub fn matches_keyword(&self, keyword: &str) -> bool {
        self.source_keywords.iter().any(|k| k == keyword)
            || self.tags.iter().any(|t| t == keyword)
    }
}
