//! The publish capability and the dispatcher that drives it.

pub mod dispatcher;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::ExternalCallError;
use crate::item::ContentItem;

pub use dispatcher::{DispatchReport, PublishDispatcher};

/// What gets sent to the publishing agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishRequest {
    pub title: String,
    pub body: String,
    pub tags: Vec<String>,
    pub media_paths: Vec<String>,
}

impl PublishRequest {
    pub fn from_item(item: &ContentItem) -> Self {
        Self {
            title: item.title.clone(),
            body: item.body.clone(),
            tags: item.tags.clone(),
            media_paths: item.media_paths.clone(),
        }
    }
}

/// What the publishing agent returns on success.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishReceipt {
    pub remote_id: String,
    pub share_url: String,
}

/// Capability interface for the publishing agent. Session management and
/// transport are the agent's problem; a call either returns a receipt or
/// an error, and is always allowed to run to completion before the
/// dispatcher accepts its result.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, request: &PublishRequest) -> Result<PublishReceipt, ExternalCallError>;
}
