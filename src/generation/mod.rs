//! The draft-generation capability and the timed scheduler around it.

pub mod scheduler;

use async_trait::async_trait;

use crate::errors::ExternalCallError;
use crate::item::Draft;

pub use scheduler::{GenerationRun, GenerationScheduler};

/// Capability interface for the text/image generation pipeline. One call
/// covers the whole batch: keyword search, copy generation, and image
/// creation behind it are a black box. Failures are reported, not
/// retried within the same cycle.
#[async_trait]
pub trait DraftGenerator: Send + Sync {
    async fn generate_drafts(
        &self,
        keywords: &[String],
        style: &str,
        audience: &str,
    ) -> Result<Vec<Draft>, ExternalCallError>;
}
