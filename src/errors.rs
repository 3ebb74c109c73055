//! Error taxonomy shared across the orchestrator.

use thiserror::Error;

use crate::store::StoreError;

/// A call to one of the external capabilities (generation, approval
/// surface, publish) failed. Always isolated to the one item or cycle
/// that issued it; sibling work proceeds.
#[derive(Debug, Clone, Error)]
#[error("{operation} failed: {message}")]
pub struct ExternalCallError {
    pub operation: &'static str,
    pub message: String,
}

impl ExternalCallError {
    pub fn new(operation: &'static str, message: impl Into<String>) -> Self {
        Self {
            operation,
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    External(#[from] ExternalCallError),

    #[error("publish retries exhausted for item {id} after {attempts} attempts")]
    RetryExhausted { id: String, attempts: u32 },

    #[error("a generation run is already in progress")]
    GenerationBusy,
}
