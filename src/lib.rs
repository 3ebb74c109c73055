// notegate - content lifecycle orchestration
// Exposes the core components for testing and integration

pub mod approval;
pub mod config;
pub mod errors;
pub mod generation;
pub mod item;
pub mod orchestrator;
pub mod providers;
pub mod publish;
pub mod store;
pub mod telemetry;

// Re-export key types for easy access
pub use approval::{
    ApprovalReconciler, ApprovalSurface, ExternalStatus, LocalApprovalSurface, ReconcileReport,
    RecordSummary, SurfaceOutcome,
};
pub use config::NotegateConfig;
pub use errors::{ExternalCallError, OrchestratorError};
pub use generation::{DraftGenerator, GenerationRun, GenerationScheduler};
pub use item::{ContentItem, Draft, ItemEvent, ItemState, PublishRecord};
pub use orchestrator::Orchestrator;
pub use publish::{
    DispatchReport, PublishDispatcher, PublishReceipt, PublishRequest, Publisher,
};
pub use store::{ItemFilter, JsonFileBackend, MemoryBackend, QueueBackend, QueueStore, StoreError};
pub use telemetry::init_telemetry;
