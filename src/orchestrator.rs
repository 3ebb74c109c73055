//! The orchestrator façade: wires the store, reconciler, dispatcher, and
//! scheduler together, and runs their periodic loops.
//!
//! Manual actions from the admin surface, timer-driven cycles, and
//! dispatch sweeps all funnel into the same store; per-item atomic
//! transitions are the only synchronization between them.

use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use tokio::sync::watch;
use tokio::time::timeout;

use crate::approval::{ApprovalReconciler, ApprovalSurface, ReconcileReport};
use crate::config::NotegateConfig;
use crate::errors::OrchestratorError;
use crate::generation::{DraftGenerator, GenerationRun, GenerationScheduler};
use crate::item::{ContentItem, ItemEvent};
use crate::publish::{DispatchReport, PublishDispatcher, Publisher};
use crate::store::{ItemFilter, QueueStore, QueueSummary, StoreError};

pub struct Orchestrator {
    store: Arc<QueueStore>,
    reconciler: ApprovalReconciler,
    dispatcher: PublishDispatcher,
    scheduler: GenerationScheduler,
    reconcile_interval: Duration,
    sweep_interval: Duration,
}

impl Orchestrator {
    pub fn new(
        config: &NotegateConfig,
        store: Arc<QueueStore>,
        generator: Arc<dyn DraftGenerator>,
        surface: Arc<dyn ApprovalSurface>,
        publisher: Arc<dyn Publisher>,
    ) -> Self {
        let reconciler = ApprovalReconciler::new(store.clone(), surface.clone());
        let dispatcher = PublishDispatcher::new(
            store.clone(),
            publisher,
            surface,
            config.publish.max_retries,
        );
        let scheduler =
            GenerationScheduler::new(store.clone(), generator, config.generation.clone());
        Self {
            store,
            reconciler,
            dispatcher,
            scheduler,
            reconcile_interval: Duration::from_secs(config.reconcile.poll_interval_secs),
            sweep_interval: Duration::from_secs(config.publish.sweep_interval_secs),
        }
    }

    pub fn store(&self) -> &Arc<QueueStore> {
        &self.store
    }

    /// Demote items stuck in `Publishing` from a previous process before
    /// accepting any new work.
    pub async fn startup_recovery(&self) -> Result<Vec<String>, StoreError> {
        let recovered = self.dispatcher.recover_interrupted().await?;
        if !recovered.is_empty() {
            tracing::warn!(
                count = recovered.len(),
                "recovered interrupted publish attempts"
            );
        }
        Ok(recovered)
    }

    pub async fn list_items(&self, filter: &ItemFilter) -> Vec<ContentItem> {
        self.store.list(filter).await
    }

    pub async fn get_item(&self, id: &str) -> Result<ContentItem, StoreError> {
        self.store.get(id).await
    }

    pub async fn status(&self) -> QueueSummary {
        self.store.summary().await
    }

    /// Manual approval from the local UI.
    pub async fn approve(&self, id: &str) -> Result<ContentItem, StoreError> {
        self.store.atomic_transition(id, &ItemEvent::Approve).await
    }

    /// Manual rejection from the local UI.
    pub async fn reject(&self, id: &str) -> Result<ContentItem, StoreError> {
        self.store.atomic_transition(id, &ItemEvent::Reject).await
    }

    pub async fn generate_now(&self) -> Result<GenerationRun, OrchestratorError> {
        self.scheduler.generate_now().await
    }

    pub async fn reconcile_now(&self) -> ReconcileReport {
        self.reconciler.run_cycle().await
    }

    pub async fn dispatch_now(&self) -> DispatchReport {
        self.dispatcher.run_sweep().await
    }

    /// Run the periodic loops until the shutdown signal flips. Startup
    /// recovery happens first so no stalled item waits out the process
    /// lifetime.
    pub async fn run(self: Arc<Self>, shutdown: watch::Receiver<bool>) -> Result<(), StoreError> {
        self.startup_recovery().await?;

        let reconcile = tokio::spawn(Self::reconcile_loop(self.clone(), shutdown.clone()));
        let dispatch = tokio::spawn(Self::dispatch_loop(self.clone(), shutdown.clone()));
        let generate = tokio::spawn(Self::generation_loop(self.clone(), shutdown));

        // Loop tasks only end on shutdown; a join error means a panic
        // inside a loop, which we surface in logs and move past so the
        // remaining loops still wind down.
        for (name, handle) in [
            ("reconcile", reconcile),
            ("dispatch", dispatch),
            ("generation", generate),
        ] {
            if let Err(e) = handle.await {
                tracing::error!(task = name, error = %e, "periodic task aborted");
            }
        }
        tracing::info!("orchestrator stopped");
        Ok(())
    }

    async fn reconcile_loop(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.reconcile_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    // A cycle that overruns its interval is a failed cycle;
                    // it is logged and retried on the next tick.
                    match timeout(self.reconcile_interval, self.reconciler.run_cycle()).await {
                        Ok(report) => {
                            tracing::debug!(
                                pushed = report.pushed.len(),
                                approved = report.approved.len(),
                                rejected = report.rejected.len(),
                                "reconcile cycle done"
                            );
                        }
                        Err(_) => tracing::warn!("reconcile cycle exceeded its deadline"),
                    }
                }
                _ = shutdown.changed() => break,
            }
        }
    }

    async fn dispatch_loop(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.sweep_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    // No timeout around the sweep itself: an in-flight
                    // publish call always runs to completion before its
                    // outcome is recorded.
                    let report = self.dispatcher.run_sweep().await;
                    if !report.failed.is_empty() {
                        tracing::warn!(failed = report.failed.len(), "dispatch sweep had failures");
                    }
                }
                _ = shutdown.changed() => break,
            }
        }
    }

    async fn generation_loop(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        loop {
            let times = self.scheduler.run_times();
            let Some(next) = GenerationScheduler::next_run_after(Local::now(), &times) else {
                tracing::info!("no generation times configured, generation loop idle");
                let _ = shutdown.changed().await;
                return;
            };
            let wait = (next - Local::now())
                .to_std()
                .unwrap_or(Duration::from_secs(0));
            tracing::debug!(next_run = %next, "generation loop sleeping");

            tokio::select! {
                _ = tokio::time::sleep(wait) => {
                    match self.scheduler.run_scheduled().await {
                        Some(Ok(run)) => {
                            tracing::info!(created = run.created.len(), "scheduled generation done");
                        }
                        Some(Err(e)) => tracing::error!(error = %e, "scheduled generation failed"),
                        None => {} // skipped: previous run still active
                    }
                }
                _ = shutdown.changed() => break,
            }
        }
    }
}
