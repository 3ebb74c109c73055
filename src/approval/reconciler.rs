//! Reconciles local item state against the external approval surface.
//!
//! Push direction: items newly in review are mirrored out and the
//! returned record id stored as `external_ref`. Pull direction: the
//! status field of every mirrored, still-pending item is fetched and
//! mapped onto a lifecycle event. The surface is authoritative for
//! pending items; races with manual local actions resolve through the
//! state machine's idempotent-approve rule, so whichever signal lands
//! first wins and the duplicate is a silent no-op.

use std::sync::Arc;

use crate::item::{ItemEvent, ItemState};
use crate::store::{ItemFilter, QueueStore, StoreError};

use super::{ApprovalSurface, ExternalStatus, RecordSummary};

/// Per-item outcomes of one reconciliation cycle. Failures are isolated:
/// one unreachable record never aborts the rest of the batch.
#[derive(Debug, Default)]
pub struct ReconcileReport {
    /// Items mirrored to the surface this cycle.
    pub pushed: Vec<String>,
    /// Items approved from the surface.
    pub approved: Vec<String>,
    /// Items rejected from the surface.
    pub rejected: Vec<String>,
    /// Items whose surface status was not actionable: (item id, raw status).
    pub anomalies: Vec<(String, String)>,
    /// Per-item push/pull failures: (item id, error description).
    pub failures: Vec<(String, String)>,
}

impl ReconcileReport {
    pub fn is_clean(&self) -> bool {
        self.anomalies.is_empty() && self.failures.is_empty()
    }
}

pub struct ApprovalReconciler {
    store: Arc<QueueStore>,
    surface: Arc<dyn ApprovalSurface>,
}

impl ApprovalReconciler {
    pub fn new(store: Arc<QueueStore>, surface: Arc<dyn ApprovalSurface>) -> Self {
        Self { store, surface }
    }

    /// One full reconciliation cycle: push unmirrored pending items,
    /// then pull statuses for mirrored ones.
    pub async fn run_cycle(&self) -> ReconcileReport {
        let mut report = ReconcileReport::default();
        self.push_pending(&mut report).await;
        self.pull_statuses(&mut report).await;
        if !report.is_clean() {
            tracing::warn!(
                anomalies = report.anomalies.len(),
                failures = report.failures.len(),
                "reconcile cycle finished with issues"
            );
        }
        report
    }

    async fn push_pending(&self, report: &mut ReconcileReport) {
        let pending = self
            .store
            .list(&ItemFilter::all().with_state(ItemState::PendingReview))
            .await;

        for item in pending.into_iter().filter(|i| i.external_ref.is_none()) {
            let summary = RecordSummary::from_item(&item);
            match self.surface.push_record(&summary).await {
                Ok(external_ref) => {
                    match self.store.set_external_ref(&item.id, &external_ref).await {
                        Ok(_) => report.pushed.push(item.id),
                        Err(e) => report.failures.push((item.id, e.to_string())),
                    }
                }
                Err(e) => {
                    // Retried on the next scheduled cycle, not abandoned.
                    tracing::warn!(item_id = %item.id, error = %e, "mirror push failed");
                    report.failures.push((item.id, e.to_string()));
                }
            }
        }
    }

    async fn pull_statuses(&self, report: &mut ReconcileReport) {
        let pending = self
            .store
            .list(&ItemFilter::all().with_state(ItemState::PendingReview))
            .await;

        for item in pending {
            let Some(external_ref) = item.external_ref.clone() else {
                continue;
            };
            match self.surface.fetch_status(&external_ref).await {
                Ok(status) => self.apply_status(&item.id, status, report).await,
                Err(e) => {
                    tracing::warn!(item_id = %item.id, error = %e, "status pull failed");
                    report.failures.push((item.id, e.to_string()));
                }
            }
        }
    }

    async fn apply_status(&self, item_id: &str, status: ExternalStatus, report: &mut ReconcileReport) {
        let event = match status {
            ExternalStatus::Pending => return,
            ExternalStatus::Approved => ItemEvent::Approve,
            ExternalStatus::Rejected => ItemEvent::Reject,
            // `published` is written by the dispatcher, never by a
            // reviewer; seeing it on a pending item means the surface was
            // edited out of band. Report, do not guess.
            ExternalStatus::Published | ExternalStatus::Unrecognized(_) => {
                tracing::warn!(
                    item_id = %item_id,
                    status = %status.as_str(),
                    "surface status not actionable for pending item"
                );
                report
                    .anomalies
                    .push((item_id.to_string(), status.as_str().to_string()));
                return;
            }
        };

        match self.store.atomic_transition(item_id, &event).await {
            Ok(_) => match event {
                ItemEvent::Approve => report.approved.push(item_id.to_string()),
                ItemEvent::Reject => report.rejected.push(item_id.to_string()),
                _ => unreachable!("reconciler only applies approval events"),
            },
            Err(StoreError::InvalidTransition(e)) => {
                // A manual action moved the item first; the surface signal
                // lost the race. Surfaced, never coerced.
                report.failures.push((item_id.to_string(), e.to_string()));
            }
            Err(e) => report.failures.push((item_id.to_string(), e.to_string())),
        }
    }
}
