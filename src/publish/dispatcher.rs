//! Publish dispatcher: claims approved items and drives them through the
//! publishing agent, at most one concurrent attempt per item.
//!
//! The claim (`start_publish` / `retry_publish`) lands before the network
//! call, so a racing dispatcher fails fast with `InvalidTransition`
//! instead of double-publishing. The price is that a crash mid-call
//! leaves the item in `Publishing`; startup recovery demotes those to
//! `PublishFailed` so they become retryable instead of stalling forever.

use std::sync::Arc;

use crate::approval::{ApprovalSurface, SurfaceOutcome};
use crate::item::{ContentItem, ItemEvent, ItemState, PublishRecord};
use crate::store::{ItemFilter, QueueStore, StoreError};

use super::{PublishRequest, Publisher};

/// Per-item outcomes of one dispatcher sweep.
#[derive(Debug, Default)]
pub struct DispatchReport {
    /// Items that reached `Published` this sweep.
    pub published: Vec<String>,
    /// Items whose attempt failed: (item id, reason).
    pub failed: Vec<(String, String)>,
    /// Items another dispatcher claimed first.
    pub lost_claim: Vec<String>,
    /// Items past the retry bound, parked for manual disposition:
    /// (item id, attempts).
    pub retry_exhausted: Vec<(String, u32)>,
}

impl DispatchReport {
    pub fn attempted(&self) -> usize {
        self.published.len() + self.failed.len()
    }
}

pub struct PublishDispatcher {
    store: Arc<QueueStore>,
    publisher: Arc<dyn Publisher>,
    surface: Arc<dyn ApprovalSurface>,
    max_retries: u32,
}

impl PublishDispatcher {
    pub fn new(
        store: Arc<QueueStore>,
        publisher: Arc<dyn Publisher>,
        surface: Arc<dyn ApprovalSurface>,
        max_retries: u32,
    ) -> Self {
        Self {
            store,
            publisher,
            surface,
            max_retries,
        }
    }

    /// One sweep over all eligible items. Errors stay per-item; the sweep
    /// never aborts early.
    pub async fn run_sweep(&self) -> DispatchReport {
        let mut report = DispatchReport::default();

        // Snapshot both eligible sets up front so an item failing in this
        // sweep is not retried by the same sweep.
        let approved = self
            .store
            .list(&ItemFilter::all().with_state(ItemState::Approved))
            .await;
        let failed = self
            .store
            .list(&ItemFilter::all().with_state(ItemState::PublishFailed))
            .await;

        for item in approved {
            self.dispatch_one(item, ItemEvent::StartPublish, &mut report)
                .await;
        }

        for item in failed {
            if item.retry_count >= self.max_retries {
                report.retry_exhausted.push((item.id, item.retry_count));
                continue;
            }
            self.dispatch_one(item, ItemEvent::RetryPublish, &mut report)
                .await;
        }

        tracing::info!(
            published = report.published.len(),
            failed = report.failed.len(),
            lost_claim = report.lost_claim.len(),
            retry_exhausted = report.retry_exhausted.len(),
            "dispatch sweep complete"
        );
        report
    }

    async fn dispatch_one(&self, item: ContentItem, claim: ItemEvent, report: &mut DispatchReport) {
        // Claim before the network call: exactly one dispatcher wins.
        let claimed = match self.store.atomic_transition(&item.id, &claim).await {
            Ok(claimed) => claimed,
            Err(StoreError::InvalidTransition(_)) => {
                tracing::debug!(item_id = %item.id, "item already claimed or moved on");
                report.lost_claim.push(item.id);
                return;
            }
            Err(e) => {
                report.failed.push((item.id, e.to_string()));
                return;
            }
        };

        let request = PublishRequest::from_item(&claimed);
        match self.publisher.publish(&request).await {
            Ok(receipt) => {
                let event = ItemEvent::PublishSucceeded {
                    remote_id: receipt.remote_id.clone(),
                    share_url: receipt.share_url.clone(),
                };
                match self.store.atomic_transition(&claimed.id, &event).await {
                    Ok(published) => {
                        self.mirror_outcome(&published).await;
                        report.published.push(published.id);
                    }
                    Err(e) => report.failed.push((claimed.id, e.to_string())),
                }
            }
            Err(e) => {
                tracing::warn!(item_id = %claimed.id, error = %e, "publish attempt failed");
                let event = ItemEvent::PublishFailed {
                    reason: e.to_string(),
                };
                match self.store.atomic_transition(&claimed.id, &event).await {
                    Ok(failed) => {
                        self.mirror_outcome(&failed).await;
                        if failed.retry_count >= self.max_retries {
                            report
                                .retry_exhausted
                                .push((failed.id.clone(), failed.retry_count));
                        }
                        report.failed.push((failed.id, e.to_string()));
                    }
                    Err(store_err) => report.failed.push((claimed.id, store_err.to_string())),
                }
            }
        }
    }

    /// Mirror the publish outcome to the approval surface. A mirror
    /// failure does not change item state; the record catches up when the
    /// surface is next reachable.
    async fn mirror_outcome(&self, item: &ContentItem) {
        let Some(external_ref) = &item.external_ref else {
            return;
        };
        let outcome = match &item.publish_result {
            Some(PublishRecord::Succeeded {
                remote_id,
                share_url,
            }) => SurfaceOutcome::Published {
                remote_id: remote_id.clone(),
                share_url: share_url.clone(),
            },
            Some(PublishRecord::Failed { reason, .. }) => SurfaceOutcome::PublishFailed {
                reason: reason.clone(),
            },
            None => return,
        };
        if let Err(e) = self.surface.record_outcome(external_ref, &outcome).await {
            tracing::warn!(
                item_id = %item.id,
                external_ref = %external_ref,
                error = %e,
                "failed to mirror publish outcome"
            );
        }
    }

    /// Startup scan: anything still in `Publishing` is an interrupted
    /// attempt from a previous process. Demote to `PublishFailed` so it
    /// is eligible for retry. The interrupted call did go out, so it
    /// counts against the retry bound.
    pub async fn recover_interrupted(&self) -> Result<Vec<String>, StoreError> {
        let stuck = self
            .store
            .list(&ItemFilter::all().with_state(ItemState::Publishing))
            .await;
        let mut recovered = Vec::with_capacity(stuck.len());
        for item in stuck {
            let event = ItemEvent::PublishFailed {
                reason: "publish attempt interrupted by restart".to_string(),
            };
            self.store.atomic_transition(&item.id, &event).await?;
            tracing::warn!(item_id = %item.id, "demoted interrupted publish attempt");
            recovered.push(item.id);
        }
        Ok(recovered)
    }
}
