//! Pure transition logic for the item lifecycle.
//!
//! The transition table:
//!
//! | From           | Event              | To             |
//! |----------------|--------------------|----------------|
//! | PendingReview  | approve            | Approved       |
//! | PendingReview  | reject             | Rejected       |
//! | Approved       | start_publish      | Publishing     |
//! | Approved       | reject             | Rejected       |
//! | Publishing     | publish_succeeded  | Published      |
//! | Publishing     | publish_failed     | PublishFailed  |
//! | PublishFailed  | retry_publish      | Publishing     |
//! | PublishFailed  | reject             | Rejected       |
//!
//! Anything else is rejected, with one carve-out: re-delivering `approve`
//! to an already-approved item (or `reject` to a rejected one) is accepted
//! as a no-op, because the same approval source may legitimately deliver
//! duplicate signals. Claim events (`start_publish`, `retry_publish`) are
//! never treated as no-ops; their fail-fast rejection is what guarantees
//! at most one concurrent publish attempt per item.

use chrono::{DateTime, Utc};
use thiserror::Error;

use super::{ContentItem, ItemEvent, ItemState, PublishRecord};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("event '{event}' is not legal from state '{from}'")]
pub struct InvalidTransition {
    pub from: ItemState,
    pub event: &'static str,
}

/// Result of consulting the transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// The event moves the item to a new state.
    Changed(ItemState),
    /// The event is already reflected in the current state; accept
    /// silently and leave the record unchanged.
    NoOp,
}

/// Consult the transition table. Pure: no record is touched here.
pub fn transition(from: ItemState, event: &ItemEvent) -> Result<Applied, InvalidTransition> {
    use Applied::{Changed, NoOp};
    use ItemState::*;

    let applied = match (from, event) {
        (PendingReview, ItemEvent::Approve) => Changed(Approved),
        (PendingReview, ItemEvent::Reject) => Changed(Rejected),
        (Approved, ItemEvent::StartPublish) => Changed(Publishing),
        (Approved, ItemEvent::Reject) => Changed(Rejected),
        (Publishing, ItemEvent::PublishSucceeded { .. }) => Changed(Published),
        (Publishing, ItemEvent::PublishFailed { .. }) => Changed(PublishFailed),
        (PublishFailed, ItemEvent::RetryPublish) => Changed(Publishing),
        (PublishFailed, ItemEvent::Reject) => Changed(Rejected),

        // Duplicate approval signals are idempotent.
        (Approved, ItemEvent::Approve) => NoOp,
        (Rejected, ItemEvent::Reject) => NoOp,

        _ => {
            return Err(InvalidTransition {
                from,
                event: event.name(),
            })
        }
    };
    Ok(applied)
}

/// Apply an event to a record: state change plus the field effects the
/// event carries. Returns `false` when the event was an accepted no-op.
///
/// This is the only place item fields derived from lifecycle events are
/// written; the store calls it inside its per-item critical section.
pub fn apply_event(
    item: &mut ContentItem,
    event: &ItemEvent,
    now: DateTime<Utc>,
) -> Result<bool, InvalidTransition> {
    let next = match transition(item.state, event)? {
        Applied::Changed(next) => next,
        Applied::NoOp => {
            tracing::debug!(
                item_id = %item.id,
                state = %item.state,
                event = %event,
                "duplicate event accepted as no-op"
            );
            return Ok(false);
        }
    };

    let previous = item.state;
    match event {
        ItemEvent::Approve => {
            item.approved_at = Some(now);
        }
        ItemEvent::PublishSucceeded {
            remote_id,
            share_url,
        } => {
            item.published_at = Some(now);
            item.publish_result = Some(PublishRecord::Succeeded {
                remote_id: remote_id.clone(),
                share_url: share_url.clone(),
            });
        }
        ItemEvent::PublishFailed { reason } => {
            item.retry_count += 1;
            item.publish_result = Some(PublishRecord::Failed {
                reason: reason.clone(),
                failed_at: now,
            });
        }
        ItemEvent::Reject | ItemEvent::StartPublish | ItemEvent::RetryPublish => {}
    }
    item.state = next;

    tracing::info!(
        item_id = %item.id,
        from = %previous,
        to = %next,
        event = %event,
        "item transitioned"
    );
    Ok(true)
}
