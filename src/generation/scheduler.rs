//! Generation scheduler: creates new items at configured times or on
//! demand, single-flight.
//!
//! The generation pipeline is one external resource; overlapping runs
//! are never allowed. A scheduled run that finds the previous one still
//! active is skipped. A manual "generate now" is honored immediately,
//! but a second concurrent manual request is rejected, not queued.

use std::sync::Arc;

use chrono::{DateTime, Duration, Local, NaiveTime, Utc};
use tokio::sync::Mutex;

use crate::config::GenerationConfig;
use crate::errors::OrchestratorError;
use crate::item::ContentItem;
use crate::store::QueueStore;

use super::DraftGenerator;

/// Outcome of one generation run.
#[derive(Debug, Default)]
pub struct GenerationRun {
    /// Ids of items created at `PendingReview`.
    pub created: Vec<String>,
    /// Per-draft insert failures.
    pub failures: Vec<String>,
}

pub struct GenerationScheduler {
    store: Arc<QueueStore>,
    generator: Arc<dyn DraftGenerator>,
    config: GenerationConfig,
    in_flight: Mutex<()>,
}

impl GenerationScheduler {
    pub fn new(
        store: Arc<QueueStore>,
        generator: Arc<dyn DraftGenerator>,
        config: GenerationConfig,
    ) -> Self {
        Self {
            store,
            generator,
            config,
            in_flight: Mutex::new(()),
        }
    }

    /// Parsed daily run times from config; invalid entries are logged and
    /// skipped rather than failing startup.
    pub fn run_times(&self) -> Vec<NaiveTime> {
        self.config
            .times
            .iter()
            .filter_map(|raw| match NaiveTime::parse_from_str(raw, "%H:%M") {
                Ok(t) => Some(t),
                Err(e) => {
                    tracing::warn!(time = %raw, error = %e, "ignoring malformed generation time");
                    None
                }
            })
            .collect()
    }

    /// Next scheduled run strictly after `now`. Pure over its inputs so
    /// one cycle is testable without a real clock.
    pub fn next_run_after(now: DateTime<Local>, times: &[NaiveTime]) -> Option<DateTime<Local>> {
        let today = now.date_naive();
        times
            .iter()
            .filter_map(|t| {
                let at_today = today.and_time(*t).and_local_timezone(Local).earliest();
                let at_tomorrow = (today + Duration::days(1))
                    .and_time(*t)
                    .and_local_timezone(Local)
                    .earliest();
                match at_today {
                    Some(candidate) if candidate > now => Some(candidate),
                    _ => at_tomorrow,
                }
            })
            .min()
    }

    /// Manual trigger. Rejected with `GenerationBusy` if a run is already
    /// in flight.
    pub async fn generate_now(&self) -> Result<GenerationRun, OrchestratorError> {
        let Ok(guard) = self.in_flight.try_lock() else {
            return Err(OrchestratorError::GenerationBusy);
        };
        let run = self.run_locked().await;
        drop(guard);
        run
    }

    /// Scheduled trigger. Returns `None` when skipped because the
    /// previous run is still active.
    pub async fn run_scheduled(&self) -> Option<Result<GenerationRun, OrchestratorError>> {
        let Ok(guard) = self.in_flight.try_lock() else {
            tracing::warn!("previous generation run still active, skipping this one");
            return None;
        };
        let run = self.run_locked().await;
        drop(guard);
        Some(run)
    }

    async fn run_locked(&self) -> Result<GenerationRun, OrchestratorError> {
        if self.config.keywords.is_empty() {
            tracing::warn!("no keywords configured, skipping generation");
            return Ok(GenerationRun::default());
        }

        tracing::info!(
            keywords = ?self.config.keywords,
            style = %self.config.style,
            "generation run starting"
        );
        let drafts = self
            .generator
            .generate_drafts(
                &self.config.keywords,
                &self.config.style,
                &self.config.audience,
            )
            .await
            .map_err(OrchestratorError::External)?;

        let mut run = GenerationRun::default();
        for draft in drafts {
            let item =
                ContentItem::from_draft(draft, &self.config.author, &self.config.style, Utc::now());
            let id = item.id.clone();
            match self.store.upsert(item).await {
                Ok(()) => {
                    tracing::info!(item_id = %id, "draft queued for review");
                    run.created.push(id);
                }
                Err(e) => {
                    tracing::error!(item_id = %id, error = %e, "failed to queue draft");
                    run.failures.push(format!("{id}: {e}"));
                }
            }
        }
        tracing::info!(created = run.created.len(), "generation run finished");
        Ok(run)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn next_run_picks_earliest_future_time_today() {
        let now = Local.with_ymd_and_hms(2025, 3, 10, 10, 30, 0).unwrap();
        let times = vec![t(9, 0), t(14, 0), t(19, 0)];
        let next = GenerationScheduler::next_run_after(now, &times).unwrap();
        assert_eq!(
            next,
            Local.with_ymd_and_hms(2025, 3, 10, 14, 0, 0).unwrap()
        );
    }

    #[test]
    fn next_run_rolls_to_tomorrow_after_last_slot() {
        let now = Local.with_ymd_and_hms(2025, 3, 10, 20, 0, 0).unwrap();
        let times = vec![t(9, 0), t(14, 0), t(19, 0)];
        let next = GenerationScheduler::next_run_after(now, &times).unwrap();
        assert_eq!(next, Local.with_ymd_and_hms(2025, 3, 11, 9, 0, 0).unwrap());
    }

    #[test]
    fn no_times_means_no_next_run() {
        let now = Local.with_ymd_and_hms(2025, 3, 10, 10, 0, 0).unwrap();
        assert_eq!(GenerationScheduler::next_run_after(now, &[]), None);
    }

    #[test]
    fn a_slot_equal_to_now_rolls_over() {
        let now = Local.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap();
        let times = vec![t(9, 0)];
        let next = GenerationScheduler::next_run_after(now, &times).unwrap();
        assert_eq!(next, Local.with_ymd_and_hms(2025, 3, 11, 9, 0, 0).unwrap());
    }
}
