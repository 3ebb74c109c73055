//! Shared mock capabilities for integration tests.
#![allow(dead_code)] // not every test binary uses every mock

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use notegate::approval::{ApprovalSurface, ExternalStatus, RecordSummary, SurfaceOutcome};
use notegate::errors::ExternalCallError;
use notegate::generation::DraftGenerator;
use notegate::item::Draft;
use notegate::publish::{PublishReceipt, PublishRequest, Publisher};

pub fn draft(title: &str) -> Draft {
    Draft {
        title: title.to_string(),
        body: format!("{title} body"),
        tags: vec!["test".to_string()],
        summary: format!("{title} summary"),
        source_keywords: BTreeSet::from(["ai".to_string()]),
        media_paths: vec![],
    }
}

/// Generator returning a fixed batch of drafts, optionally slowly.
pub struct MockGenerator {
    drafts: Vec<Draft>,
    delay: Option<Duration>,
    fail: bool,
    calls: AtomicUsize,
}

impl MockGenerator {
    pub fn returning(drafts: Vec<Draft>) -> Self {
        Self {
            drafts,
            delay: None,
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn slow(drafts: Vec<Draft>, delay: Duration) -> Self {
        Self {
            drafts,
            delay: Some(delay),
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            drafts: vec![],
            delay: None,
            fail: true,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DraftGenerator for MockGenerator {
    async fn generate_drafts(
        &self,
        _keywords: &[String],
        _style: &str,
        _audience: &str,
    ) -> Result<Vec<Draft>, ExternalCallError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(ExternalCallError::new("draft generation", "provider down"));
        }
        Ok(self.drafts.clone())
    }
}

/// In-memory approval surface with per-ref failure injection.
#[derive(Default)]
pub struct MockSurface {
    statuses: Mutex<HashMap<String, String>>,
    unreachable: Mutex<HashSet<String>>,
    outcomes: Mutex<Vec<(String, SurfaceOutcome)>>,
    push_fails: Mutex<usize>,
    next_id: AtomicUsize,
}

impl MockSurface {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_status(&self, external_ref: &str, status: &str) {
        self.statuses
            .lock()
            .unwrap()
            .insert(external_ref.to_string(), status.to_string());
    }

    /// Make `fetch_status` fail for one record.
    pub fn make_unreachable(&self, external_ref: &str) {
        self.unreachable
            .lock()
            .unwrap()
            .insert(external_ref.to_string());
    }

    /// Make the next `n` pushes fail.
    pub fn fail_next_pushes(&self, n: usize) {
        *self.push_fails.lock().unwrap() = n;
    }

    pub fn recorded_outcomes(&self) -> Vec<(String, SurfaceOutcome)> {
        self.outcomes.lock().unwrap().clone()
    }
}

#[async_trait]
impl ApprovalSurface for MockSurface {
    async fn push_record(&self, _record: &RecordSummary) -> Result<String, ExternalCallError> {
        {
            let mut fails = self.push_fails.lock().unwrap();
            if *fails > 0 {
                *fails -= 1;
                return Err(ExternalCallError::new("approval surface push", "unreachable"));
            }
        }
        let external_ref = format!("rec_{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        self.statuses
            .lock()
            .unwrap()
            .insert(external_ref.clone(), "pending".to_string());
        Ok(external_ref)
    }

    async fn fetch_status(&self, external_ref: &str) -> Result<ExternalStatus, ExternalCallError> {
        if self.unreachable.lock().unwrap().contains(external_ref) {
            return Err(ExternalCallError::new(
                "approval surface fetch",
                "unreachable",
            ));
        }
        let statuses = self.statuses.lock().unwrap();
        let raw = statuses.get(external_ref).ok_or_else(|| {
            ExternalCallError::new("approval surface fetch", format!("no record {external_ref}"))
        })?;
        Ok(ExternalStatus::parse(raw))
    }

    async fn record_outcome(
        &self,
        external_ref: &str,
        outcome: &SurfaceOutcome,
    ) -> Result<(), ExternalCallError> {
        if let SurfaceOutcome::Published { .. } = outcome {
            self.statuses
                .lock()
                .unwrap()
                .insert(external_ref.to_string(), "published".to_string());
        }
        self.outcomes
            .lock()
            .unwrap()
            .push((external_ref.to_string(), outcome.clone()));
        Ok(())
    }
}

/// Publisher driven by a script of responses; repeats the last response
/// once the script runs out.
pub struct MockPublisher {
    script: Mutex<VecDeque<Result<PublishReceipt, String>>>,
    calls: AtomicUsize,
}

impl MockPublisher {
    pub fn succeeding(remote_id: &str, share_url: &str) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(VecDeque::from([Ok(PublishReceipt {
                remote_id: remote_id.to_string(),
                share_url: share_url.to_string(),
            })])),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn always_failing(reason: &str) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(VecDeque::from([Err(reason.to_string())])),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Publisher for MockPublisher {
    async fn publish(&self, _request: &PublishRequest) -> Result<PublishReceipt, ExternalCallError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut script = self.script.lock().unwrap();
        let response = if script.len() > 1 {
            script.pop_front().unwrap()
        } else {
            script.front().cloned().unwrap()
        };
        response.map_err(|reason| ExternalCallError::new("publish", reason))
    }
}
