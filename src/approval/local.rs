//! File-backed approval surface.
//!
//! Used when no remote surface is configured: records live in a JSON
//! file next to the queue, and a reviewer edits the `status` field by
//! hand (or through the admin UI). Doubles as the production twin of the
//! test surface.

use std::collections::BTreeMap;
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{ApprovalSurface, ExternalStatus, RecordSummary, SurfaceOutcome};
use crate::errors::ExternalCallError;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SurfaceRecord {
    record_id: String,
    item_id: String,
    title: String,
    body: String,
    tags: Vec<String>,
    summary: String,
    keywords: Vec<String>,
    media_paths: Vec<String>,
    author: String,
    status: String,
    created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    remote_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    share_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    failure_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    updated_at: Option<DateTime<Utc>>,
}

pub struct LocalApprovalSurface {
    path: PathBuf,
    records: Mutex<BTreeMap<String, SurfaceRecord>>,
}

impl LocalApprovalSurface {
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, ExternalCallError> {
        let path = path.into();
        let records = if path.exists() {
            let contents = fs::read_to_string(&path)
                .await
                .map_err(|e| ExternalCallError::new("approval surface load", e.to_string()))?;
            serde_json::from_str(&contents)
                .map_err(|e| ExternalCallError::new("approval surface load", e.to_string()))?
        } else {
            BTreeMap::new()
        };
        Ok(Self {
            path,
            records: Mutex::new(records),
        })
    }

    async fn save(
        &self,
        records: &BTreeMap<String, SurfaceRecord>,
    ) -> Result<(), ExternalCallError> {
        let save = async {
            if let Some(parent) = self.path.parent() {
                fs::create_dir_all(parent).await?;
            }
            let serialized = serde_json::to_string_pretty(records)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
            let temp = self.path.with_extension("json.tmp");
            fs::write(&temp, serialized).await?;
            fs::rename(&temp, &self.path).await?;
            Ok::<_, std::io::Error>(())
        };
        save.await
            .map_err(|e| ExternalCallError::new("approval surface save", e.to_string()))
    }

    /// Reviewer-side edit of the status field, used by the admin CLI and
    /// tests. Production reviewers edit the file or the remote surface.
    pub async fn set_status(
        &self,
        external_ref: &str,
        status: &str,
    ) -> Result<(), ExternalCallError> {
        let mut records = self.records.lock().await;
        let record = records.get_mut(external_ref).ok_or_else(|| {
            ExternalCallError::new("approval surface update", format!("no record {external_ref}"))
        })?;
        record.status = status.to_string();
        record.updated_at = Some(Utc::now());
        self.save(&records).await
    }
}

#[async_trait]
impl ApprovalSurface for LocalApprovalSurface {
    async fn push_record(&self, record: &RecordSummary) -> Result<String, ExternalCallError> {
        let record_id = format!("rec_{}", Uuid::new_v4().simple());
        let mut records = self.records.lock().await;
        records.insert(
            record_id.clone(),
            SurfaceRecord {
                record_id: record_id.clone(),
                item_id: record.item_id.clone(),
                title: record.title.clone(),
                body: record.body.clone(),
                tags: record.tags.clone(),
                summary: record.summary.clone(),
                keywords: record.keywords.clone(),
                media_paths: record.media_paths.clone(),
                author: record.author.clone(),
                status: ExternalStatus::Pending.as_str().to_string(),
                created_at: record.created_at,
                remote_id: None,
                share_url: None,
                failure_reason: None,
                updated_at: None,
            },
        );
        self.save(&records).await?;
        tracing::info!(record_id = %record_id, item_id = %record.item_id, "record mirrored to local surface");
        Ok(record_id)
    }

    async fn fetch_status(&self, external_ref: &str) -> Result<ExternalStatus, ExternalCallError> {
        let records = self.records.lock().await;
        let record = records.get(external_ref).ok_or_else(|| {
            ExternalCallError::new("approval surface fetch", format!("no record {external_ref}"))
        })?;
        Ok(ExternalStatus::parse(&record.status))
    }

    async fn record_outcome(
        &self,
        external_ref: &str,
        outcome: &SurfaceOutcome,
    ) -> Result<(), ExternalCallError> {
        let mut records = self.records.lock().await;
        let record = records.get_mut(external_ref).ok_or_else(|| {
            ExternalCallError::new("approval surface update", format!("no record {external_ref}"))
        })?;
        match outcome {
            SurfaceOutcome::Published {
                remote_id,
                share_url,
            } => {
                record.status = ExternalStatus::Published.as_str().to_string();
                record.remote_id = Some(remote_id.clone());
                record.share_url = Some(share_url.clone());
            }
            SurfaceOutcome::PublishFailed { reason } => {
                record.failure_reason = Some(reason.clone());
            }
        }
        record.updated_at = Some(Utc::now());
        self.save(&records).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn summary() -> RecordSummary {
        RecordSummary {
            item_id: "item-1".into(),
            title: "t".into(),
            body: "b".into(),
            tags: vec!["tag".into()],
            summary: "s".into(),
            keywords: BTreeSet::from(["kw".to_string()]).into_iter().collect(),
            media_paths: vec![],
            author: "bot".into(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn push_fetch_and_outcome_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let surface = LocalApprovalSurface::open(dir.path().join("approval.json"))
            .await
            .unwrap();

        let record_id = surface.push_record(&summary()).await.unwrap();
        assert_eq!(
            surface.fetch_status(&record_id).await.unwrap(),
            ExternalStatus::Pending
        );

        surface.set_status(&record_id, "approved").await.unwrap();
        assert_eq!(
            surface.fetch_status(&record_id).await.unwrap(),
            ExternalStatus::Approved
        );

        surface
            .record_outcome(
                &record_id,
                &SurfaceOutcome::Published {
                    remote_id: "n1".into(),
                    share_url: "https://x/n1".into(),
                },
            )
            .await
            .unwrap();
        assert_eq!(
            surface.fetch_status(&record_id).await.unwrap(),
            ExternalStatus::Published
        );
    }

    #[tokio::test]
    async fn records_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("approval.json");

        let record_id = {
            let surface = LocalApprovalSurface::open(path.clone()).await.unwrap();
            surface.push_record(&summary()).await.unwrap()
        };

        let reopened = LocalApprovalSurface::open(path.clone()).await.unwrap();
        assert_eq!(
            reopened.fetch_status(&record_id).await.unwrap(),
            ExternalStatus::Pending
        );
    }

    #[tokio::test]
    async fn fetch_unknown_record_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let surface = LocalApprovalSurface::open(dir.path().join("approval.json"))
            .await
            .unwrap();
        assert!(surface.fetch_status("rec_missing").await.is_err());
    }
}
