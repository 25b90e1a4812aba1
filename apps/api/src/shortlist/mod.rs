/// Shortlist Engine: ranks a job's processed resumes and flags the top of the list.
///
/// Every recompute is a full recomputation from the current store contents. Recomputes
/// for the same job are serialized through a per-job lock held from snapshot to write;
/// notifications go out after the lock is released.
use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::models::resume::ResumeRecord;
use crate::notifier::Notifier;
use crate::storage::{JobStore, ResumeStore, StoreError};

pub mod stats;

pub use stats::{compute_stats, JobStats};

pub const SHORTLIST_MIN_SCORE: i32 = 75;
pub const SHORTLIST_MAX_SIZE: usize = 10;

/// Ids of the records that make the shortlist, best first.
///
/// `processed` must be in a stable order (upload order); ties on score keep it.
pub fn compute_shortlist(processed: &[ResumeRecord]) -> Vec<Uuid> {
    let mut ranked: Vec<&ResumeRecord> = processed.iter().collect();
    ranked.sort_by(|a, b| b.match_score.cmp(&a.match_score));

    ranked
        .into_iter()
        .take(SHORTLIST_MAX_SIZE)
        .filter(|r| r.match_score >= SHORTLIST_MIN_SCORE)
        .map(|r| r.id)
        .collect()
}

#[derive(Debug, Clone)]
pub struct ShortlistResult {
    pub job_id: Uuid,
    pub total_processed: usize,
    pub shortlisted: Vec<Uuid>,
    /// Records whose flag went false → true, as they look after the update.
    pub newly_shortlisted: Vec<ResumeRecord>,
    /// Records whose flag went true → false. Not notified.
    pub removed: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NotificationOutcome {
    pub resume_id: Uuid,
    pub delivered: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ShortlistReport {
    pub job_id: Uuid,
    pub total_processed: usize,
    pub shortlisted_count: usize,
    pub shortlisted: Vec<Uuid>,
    pub newly_shortlisted: Vec<Uuid>,
    pub removed: Vec<Uuid>,
    pub notifications: Vec<NotificationOutcome>,
}

pub struct ShortlistEngine {
    resumes: Arc<dyn ResumeStore>,
    jobs: Arc<dyn JobStore>,
    notifier: Arc<dyn Notifier>,
    job_locks: DashMap<Uuid, Arc<Mutex<()>>>,
}

impl ShortlistEngine {
    pub fn new(
        resumes: Arc<dyn ResumeStore>,
        jobs: Arc<dyn JobStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            resumes,
            jobs,
            notifier,
            job_locks: DashMap::new(),
        }
    }

    fn lock_for(&self, job_id: Uuid) -> Arc<Mutex<()>> {
        self.job_locks.entry(job_id).or_default().value().clone()
    }

    pub async fn recompute(&self, job_id: Uuid) -> Result<ShortlistResult, StoreError> {
        let lock = self.lock_for(job_id);
        let _guard = lock.lock().await;

        let processed = self.resumes.list_processed_for_job(job_id).await?;
        let shortlisted = compute_shortlist(&processed);
        self.resumes.apply_shortlist(job_id, &shortlisted).await?;

        let selected: HashSet<Uuid> = shortlisted.iter().copied().collect();
        let newly_shortlisted: Vec<ResumeRecord> = processed
            .iter()
            .filter(|r| !r.shortlisted && selected.contains(&r.id))
            .map(|r| ResumeRecord {
                shortlisted: true,
                ..r.clone()
            })
            .collect();
        let removed: Vec<Uuid> = processed
            .iter()
            .filter(|r| r.shortlisted && !selected.contains(&r.id))
            .map(|r| r.id)
            .collect();

        info!(
            job_id = %job_id,
            "Shortlist recomputed: {} of {} processed shortlisted ({} new, {} removed)",
            shortlisted.len(),
            processed.len(),
            newly_shortlisted.len(),
            removed.len()
        );

        Ok(ShortlistResult {
            job_id,
            total_processed: processed.len(),
            shortlisted,
            newly_shortlisted,
            removed,
        })
    }

    /// Recomputes, then emails every newly shortlisted candidate. Notification
    /// failures only show up in the report.
    pub async fn recompute_and_notify(&self, job_id: Uuid) -> Result<ShortlistReport, StoreError> {
        let result = self.recompute(job_id).await?;
        let notifications = self.notify(&result).await;

        Ok(ShortlistReport {
            job_id,
            total_processed: result.total_processed,
            shortlisted_count: result.shortlisted.len(),
            newly_shortlisted: result.newly_shortlisted.iter().map(|r| r.id).collect(),
            shortlisted: result.shortlisted,
            removed: result.removed,
            notifications,
        })
    }

    async fn notify(&self, result: &ShortlistResult) -> Vec<NotificationOutcome> {
        if result.newly_shortlisted.is_empty() {
            return Vec::new();
        }

        let job = match self.jobs.get_job(result.job_id).await {
            Ok(Some(job)) => job,
            Ok(None) => {
                warn!(job_id = %result.job_id, "Job vanished before shortlist notifications");
                return Vec::new();
            }
            Err(e) => {
                error!(job_id = %result.job_id, "Failed to load job for shortlist notifications: {e}");
                return Vec::new();
            }
        };

        let mut outcomes = Vec::with_capacity(result.newly_shortlisted.len());
        for record in &result.newly_shortlisted {
            let delivered = self.notifier.notify_shortlisted(record, &job).await;
            outcomes.push(NotificationOutcome {
                resume_id: record.id,
                delivered,
            });
        }
        outcomes
    }

    /// Current shortlist, best score first.
    pub async fn shortlist(&self, job_id: Uuid) -> Result<Vec<ResumeRecord>, StoreError> {
        self.resumes.list_shortlisted(job_id).await
    }

    pub async fn stats(&self, job_id: Uuid) -> Result<JobStats, StoreError> {
        let records = self.resumes.list(Some(job_id)).await?;
        Ok(compute_stats(job_id, &records))
    }
}
