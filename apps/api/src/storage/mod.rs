//! Persistence ports. The pipeline only talks to these traits; `postgres` and `s3`
//! hold the production adapters.

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use uuid::Uuid;

use crate::models::job::{JobCategory, JobDescription};
use crate::models::resume::{ExtractedProfile, ResumeRecord};

#[cfg(test)]
pub mod memory;
pub mod postgres;
pub mod s3;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Corrupt row: {0}")]
    Corrupt(String),

    #[error("Document store error: {0}")]
    Document(String),

    #[error("Document not found: {0}")]
    DocumentMissing(String),
}

/// The pipeline run a write belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunRef<'a> {
    /// Before a task exists: the record's `submission_attempt` when the run started.
    Submission(i32),
    /// After submission: the NLP task id.
    Task(&'a str),
}

/// Resume records. Every mutation is a single-record atomic update.
///
/// Pipeline writes (`record_task_id`, `complete`, `fail`) are conditional on the
/// record still belonging to the run that produced the write; they return `false`
/// when the record has moved on (e.g. a forced reprocess started a new run).
#[async_trait]
pub trait ResumeStore: Send + Sync {
    async fn insert(&self, record: &ResumeRecord) -> Result<(), StoreError>;

    async fn get(&self, id: Uuid) -> Result<Option<ResumeRecord>, StoreError>;

    async fn find_by_task_id(&self, task_id: &str) -> Result<Option<ResumeRecord>, StoreError>;

    /// All records (optionally for one job), best score first, newest upload first on ties.
    async fn list(&self, job_id: Option<Uuid>) -> Result<Vec<ResumeRecord>, StoreError>;

    /// Records with `processing=true`, oldest first.
    async fn list_in_flight(&self) -> Result<Vec<ResumeRecord>, StoreError>;

    /// Processed records for a job in upload order (the stable tie-break order).
    async fn list_processed_for_job(&self, job_id: Uuid) -> Result<Vec<ResumeRecord>, StoreError>;

    /// Shortlisted processed records for a job, best score first.
    async fn list_shortlisted(&self, job_id: Uuid) -> Result<Vec<ResumeRecord>, StoreError>;

    /// Puts the record back at the start of the pipeline: `processing=true`,
    /// `processed=false`, `shortlisted=false`, no task, no error, no extracted fields,
    /// score 0. Bumps `submission_attempt` and returns the new value (`None` if the
    /// record does not exist).
    async fn reset_for_submission(&self, id: Uuid) -> Result<Option<i32>, StoreError>;

    /// Stores the task id of a successful submission. Applies only while the record
    /// is processing, has no task yet and is still on `attempt`.
    async fn record_task_id(&self, id: Uuid, attempt: i32, task_id: &str)
        -> Result<bool, StoreError>;

    /// Writes extracted fields and score, `processed=true`, `processing=false`, clears the error.
    async fn complete(
        &self,
        id: Uuid,
        task_id: &str,
        profile: &ExtractedProfile,
    ) -> Result<bool, StoreError>;

    /// Writes `processing_error`, `processing=false`, `processed=false`.
    async fn fail(&self, id: Uuid, run: RunRef<'_>, error: &str) -> Result<bool, StoreError>;

    /// Resets `shortlisted` on every processed record of the job, then sets it on `shortlisted`.
    /// Applied atomically.
    async fn apply_shortlist(&self, job_id: Uuid, shortlisted: &[Uuid]) -> Result<(), StoreError>;
}

#[async_trait]
pub trait JobStore: Send + Sync {
    async fn insert_job(&self, job: &JobDescription) -> Result<(), StoreError>;

    async fn get_job(&self, id: Uuid) -> Result<Option<JobDescription>, StoreError>;

    /// Newest first, optionally only one category.
    async fn list_jobs(&self, category: Option<JobCategory>)
        -> Result<Vec<JobDescription>, StoreError>;
}

/// Blob storage for uploaded resume files.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn put(&self, key: &str, body: Bytes, content_type: &str) -> Result<(), StoreError>;

    async fn fetch(&self, key: &str) -> Result<Bytes, StoreError>;
}
