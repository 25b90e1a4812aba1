//! Processing Orchestrator: one state machine per resume.
//!
//! ```text
//! Created -> Submitting -> Polling -> Completed
//!                 \            \
//!                  `-> Failed   `-> Failed
//! ```
//!
//! Failures never escape past this module once a record exists; each one ends up in
//! the record's `processing_error`.

use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::PollPolicy;
use crate::models::job::JobDescription;
use crate::models::resume::{ExtractedProfile, ResumeRecord};
use crate::nlp_client::{JobContext, ResumeDocument, TaskClient};
use crate::pipeline::errors::PipelineError;
use crate::pipeline::poller::{poll_until_terminal, TerminalOutcome};
use crate::shortlist::ShortlistEngine;
use crate::storage::{DocumentStore, JobStore, ResumeStore, RunRef};

/// A resume file as received from the caller.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub original_filename: String,
    pub mime_type: String,
    pub bytes: Bytes,
}

/// Returned as soon as the document has been handed to the NLP service (or has failed to be).
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionReceipt {
    pub resume_id: Uuid,
    /// `None` when submission failed; the record's `processing_error` says why.
    pub task_id: Option<String>,
}

pub struct Orchestrator {
    resumes: Arc<dyn ResumeStore>,
    jobs: Arc<dyn JobStore>,
    documents: Arc<dyn DocumentStore>,
    nlp: Arc<dyn TaskClient>,
    shortlist: Arc<ShortlistEngine>,
    poll: PollPolicy,
}

impl Orchestrator {
    pub fn new(
        resumes: Arc<dyn ResumeStore>,
        jobs: Arc<dyn JobStore>,
        documents: Arc<dyn DocumentStore>,
        nlp: Arc<dyn TaskClient>,
        shortlist: Arc<ShortlistEngine>,
        poll: PollPolicy,
    ) -> Self {
        Self {
            resumes,
            jobs,
            documents,
            nlp,
            shortlist,
            poll,
        }
    }

    /// Stores the file, creates the record, submits it, and leaves polling running in
    /// the background.
    ///
    /// Errors only when nothing could be persisted (document or record write failed).
    pub async fn submit_resume(
        self: &Arc<Self>,
        file: UploadedFile,
        job: &JobDescription,
    ) -> Result<SubmissionReceipt, PipelineError> {
        let resume_id = Uuid::new_v4();
        let stored_filename = stored_filename(&file.original_filename);
        let storage_path = format!("resumes/{resume_id}/{stored_filename}");

        self.documents
            .put(&storage_path, file.bytes.clone(), &file.mime_type)
            .await?;

        let record = ResumeRecord::new_upload(
            resume_id,
            job.id,
            &file.original_filename,
            &stored_filename,
            file.bytes.len() as i64,
            &file.mime_type,
            &storage_path,
        );
        self.resumes.insert(&record).await?;
        info!(resume_id = %resume_id, job_id = %job.id, "Resume accepted: {}", file.original_filename);

        let task_id = self
            .submit_and_track(&record, job, record.submission_attempt, file.bytes)
            .await;
        Ok(SubmissionReceipt { resume_id, task_id })
    }

    /// Discards whatever task the record had and runs the pipeline again from `Submitting`.
    pub async fn force_reprocess(
        self: &Arc<Self>,
        resume_id: Uuid,
    ) -> Result<SubmissionReceipt, PipelineError> {
        let record = self
            .resumes
            .get(resume_id)
            .await?
            .ok_or(PipelineError::ResumeMissing(resume_id))?;
        let job = self
            .jobs
            .get_job(record.job_id)
            .await?
            .ok_or(PipelineError::JobMissing(record.job_id))?;

        let attempt = self
            .resumes
            .reset_for_submission(resume_id)
            .await?
            .ok_or(PipelineError::ResumeMissing(resume_id))?;
        info!(resume_id = %resume_id, previous_task = ?record.task_id, attempt, "Forced reprocess");

        // The record just left the processed set; the rest of the job's shortlist may move.
        if record.processed {
            self.recompute_shortlist(record.job_id).await;
        }

        let task_id = self.resubmit(&record, &job, attempt).await;
        Ok(SubmissionReceipt { resume_id, task_id })
    }

    /// Picks up every record a previous process left in flight. Records with a task
    /// resume polling on it; records without one are submitted again.
    pub async fn resume_in_flight(self: &Arc<Self>) -> Result<usize, PipelineError> {
        let records = self.resumes.list_in_flight().await?;
        let count = records.len();

        for record in records {
            match record.task_id.clone() {
                Some(task_id) => {
                    info!(resume_id = %record.id, task_id = %task_id, "Resuming polling");
                    self.spawn_polling(record.id, record.job_id, task_id);
                }
                None => {
                    let this = Arc::clone(self);
                    tokio::spawn(async move {
                        let attempt = record.submission_attempt;
                        let run = RunRef::Submission(attempt);
                        match this.jobs.get_job(record.job_id).await {
                            Ok(Some(job)) => {
                                this.resubmit(&record, &job, attempt).await;
                            }
                            Ok(None) => {
                                this.persist_failure(record.id, run, &PipelineError::JobMissing(record.job_id))
                                    .await;
                            }
                            Err(e) => {
                                this.persist_failure(record.id, run, &PipelineError::from(e)).await;
                            }
                        }
                    });
                }
            }
        }

        if count > 0 {
            info!("Resumed {count} in-flight resume pipelines");
        }
        Ok(count)
    }

    /// Polls an already-submitted task to the end and persists the outcome. Runs inline;
    /// `spawn_polling` is the background variant.
    pub async fn track_task(&self, resume_id: Uuid, job_id: Uuid, task_id: &str) {
        let outcome = poll_until_terminal(self.nlp.as_ref(), task_id, &self.poll).await;

        let result = match outcome {
            TerminalOutcome::Succeeded(payload) => match extract_profile(payload) {
                Ok(profile) => self
                    .resumes
                    .complete(resume_id, task_id, &profile)
                    .await
                    .map_err(PipelineError::from),
                Err(e) => Err(e),
            },
            TerminalOutcome::Failed(reason) => Err(PipelineError::UpstreamRejected(reason)),
            TerminalOutcome::TimedOut { attempts, last_error } => {
                if let Some(last_error) = last_error {
                    warn!(task_id = %task_id, "Polling timed out, last check error: {last_error}");
                }
                Err(PipelineError::TimedOut {
                    task_id: task_id.to_string(),
                    attempts,
                })
            }
        };

        match result {
            Ok(true) => {
                info!(resume_id = %resume_id, task_id = %task_id, "Resume processed");
                self.recompute_shortlist(job_id).await;
            }
            Ok(false) => {
                info!(resume_id = %resume_id, task_id = %task_id, "Result discarded, record moved to a newer task");
            }
            Err(err) => self.persist_failure(resume_id, RunRef::Task(task_id), &err).await,
        }
    }

    fn spawn_polling(self: &Arc<Self>, resume_id: Uuid, job_id: Uuid, task_id: String) {
        let this = Arc::clone(self);
        tokio::spawn(async move { this.track_task(resume_id, job_id, &task_id).await });
    }

    /// Loads the stored document and submits it.
    async fn resubmit(
        self: &Arc<Self>,
        record: &ResumeRecord,
        job: &JobDescription,
        attempt: i32,
    ) -> Option<String> {
        match self.documents.fetch(&record.storage_path).await {
            Ok(bytes) => self.submit_and_track(record, job, attempt, bytes).await,
            Err(e) => {
                let run = RunRef::Submission(attempt);
                self.persist_failure(record.id, run, &PipelineError::from(e)).await;
                None
            }
        }
    }

    /// `Submitting -> Polling` (polling spawned) or `Submitting -> Failed`. Writes only
    /// land while the record is still on submission `attempt`.
    async fn submit_and_track(
        self: &Arc<Self>,
        record: &ResumeRecord,
        job: &JobDescription,
        attempt: i32,
        bytes: Bytes,
    ) -> Option<String> {
        let run = RunRef::Submission(attempt);
        let document = ResumeDocument {
            file_name: record.original_filename.clone(),
            mime_type: record.mime_type.clone(),
            bytes,
        };

        let task_id = match self.nlp.submit(&document, &JobContext::from(job)).await {
            Ok(task_id) => task_id,
            Err(e) => {
                self.persist_failure(record.id, run, &PipelineError::from(e)).await;
                return None;
            }
        };

        match self.resumes.record_task_id(record.id, attempt, &task_id).await {
            Ok(true) => {
                self.spawn_polling(record.id, record.job_id, task_id.clone());
                Some(task_id)
            }
            Ok(false) => {
                warn!(resume_id = %record.id, task_id = %task_id, "Record no longer awaiting a task, dropping submission");
                None
            }
            Err(e) => {
                self.persist_failure(record.id, run, &PipelineError::from(e)).await;
                None
            }
        }
    }

    async fn persist_failure(&self, resume_id: Uuid, run: RunRef<'_>, err: &PipelineError) {
        let message = err.to_string();
        match self.resumes.fail(resume_id, run, &message).await {
            Ok(true) => {
                warn!(resume_id = %resume_id, retriable = err.is_retriable(), "Resume processing failed: {message}");
            }
            Ok(false) => {
                info!(resume_id = %resume_id, "Failure for a superseded task ignored: {message}");
            }
            Err(e) => {
                error!(resume_id = %resume_id, "Could not persist processing error ({message}): {e}");
            }
        }
    }

    /// Shortlist problems never touch the record that triggered them.
    async fn recompute_shortlist(&self, job_id: Uuid) {
        if let Err(e) = self.shortlist.recompute_and_notify(job_id).await {
            error!(job_id = %job_id, "Shortlist recompute failed: {e}");
        }
    }
}

/// Checks that a successful task carries `result.data` in the expected shape.
pub fn extract_profile(payload: Option<Value>) -> Result<ExtractedProfile, PipelineError> {
    let result = match payload {
        Some(Value::Object(map)) => map,
        Some(Value::Null) | None => {
            return Err(PipelineError::MalformedResult(
                "task completed without a result".to_string(),
            ))
        }
        Some(_) => {
            return Err(PipelineError::MalformedResult(
                "result is not an object".to_string(),
            ))
        }
    };

    if result.get("success").and_then(Value::as_bool) == Some(false) {
        let reason = result
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("processing reported no success");
        return Err(PipelineError::UpstreamRejected(reason.to_string()));
    }

    let data = match result.get("data") {
        Some(data @ Value::Object(_)) => data.clone(),
        Some(Value::Null) | None => {
            return Err(PipelineError::MalformedResult("result.data is missing".to_string()))
        }
        Some(_) => {
            return Err(PipelineError::MalformedResult(
                "result.data is not an object".to_string(),
            ))
        }
    };

    serde_json::from_value(data).map_err(|e| {
        PipelineError::MalformedResult(format!("result.data has an unexpected shape: {e}"))
    })
}

/// `{unix millis}-{sanitized original name}`.
fn stored_filename(original: &str) -> String {
    let sanitized: String = original
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let sanitized = sanitized.trim_matches('.');
    let name = if sanitized.is_empty() { "resume" } else { sanitized };
    format!("{}-{}", Utc::now().timestamp_millis(), name)
}
