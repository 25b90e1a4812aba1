use thiserror::Error;
use uuid::Uuid;

use crate::nlp_client::NlpError;
use crate::storage::StoreError;

/// Everything that can end a resume's pipeline. The `Display` text is what lands in
/// `processing_error`, so it is written for a human reading the record.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("NLP service unavailable after {attempts} attempts: {message}")]
    UpstreamUnavailable { attempts: u32, message: String },

    #[error("NLP service rejected the task: {0}")]
    UpstreamRejected(String),

    #[error("NLP service returned an unusable result: {0}")]
    MalformedResult(String),

    #[error("NLP task {task_id} still pending after {attempts} status checks; retry with reprocess")]
    TimedOut { task_id: String, attempts: u32 },

    #[error("Resume {0} not found")]
    ResumeMissing(Uuid),

    #[error("Job description {0} not found")]
    JobMissing(Uuid),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

impl PipelineError {
    /// Whether a forced reprocess has a reasonable chance of succeeding.
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            PipelineError::UpstreamUnavailable { .. }
                | PipelineError::UpstreamRejected(_)
                | PipelineError::TimedOut { .. }
                | PipelineError::Store(_)
        )
    }
}

impl From<NlpError> for PipelineError {
    fn from(err: NlpError) -> Self {
        match err {
            NlpError::Unavailable { attempts, message } => {
                PipelineError::UpstreamUnavailable { attempts, message }
            }
            NlpError::Transient { status, message } => PipelineError::UpstreamUnavailable {
                attempts: 1,
                message: format!("HTTP {status}: {message}"),
            },
            NlpError::Http(e) => PipelineError::UpstreamUnavailable {
                attempts: 1,
                message: e.to_string(),
            },
            NlpError::Rejected { message, .. } => PipelineError::UpstreamRejected(message),
            NlpError::InvalidResponse(message) => PipelineError::MalformedResult(message),
        }
    }
}
