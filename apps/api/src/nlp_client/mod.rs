/// NLP Client: the single point of entry for the external resume-processing service.
///
/// `submit` posts a document for asynchronous processing and retries transient
/// failures with exponential backoff. `get_status` makes exactly one request per call;
/// repeated checks are the poller's job.
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::NlpClientConfig;
use crate::models::job::JobDescription;

pub mod status;

pub use status::TaskStatusView;

#[derive(Debug, Error)]
pub enum NlpError {
    #[error("NLP service unavailable after {attempts} attempts: {message}")]
    Unavailable { attempts: u32, message: String },

    #[error("NLP service rejected the request (status {status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("NLP service returned status {status}: {message}")]
    Transient { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid response from NLP service: {0}")]
    InvalidResponse(String),
}

/// The resume file as sent upstream.
#[derive(Debug, Clone)]
pub struct ResumeDocument {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Bytes,
}

/// Job metadata the NLP service scores against.
#[derive(Debug, Clone)]
pub struct JobContext {
    pub description: String,
    pub category: String,
    pub required_skills: Vec<String>,
}

impl From<&JobDescription> for JobContext {
    fn from(job: &JobDescription) -> Self {
        Self {
            description: job.description.clone(),
            category: job.category.as_str().to_string(),
            required_skills: job.required_skills.clone(),
        }
    }
}

/// Seam between the orchestrator and the NLP service. Tests substitute scripted clients.
#[async_trait]
pub trait TaskClient: Send + Sync {
    /// Returns the upstream task id.
    async fn submit(&self, document: &ResumeDocument, job: &JobContext) -> Result<String, NlpError>;

    /// One status request, normalized. `Err` means the check itself failed (network,
    /// gateway) and says nothing about the task.
    async fn get_status(&self, task_id: &str) -> Result<TaskStatusView, NlpError>;
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    #[serde(default)]
    success: bool,
    #[serde(rename = "taskId")]
    task_id: Option<String>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UpstreamErrorBody {
    message: Option<String>,
    error: Option<String>,
}

#[derive(Clone)]
pub struct NlpClient {
    client: Client,
    config: NlpClientConfig,
}

impl NlpClient {
    pub fn new(config: NlpClientConfig) -> Result<Self, NlpError> {
        let client = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn build_form(document: &ResumeDocument, job: &JobContext) -> Result<Form, NlpError> {
        let part = Part::bytes(document.bytes.to_vec())
            .file_name(document.file_name.clone())
            .mime_str(&document.mime_type)?;

        let mut form = Form::new()
            .part("resume", part)
            .text("jobDescription", job.description.clone())
            .text("jobCategory", job.category.clone());

        if !job.required_skills.is_empty() {
            form = form.text("requiredSkills", job.required_skills.join(","));
        }
        Ok(form)
    }
}

/// `base × 2^retry`, capped. `retry` is 0 for the first retry.
pub fn backoff_delay(base: Duration, cap: Duration, retry: u32) -> Duration {
    let factor = 2u32.saturating_pow(retry.min(16));
    base.saturating_mul(factor).min(cap)
}

/// Statuses worth retrying: timeouts, rate limits, gateway hiccups.
fn is_transient_status(status: StatusCode) -> bool {
    matches!(status.as_u16(), 408 | 429 | 502 | 503 | 504)
}

fn upstream_message(body: &str) -> String {
    serde_json::from_str::<UpstreamErrorBody>(body)
        .ok()
        .and_then(|b| b.message.or(b.error))
        .unwrap_or_else(|| body.chars().take(200).collect())
}

#[async_trait]
impl TaskClient for NlpClient {
    async fn submit(&self, document: &ResumeDocument, job: &JobContext) -> Result<String, NlpError> {
        let url = self.url("process");
        let max_attempts = self.config.submit_max_attempts.max(1);
        let mut last_error = String::from("no attempt made");

        for attempt in 0..max_attempts {
            if attempt > 0 {
                let delay = backoff_delay(
                    self.config.retry_base_delay,
                    self.config.retry_max_delay,
                    attempt - 1,
                );
                warn!(
                    "NLP submit attempt {} of {} failed ({last_error}), retrying after {}ms...",
                    attempt,
                    max_attempts,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            // Multipart forms are single-use; rebuild per attempt.
            let form = Self::build_form(document, job)?;
            let response = match self.client.post(&url).multipart(form).send().await {
                Ok(r) => r,
                Err(e) => {
                    last_error = e.to_string();
                    continue;
                }
            };

            let status = response.status();
            let body = response.text().await.unwrap_or_default();

            if is_transient_status(status) {
                last_error = format!("HTTP {}: {}", status.as_u16(), upstream_message(&body));
                continue;
            }

            if !status.is_success() {
                return Err(NlpError::Rejected {
                    status: status.as_u16(),
                    message: upstream_message(&body),
                });
            }

            let parsed: SubmitResponse = serde_json::from_str(&body)
                .map_err(|e| NlpError::InvalidResponse(format!("submit response: {e}")))?;

            return match parsed.task_id.filter(|id| !id.trim().is_empty()) {
                Some(task_id) if parsed.success => {
                    info!(task_id = %task_id, "NLP task created for {}", document.file_name);
                    Ok(task_id)
                }
                _ => Err(NlpError::Rejected {
                    status: status.as_u16(),
                    message: parsed
                        .message
                        .unwrap_or_else(|| "NLP processing failed".to_string()),
                }),
            };
        }

        Err(NlpError::Unavailable {
            attempts: max_attempts,
            message: last_error,
        })
    }

    async fn get_status(&self, task_id: &str) -> Result<TaskStatusView, NlpError> {
        if task_id.trim().is_empty() {
            return Ok(TaskStatusView::Failed("No task ID provided".to_string()));
        }

        let response = self
            .client
            .get(self.url(&format!("task/{task_id}")))
            .timeout(self.config.status_timeout)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if is_transient_status(status) {
            return Err(NlpError::Transient {
                status: status.as_u16(),
                message: upstream_message(&body),
            });
        }

        let view = status::parse_status_body(&body);
        debug!(task_id = %task_id, http_status = status.as_u16(), "Task status: {view:?}");
        Ok(view)
    }
}
