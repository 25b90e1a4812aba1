//! Normalization of the NLP service's task status vocabulary.
//!
//! The upstream reports the same outcome under several names ("completed", "success",
//! "done") and sometimes signals failure only through `success: false`. Everything is
//! folded into [`TaskStatusView`] here; no other module compares status strings.

use serde::Deserialize;
use serde_json::Value;

/// Reason used when the upstream answer has no recognizable status.
pub const MALFORMED_RESPONSE: &str = "malformed response";

/// Normalized view of one status check.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskStatusView {
    Pending,
    /// Terminal success. Carries the raw `result` payload, which may be absent or unusable:
    /// shape validation belongs to the orchestrator.
    Succeeded(Option<Value>),
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StatusClass {
    Pending,
    Success,
    Failure,
}

/// Upstream status string (lowercased) → outcome class.
const STATUS_TABLE: &[(&str, StatusClass)] = &[
    ("pending", StatusClass::Pending),
    ("processing", StatusClass::Pending),
    ("started", StatusClass::Pending),
    ("received", StatusClass::Pending),
    ("retry", StatusClass::Pending),
    ("completed", StatusClass::Success),
    ("success", StatusClass::Success),
    ("done", StatusClass::Success),
    ("failed", StatusClass::Failure),
    ("failure", StatusClass::Failure),
    ("error", StatusClass::Failure),
    ("revoked", StatusClass::Failure),
];

fn classify(status: &str) -> Option<StatusClass> {
    let status = status.trim().to_ascii_lowercase();
    STATUS_TABLE
        .iter()
        .find(|(name, _)| *name == status)
        .map(|(_, class)| *class)
}

/// `GET /task/{id}` response body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskStatusResponse {
    pub status: Option<String>,
    pub success: Option<bool>,
    pub result: Option<Value>,
    pub error: Option<String>,
    pub message: Option<String>,
}

impl TaskStatusResponse {
    fn reason(&self, fallback: &str) -> String {
        self.error
            .as_deref()
            .or(self.message.as_deref())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(fallback)
            .to_string()
    }
}

pub fn normalize(response: &TaskStatusResponse) -> TaskStatusView {
    let class = match response.status.as_deref().and_then(classify) {
        Some(class) => class,
        None => return TaskStatusView::Failed(MALFORMED_RESPONSE.to_string()),
    };

    match class {
        StatusClass::Success if response.success == Some(false) => {
            TaskStatusView::Failed(response.reason("Task completed without success"))
        }
        StatusClass::Success => TaskStatusView::Succeeded(response.result.clone()),
        StatusClass::Failure => TaskStatusView::Failed(response.reason("Unknown error")),
        StatusClass::Pending if response.success == Some(false) => {
            TaskStatusView::Failed(response.reason("Unknown error"))
        }
        StatusClass::Pending => TaskStatusView::Pending,
    }
}

/// Parses and normalizes a raw response body. Anything that is not a JSON object is malformed.
pub fn parse_status_body(body: &str) -> TaskStatusView {
    match serde_json::from_str::<TaskStatusResponse>(body) {
        Ok(response) => normalize(&response),
        Err(_) => TaskStatusView::Failed(MALFORMED_RESPONSE.to_string()),
    }
}
