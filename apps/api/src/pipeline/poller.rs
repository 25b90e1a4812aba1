//! Poller: repeated status checks for one task until it reaches a terminal state.
//!
//! Holds nothing beyond the task id it was handed, so a pipeline abandoned by a restart
//! can be picked up again from the persisted `task_id`.

use std::time::Duration;

use serde_json::Value;
use tracing::{debug, warn};

use crate::config::PollPolicy;
use crate::nlp_client::{TaskClient, TaskStatusView};

#[derive(Debug, Clone, PartialEq)]
pub enum TerminalOutcome {
    Succeeded(Option<Value>),
    Failed(String),
    /// Still pending after every attempt. `last_error` is the most recent failed check, if any.
    TimedOut {
        attempts: u32,
        last_error: Option<String>,
    },
}

/// Delay after the `attempt`-th check: `min(initial × factor^attempt, max)`.
pub fn poll_delay(policy: &PollPolicy, attempt: u32) -> Duration {
    let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
    let secs = policy.initial_delay.as_secs_f64() * policy.backoff_factor.powi(exponent);
    if !secs.is_finite() || secs >= policy.max_delay.as_secs_f64() {
        policy.max_delay
    } else if secs <= 0.0 {
        Duration::ZERO
    } else {
        Duration::from_secs_f64(secs)
    }
}

/// Checks `task_id` until it succeeds, fails, or `policy.max_attempts` checks have
/// come back pending. A check that errors (network, gateway) uses up an attempt but
/// does not end the loop.
pub async fn poll_until_terminal(
    client: &dyn TaskClient,
    task_id: &str,
    policy: &PollPolicy,
) -> TerminalOutcome {
    let max_attempts = policy.max_attempts.max(1);
    let mut last_error = None;

    for attempt in 0..max_attempts {
        match client.get_status(task_id).await {
            Ok(TaskStatusView::Succeeded(result)) => return TerminalOutcome::Succeeded(result),
            Ok(TaskStatusView::Failed(reason)) => return TerminalOutcome::Failed(reason),
            Ok(TaskStatusView::Pending) => {
                debug!(task_id = %task_id, "Task pending (check {} of {})", attempt + 1, max_attempts);
            }
            Err(e) => {
                warn!(task_id = %task_id, "Status check {} of {} failed: {e}", attempt + 1, max_attempts);
                last_error = Some(e.to_string());
            }
        }

        if attempt + 1 < max_attempts {
            tokio::time::sleep(poll_delay(policy, attempt)).await;
        }
    }

    TerminalOutcome::TimedOut {
        attempts: max_attempts,
        last_error,
    }
}
