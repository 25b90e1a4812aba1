use std::time::Duration;

use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub s3_bucket: String,
    pub s3_endpoint: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    pub port: u16,
    pub rust_log: String,
    /// Largest accepted resume file, in bytes.
    pub max_upload_bytes: usize,
    pub nlp: NlpClientConfig,
    pub poll: PollPolicy,
    /// `None` disables shortlist emails.
    pub smtp: Option<SmtpConfig>,
}

/// Everything the NLP task client needs. Passed to `NlpClient::new`, never read from globals.
#[derive(Debug, Clone)]
pub struct NlpClientConfig {
    /// Base URL; `/process` and `/task/{id}` are appended.
    pub base_url: String,
    pub request_timeout: Duration,
    pub status_timeout: Duration,
    pub submit_max_attempts: u32,
    pub retry_base_delay: Duration,
    pub retry_max_delay: Duration,
}

impl Default for NlpClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5002/api".to_string(),
            request_timeout: Duration::from_secs(60),
            status_timeout: Duration::from_secs(30),
            submit_max_attempts: 3,
            retry_base_delay: Duration::from_millis(1000),
            retry_max_delay: Duration::from_millis(10_000),
        }
    }
}

/// Backoff schedule for status polling.
#[derive(Debug, Clone)]
pub struct PollPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub backoff_factor: f64,
    pub max_delay: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 30,
            initial_delay: Duration::from_millis(1000),
            backoff_factor: 2.0,
            max_delay: Duration::from_millis(10_000),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub credentials: Option<(String, String)>,
    pub from: String,
}

pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

const DEFAULT_EMAIL_FROM: &str = "Resume Screening <noreply@resumescreen.local>";

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let nlp_defaults = NlpClientConfig::default();
        let poll_defaults = PollPolicy::default();

        let nlp = NlpClientConfig {
            base_url: std::env::var("NLP_API_URL").unwrap_or(nlp_defaults.base_url),
            request_timeout: Duration::from_secs(parse_env(
                "NLP_REQUEST_TIMEOUT_SECS",
                nlp_defaults.request_timeout.as_secs(),
            )?),
            status_timeout: Duration::from_secs(parse_env(
                "NLP_STATUS_TIMEOUT_SECS",
                nlp_defaults.status_timeout.as_secs(),
            )?),
            submit_max_attempts: parse_env(
                "NLP_SUBMIT_MAX_ATTEMPTS",
                nlp_defaults.submit_max_attempts,
            )?,
            retry_base_delay: Duration::from_millis(parse_env(
                "NLP_RETRY_BASE_DELAY_MS",
                nlp_defaults.retry_base_delay.as_millis() as u64,
            )?),
            retry_max_delay: Duration::from_millis(parse_env(
                "NLP_RETRY_MAX_DELAY_MS",
                nlp_defaults.retry_max_delay.as_millis() as u64,
            )?),
        };

        let poll = PollPolicy {
            max_attempts: parse_env("POLL_MAX_ATTEMPTS", poll_defaults.max_attempts)?,
            initial_delay: Duration::from_millis(parse_env(
                "POLL_INITIAL_DELAY_MS",
                poll_defaults.initial_delay.as_millis() as u64,
            )?),
            backoff_factor: parse_env("POLL_BACKOFF_FACTOR", poll_defaults.backoff_factor)?,
            max_delay: Duration::from_millis(parse_env(
                "POLL_MAX_DELAY_MS",
                poll_defaults.max_delay.as_millis() as u64,
            )?),
        };

        let smtp = match std::env::var("SMTP_HOST") {
            Ok(host) if !host.trim().is_empty() => Some(SmtpConfig {
                host,
                port: parse_env("SMTP_PORT", 587u16)?,
                credentials: match (std::env::var("SMTP_USERNAME"), std::env::var("SMTP_PASSWORD")) {
                    (Ok(user), Ok(pass)) => Some((user, pass)),
                    _ => None,
                },
                from: std::env::var("EMAIL_FROM").unwrap_or_else(|_| DEFAULT_EMAIL_FROM.to_string()),
            }),
            _ => None,
        };

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            s3_bucket: require_env("S3_BUCKET")?,
            s3_endpoint: require_env("S3_ENDPOINT")?,
            aws_access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
            aws_secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
            port: parse_env("PORT", 8080u16).context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            max_upload_bytes: parse_env("MAX_FILE_SIZE", DEFAULT_MAX_UPLOAD_BYTES)?,
            nlp,
            poll,
            smtp,
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

/// Reads an optional variable, falling back to `default` when unset.
fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value: {raw}")),
        Err(_) => Ok(default),
    }
}
