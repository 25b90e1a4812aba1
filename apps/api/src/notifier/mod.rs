/// Notifier: one-shot email to a candidate who just made a job's shortlist.
///
/// Delivery is best-effort: every failure is logged and reported as `false`, never as an
/// error, so the shortlist that triggered it stands regardless.
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::config::SmtpConfig;
use crate::models::job::JobDescription;
use crate::models::resume::ResumeRecord;

pub const SHORTLIST_SUBJECT: &str = "You've Been Shortlisted!";

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Invalid address '{address}': {reason}")]
    Address { address: String, reason: String },

    #[error("Failed to build message: {0}")]
    Message(String),

    #[error("SMTP error: {0}")]
    Transport(String),
}

#[async_trait]
pub trait Notifier: Send + Sync {
    /// `true` iff the provider accepted the message.
    async fn notify_shortlisted(&self, record: &ResumeRecord, job: &JobDescription) -> bool;
}

/// Transport seam so the notifier can be tested without an SMTP server.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: Message) -> Result<(), NotifyError>;
}

#[async_trait]
impl Mailer for AsyncSmtpTransport<Tokio1Executor> {
    async fn send(&self, email: Message) -> Result<(), NotifyError> {
        AsyncTransport::send(self, email)
            .await
            .map(|_response| ())
            .map_err(|e| NotifyError::Transport(e.to_string()))
    }
}

pub struct EmailNotifier {
    mailer: Box<dyn Mailer>,
    from: Mailbox,
}

impl EmailNotifier {
    pub fn new_with_mailer(mailer: Box<dyn Mailer>, from: &str) -> Result<Self, NotifyError> {
        Ok(Self {
            mailer,
            from: parse_mailbox(from)?,
        })
    }

    /// Relay (STARTTLS) with credentials when they are configured, plain SMTP otherwise
    /// (Mailpit, MailHog and friends).
    pub fn from_config(config: &SmtpConfig) -> Result<Self, NotifyError> {
        let transport = match &config.credentials {
            Some((username, password)) => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
                .map_err(|e| NotifyError::Transport(e.to_string()))?
                .port(config.port)
                .credentials(Credentials::new(username.clone(), password.clone()))
                .build(),
            None => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
                .port(config.port)
                .build(),
        };

        info!("Email notifications via {}:{}", config.host, config.port);
        Self::new_with_mailer(Box::new(transport), &config.from)
    }

    fn build_message(
        &self,
        to: &str,
        record: &ResumeRecord,
        job: &JobDescription,
    ) -> Result<Message, NotifyError> {
        Message::builder()
            .from(self.from.clone())
            .to(parse_mailbox(to)?)
            .subject(SHORTLIST_SUBJECT)
            .header(ContentType::TEXT_HTML)
            .body(shortlist_email_html(record, job))
            .map_err(|e| NotifyError::Message(e.to_string()))
    }
}

#[async_trait]
impl Notifier for EmailNotifier {
    async fn notify_shortlisted(&self, record: &ResumeRecord, job: &JobDescription) -> bool {
        let Some(to) = record.contact_info.email() else {
            info!(resume_id = %record.id, "No email on record, skipping shortlist notification");
            return false;
        };

        let result = match self.build_message(to, record, job) {
            Ok(message) => self.mailer.send(message).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => {
                info!(resume_id = %record.id, "Shortlist notification sent to {to}");
                true
            }
            Err(e) => {
                error!(resume_id = %record.id, "Shortlist notification to {to} failed: {e}");
                false
            }
        }
    }
}

/// Used when SMTP is not configured.
pub struct DisabledNotifier;

#[async_trait]
impl Notifier for DisabledNotifier {
    async fn notify_shortlisted(&self, record: &ResumeRecord, _job: &JobDescription) -> bool {
        warn!(resume_id = %record.id, "Email notifications disabled, shortlist notification not sent");
        false
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, NotifyError> {
    address.trim().parse::<Mailbox>().map_err(|e| NotifyError::Address {
        address: address.to_string(),
        reason: e.to_string(),
    })
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

pub fn shortlist_email_html(record: &ResumeRecord, job: &JobDescription) -> String {
    let name = record
        .candidate_name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or("Candidate");

    format!(
        r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
  <h2 style="color: #4a6cf7;">Congratulations, {name}!</h2>
  <p>Your application for the position of <strong>{title}</strong> has been shortlisted.</p>
  <p>Your resume scored <strong>{score}%</strong> against the job requirements.</p>
  <p>Our recruitment team will contact you shortly about the next steps.</p>
  <p>Best regards,<br>The Recruitment Team</p>
</div>"#,
        name = escape_html(name),
        title = escape_html(&job.title),
        score = record.match_score,
    )
}
