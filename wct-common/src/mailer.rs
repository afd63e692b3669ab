//! Applicant email spooling
//!
//! The email action writes each message to the `mail_outbox` table; a
//! delivery agent outside this service drains it.

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::info;

use crate::{Error, Result};

/// Message composed in the bulk mailer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailMessage {
    pub subject: String,
    #[serde(default)]
    pub reply_to: Option<String>,
    pub message: String,
}

impl EmailMessage {
    pub fn validate(&self) -> Result<()> {
        if self.subject.trim().is_empty() || self.message.trim().is_empty() {
            return Err(Error::InvalidInput("subject and message are required".to_string()));
        }
        if let Some(reply_to) = self.reply_to.as_deref().filter(|r| !r.trim().is_empty()) {
            if !looks_like_email(reply_to) {
                return Err(Error::InvalidInput(format!("invalid reply-to address: {}", reply_to)));
            }
        }
        Ok(())
    }
}

fn looks_like_email(value: &str) -> bool {
    match value.trim().split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.starts_with('.'),
        None => false,
    }
}

/// Outcome category of one send
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogKind {
    Success,
    Error,
    Info,
}

/// Entry in the bulk mailer log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    #[serde(rename = "type")]
    pub kind: LogKind,
    pub log_message: String,
    #[serde(default)]
    pub user_email: String,
}

impl LogEntry {
    pub fn new(kind: LogKind, log_message: impl Into<String>, user_email: impl Into<String>) -> Self {
        Self {
            kind,
            log_message: log_message.into(),
            user_email: user_email.into(),
        }
    }

    pub fn info(log_message: impl Into<String>) -> Self {
        Self::new(LogKind::Info, log_message, "")
    }
}

/// Spool `email` for `recipient`, returning the outbox id
pub async fn queue_email(pool: &SqlitePool, recipient: &str, email: &EmailMessage) -> Result<i64> {
    email.validate()?;
    if !looks_like_email(recipient) {
        return Err(Error::InvalidInput(format!("invalid recipient: {}", recipient)));
    }

    let id = sqlx::query(
        "INSERT INTO mail_outbox (recipient, reply_to, subject, body, queued_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(recipient)
    .bind(email.reply_to.as_deref().filter(|r| !r.trim().is_empty()))
    .bind(email.subject.trim())
    .bind(&email.message)
    .bind(chrono::Utc::now().to_rfc3339())
    .execute(pool)
    .await?
    .last_insert_rowid();

    info!(outbox_id = id, recipient, "Email queued");
    Ok(id)
}
