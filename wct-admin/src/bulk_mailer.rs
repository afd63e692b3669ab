//! Serial bulk mailer
//!
//! Walks a client-held queue of applicants and calls the per-applicant
//! email action for the head of the queue. The head is dequeued only once
//! its request has completed, so exactly one request is in flight. A failed
//! send is logged and the queue moves on.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::collections::VecDeque;
use tracing::{info, warn};
use wct_common::mailer::{EmailMessage, LogEntry, LogKind};
use wct_common::roster::{Applicant, RosterPage};

pub const STARTED_MESSAGE: &str = "Started sending emails.";
pub const ENDED_MESSAGE: &str = "All emails have been processed.";

/// Delivers one email for one applicant
#[async_trait]
pub trait EmailTransport: Send + Sync {
    async fn send(&self, applicant: &Applicant, email: &EmailMessage) -> Result<LogEntry>;
}

/// Send `email` to every queued applicant, one at a time
///
/// `on_entry` sees each log entry as it is produced; the full log is
/// returned as well.
pub async fn run_queue<T, F>(
    mut queue: VecDeque<Applicant>,
    email: &EmailMessage,
    transport: &T,
    mut on_entry: F,
) -> Vec<LogEntry>
where
    T: EmailTransport + ?Sized,
    F: FnMut(&LogEntry),
{
    let mut log = Vec::with_capacity(queue.len() + 2);
    let mut record = |entry: LogEntry, log: &mut Vec<LogEntry>| {
        on_entry(&entry);
        log.push(entry);
    };

    info!(recipients = queue.len(), "Bulk mailing started");
    record(LogEntry::info(STARTED_MESSAGE), &mut log);

    while let Some(applicant) = queue.front() {
        let entry = if applicant.id == 0 {
            LogEntry::new(LogKind::Error, "Skipped an applicant without id.", &applicant.email)
        } else {
            match transport.send(applicant, email).await {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(applicant_id = applicant.id, "Email failed: {:#}", e);
                    LogEntry::new(
                        LogKind::Error,
                        format!("Email to {} failed: {:#}", applicant.display_name, e),
                        &applicant.email,
                    )
                }
            }
        };

        queue.pop_front();
        record(entry, &mut log);
    }

    record(LogEntry::info(ENDED_MESSAGE), &mut log);
    info!(entries = log.len(), "Bulk mailing ended");
    log
}

#[derive(Debug, Serialize)]
struct EmailBody<'a> {
    #[serde(flatten)]
    email: &'a EmailMessage,
    #[serde(rename = "_token")]
    token: &'a str,
}

#[derive(Debug, serde::Deserialize)]
struct TokenBody {
    token: String,
}

/// Transport calling the wct-admin HTTP API
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    api_token: String,
    email_token: String,
}

impl HttpTransport {
    /// Connect and obtain the `email_applicant` request token
    pub async fn connect(base_url: &str, api_token: &str) -> Result<Self> {
        let client = reqwest::Client::new();
        let base_url = base_url.trim_end_matches('/').to_string();

        let response = client
            .get(format!("{}/api/tokens/email_applicant", base_url))
            .bearer_auth(api_token)
            .send()
            .await
            .context("Failed to reach wct-admin")?;
        if !response.status().is_success() {
            bail!("Token request refused: HTTP {}", response.status());
        }
        let TokenBody { token } = response.json().await.context("Invalid token response")?;

        Ok(Self {
            client,
            base_url,
            api_token: api_token.to_string(),
            email_token: token,
        })
    }

    /// Every applicant matching `filters`, fetched page by page
    pub async fn fetch_applicants(&self, filters: &[(&str, &str)]) -> Result<VecDeque<Applicant>> {
        let mut applicants = VecDeque::new();
        let mut page_number = 1i64;

        loop {
            let paged = page_number.to_string();
            let response = self
                .client
                .get(format!("{}/api/applicants", self.base_url))
                .bearer_auth(&self.api_token)
                .query(filters)
                .query(&[("paged", paged.as_str())])
                .send()
                .await
                .context("Failed to fetch applicants")?;
            if !response.status().is_success() {
                bail!("Applicant listing refused: HTTP {}", response.status());
            }

            let page: RosterPage = response.json().await.context("Invalid roster response")?;
            let done = page.applicants.is_empty() || page_number >= page.total_pages();
            applicants.extend(page.applicants);
            if done {
                break;
            }
            page_number += 1;
        }

        Ok(applicants)
    }
}

#[async_trait]
impl EmailTransport for HttpTransport {
    async fn send(&self, applicant: &Applicant, email: &EmailMessage) -> Result<LogEntry> {
        let response = self
            .client
            .post(format!("{}/api/applicants/{}/email", self.base_url, applicant.id))
            .bearer_auth(&self.api_token)
            .json(&EmailBody {
                email,
                token: &self.email_token,
            })
            .send()
            .await
            .context("Request failed")?;

        let status = response.status();
        match response.json::<LogEntry>().await {
            Ok(entry) => Ok(entry),
            Err(_) => bail!("HTTP {}", status),
        }
    }
}
