//! Bulk mailer client
//!
//! Fetches the applicant roster from a running wct-admin and emails each
//! applicant in turn.
//!
//! **Usage:**
//! ```bash
//! wct-bulk-mailer --subject "Your proposal" --message-file body.txt --status selected
//! ```

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{error, info, warn};
use wct_admin::bulk_mailer::{run_queue, HttpTransport};
use wct_common::mailer::{EmailMessage, LogKind};

/// Email every applicant matching a roster filter
#[derive(Parser, Debug)]
#[command(name = "wct-bulk-mailer")]
#[command(version)]
struct Args {
    /// wct-admin base URL
    #[arg(long, default_value = "http://127.0.0.1:5730", env = "WCT_URL")]
    url: String,

    /// API token of an administrator account
    #[arg(long, env = "WCT_API_TOKEN", hide_env_values = true)]
    api_token: String,

    #[arg(long)]
    subject: String,

    #[arg(long)]
    reply_to: Option<String>,

    /// Message body
    #[arg(long, conflicts_with = "message_file")]
    message: Option<String>,

    /// Read the message body from a file
    #[arg(long, value_name = "FILE")]
    message_file: Option<PathBuf>,

    /// Roster facet: all, missing-bio, selected, not-selected
    #[arg(long, default_value = "all")]
    status: String,

    /// Roster search term
    #[arg(long)]
    search: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();

    let message = match (&args.message, &args.message_file) {
        (Some(message), _) => message.clone(),
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        (None, None) => bail!("Either --message or --message-file is required"),
    };
    let email = EmailMessage {
        subject: args.subject,
        reply_to: args.reply_to,
        message,
    };
    email.validate()?;

    let transport = HttpTransport::connect(&args.url, &args.api_token).await?;

    let mut filters = vec![("status", args.status.as_str())];
    if let Some(search) = args.search.as_deref() {
        filters.push(("s", search));
    }
    let queue = transport.fetch_applicants(&filters).await?;
    info!(recipients = queue.len(), "Roster fetched");

    let log = run_queue(queue, &email, &transport, |entry| match entry.kind {
        LogKind::Success => info!(email = %entry.user_email, "{}", entry.log_message),
        LogKind::Error => error!(email = %entry.user_email, "{}", entry.log_message),
        LogKind::Info => info!("{}", entry.log_message),
    })
    .await;

    let failures = log.iter().filter(|e| e.kind == LogKind::Error).count();
    if failures > 0 {
        warn!(failures, "Some emails were not sent");
    }
    Ok(())
}
