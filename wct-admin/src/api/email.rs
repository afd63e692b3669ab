//! Per-applicant email action driven by the bulk mailer

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use tracing::{error, warn};
use wct_common::context::{Capability, RequestContext};
use wct_common::db::find_user;
use wct_common::mailer::{queue_email, EmailMessage, LogEntry, LogKind};
use wct_common::nonce::{now_secs, verify_token, TokenAction};
use wct_common::Error;

use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct EmailRequest {
    #[serde(flatten)]
    pub email: EmailMessage,
    #[serde(rename = "_token", default)]
    pub token: String,
}

/// POST /api/applicants/:id/email
///
/// Always answers with a log entry; the status code separates refusals
/// (403) from per-recipient outcomes (200).
pub async fn email_applicant(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(user_id): Path<i64>,
    Json(request): Json<EmailRequest>,
) -> (StatusCode, Json<LogEntry>) {
    if !ctx.can(Capability::SendEmail)
        || !verify_token(&state.nonce_secret, TokenAction::EmailApplicant, ctx.user_id(), &request.token, now_secs())
    {
        warn!(user_id = ctx.user_id(), "Email refused");
        return (
            StatusCode::FORBIDDEN,
            Json(LogEntry::new(LogKind::Error, "You are not allowed to send emails.", "")),
        );
    }

    let recipient = match find_user(&state.db, user_id).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            return (
                StatusCode::OK,
                Json(LogEntry::new(LogKind::Error, format!("Unknown applicant #{}.", user_id), "")),
            )
        }
        Err(e) => {
            error!(user_id, "Failed to load applicant: {}", e);
            return (
                StatusCode::OK,
                Json(LogEntry::new(LogKind::Error, "Something went wrong, please try again", "")),
            );
        }
    };

    let entry = match queue_email(&state.db, &recipient.email, &request.email).await {
        Ok(_) => LogEntry::new(
            LogKind::Success,
            format!("Email sent to {}.", recipient.display_name),
            &recipient.email,
        ),
        Err(Error::InvalidInput(reason)) => LogEntry::new(
            LogKind::Error,
            format!("Email to {} was not sent: {}.", recipient.display_name, reason),
            &recipient.email,
        ),
        Err(e) => {
            error!(user_id, "Failed to queue email: {}", e);
            LogEntry::new(
                LogKind::Error,
                format!("Email to {} was not sent.", recipient.display_name),
                &recipient.email,
            )
        }
    };

    (StatusCode::OK, Json(entry))
}
