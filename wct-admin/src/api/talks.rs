//! Talk workflow endpoints
//!
//! Status changes for organizers and the CSV export of every live talk.

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::{debug, info};
use wct_common::context::{Capability, RequestContext};
use wct_common::db::{list_talk_summaries, set_talk_status, TalkStatus};
use wct_common::feedback::{NOT_ALLOWED_TO_EDIT_TALK, SOMETHING_WENT_WRONG};
use wct_common::nonce::{now_secs, verify_token, TokenAction};

use super::render::TalkCsvRenderer;
use super::ApiError;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub talk_status: String,
    #[serde(rename = "_token", default)]
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub id: i64,
    pub talk_status: &'static str,
    pub label: &'static str,
}

/// PUT /api/talks/:id/status
///
/// Accepts the live workflow statuses only. Selecting a talk whose author
/// has no biography answers 400 with the `error:14` feedback.
pub async fn update_talk_status(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(talk_id): Path<i64>,
    Json(request): Json<StatusRequest>,
) -> Result<Json<StatusResponse>, ApiError> {
    if !ctx.can(Capability::EditTalks)
        || !verify_token(&state.nonce_secret, TokenAction::UpdateTalkStatus, ctx.user_id(), &request.token, now_secs())
    {
        debug!(talk_id, user_id = ctx.user_id(), "Status change refused");
        return Err(ApiError::Forbidden(Some(NOT_ALLOWED_TO_EDIT_TALK)));
    }

    let status = TalkStatus::parse(&request.talk_status)
        .filter(|s| TalkStatus::LIVE.contains(s))
        .ok_or(ApiError::BadRequest(SOMETHING_WENT_WRONG))?;

    set_talk_status(&state.db, talk_id, status).await?;
    info!(talk_id, status = status.as_str(), user_id = ctx.user_id(), "Talk status changed");

    Ok(Json(StatusResponse {
        id: talk_id,
        talk_status: status.as_str(),
        label: status.label(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    #[serde(rename = "_token", default)]
    pub token: String,
}

/// GET /admin/talks/export
pub async fn export_talks(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Query(query): Query<ExportQuery>,
) -> Result<Response, ApiError> {
    if !ctx.can(Capability::ExportTalks)
        || !verify_token(&state.nonce_secret, TokenAction::ExportTalks, ctx.user_id(), &query.token, now_secs())
    {
        debug!(user_id = ctx.user_id(), "Talk export refused");
        return Err(ApiError::Forbidden(None));
    }
    info!(user_id = ctx.user_id(), "Exporting talks");

    let body = Body::from_stream(talks_csv_stream(state.db.clone(), state.page_size));

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"talks.csv\""),
        ],
        body,
    )
        .into_response())
}

/// Header line, then one chunk per batch of `batch` talks
fn talks_csv_stream(
    pool: SqlitePool,
    batch: i64,
) -> impl futures::Stream<Item = wct_common::Result<String>> {
    async_stream::try_stream! {
        let renderer = TalkCsvRenderer;
        yield renderer.header();

        let mut after_id = 0;
        loop {
            let talks = list_talk_summaries(&pool, after_id, batch).await?;
            let Some(last) = talks.last() else {
                break;
            };
            after_id = last.id;
            yield renderer.rows(&talks);

            if (talks.len() as i64) < batch {
                break;
            }
        }
    }
}
