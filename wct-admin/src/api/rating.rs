//! Rating endpoints
//!
//! The rate and delete actions answer in plain text: the new average, or
//! `0` when the request was rejected for any reason.

use axum::{
    extract::{Path, Query, State},
    Extension, Form, Json,
};
use serde::Deserialize;
use tracing::{debug, error};
use wct_common::context::{Capability, RequestContext};
use wct_common::db::Talk;
use wct_common::nonce::{now_secs, verify_token, TokenAction};
use wct_common::ratings::{format_rating, RatingStats};
use wct_common::roster::SortOrder;

use super::ApiError;
use crate::AppState;

const REJECTED: &str = "0";

#[derive(Debug, Deserialize)]
pub struct RateForm {
    #[serde(default)]
    pub rate: String,
    #[serde(rename = "_token", default)]
    pub token: String,
}

/// POST /api/talks/:id/rate
pub async fn rate_talk(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(talk_id): Path<i64>,
    Form(form): Form<RateForm>,
) -> String {
    if !ctx.can(Capability::RateTalks) {
        debug!(talk_id, user_id = ctx.user_id(), "Rating refused: missing capability");
        return REJECTED.to_string();
    }
    if !verify_token(&state.nonce_secret, TokenAction::RateTalk, ctx.user_id(), &form.token, now_secs()) {
        debug!(talk_id, user_id = ctx.user_id(), "Rating refused: bad token");
        return REJECTED.to_string();
    }

    let value = form.rate.trim().parse::<i64>().unwrap_or(0);

    match state.ratings.add_rating(talk_id, ctx.user_id(), value).await {
        Ok(Some(average)) if ctx.can(Capability::ViewTalkRates) => average.to_string(),
        Ok(Some(_)) => format_rating(value),
        Ok(None) => REJECTED.to_string(),
        Err(e) => {
            error!(talk_id, "Failed to rate talk: {}", e);
            REJECTED.to_string()
        }
    }
}

/// DELETE /api/talks/:id/rates/:user_id
pub async fn delete_rating(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path((talk_id, user_id)): Path<(i64, i64)>,
) -> String {
    if !ctx.can(Capability::DeleteRates) {
        return REJECTED.to_string();
    }

    match state.ratings.remove_rating(talk_id, user_id).await {
        Ok(Some(average)) => average.to_string(),
        Ok(None) => REJECTED.to_string(),
        Err(e) => {
            error!(talk_id, user_id, "Failed to remove rating: {}", e);
            REJECTED.to_string()
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RatingsQuery {
    #[serde(default)]
    pub details: bool,
}

/// GET /api/talks/:id/ratings
pub async fn talk_ratings(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(talk_id): Path<i64>,
    Query(query): Query<RatingsQuery>,
) -> Result<Json<RatingStats>, ApiError> {
    if !ctx.can(Capability::ViewTalkRates) {
        return Err(ApiError::Forbidden(None));
    }

    Ok(Json(state.ratings.get_rating_stats(talk_id, query.details).await?))
}

/// Query parameters for the talk listing
#[derive(Debug, Deserialize)]
pub struct TalksQuery {
    /// Only `rates_count` is supported
    pub orderby: Option<String>,
    /// "asc" or "desc" (default)
    pub order: Option<String>,
    pub author: Option<i64>,
}

/// GET /api/talks
pub async fn list_talks(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Query(query): Query<TalksQuery>,
) -> Result<Json<Vec<Talk>>, ApiError> {
    if !ctx.can(Capability::ViewTalkRates) {
        return Err(ApiError::Forbidden(None));
    }

    if let Some(orderby) = query.orderby.as_deref().filter(|o| *o != "rates_count") {
        debug!(orderby, "Unsupported talk ordering, using rates_count");
    }
    let order = query
        .order
        .as_deref()
        .map(SortOrder::parse)
        .unwrap_or(SortOrder::Desc);

    let mut talks = state.ratings.list_talks_by_rating(order).await?;
    if let Some(author) = query.author {
        talks.retain(|t| t.author_id == author);
    }

    Ok(Json(talks))
}
