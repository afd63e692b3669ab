//! Feedback code resolution

use axum::{extract::RawQuery, Json};
use std::collections::BTreeMap;
use wct_common::feedback::{FeedbackKind, FeedbackSet};

/// GET /api/feedback?error=1,4&info=2
pub async fn resolve_feedback(RawQuery(query): RawQuery) -> Json<BTreeMap<FeedbackKind, Vec<&'static str>>> {
    let pairs: Vec<(String, String)> = query
        .as_deref()
        .and_then(|q| serde_urlencoded::from_str(q).ok())
        .unwrap_or_default();

    let set = FeedbackSet::from_pairs(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())));
    Json(set.messages())
}
