//! Profile section links

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use wct_common::context::RequestContext;
use wct_common::db::find_user;
use wct_common::feedback::NOT_ALLOWED_TO_EDIT_PROFILE;
use wct_common::profile::ProfileSection;

use super::ApiError;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct SectionLink {
    pub section: ProfileSection,
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct UserLinksResponse {
    pub user_id: i64,
    pub rates_count: i64,
    pub sections: Vec<SectionLink>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LinksQuery {
    /// Restrict the answer to one section, e.g. `to-rate`
    pub section: Option<String>,
}

/// GET /api/users/:id/links
pub async fn user_links(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(user_id): Path<i64>,
    Query(query): Query<LinksQuery>,
) -> Result<Json<UserLinksResponse>, ApiError> {
    if ctx.current_user.is_none() {
        return Err(ApiError::Forbidden(Some(NOT_ALLOWED_TO_EDIT_PROFILE)));
    }

    let wanted = match query.section.as_deref() {
        Some(name) => Some(
            ProfileSection::parse(name)
                .ok_or_else(|| ApiError::NotFound(format!("profile section {}", name)))?,
        ),
        None => None,
    };

    let user = find_user(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("user {}", user_id)))?;

    let sections = ProfileSection::ALL
        .into_iter()
        .filter(|section| wanted.map_or(true, |w| w == *section))
        .map(|section| SectionLink {
            section,
            url: section.url(&state.site_url, &user),
        })
        .collect();

    Ok(Json(UserLinksResponse {
        user_id,
        rates_count: state.rates_cache.get_or_load(&state.ratings, user_id).await?,
        sections,
    }))
}
