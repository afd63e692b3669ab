//! Request token issuing

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::Serialize;
use wct_common::context::RequestContext;
use wct_common::nonce::{create_token, now_secs, TokenAction, TOKEN_LIFETIME_SECS};

use super::ApiError;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub action: &'static str,
    pub token: String,
    pub lifetime_secs: i64,
}

/// GET /api/tokens/:action
pub async fn issue_token(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(action): Path<String>,
) -> Result<Json<TokenResponse>, ApiError> {
    if ctx.current_user.is_none() {
        return Err(ApiError::Forbidden(None));
    }
    let action = TokenAction::parse(&action).ok_or_else(|| ApiError::NotFound(format!("token action {}", action)))?;

    Ok(Json(TokenResponse {
        action: action.as_str(),
        token: create_token(&state.nonce_secret, action, ctx.user_id(), now_secs()),
        lifetime_secs: TOKEN_LIFETIME_SECS,
    }))
}
