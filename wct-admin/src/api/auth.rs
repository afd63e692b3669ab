//! Identity middleware
//!
//! Resolves `Authorization: Bearer <api_token>` to an account and attaches
//! a [`RequestContext`] to the request. Requests without the header
//! proceed anonymously; an unknown token is rejected.

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{debug, warn};
use wct_common::context::RequestContext;
use wct_common::db::find_user_by_token;

use crate::AppState;

pub async fn identity_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let token = match request.headers().get(AUTHORIZATION) {
        None => None,
        Some(value) => {
            let value = value.to_str().map_err(|_| AuthError::MalformedHeader)?;
            let token = value
                .strip_prefix("Bearer ")
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .ok_or(AuthError::MalformedHeader)?;
            Some(token.to_string())
        }
    };

    let context = match token {
        None => RequestContext::anonymous(),
        Some(token) => match find_user_by_token(&state.db, &token).await {
            Ok(Some(user)) => {
                debug!(user_id = user.id, role = %user.role, "Request identified");
                RequestContext::for_user(user)
            }
            Ok(None) => {
                warn!("Rejected unknown API token");
                return Err(AuthError::InvalidToken);
            }
            Err(e) => return Err(AuthError::Other(e.to_string())),
        },
    };

    request.extensions_mut().insert(context);
    Ok(next.run(request).await)
}

/// Authentication error types for HTTP responses
#[derive(Debug)]
pub enum AuthError {
    MalformedHeader,
    InvalidToken,
    Other(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthError::MalformedHeader => (
                StatusCode::BAD_REQUEST,
                "Malformed Authorization header".to_string(),
            ),
            AuthError::InvalidToken => (StatusCode::UNAUTHORIZED, "Invalid API token".to_string()),
            AuthError::Other(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Authentication error: {}", msg),
            ),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
