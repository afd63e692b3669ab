//! JSON error responses

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;
use wct_common::feedback::{FeedbackCode, FeedbackSet, BIO_REQUIRED, REQUIRED_FIELDS};
use wct_common::Error;

/// Error returned by JSON and HTML handlers
///
/// User-facing detail travels as a feedback code; raw error text only
/// reaches the log.
#[derive(Debug)]
pub enum ApiError {
    /// Missing capability or invalid request token
    Forbidden(Option<FeedbackCode>),
    BadRequest(FeedbackCode),
    NotFound(String),
    Internal(String),
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        match e {
            Error::NotFound(what) => ApiError::NotFound(what),
            Error::InvalidInput(_) => ApiError::BadRequest(REQUIRED_FIELDS),
            Error::BioRequired(_) => ApiError::BadRequest(BIO_REQUIRED),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, code) = match self {
            ApiError::Forbidden(code) => (StatusCode::FORBIDDEN, "Insufficient permissions".to_string(), code),
            ApiError::BadRequest(code) => (StatusCode::BAD_REQUEST, "Invalid request".to_string(), Some(code)),
            ApiError::NotFound(what) => (StatusCode::NOT_FOUND, format!("Not found: {}", what), None),
            ApiError::Internal(msg) => {
                error!("Request failed: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal error".to_string(), None)
            }
        };

        let body = match code {
            Some(code) => {
                let mut feedback = FeedbackSet::new();
                feedback.push(code);
                json!({
                    "error": message,
                    "feedback": feedback.messages(),
                    "feedback_query": feedback.to_query(),
                })
            }
            None => json!({ "error": message }),
        };

        (status, Json(body)).into_response()
    }
}
