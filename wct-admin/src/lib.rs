//! wct-admin library - talk review service
//!
//! Rating endpoints for raters, applicant roster and bulk email for
//! administrators.

use axum::Router;
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use wct_common::config::WctConfig;
use wct_common::events::EventBus;
use wct_common::ratings::RatingService;
use wct_common::roster::SqliteRoster;

pub mod api;
pub mod bulk_mailer;
pub mod cache;
pub mod pagination;

use cache::RatesCountCache;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub ratings: RatingService,
    pub roster: SqliteRoster,
    pub rates_cache: RatesCountCache,
    pub bus: EventBus,
    /// Secret behind request-forgery tokens
    pub nonce_secret: Arc<str>,
    pub page_size: i64,
    pub site_url: Arc<str>,
}

impl AppState {
    /// Create new application state
    pub fn new(db: SqlitePool, config: &WctConfig, nonce_secret: String) -> Self {
        let bus = EventBus::default();
        Self {
            ratings: RatingService::new(db.clone(), bus.clone(), config.rating_scale),
            roster: SqliteRoster::new(db.clone(), config.applicant_role.clone()),
            rates_cache: RatesCountCache::new(),
            bus,
            nonce_secret: nonce_secret.into(),
            page_size: config.page_size,
            site_url: config.site_url.as_str().into(),
            db,
        }
    }
}

/// Build application router
///
/// Everything except `/health` and `/api/feedback` passes through the
/// identity middleware, which attaches a [`wct_common::context::RequestContext`].
pub fn build_router(state: AppState) -> Router {
    use axum::middleware;
    use axum::routing::{delete, get, post, put};

    let identified = Router::new()
        .route("/api/talks", get(api::list_talks))
        .route("/api/talks/:id/rate", post(api::rate_talk))
        .route("/api/talks/:id/rates/:user_id", delete(api::delete_rating))
        .route("/api/talks/:id/ratings", get(api::talk_ratings))
        .route("/api/talks/:id/status", put(api::update_talk_status))
        .route("/admin/talks/export", get(api::export_talks))
        .route("/admin/applicants", get(api::applicants_page))
        .route("/api/applicants", get(api::applicants_json))
        .route("/api/applicants/:id/email", post(api::email_applicant))
        .route("/api/users/:id/links", get(api::user_links))
        .route("/api/tokens/:action", get(api::issue_token))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api::identity_middleware,
        ));

    let public = Router::new()
        .route("/api/feedback", get(api::resolve_feedback))
        .merge(api::health_routes());

    Router::new()
        .merge(identified)
        .merge(public)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
