//! Applicant roster endpoints
//!
//! `GET /admin/applicants` renders the HTML table, or streams every matching
//! row as CSV when called with `export=csv` and an export token.

use axum::{
    body::Body,
    extract::{Query, State},
    http::header,
    response::{Html, IntoResponse, Response},
    Extension, Json,
};
use serde::Deserialize;
use tracing::{debug, info};
use wct_common::context::{Capability, RequestContext};
use wct_common::nonce::{create_token, now_secs, verify_token, TokenAction};
use wct_common::roster::{
    list_applicants, OrderKey, RosterPage, RosterQuery, SortOrder, SqliteRoster, StatusFacet,
};

use super::render::{CsvRenderer, HtmlTableRenderer, ListingParams};
use super::ApiError;
use crate::AppState;

/// Query parameters shared by the roster endpoints
#[derive(Debug, Default, Deserialize)]
pub struct ApplicantsQuery {
    /// Search term
    pub s: Option<String>,
    /// `login` or `email`
    pub orderby: Option<String>,
    pub order: Option<String>,
    /// Status facet
    pub status: Option<String>,
    /// Page number (1-indexed)
    pub paged: Option<i64>,
    pub export: Option<String>,
    #[serde(rename = "_token")]
    pub token: Option<String>,
}

impl ApplicantsQuery {
    /// Unknown facets and sort keys fall back to the defaults
    pub fn to_roster_query(&self, page_size: i64) -> RosterQuery {
        RosterQuery {
            facet: self
                .status
                .as_deref()
                .and_then(StatusFacet::parse)
                .unwrap_or_default(),
            search: self.s.clone(),
            order_by: self.orderby.as_deref().and_then(OrderKey::parse),
            order: self.order.as_deref().map(SortOrder::parse).unwrap_or_default(),
            page: self.paged.unwrap_or(1).clamp(1, RosterQuery::max_page(page_size)),
            page_size,
        }
    }

    fn listing_params(&self) -> ListingParams {
        ListingParams {
            s: self.s.clone().filter(|s| !s.trim().is_empty()),
            status: self.status.clone(),
            orderby: self.orderby.clone(),
            order: self.order.clone(),
            paged: None,
        }
    }

    fn wants_csv(&self) -> bool {
        self.export.as_deref() == Some("csv")
    }
}

/// GET /admin/applicants
pub async fn applicants_page(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Query(query): Query<ApplicantsQuery>,
) -> Result<Response, ApiError> {
    if query.wants_csv() {
        return export_csv(&state, &ctx, &query);
    }

    if !ctx.can(Capability::ListApplicants) {
        return Err(ApiError::Forbidden(None));
    }

    let roster_query = query.to_roster_query(state.page_size);
    let page = list_applicants(&state.roster, &roster_query).await?;

    let export_href = ctx.can(Capability::ExportApplicants).then(|| {
        let token = create_token(
            &state.nonce_secret,
            TokenAction::ExportApplicants,
            ctx.user_id(),
            now_secs(),
        );
        let filters = serde_urlencoded::to_string(query.listing_params()).unwrap_or_default();
        let separator = if filters.is_empty() { "" } else { "&" };
        format!("/admin/applicants?{}{}export=csv&_token={}", filters, separator, token)
    });

    let renderer = HtmlTableRenderer {
        params: query.listing_params(),
        facet: roster_query.facet,
        export_href,
    };

    Ok(Html(renderer.render(&page)).into_response())
}

/// GET /api/applicants
pub async fn applicants_json(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Query(query): Query<ApplicantsQuery>,
) -> Result<Json<RosterPage>, ApiError> {
    if !ctx.can(Capability::ListApplicants) {
        return Err(ApiError::Forbidden(None));
    }

    let page = list_applicants(&state.roster, &query.to_roster_query(state.page_size)).await?;
    Ok(Json(page))
}

fn export_csv(state: &AppState, ctx: &RequestContext, query: &ApplicantsQuery) -> Result<Response, ApiError> {
    if !ctx.can(Capability::ExportApplicants) {
        return Err(ApiError::Forbidden(None));
    }
    let token = query.token.as_deref().unwrap_or_default();
    if !verify_token(&state.nonce_secret, TokenAction::ExportApplicants, ctx.user_id(), token, now_secs()) {
        debug!(user_id = ctx.user_id(), "Export refused: bad token");
        return Err(ApiError::Forbidden(None));
    }

    let roster_query = RosterQuery {
        page: 1,
        ..query.to_roster_query(state.page_size)
    };
    info!(user_id = ctx.user_id(), facet = roster_query.facet.as_str(), "Exporting applicants");

    let body = Body::from_stream(csv_stream(state.roster.clone(), roster_query));

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"applicants.csv\""),
        ],
        body,
    )
        .into_response())
}

/// Header line, then one chunk per roster page until the rows run out
fn csv_stream(
    roster: SqliteRoster,
    mut query: RosterQuery,
) -> impl futures::Stream<Item = wct_common::Result<String>> {
    async_stream::try_stream! {
        let renderer = CsvRenderer;
        yield renderer.header();

        loop {
            let page = list_applicants(&roster, &query).await?;
            if page.applicants.is_empty() {
                break;
            }
            yield renderer.rows(&page.applicants);

            if query.page >= page.total_pages() {
                break;
            }
            query.page += 1;
        }
    }
}
