//! Integration tests for wct-admin API endpoints
//!
//! Each test builds the router over a fresh temporary database seeded with
//! one account per role and drives it with `oneshot`.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use sqlx::SqlitePool;
use tempfile::TempDir;
use tower::util::ServiceExt; // for `oneshot` method
use wct_admin::{build_router, AppState};
use wct_common::config::{WctConfig, DEFAULT_PAGE_SIZE};
use wct_common::db::init::{init_database, load_nonce_secret};
use wct_common::db::{insert_talk, insert_user, set_talk_status, NewUser, Role, TalkStatus};
use wct_common::nonce::{create_token, now_secs, TokenAction};

const ADMIN: &str = "admin-token";
const RATER: &str = "rater-token";
const SUBSCRIBER: &str = "subscriber-token";

struct TestApp {
    _dir: TempDir,
    pool: SqlitePool,
    app: Router,
    secret: String,
    admin_id: i64,
    rater_id: i64,
    applicant_id: i64,
    talk_id: i64,
}

impl TestApp {
    fn token(&self, action: TokenAction, user_id: i64) -> String {
        create_token(&self.secret, action, user_id, now_secs())
    }

    async fn send(&self, request: Request<Body>) -> axum::response::Response {
        self.app.clone().oneshot(request).await.unwrap()
    }
}

/// Test helper: admin, rater and one applicant with a pending talk
async fn setup() -> TestApp {
    setup_with_page_size(DEFAULT_PAGE_SIZE).await
}

async fn setup_with_page_size(page_size: i64) -> TestApp {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("wct.db");
    let pool = init_database(&db_path).await.unwrap();

    let user = |login: &'static str, role: Role, token: &'static str, bio: Option<&'static str>| {
        let pool = pool.clone();
        async move {
            let email = format!("{}@example.org", login);
            let display_name = login.to_uppercase();
            let id = insert_user(
                &pool,
                &NewUser {
                    login,
                    email: &email,
                    display_name: &display_name,
                    role,
                    description: bio,
                    api_token: Some(token),
                },
            )
            .await
            .unwrap();
            id
        }
    };
    let admin_id = user("organizer", Role::Administrator, ADMIN, None).await;
    let rater_id = user("reviewer", Role::Rater, RATER, None).await;
    let applicant_id = user("speaker", Role::Subscriber, SUBSCRIBER, Some("Rust trainer")).await;
    let talk_id = insert_talk(&pool, applicant_id, "Zero-cost futures", "Abstract", TalkStatus::Pending)
        .await
        .unwrap();

    let config = WctConfig {
        database_path: db_path,
        site_url: "https://example.org".to_string(),
        page_size,
        ..Default::default()
    };
    let secret = load_nonce_secret(&pool).await.unwrap();
    let state = AppState::new(pool.clone(), &config, secret.clone());
    state.rates_cache.spawn_invalidation(&state.bus);

    TestApp {
        _dir: dir,
        app: build_router(state),
        pool,
        secret,
        admin_id,
        rater_id,
        applicant_id,
        talk_id,
    }
}

/// Test helper: request carrying a bearer token
fn authed(method: &str, uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

fn form(uri: &str, token: &str, body: String) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body))
        .unwrap()
}

fn json_post(uri: &str, token: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn json_put(uri: &str, token: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("PUT")
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Test helper: extra applicant with one pending talk, returns (user, talk)
async fn add_applicant(pool: &SqlitePool, login: &str, bio: Option<&str>) -> (i64, i64) {
    let email = format!("{}@example.org", login);
    let display_name = login.to_uppercase();
    let user_id = insert_user(
        pool,
        &NewUser {
            login,
            email: &email,
            display_name: &display_name,
            role: Role::Subscriber,
            description: bio,
            api_token: None,
        },
    )
    .await
    .unwrap();
    let talk_id = insert_talk(pool, user_id, &format!("Talk by {}", login), "Abstract", TalkStatus::Pending)
        .await
        .unwrap();
    (user_id, talk_id)
}

/// First CSV field of every data line
fn csv_first_column(csv: &str) -> Vec<String> {
    csv.lines()
        .skip(1)
        .map(|line| line.split(',').next().unwrap().trim_matches('"').to_string())
        .collect()
}

async fn extract_text(body: Body) -> String {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    String::from_utf8(bytes.to_vec()).expect("Should be UTF-8")
}

/// Test helper: Extract JSON body from response
async fn extract_json(body: Body) -> Value {
    serde_json::from_str(&extract_text(body).await).expect("Should parse JSON")
}

// =============================================================================
// Public endpoints
// =============================================================================

#[tokio::test]
async fn test_health_endpoint_no_auth_required() {
    let t = setup().await;
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let response = t.send(request).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "wct-admin");
    assert!(body["version"].is_string());
    assert_eq!(body["database"], "ok");
}

#[tokio::test]
async fn test_feedback_resolution() {
    let t = setup().await;
    let request = Request::builder()
        .uri("/api/feedback?error=4,99&success=1")
        .body(Body::empty())
        .unwrap();
    let body = extract_json(t.send(request).await.into_body()).await;

    assert_eq!(body["error"], json!(["Title and description are required fields."]));
    assert_eq!(body["success"], json!(["Saved successfully"]));
}

#[tokio::test]
async fn test_unknown_api_token_rejected() {
    let t = setup().await;
    let response = t.send(authed("GET", "/api/applicants", "nope")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// =============================================================================
// Rating
// =============================================================================

#[tokio::test]
async fn test_rate_talk_text_protocol() {
    let t = setup().await;
    let uri = format!("/api/talks/{}/rate", t.talk_id);

    // Token issued through the API
    let response = t.send(authed("GET", "/api/tokens/rate_talk", RATER)).await;
    let token = extract_json(response.into_body()).await["token"]
        .as_str()
        .unwrap()
        .to_string();

    let response = t.send(form(&uri, RATER, format!("rate=4&_token={}", token))).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(extract_text(response.into_body()).await, "4.0");

    // Double submission
    let response = t.send(form(&uri, RATER, format!("rate=4&_token={}", token))).await;
    assert_eq!(extract_text(response.into_body()).await, "0");

    let admin_token = t.token(TokenAction::RateTalk, t.admin_id);
    let response = t.send(form(&uri, ADMIN, format!("rate=1&_token={}", admin_token))).await;
    assert_eq!(extract_text(response.into_body()).await, "2.5");
}

#[tokio::test]
async fn test_rate_talk_rejections_answer_zero() {
    let t = setup().await;
    let uri = format!("/api/talks/{}/rate", t.talk_id);

    let response = t.send(form(&uri, RATER, "rate=4&_token=forged".to_string())).await;
    assert_eq!(extract_text(response.into_body()).await, "0");

    let sub_token = t.token(TokenAction::RateTalk, t.applicant_id);
    let response = t.send(form(&uri, SUBSCRIBER, format!("rate=4&_token={}", sub_token))).await;
    assert_eq!(extract_text(response.into_body()).await, "0");

    let token = t.token(TokenAction::RateTalk, t.rater_id);
    let response = t.send(form(&uri, RATER, format!("rate=9&_token={}", token))).await;
    assert_eq!(extract_text(response.into_body()).await, "0");

    let response = t.send(form("/api/talks/999/rate", RATER, format!("rate=3&_token={}", token))).await;
    assert_eq!(extract_text(response.into_body()).await, "0");
}

#[tokio::test]
async fn test_delete_rating_and_stats() {
    let t = setup().await;
    let uri = format!("/api/talks/{}/rate", t.talk_id);
    let token = t.token(TokenAction::RateTalk, t.rater_id);
    t.send(form(&uri, RATER, format!("rate=4&_token={}", token))).await;
    let token = t.token(TokenAction::RateTalk, t.admin_id);
    t.send(form(&uri, ADMIN, format!("rate=2&_token={}", token))).await;

    let delete_uri = format!("/api/talks/{}/rates/{}", t.talk_id, t.admin_id);

    // Raters may not delete
    let response = t.send(authed("DELETE", &delete_uri, RATER)).await;
    assert_eq!(extract_text(response.into_body()).await, "0");

    let response = t.send(authed("DELETE", &delete_uri, ADMIN)).await;
    assert_eq!(extract_text(response.into_body()).await, "4.0");

    let stats_uri = format!("/api/talks/{}/ratings?details=true", t.talk_id);
    let body = extract_json(t.send(authed("GET", &stats_uri, RATER)).await.into_body()).await;
    assert_eq!(body["average"], "4.0");
    assert_eq!(body["user_ids"], json!([t.rater_id]));
    assert_eq!(body["details"]["4"], json!([t.rater_id]));

    let response = t.send(authed("GET", &stats_uri, SUBSCRIBER)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_list_talks_by_rating() {
    let t = setup().await;
    let second = insert_talk(&t.pool, t.applicant_id, "Pinning", "Abstract", TalkStatus::Pending)
        .await
        .unwrap();
    let token = t.token(TokenAction::RateTalk, t.rater_id);
    t.send(form(&format!("/api/talks/{}/rate", second), RATER, format!("rate=5&_token={}", token)))
        .await;

    let body = extract_json(
        t.send(authed("GET", "/api/talks?orderby=rates_count", RATER))
            .await
            .into_body(),
    )
    .await;
    let ids: Vec<i64> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|talk| talk["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![second, t.talk_id]);
}

// =============================================================================
// Applicants
// =============================================================================

#[tokio::test]
async fn test_applicants_html_requires_capability() {
    let t = setup().await;

    let response = t.send(authed("GET", "/admin/applicants", RATER)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = t.send(authed("GET", "/admin/applicants?status=all&orderby=email", ADMIN)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = extract_text(response.into_body()).await;
    assert!(html.contains("<th scope=\"col\">Talk proposals</th>"));
    assert!(html.contains("<strong>speaker</strong>"));
    assert!(!html.contains("<strong>organizer</strong>"), "only the applicant role is listed");
    assert!(html.contains("export=csv"));
}

#[tokio::test]
async fn test_applicants_selected_facet_empty() {
    let t = setup().await;
    let response = t.send(authed("GET", "/admin/applicants?status=selected", ADMIN)).await;
    let html = extract_text(response.into_body()).await;
    assert!(html.contains("No applicants found."));
}

#[tokio::test]
async fn test_applicants_json() {
    let t = setup().await;
    let body = extract_json(t.send(authed("GET", "/api/applicants?s=peak", ADMIN)).await.into_body()).await;

    assert_eq!(body["total"], 1);
    assert_eq!(body["applicants"][0]["login"], "speaker");
    assert_eq!(body["applicants"][0]["proposal_count"], 1);
}

#[tokio::test]
async fn test_csv_export_requires_token() {
    let t = setup().await;

    let response = t.send(authed("GET", "/admin/applicants?export=csv", ADMIN)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let token = t.token(TokenAction::ExportApplicants, t.admin_id);
    let uri = format!("/admin/applicants?export=csv&_token={}", token);
    let response = t.send(authed("GET", &uri, ADMIN)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/csv; charset=utf-8"
    );

    let csv = extract_text(response.into_body()).await;
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines[0], "\"Username\",\"Name\",\"Email\",\"Talk proposals\"");
    assert_eq!(lines[1], "\"speaker\",\"SPEAKER\",\"speaker@example.org\",\"1\"");
    assert_eq!(lines.len(), 2);
}

#[tokio::test]
async fn test_csv_export_walks_every_page() {
    let t = setup_with_page_size(2).await;
    let (_, ann_talk) = add_applicant(&t.pool, "ann", Some("Compiler engineer")).await;
    for login in ["bo", "cy", "dee"] {
        add_applicant(&t.pool, login, None).await;
    }
    set_talk_status(&t.pool, ann_talk, TalkStatus::Selected).await.unwrap();
    let token = t.token(TokenAction::ExportApplicants, t.admin_id);

    // 5 applicants over 3 pages of 2
    let uri = format!("/admin/applicants?export=csv&_token={}", token);
    let csv = extract_text(t.send(authed("GET", &uri, ADMIN)).await.into_body()).await;
    assert_eq!(csv.matches("\"Username\"").count(), 1);
    assert_eq!(csv_first_column(&csv), vec!["ann", "bo", "cy", "dee", "speaker"]);

    // The facet is carried to every fetched page
    let uri = format!("/admin/applicants?export=csv&status=not-selected&orderby=login&order=desc&_token={}", token);
    let csv = extract_text(t.send(authed("GET", &uri, ADMIN)).await.into_body()).await;
    assert_eq!(csv.matches("\"Username\"").count(), 1);
    assert_eq!(csv_first_column(&csv), vec!["speaker", "dee", "cy", "bo"]);
}

#[tokio::test]
async fn test_huge_page_numbers_answer_empty_pages() {
    let t = setup().await;

    let response = t
        .send(authed("GET", "/admin/applicants?paged=9223372036854775807", ADMIN))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = extract_text(response.into_body()).await;
    assert!(html.contains("No applicants found."));
    assert!(html.contains("1 item"));

    let response = t
        .send(authed("GET", "/api/applicants?paged=461168601842738791", ADMIN))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["applicants"], json!([]));
}

// =============================================================================
// Talk workflow
// =============================================================================

#[tokio::test]
async fn test_talk_status_change() {
    let t = setup().await;
    let uri = format!("/api/talks/{}/status", t.talk_id);

    let token = t.token(TokenAction::UpdateTalkStatus, t.rater_id);
    let response = t
        .send(json_put(&uri, RATER, json!({ "talk_status": "wct_selected", "_token": token })))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(extract_json(response.into_body()).await["feedback_query"], "error=2");

    let token = t.token(TokenAction::UpdateTalkStatus, t.admin_id);
    let response = t
        .send(json_put(&uri, ADMIN, json!({ "talk_status": "trash", "_token": token })))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = t
        .send(json_put(&uri, ADMIN, json!({ "talk_status": "wct_selected", "_token": token })))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["talk_status"], "wct_selected");
    assert_eq!(body["label"], "Selected");

    let stored: String = sqlx::query_scalar("SELECT status FROM talks WHERE id = ?")
        .bind(t.talk_id)
        .fetch_one(&t.pool)
        .await
        .unwrap();
    assert_eq!(stored, "wct_selected");
}

#[tokio::test]
async fn test_selecting_talk_requires_author_bio() {
    let t = setup().await;
    let (_, talk_id) = add_applicant(&t.pool, "quiet", None).await;
    let token = t.token(TokenAction::UpdateTalkStatus, t.admin_id);

    let response = t
        .send(json_put(
            &format!("/api/talks/{}/status", talk_id),
            ADMIN,
            json!({ "talk_status": "wct_selected", "_token": token }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["feedback_query"], "error=14");
    assert_eq!(body["feedback"]["error"], json!(["Your biographical information are required"]));

    // Other statuses do not need a bio
    let response = t
        .send(json_put(
            &format!("/api/talks/{}/status", talk_id),
            ADMIN,
            json!({ "talk_status": "wct_shortlist", "_token": token }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_talks_csv_export() {
    let t = setup_with_page_size(2).await;
    let second = insert_talk(&t.pool, t.applicant_id, "=cmd", "Abstract", TalkStatus::Pending)
        .await
        .unwrap();
    insert_talk(&t.pool, t.applicant_id, "Async drop", "Abstract", TalkStatus::Rejected)
        .await
        .unwrap();
    insert_talk(&t.pool, t.applicant_id, "Withdrawn", "Abstract", TalkStatus::Trash)
        .await
        .unwrap();
    let rate = t.token(TokenAction::RateTalk, t.rater_id);
    t.send(form(&format!("/api/talks/{}/rate", second), RATER, format!("rate=3&_token={}", rate)))
        .await;

    let response = t.send(authed("GET", "/admin/talks/export", ADMIN)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let rater_token = t.token(TokenAction::ExportTalks, t.rater_id);
    let uri = format!("/admin/talks/export?_token={}", rater_token);
    assert_eq!(t.send(authed("GET", &uri, RATER)).await.status(), StatusCode::FORBIDDEN);

    let token = t.token(TokenAction::ExportTalks, t.admin_id);
    let uri = format!("/admin/talks/export?_token={}", token);
    let response = t.send(authed("GET", &uri, ADMIN)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"talks.csv\""
    );

    let csv = extract_text(response.into_body()).await;
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(
        lines,
        vec![
            "\"Title\",\"Author\",\"Status\",\"Average rating\"",
            "\"Zero-cost futures\",\"SPEAKER\",\"Pending\",\"0\"",
            "\"'=cmd\",\"SPEAKER\",\"Pending\",\"3.0\"",
            "\"Async drop\",\"SPEAKER\",\"Rejected\",\"0\"",
        ]
    );
}

// =============================================================================
// Email
// =============================================================================

#[tokio::test]
async fn test_email_applicant_spools_message() {
    let t = setup().await;
    let uri = format!("/api/applicants/{}/email", t.applicant_id);
    let token = t.token(TokenAction::EmailApplicant, t.admin_id);

    let response = t
        .send(json_post(
            &uri,
            ADMIN,
            json!({ "subject": "Your talk", "reply_to": "", "message": "Hello", "_token": token }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["type"], "success");
    assert_eq!(body["user_email"], "speaker@example.org");

    let queued: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM mail_outbox WHERE recipient = ?")
        .bind("speaker@example.org")
        .fetch_one(&t.pool)
        .await
        .unwrap();
    assert_eq!(queued, 1);
}

#[tokio::test]
async fn test_email_applicant_refusals() {
    let t = setup().await;
    let uri = format!("/api/applicants/{}/email", t.applicant_id);

    let response = t
        .send(json_post(&uri, ADMIN, json!({ "subject": "s", "message": "m", "_token": "forged" })))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(extract_json(response.into_body()).await["type"], "error");

    let token = t.token(TokenAction::EmailApplicant, t.admin_id);
    let response = t
        .send(json_post(&uri, ADMIN, json!({ "subject": " ", "message": "m", "_token": token })))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(extract_json(response.into_body()).await["type"], "error");
}

// =============================================================================
// Profile links
// =============================================================================

#[tokio::test]
async fn test_user_links_and_rates_count() {
    let t = setup().await;
    let uri = format!("/api/users/{}/links", t.rater_id);

    let body = extract_json(t.send(authed("GET", &uri, SUBSCRIBER)).await.into_body()).await;
    assert_eq!(body["rates_count"], 0);
    assert_eq!(body["sections"][0]["url"], "https://example.org/users/reviewer/");
    assert_eq!(body["sections"][1]["section"], "rates");
    assert_eq!(body["sections"][1]["url"], "https://example.org/users/reviewer/ratings/");

    let only = extract_json(
        t.send(authed("GET", &format!("{}?section=to-rate", uri), SUBSCRIBER))
            .await
            .into_body(),
    )
    .await;
    assert_eq!(only["sections"], json!([{ "section": "to-rate", "url": "https://example.org/users/reviewer/to-rate/" }]));

    let response = t
        .send(authed("GET", &format!("{}?section=nope", uri), SUBSCRIBER))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = t
        .send(
            Request::builder()
                .uri(&uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
