//! HTTP API handlers for wct-admin

pub mod applicants;
pub mod auth;
pub mod email;
pub mod error;
pub mod feedback;
pub mod health;
pub mod profile;
pub mod rating;
pub mod render;
pub mod talks;
pub mod tokens;

pub use applicants::{applicants_json, applicants_page};
pub use auth::identity_middleware;
pub use email::email_applicant;
pub use error::ApiError;
pub use feedback::resolve_feedback;
pub use health::health_routes;
pub use profile::user_links;
pub use rating::{delete_rating, list_talks, rate_talk, talk_ratings};
pub use talks::{export_talks, update_talk_status};
pub use tokens::issue_token;
