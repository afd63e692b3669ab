//! Request-forgery tokens
//!
//! A token is the SHA-256 of (tick, action, user id, secret), truncated to
//! 20 hex chars. Ticks are 12 hours long. A token verifies during the tick
//! it was issued in and the following one.
//!
//! # Pure Functions
//!
//! Time is passed in explicitly; callers use [`now_secs`].

use sha2::{Digest, Sha256};

/// Seconds a token may stay valid
pub const TOKEN_LIFETIME_SECS: i64 = 24 * 60 * 60;

const TOKEN_HEX_LEN: usize = 20;

/// Actions that require a token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenAction {
    RateTalk,
    ExportApplicants,
    EmailApplicant,
    UpdateTalkStatus,
    ExportTalks,
}

impl TokenAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenAction::RateTalk => "rate_talk",
            TokenAction::ExportApplicants => "export_applicants",
            TokenAction::EmailApplicant => "email_applicant",
            TokenAction::UpdateTalkStatus => "update_talk_status",
            TokenAction::ExportTalks => "export_talks",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "rate_talk" => Some(TokenAction::RateTalk),
            "export_applicants" => Some(TokenAction::ExportApplicants),
            "email_applicant" => Some(TokenAction::EmailApplicant),
            "update_talk_status" => Some(TokenAction::UpdateTalkStatus),
            "export_talks" => Some(TokenAction::ExportTalks),
            _ => None,
        }
    }
}

pub fn now_secs() -> i64 {
    chrono::Utc::now().timestamp()
}

fn tick(now: i64) -> i64 {
    let half = TOKEN_LIFETIME_SECS / 2;
    (now + half - 1) / half
}

fn digest(secret: &str, action: TokenAction, user_id: i64, tick: i64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("{}|{}|{}|{}", tick, action.as_str(), user_id, secret).as_bytes());
    let hex = format!("{:x}", hasher.finalize());
    hex[..TOKEN_HEX_LEN].to_string()
}

/// Issue a token for `user_id` performing `action`
///
/// # Examples
///
/// ```
/// use wct_common::nonce::{create_token, verify_token, TokenAction};
///
/// let token = create_token("s3cret", TokenAction::RateTalk, 7, 1_700_000_000);
/// assert_eq!(token.len(), 20);
/// assert!(verify_token("s3cret", TokenAction::RateTalk, 7, &token, 1_700_000_000));
/// assert!(!verify_token("s3cret", TokenAction::ExportApplicants, 7, &token, 1_700_000_000));
/// ```
pub fn create_token(secret: &str, action: TokenAction, user_id: i64, now: i64) -> String {
    digest(secret, action, user_id, tick(now))
}

/// Check a token against the current and previous tick
pub fn verify_token(secret: &str, action: TokenAction, user_id: i64, token: &str, now: i64) -> bool {
    let current = tick(now);
    [current, current - 1]
        .into_iter()
        .any(|t| constant_time_eq(digest(secret, action, user_id, t).as_bytes(), token.as_bytes()))
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000;

    #[test]
    fn test_token_bound_to_user() {
        let token = create_token("k", TokenAction::EmailApplicant, 1, NOW);
        assert!(!verify_token("k", TokenAction::EmailApplicant, 2, &token, NOW));
    }

    #[test]
    fn test_token_bound_to_secret() {
        let token = create_token("k", TokenAction::EmailApplicant, 1, NOW);
        assert!(!verify_token("other", TokenAction::EmailApplicant, 1, &token, NOW));
    }

    #[test]
    fn test_token_survives_one_tick() {
        let token = create_token("k", TokenAction::RateTalk, 1, NOW);
        assert!(verify_token("k", TokenAction::RateTalk, 1, &token, NOW + TOKEN_LIFETIME_SECS / 2));
    }

    #[test]
    fn test_token_expires() {
        let token = create_token("k", TokenAction::RateTalk, 1, NOW);
        assert!(!verify_token("k", TokenAction::RateTalk, 1, &token, NOW + TOKEN_LIFETIME_SECS + 1));
    }

    #[test]
    fn test_token_bound_to_action() {
        let token = create_token("k", TokenAction::ExportTalks, 1, NOW);
        assert!(verify_token("k", TokenAction::ExportTalks, 1, &token, NOW));
        assert!(!verify_token("k", TokenAction::ExportApplicants, 1, &token, NOW));
        assert_eq!(TokenAction::parse("update_talk_status"), Some(TokenAction::UpdateTalkStatus));
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(!verify_token("k", TokenAction::RateTalk, 1, "", NOW));
        assert!(!verify_token("k", TokenAction::RateTalk, 1, "zzzzzzzzzzzzzzzzzzzz", NOW));
    }
}
