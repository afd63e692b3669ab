//! Per-request context
//!
//! Built once per request from the authenticated account and passed down
//! explicitly to every operation that needs the current user.

use crate::db::{Role, User};
use crate::feedback::{FeedbackCode, FeedbackSet};

/// Actions gated by role
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    RateTalks,
    ViewTalkRates,
    DeleteRates,
    ListApplicants,
    ExportApplicants,
    SendEmail,
    /// Move talks through the review workflow
    EditTalks,
    ExportTalks,
}

/// Capabilities granted to `role`
pub fn capabilities_for(role: Role) -> &'static [Capability] {
    match role {
        Role::Administrator => &[
            Capability::RateTalks,
            Capability::ViewTalkRates,
            Capability::DeleteRates,
            Capability::ListApplicants,
            Capability::ExportApplicants,
            Capability::SendEmail,
            Capability::EditTalks,
            Capability::ExportTalks,
        ],
        Role::Rater => &[Capability::RateTalks, Capability::ViewTalkRates],
        Role::Subscriber => &[],
    }
}

/// Who is asking, and what they may do
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub current_user: Option<User>,
    pub feedback: FeedbackSet,
}

impl RequestContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn for_user(user: User) -> Self {
        Self {
            current_user: Some(user),
            feedback: FeedbackSet::new(),
        }
    }

    /// 0 when nobody is signed in
    pub fn user_id(&self) -> i64 {
        self.current_user.as_ref().map_or(0, |u| u.id)
    }

    pub fn can(&self, capability: Capability) -> bool {
        self.current_user
            .as_ref()
            .is_some_and(|u| capabilities_for(u.role()).contains(&capability))
    }

    pub fn add_feedback(&mut self, code: FeedbackCode) {
        self.feedback.push(code);
    }
}
