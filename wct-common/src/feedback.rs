//! User-facing feedback catalog
//!
//! Failures and confirmations reach users as `(category, id)` codes looked
//! up here, never as raw error text. Codes travel in query strings as
//! `error=4,8&success=1`.

use serde::Serialize;
use std::collections::BTreeMap;

/// Feedback category
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackKind {
    Error,
    Success,
    Info,
}

impl FeedbackKind {
    pub const ALL: [FeedbackKind; 3] = [FeedbackKind::Error, FeedbackKind::Success, FeedbackKind::Info];

    pub fn as_str(&self) -> &'static str {
        match self {
            FeedbackKind::Error => "error",
            FeedbackKind::Success => "success",
            FeedbackKind::Info => "info",
        }
    }
}

/// A catalog entry reference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedbackCode {
    pub kind: FeedbackKind,
    pub id: u32,
}

impl FeedbackCode {
    pub const fn error(id: u32) -> Self {
        Self { kind: FeedbackKind::Error, id }
    }

    pub const fn success(id: u32) -> Self {
        Self { kind: FeedbackKind::Success, id }
    }

    pub const fn info(id: u32) -> Self {
        Self { kind: FeedbackKind::Info, id }
    }

    pub fn message(&self) -> Option<&'static str> {
        lookup(self.kind, self.id)
    }
}

pub const SOMETHING_WENT_WRONG: FeedbackCode = FeedbackCode::error(1);
pub const NOT_ALLOWED_TO_EDIT_TALK: FeedbackCode = FeedbackCode::error(2);
pub const REQUIRED_TALK_FIELDS: FeedbackCode = FeedbackCode::error(4);
pub const REQUIRED_FIELDS: FeedbackCode = FeedbackCode::error(8);
pub const TALK_NOT_FOUND: FeedbackCode = FeedbackCode::error(9);
pub const NOT_ALLOWED_TO_EDIT_PROFILE: FeedbackCode = FeedbackCode::error(11);
pub const BIO_REQUIRED: FeedbackCode = FeedbackCode::error(14);
pub const SAVED: FeedbackCode = FeedbackCode::success(1);

fn lookup(kind: FeedbackKind, id: u32) -> Option<&'static str> {
    let message = match (kind, id) {
        (FeedbackKind::Success, 1) => "Saved successfully",
        (FeedbackKind::Success, 2) => "Registration complete. Please check your mailbox.",
        (FeedbackKind::Success, 3) => "The Talk Proposal was successfully created.",
        (FeedbackKind::Success, 4) => "The Talk Proposal was successfully updated.",
        (FeedbackKind::Success, 5) => "For your convenience, you have been automagically logged in.",
        (FeedbackKind::Success, 6) => "Make sure to check you received the email we sent you to reset your password.",
        (FeedbackKind::Success, 7) => "Otherwise, edit your email and password from your profile before logging off the site.",
        (FeedbackKind::Success, 8) => "Profile successfully updated.",

        (FeedbackKind::Error, 1) => "Something went wrong, please try again",
        (FeedbackKind::Error, 2) => "You are not allowed to edit this Talk Proposal.",
        (FeedbackKind::Error, 3) => "You are not allowed to publish Talk Proposals",
        (FeedbackKind::Error, 4) => "Title and description are required fields.",
        (FeedbackKind::Error, 5) => "Something went wrong while trying to save your Talk Proposal.",
        (FeedbackKind::Error, 7) => "Please choose a username having at least 4 characters.",
        (FeedbackKind::Error, 8) => "Please fill all required fields.",
        (FeedbackKind::Error, 9) => "The Talk Proposal you are trying to edit does not seem to exist.",
        (FeedbackKind::Error, 10) => "Something went wrong while trying to update your Talk Proposal.",
        (FeedbackKind::Error, 11) => "You are not allowed to edit this user profile.",
        (FeedbackKind::Error, 12) => "We were not able to validate your profile on WordPress.org.",
        (FeedbackKind::Error, 14) => "Your biographical information are required",

        (FeedbackKind::Info, 1) => "This Talk Proposal is already being edited by another user.",
        (FeedbackKind::Info, 2) => "Your Talk Proposal is currently awaiting moderation.",
        (FeedbackKind::Info, 3) => "This user has not filled any public profile informations.",
        (FeedbackKind::Info, 4) => "Your profile is empty. You can edit it at anytime.",
        (FeedbackKind::Info, 5) => "Please, share a little biographical information about yourself as we will use it if/once your Talk Proposal is selected.",
        (FeedbackKind::Info, 6) => "Please, make sure to review your biographical information as we will use it if/once your Talk Proposal is selected.",

        _ => return None,
    };
    Some(message)
}

/// Collected feedback for one response
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedbackSet {
    codes: Vec<FeedbackCode>,
}

impl FeedbackSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, code: FeedbackCode) {
        if !self.codes.contains(&code) {
            self.codes.push(code);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Parse `error=1,4&info=2` style pairs; unknown keys and ids are dropped
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut set = Self::new();
        for (key, value) in pairs {
            let Some(kind) = FeedbackKind::ALL.into_iter().find(|k| k.as_str() == key) else {
                continue;
            };
            for id in value.split(',').filter_map(|s| s.trim().parse::<u32>().ok()) {
                if lookup(kind, id).is_some() {
                    set.push(FeedbackCode { kind, id });
                }
            }
        }
        set
    }

    /// Messages grouped by category
    pub fn messages(&self) -> BTreeMap<FeedbackKind, Vec<&'static str>> {
        let mut grouped: BTreeMap<FeedbackKind, Vec<&'static str>> = BTreeMap::new();
        for code in &self.codes {
            if let Some(message) = code.message() {
                grouped.entry(code.kind).or_default().push(message);
            }
        }
        grouped
    }

    /// Query-string form, e.g. `error=4,8`
    pub fn to_query(&self) -> String {
        FeedbackKind::ALL
            .into_iter()
            .filter_map(|kind| {
                let ids: Vec<String> = self
                    .codes
                    .iter()
                    .filter(|c| c.kind == kind)
                    .map(|c| c.id.to_string())
                    .collect();
                (!ids.is_empty()).then(|| format!("{}={}", kind.as_str(), ids.join(",")))
            })
            .collect::<Vec<_>>()
            .join("&")
    }
}
