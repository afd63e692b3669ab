//! User profile sections and their URLs

use serde::Serialize;

use crate::db::User;

/// Part of a user's public profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProfileSection {
    Profile,
    Rates,
    Comments,
    Talks,
    ToRate,
    Archive,
}

impl ProfileSection {
    pub const ALL: [ProfileSection; 6] = [
        ProfileSection::Profile,
        ProfileSection::Rates,
        ProfileSection::Comments,
        ProfileSection::Talks,
        ProfileSection::ToRate,
        ProfileSection::Archive,
    ];

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "profile" => Some(ProfileSection::Profile),
            "rates" => Some(ProfileSection::Rates),
            "comments" => Some(ProfileSection::Comments),
            "talks" => Some(ProfileSection::Talks),
            "to-rate" => Some(ProfileSection::ToRate),
            "archive" => Some(ProfileSection::Archive),
            _ => None,
        }
    }

    /// Path segment after the user slug; the profile itself has none
    fn slug(&self) -> Option<&'static str> {
        match self {
            ProfileSection::Profile => None,
            ProfileSection::Rates => Some("ratings"),
            ProfileSection::Comments => Some("comments"),
            ProfileSection::Talks => Some("talks"),
            ProfileSection::ToRate => Some("to-rate"),
            ProfileSection::Archive => Some("archive"),
        }
    }

    /// Absolute URL of this section for `user` under `base_url`
    pub fn url(&self, base_url: &str, user: &User) -> String {
        let base = base_url.trim_end_matches('/');
        match self.slug() {
            Some(slug) => format!("{}/users/{}/{}/", base, user.nicename(), slug),
            None => format!("{}/users/{}/", base, user.nicename()),
        }
    }
}
