//! Database models

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::fmt;

use crate::{Error, Result};

/// Workflow status of a talk proposal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TalkStatus {
    Pending,
    Shortlist,
    Selected,
    Rejected,
    /// Deleted; excluded from every proposal count
    Trash,
}

impl TalkStatus {
    /// Statuses a live (non-deleted) proposal can hold
    pub const LIVE: [TalkStatus; 4] = [
        TalkStatus::Pending,
        TalkStatus::Shortlist,
        TalkStatus::Selected,
        TalkStatus::Rejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TalkStatus::Pending => "wct_pending",
            TalkStatus::Shortlist => "wct_shortlist",
            TalkStatus::Selected => "wct_selected",
            TalkStatus::Rejected => "wct_rejected",
            TalkStatus::Trash => "trash",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TalkStatus::Pending => "Pending",
            TalkStatus::Shortlist => "Short-listed",
            TalkStatus::Selected => "Selected",
            TalkStatus::Rejected => "Rejected",
            TalkStatus::Trash => "Trash",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "wct_pending" => Some(TalkStatus::Pending),
            "wct_shortlist" => Some(TalkStatus::Shortlist),
            "wct_selected" => Some(TalkStatus::Selected),
            "wct_rejected" => Some(TalkStatus::Rejected),
            "trash" => Some(TalkStatus::Trash),
            _ => None,
        }
    }
}

impl Default for TalkStatus {
    fn default() -> Self {
        TalkStatus::Pending
    }
}

impl fmt::Display for TalkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Account role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Administrator,
    Rater,
    Subscriber,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Administrator => "administrator",
            Role::Rater => "rater",
            Role::Subscriber => "subscriber",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "administrator" => Some(Role::Administrator),
            "rater" => Some(Role::Rater),
            "subscriber" => Some(Role::Subscriber),
            _ => None,
        }
    }
}

/// Account row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub login: String,
    pub email: String,
    pub display_name: String,
    pub role: String,
    pub description: Option<String>,
}

impl User {
    /// Unknown role strings are treated as the least privileged role
    pub fn role(&self) -> Role {
        Role::parse(&self.role).unwrap_or(Role::Subscriber)
    }

    /// URL slug derived from the login
    pub fn nicename(&self) -> String {
        self.login
            .to_lowercase()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '-' })
            .collect()
    }
}

/// Talk summary row (ledger blob excluded)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Talk {
    pub id: i64,
    pub author_id: i64,
    pub title: String,
    pub status: String,
    pub average_rate: Option<String>,
}

/// Fields for a new account
#[derive(Debug, Clone)]
pub struct NewUser<'a> {
    pub login: &'a str,
    pub email: &'a str,
    pub display_name: &'a str,
    pub role: Role,
    pub description: Option<&'a str>,
    pub api_token: Option<&'a str>,
}

/// Insert an account, returning its id
pub async fn insert_user(pool: &SqlitePool, user: &NewUser<'_>) -> Result<i64> {
    let id = sqlx::query(
        "INSERT INTO users (login, email, display_name, role, description, api_token)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(user.login)
    .bind(user.email)
    .bind(user.display_name)
    .bind(user.role.as_str())
    .bind(user.description)
    .bind(user.api_token)
    .execute(pool)
    .await?
    .last_insert_rowid();

    Ok(id)
}

/// Insert a talk, returning its id
pub async fn insert_talk(
    pool: &SqlitePool,
    author_id: i64,
    title: &str,
    content: &str,
    status: TalkStatus,
) -> Result<i64> {
    if title.trim().is_empty() || content.trim().is_empty() {
        return Err(Error::InvalidInput(
            "Title and description are required fields".to_string(),
        ));
    }

    let id = sqlx::query(
        "INSERT INTO talks (author_id, title, content, status) VALUES (?, ?, ?, ?)",
    )
    .bind(author_id)
    .bind(title)
    .bind(content)
    .bind(status.as_str())
    .execute(pool)
    .await?
    .last_insert_rowid();

    Ok(id)
}

/// Move a talk to another workflow status
///
/// Selecting a talk requires its author to have filled in a biography.
pub async fn set_talk_status(pool: &SqlitePool, talk_id: i64, status: TalkStatus) -> Result<()> {
    if status == TalkStatus::Selected {
        let bio: Option<Option<String>> = sqlx::query_scalar(
            "SELECT u.description FROM talks t JOIN users u ON u.id = t.author_id WHERE t.id = ?",
        )
        .bind(talk_id)
        .fetch_optional(pool)
        .await?;

        match bio {
            None => return Err(Error::NotFound(format!("talk {}", talk_id))),
            Some(bio) if bio.as_deref().map_or(true, |b| b.trim().is_empty()) => {
                return Err(Error::BioRequired(talk_id));
            }
            Some(_) => {}
        }
    }

    let updated = sqlx::query("UPDATE talks SET status = ? WHERE id = ?")
        .bind(status.as_str())
        .bind(talk_id)
        .execute(pool)
        .await?
        .rows_affected();

    if updated == 0 {
        return Err(Error::NotFound(format!("talk {}", talk_id)));
    }
    Ok(())
}

/// Talk row with its author's display name, as exported
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct TalkSummary {
    pub id: i64,
    pub title: String,
    pub status: String,
    pub average_rate: Option<String>,
    pub author_name: String,
}

impl TalkSummary {
    /// Human-readable status, falling back to the stored name
    pub fn status_label(&self) -> &str {
        TalkStatus::parse(&self.status).map_or(self.status.as_str(), |s| s.label())
    }
}

/// Up to `limit` live talks with an id above `after_id`, in id order
pub async fn list_talk_summaries(pool: &SqlitePool, after_id: i64, limit: i64) -> Result<Vec<TalkSummary>> {
    Ok(sqlx::query_as::<_, TalkSummary>(
        "SELECT t.id, t.title, t.status, t.average_rate, u.display_name AS author_name
         FROM talks t JOIN users u ON u.id = t.author_id
         WHERE t.status != ? AND t.id > ?
         ORDER BY t.id
         LIMIT ?",
    )
    .bind(TalkStatus::Trash.as_str())
    .bind(after_id)
    .bind(limit)
    .fetch_all(pool)
    .await?)
}

/// Look up an account by id
pub async fn find_user(pool: &SqlitePool, user_id: i64) -> Result<Option<User>> {
    Ok(sqlx::query_as::<_, User>(
        "SELECT id, login, email, display_name, role, description FROM users WHERE id = ?",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?)
}

/// Look up the account owning an API token
pub async fn find_user_by_token(pool: &SqlitePool, token: &str) -> Result<Option<User>> {
    Ok(sqlx::query_as::<_, User>(
        "SELECT id, login, email, display_name, role, description FROM users WHERE api_token = ?",
    )
    .bind(token)
    .fetch_optional(pool)
    .await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip_names() {
        for status in TalkStatus::LIVE {
            assert_eq!(TalkStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(TalkStatus::parse("publish"), None);
    }

    #[test]
    fn test_summary_status_label() {
        let mut talk = TalkSummary {
            id: 1,
            title: "t".into(),
            status: "wct_shortlist".into(),
            average_rate: None,
            author_name: "A".into(),
        };
        assert_eq!(talk.status_label(), "Short-listed");
        talk.status = "draft".into();
        assert_eq!(talk.status_label(), "draft");
    }

    #[test]
    fn test_unknown_role_is_subscriber() {
        let user = User {
            id: 1,
            login: "x".into(),
            email: "x@example.org".into(),
            display_name: "X".into(),
            role: "editor".into(),
            description: None,
        };
        assert_eq!(user.role(), Role::Subscriber);
    }

    #[test]
    fn test_nicename() {
        let user = User {
            id: 1,
            login: "Jane Doe".into(),
            email: "j@example.org".into(),
            display_name: "Jane".into(),
            role: "subscriber".into(),
            description: None,
        };
        assert_eq!(user.nicename(), "jane-doe");
    }
}
