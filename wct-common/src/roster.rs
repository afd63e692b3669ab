//! Applicant roster filtering
//!
//! Turns a status facet, a search term, an order and a page into the page
//! of applicant accounts plus the total number of matches. Rendering is left
//! to the caller; see the HTML and CSV renderers in the admin service.
//!
//! A roster page costs at most two statements: the account query, which
//! returns the rows and the pre-pagination total together, and one batched
//! proposal count for the ids on the page.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use std::collections::HashMap;
use tracing::debug;

use crate::db::TalkStatus;
use crate::Result;

/// Named roster filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StatusFacet {
    #[default]
    All,
    /// Accounts without a biography
    MissingBio,
    /// Authors of at least one selected talk
    Selected,
    /// Everyone except authors of a selected talk
    NotSelected,
}

impl StatusFacet {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "all" | "" => Some(StatusFacet::All),
            "missing-bio" => Some(StatusFacet::MissingBio),
            "selected" => Some(StatusFacet::Selected),
            "not-selected" => Some(StatusFacet::NotSelected),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StatusFacet::All => "all",
            StatusFacet::MissingBio => "missing-bio",
            StatusFacet::Selected => "selected",
            StatusFacet::NotSelected => "not-selected",
        }
    }
}

/// Sortable roster column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderKey {
    Login,
    Email,
}

impl OrderKey {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "login" | "username" => Some(OrderKey::Login),
            "email" => Some(OrderKey::Email),
            _ => None,
        }
    }

    fn column(&self) -> &'static str {
        match self {
            OrderKey::Login => "u.login",
            OrderKey::Email => "u.email",
        }
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    /// Case-insensitive; anything but "desc" sorts ascending
    pub fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("desc") {
            SortOrder::Desc
        } else {
            SortOrder::Asc
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// One roster request
#[derive(Debug, Clone, PartialEq)]
pub struct RosterQuery {
    pub facet: StatusFacet,
    pub search: Option<String>,
    /// `None` keeps the default ordering (login ascending)
    pub order_by: Option<OrderKey>,
    pub order: SortOrder,
    /// 1-based
    pub page: i64,
    pub page_size: i64,
}

impl RosterQuery {
    pub fn new(page_size: i64) -> Self {
        Self {
            facet: StatusFacet::All,
            search: None,
            order_by: None,
            order: SortOrder::Asc,
            page: 1,
            page_size,
        }
    }

    /// Highest page whose row bounds fit in an `i64`
    pub fn max_page(page_size: i64) -> i64 {
        i64::MAX / page_size.max(1)
    }

    pub fn offset(&self) -> i64 {
        (self.page.max(1) - 1).saturating_mul(self.page_size)
    }

    /// The search term as handed to the account search, e.g. `*jane*`
    pub fn search_term(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(|s| s.trim().trim_matches('*'))
            .filter(|s| !s.is_empty())
            .map(|s| format!("*{}*", s))
    }
}

/// Account columns shown in the roster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountRow {
    pub id: i64,
    pub login: String,
    pub display_name: String,
    pub email: String,
}

/// Roster row: an account plus its number of proposals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Applicant {
    pub id: i64,
    pub login: String,
    pub display_name: String,
    pub email: String,
    pub proposal_count: i64,
}

/// Data contract consumed by roster renderers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterPage {
    pub applicants: Vec<Applicant>,
    /// Matches before pagination
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
}

impl RosterPage {
    pub fn total_pages(&self) -> i64 {
        (self.total + self.page_size - 1) / self.page_size
    }
}

/// Storage behind the roster
#[async_trait]
pub trait RosterSource: Send + Sync {
    /// One page of matching accounts plus the total match count
    async fn fetch_accounts(&self, query: &RosterQuery) -> Result<(Vec<AccountRow>, i64)>;

    /// Live proposal counts keyed by author, in a single query
    async fn count_proposals(&self, user_ids: &[i64]) -> Result<HashMap<i64, i64>>;
}

/// Resolve one roster page
pub async fn list_applicants<S>(source: &S, query: &RosterQuery) -> Result<RosterPage>
where
    S: RosterSource + ?Sized,
{
    let (accounts, total) = source.fetch_accounts(query).await?;

    let ids: Vec<i64> = accounts.iter().map(|a| a.id).collect();
    let counts = if ids.is_empty() {
        HashMap::new()
    } else {
        source.count_proposals(&ids).await?
    };

    debug!(
        facet = query.facet.as_str(),
        page = query.page,
        rows = accounts.len(),
        total,
        "Roster page resolved"
    );

    let applicants = accounts
        .into_iter()
        .map(|a| Applicant {
            proposal_count: counts.get(&a.id).copied().unwrap_or(0),
            id: a.id,
            login: a.login,
            display_name: a.display_name,
            email: a.email,
        })
        .collect();

    Ok(RosterPage {
        applicants,
        total,
        page: query.page.max(1),
        page_size: query.page_size,
    })
}

/// Translate a `*`-bounded search term to a LIKE pattern
///
/// Leading and trailing `*` become `%`; LIKE metacharacters in the term are
/// escaped with `\`. Without any `*` the pattern matches the exact value.
pub fn like_pattern(term: &str) -> String {
    let leading = term.starts_with('*');
    let trailing = term.len() > 1 && term.ends_with('*');
    let core = term.trim_matches('*');

    let mut pattern = String::with_capacity(core.len() + 2);
    if leading {
        pattern.push('%');
    }
    for c in core.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    if trailing {
        pattern.push('%');
    }
    pattern
}

/// SQLite-backed roster limited to one account role
#[derive(Debug, Clone)]
pub struct SqliteRoster {
    pool: SqlitePool,
    role: String,
}

impl SqliteRoster {
    pub fn new(pool: SqlitePool, role: impl Into<String>) -> Self {
        Self {
            pool,
            role: role.into(),
        }
    }
}

#[async_trait]
impl RosterSource for SqliteRoster {
    async fn fetch_accounts(&self, query: &RosterQuery) -> Result<(Vec<AccountRow>, i64)> {
        let order_column = query.order_by.unwrap_or(OrderKey::Login).column();
        let direction = match query.order_by {
            Some(_) => query.order.as_sql(),
            None => "ASC",
        };

        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("WITH matched AS (SELECT u.id, u.login, u.email, u.display_name, ROW_NUMBER() OVER (ORDER BY ");
        qb.push(order_column)
            .push(" ")
            .push(direction)
            .push(", u.id ASC) AS rn FROM users u WHERE u.role = ")
            .push_bind(self.role.clone());

        match query.facet {
            StatusFacet::All => {}
            StatusFacet::MissingBio => {
                qb.push(" AND (u.description IS NULL OR TRIM(u.description) = '')");
            }
            StatusFacet::Selected => {
                // IN over an empty subquery matches nothing
                qb.push(" AND u.id IN (SELECT DISTINCT author_id FROM talks WHERE status = ")
                    .push_bind(TalkStatus::Selected.as_str())
                    .push(")");
            }
            StatusFacet::NotSelected => {
                qb.push(" AND u.id NOT IN (SELECT DISTINCT author_id FROM talks WHERE status = ")
                    .push_bind(TalkStatus::Selected.as_str())
                    .push(")");
            }
        }

        if let Some(term) = query.search_term() {
            let pattern = like_pattern(&term);
            qb.push(" AND (u.login LIKE ")
                .push_bind(pattern.clone())
                .push(" ESCAPE '\\' OR u.email LIKE ")
                .push_bind(pattern.clone())
                .push(" ESCAPE '\\' OR u.display_name LIKE ")
                .push_bind(pattern)
                .push(" ESCAPE '\\')");
        }

        // The anchor row keeps the total available when the page is empty
        qb.push(
            ") SELECT (SELECT COUNT(*) FROM matched) AS total, p.id, p.login, p.email, p.display_name \
             FROM (SELECT 1) AS anchor \
             LEFT JOIN (SELECT * FROM matched WHERE rn > ",
        )
        .push_bind(query.offset())
        .push(" AND rn <= ")
        .push_bind(query.offset().saturating_add(query.page_size))
        .push(") AS p ON 1 = 1 ORDER BY p.rn");

        let rows: Vec<(i64, Option<i64>, Option<String>, Option<String>, Option<String>)> =
            qb.build_query_as().fetch_all(&self.pool).await?;

        let total = rows.first().map(|r| r.0).unwrap_or(0);
        let accounts = rows
            .into_iter()
            .filter_map(|(_, id, login, email, display_name)| {
                Some(AccountRow {
                    id: id?,
                    login: login.unwrap_or_default(),
                    email: email.unwrap_or_default(),
                    display_name: display_name.unwrap_or_default(),
                })
            })
            .collect();

        Ok((accounts, total))
    }

    async fn count_proposals(&self, user_ids: &[i64]) -> Result<HashMap<i64, i64>> {
        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT author_id, COUNT(*) FROM talks WHERE status IN (");
        let mut statuses = qb.separated(", ");
        for status in TalkStatus::LIVE {
            statuses.push_bind(status.as_str());
        }
        qb.push(") AND author_id IN (");
        let mut ids = qb.separated(", ");
        for id in user_ids {
            ids.push_bind(*id);
        }
        qb.push(") GROUP BY author_id");

        let rows: Vec<(i64, i64)> = qb.build_query_as().fetch_all(&self.pool).await?;
        Ok(rows.into_iter().collect())
    }
}
