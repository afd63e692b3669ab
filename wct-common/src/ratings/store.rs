//! Ledger persistence with optimistic concurrency
//!
//! Each mutation reads the blob with its `ledger_version`, applies the
//! change in memory and writes back only if the version is unchanged. A
//! concurrent writer bumps the version, so the loser re-reads and retries.

use sqlx::SqlitePool;
use tracing::{debug, info, warn};

use super::{Average, RatingLedger, RatingStats};
use crate::db::{Talk, TalkStatus};
use crate::events::{EventBus, WctEvent};
use crate::roster::SortOrder;
use crate::{Error, Result};

/// Read-modify-write attempts before giving up with [`Error::Conflict`]
pub const MAX_UPDATE_ATTEMPTS: usize = 16;

/// Rating operations over the talks table
#[derive(Debug, Clone)]
pub struct RatingService {
    pool: SqlitePool,
    bus: EventBus,
    scale: i64,
}

impl RatingService {
    /// `scale` is the highest accepted rating value
    pub fn new(pool: SqlitePool, bus: EventBus, scale: i64) -> Self {
        Self { pool, bus, scale }
    }

    /// Record `user_id`'s rating of `talk_id`
    ///
    /// Returns the new average, or `None` when an argument is zero, the
    /// value is outside the scale, or the rater already rated this talk.
    pub async fn add_rating(&self, talk_id: i64, user_id: i64, value: i64) -> Result<Option<Average>> {
        if talk_id == 0 || user_id == 0 || value == 0 {
            return Ok(None);
        }
        if !(1..=self.scale).contains(&value) {
            debug!(talk_id, user_id, value, "Rating outside scale");
            return Ok(None);
        }

        let Some(average) = self
            .mutate(talk_id, |ledger| ledger.add(user_id, value))
            .await?
        else {
            debug!(talk_id, user_id, value, "Rater already rated this talk");
            return Ok(None);
        };

        info!(talk_id, user_id, value, %average, "Rating added");
        self.bus.emit_lossy(WctEvent::RateAdded {
            talk_id,
            user_id,
            value,
            average: average.to_string(),
        });

        Ok(Some(average))
    }

    /// Remove `user_id`'s rating from `talk_id`
    ///
    /// Returns the new average, or `None` when the ledger is empty or does
    /// not hold the rater. Nothing is written in that case.
    pub async fn remove_rating(&self, talk_id: i64, user_id: i64) -> Result<Option<Average>> {
        if talk_id == 0 || user_id == 0 {
            return Ok(None);
        }

        let Some(average) = self
            .mutate(talk_id, |ledger| !ledger.is_empty() && ledger.remove(user_id))
            .await?
        else {
            return Ok(None);
        };

        info!(talk_id, user_id, %average, "Rating removed");
        self.bus.emit_lossy(WctEvent::RateDeleted {
            talk_id,
            user_id,
            average: average.to_string(),
        });

        Ok(Some(average))
    }

    /// Average, raters and optionally the per-value breakdown of a talk
    pub async fn get_rating_stats(&self, talk_id: i64, want_details: bool) -> Result<RatingStats> {
        let (ledger, _) = self.load(talk_id).await?;
        Ok(RatingStats::from_ledger(&ledger, want_details))
    }

    /// The value `user_id` gave `talk_id`, or 0
    pub async fn get_user_rating(&self, talk_id: i64, user_id: i64) -> Result<i64> {
        let (ledger, _) = self.load(talk_id).await?;
        Ok(ledger.user_rating(user_id))
    }

    /// Number of talks `user_id` has rated
    pub async fn count_user_rates(&self, user_id: i64) -> Result<i64> {
        if user_id == 0 {
            return Ok(0);
        }

        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(DISTINCT t.id)
            FROM talks t, json_each(t.rates) AS bucket, json_each(bucket.value) AS rater
            WHERE t.rates IS NOT NULL AND rater.value = ?
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    /// Live talks ordered by their stored average; unrated talks count as 0
    pub async fn list_talks_by_rating(&self, order: SortOrder) -> Result<Vec<Talk>> {
        let sql = format!(
            "SELECT id, author_id, title, status, average_rate FROM talks
             WHERE status != ?
             ORDER BY CAST(COALESCE(average_rate, '0') AS REAL) {}, id ASC",
            order.as_sql()
        );

        Ok(sqlx::query_as::<_, Talk>(&sql)
            .bind(TalkStatus::Trash.as_str())
            .fetch_all(&self.pool)
            .await?)
    }

    async fn load(&self, talk_id: i64) -> Result<(RatingLedger, i64)> {
        let row: Option<(Option<String>, i64)> =
            sqlx::query_as("SELECT rates, ledger_version FROM talks WHERE id = ?")
                .bind(talk_id)
                .fetch_optional(&self.pool)
                .await?;

        let (blob, version) = row.ok_or_else(|| Error::NotFound(format!("talk {}", talk_id)))?;
        Ok((RatingLedger::from_blob(blob.as_deref())?, version))
    }

    /// Apply `change` and persist; `None` when `change` reports no-op
    async fn mutate<F>(&self, talk_id: i64, change: F) -> Result<Option<Average>>
    where
        F: Fn(&mut RatingLedger) -> bool,
    {
        for attempt in 1..=MAX_UPDATE_ATTEMPTS {
            let (mut ledger, version) = self.load(talk_id).await?;

            if !change(&mut ledger) {
                return Ok(None);
            }

            let average = ledger.average();
            let blob = if ledger.is_empty() {
                None
            } else {
                Some(ledger.to_blob()?)
            };

            let updated = sqlx::query(
                "UPDATE talks SET rates = ?, average_rate = ?, ledger_version = ledger_version + 1
                 WHERE id = ? AND ledger_version = ?",
            )
            .bind(blob)
            .bind(average.to_string())
            .bind(talk_id)
            .bind(version)
            .execute(&self.pool)
            .await?
            .rows_affected();

            if updated == 1 {
                return Ok(Some(average));
            }

            debug!(talk_id, attempt, "Ledger changed underneath, retrying");
            tokio::task::yield_now().await;
        }

        warn!(talk_id, "Giving up ledger update after {} attempts", MAX_UPDATE_ATTEMPTS);
        Err(Error::Conflict(format!("talk {}", talk_id)))
    }
}
