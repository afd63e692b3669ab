//! Rating ledger and aggregation
//!
//! A talk's ratings are a map from rating value to the set of raters who
//! gave that value. The ledger is stored as one JSON blob on the talk row,
//! with the formatted average stored next to it so talk listings can sort
//! without decoding the blob.
//!
//! # Duplicate raters
//!
//! A rater holds at most one value per talk. [`RatingLedger::add`] enforces
//! this at write time by rejecting a rater who already appears in any
//! bucket. [`RatingLedger::remove`] still scans every bucket, so a blob
//! written by older tooling with the same rater in two buckets is repaired on
//! the next removal instead of rejected on read.

mod store;

pub use store::{RatingService, MAX_UPDATE_ATTEMPTS};

use serde::{Deserialize, Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::Result;

/// Mean rating of a talk, kept as exact tenths
///
/// Displays as `0` when nobody rated, otherwise with exactly one decimal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Average {
    #[default]
    Unrated,
    Tenths(i64),
}

impl Average {
    /// Σ(value × count) / Σcount rounded half away from zero to one decimal
    pub fn from_totals(weighted_sum: i64, raters: i64) -> Self {
        if raters <= 0 {
            return Average::Unrated;
        }
        // Integer arithmetic keeps x.x5 cases exact
        Average::Tenths((20 * weighted_sum + raters) / (2 * raters))
    }
}

impl fmt::Display for Average {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Average::Unrated => f.write_str("0"),
            Average::Tenths(t) => write!(f, "{}.{}", t / 10, t % 10),
        }
    }
}

impl Serialize for Average {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Average::Unrated => serializer.serialize_i64(0),
            Average::Tenths(_) => serializer.collect_str(self),
        }
    }
}

/// Format a single rating value the way averages are formatted
pub fn format_rating(value: i64) -> String {
    Average::from_totals(value, 1).to_string()
}

/// Per-talk map of rating value → rater ids
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RatingLedger {
    buckets: BTreeMap<i64, BTreeSet<i64>>,
}

impl RatingLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a stored blob; a missing or empty blob is an empty ledger
    pub fn from_blob(blob: Option<&str>) -> Result<Self> {
        match blob.map(str::trim) {
            None | Some("") => Ok(Self::default()),
            Some(json) => {
                let mut ledger: RatingLedger = serde_json::from_str(json)?;
                ledger.buckets.retain(|_, raters| !raters.is_empty());
                Ok(ledger)
            }
        }
    }

    pub fn to_blob(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Record `user_id` under `value`
    ///
    /// Returns false without changing anything when the rater already holds
    /// a rating on this ledger, at this or any other value.
    pub fn add(&mut self, user_id: i64, value: i64) -> bool {
        if self.buckets.values().any(|raters| raters.contains(&user_id)) {
            return false;
        }
        self.buckets.entry(value).or_default().insert(user_id)
    }

    /// Remove `user_id` from every bucket holding it; emptied buckets are dropped
    pub fn remove(&mut self, user_id: i64) -> bool {
        let mut removed = false;
        for raters in self.buckets.values_mut() {
            removed |= raters.remove(&user_id);
        }
        self.buckets.retain(|_, raters| !raters.is_empty());
        removed
    }

    pub fn average(&self) -> Average {
        let (sum, count) = self
            .buckets
            .iter()
            .fold((0i64, 0i64), |(sum, count), (value, raters)| {
                let n = raters.len() as i64;
                (sum + value * n, count + n)
            });
        Average::from_totals(sum, count)
    }

    /// The value `user_id` gave, or 0 when they have not rated
    pub fn user_rating(&self, user_id: i64) -> i64 {
        self.buckets
            .iter()
            .find(|(_, raters)| raters.contains(&user_id))
            .map(|(value, _)| *value)
            .unwrap_or(0)
    }

    /// Every rater once, ascending
    pub fn rater_ids(&self) -> Vec<i64> {
        let all: BTreeSet<i64> = self.buckets.values().flatten().copied().collect();
        all.into_iter().collect()
    }

    pub fn details(&self) -> BTreeMap<i64, Vec<i64>> {
        self.buckets
            .iter()
            .map(|(value, raters)| (*value, raters.iter().copied().collect()))
            .collect()
    }
}

/// Aggregate view of a talk's ledger
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatingStats {
    pub average: Average,
    pub user_ids: Vec<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<BTreeMap<i64, Vec<i64>>>,
}

impl RatingStats {
    pub fn from_ledger(ledger: &RatingLedger, want_details: bool) -> Self {
        Self {
            average: ledger.average(),
            user_ids: ledger.rater_ids(),
            details: want_details.then(|| ledger.details()),
        }
    }
}
