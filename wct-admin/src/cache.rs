//! Per-user rates-count cache
//!
//! Counting a user's ratings scans every ledger, so the count is cached
//! per user. Rating events drop the affected entry.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use wct_common::events::EventBus;
use wct_common::ratings::RatingService;
use wct_common::Result;

#[derive(Debug, Clone, Default)]
pub struct RatesCountCache {
    counts: Arc<RwLock<HashMap<i64, i64>>>,
}

impl RatesCountCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached count for `user_id`, computed on a miss
    pub async fn get_or_load(&self, ratings: &RatingService, user_id: i64) -> Result<i64> {
        if let Some(count) = self.counts.read().await.get(&user_id) {
            return Ok(*count);
        }

        let count = ratings.count_user_rates(user_id).await?;
        self.counts.write().await.insert(user_id, count);
        Ok(count)
    }

    pub async fn invalidate(&self, user_id: i64) {
        if self.counts.write().await.remove(&user_id).is_some() {
            debug!(user_id, "Rates count invalidated");
        }
    }

    pub async fn clear(&self) {
        self.counts.write().await.clear();
    }

    pub async fn contains(&self, user_id: i64) -> bool {
        self.counts.read().await.contains_key(&user_id)
    }

    /// Drop entries as rating events arrive
    ///
    /// A lagged receiver no longer knows which users changed, so it clears
    /// the whole cache.
    pub fn spawn_invalidation(&self, bus: &EventBus) -> JoinHandle<()> {
        let cache = self.clone();
        let mut rx = bus.subscribe();

        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => cache.invalidate(event.user_id()).await,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Rates cache lagged behind events, clearing");
                        cache.clear().await;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }
}
