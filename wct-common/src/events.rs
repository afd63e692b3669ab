//! Rating hook events
//!
//! Every successful ledger mutation emits an event carrying the talk, the
//! rater and the new formatted average. Subscribers use them to invalidate
//! per-user caches.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::trace;

/// Events emitted by the rating aggregator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WctEvent {
    RateAdded {
        talk_id: i64,
        user_id: i64,
        value: i64,
        average: String,
    },
    RateDeleted {
        talk_id: i64,
        user_id: i64,
        average: String,
    },
}

impl WctEvent {
    /// The rater whose cached stats are affected
    pub fn user_id(&self) -> i64 {
        match self {
            WctEvent::RateAdded { user_id, .. } | WctEvent::RateDeleted { user_id, .. } => *user_id,
        }
    }
}

/// Broadcast bus for [`WctEvent`]s
///
/// # Examples
///
/// ```
/// use wct_common::events::{EventBus, WctEvent};
///
/// let bus = EventBus::new(16);
/// let mut rx = bus.subscribe();
/// bus.emit_lossy(WctEvent::RateDeleted { talk_id: 1, user_id: 2, average: "0".into() });
/// assert_eq!(rx.try_recv().unwrap().user_id(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<WctEvent>,
}

impl EventBus {
    /// Creates a new EventBus buffering up to `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<WctEvent> {
        self.tx.subscribe()
    }

    /// Emit an event; having no subscribers is not an error
    pub fn emit_lossy(&self, event: WctEvent) {
        if self.tx.send(event).is_err() {
            trace!("No event subscribers");
        }
    }

    /// Number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
