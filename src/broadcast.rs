//! Minimal-diff change notifications.
//!
//! Engines publish [`Update`] values on an [`UpdateBus`]; external observers
//! (session layers, AI, replication) subscribe for fan-out. Publishing is
//! fire-and-forget: a bus with no subscribers, or with lagging subscribers,
//! never fails the publishing engine.

use std::collections::HashMap;

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::trace;

use crate::stats::types::StatType;
use crate::threat::model::ThreatUpdate;

/// A change notification, tagged with `"type"` when serialized so consumers
/// can dispatch on the event kind.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum Update {
    /// Derived-stat entries that changed for one actor.
    StatsDiff {
        /// Actor whose stats changed.
        actor_id: String,
        /// Only the changed entries, never the full derived map.
        derived_stats: HashMap<StatType, f64>,
    },

    /// Threat additions and removals for one actor.
    ThreatDelta(ThreatUpdate),
}

impl Update {
    /// The actor this update concerns.
    #[must_use]
    pub fn actor_id(&self) -> &str {
        match self {
            Self::StatsDiff { actor_id, .. } => actor_id,
            Self::ThreatDelta(update) => &update.actor_id,
        }
    }
}

/// Broadcast fan-out for engine updates.
#[derive(Debug, Clone)]
pub struct UpdateBus {
    tx: broadcast::Sender<Update>,
}

impl UpdateBus {
    /// Creates a bus retaining up to `capacity` undelivered updates per
    /// subscriber before older ones are dropped.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publishes an update to all current subscribers.
    ///
    /// Dropped when there are no subscribers; soft real-time state has no
    /// use for replaying stale diffs.
    pub fn publish(&self, update: Update) {
        if let Err(err) = self.tx.send(update) {
            trace!(actor_id = %err.0.actor_id(), "update dropped, no subscribers");
        }
    }

    /// Registers a new observer.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Update> {
        self.tx.subscribe()
    }

    /// Number of live subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for UpdateBus {
    fn default() -> Self {
        Self::new(256)
    }
}
