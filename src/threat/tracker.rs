//! The threat service: accumulation, removal, reset, and the decay loop.
//!
//! The tracker owns the engine-wide tracked-actor set — the actors whose
//! threat maps are under active decay. Dead actors never admit new threat;
//! the death check goes straight to the stored status document to keep the
//! dependency on the status engine one-way.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashSet;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::broadcast::{Update, UpdateBus};
use crate::config::EngineConfig;
use crate::error::Result;
use crate::store::{ActorStore, StoreError};
use crate::sync::ActorLocks;

use super::model::{ActorThreat, ThreatUpdate};

/// Threat accumulation and decay service.
pub struct ThreatTracker {
    store: Arc<dyn ActorStore>,
    bus: UpdateBus,
    locks: Arc<ActorLocks>,
    decay_factor: f64,
    min_threat: i64,
    /// Actors with a non-empty threat map, driving the decay loop.
    tracked: DashSet<String>,
    cancel: CancellationToken,
}

impl ThreatTracker {
    /// Creates the tracker over the shared store, bus, and lock registry,
    /// taking its decay tuning from `config`.
    #[must_use]
    pub fn new(
        store: Arc<dyn ActorStore>,
        bus: UpdateBus,
        locks: Arc<ActorLocks>,
        config: &EngineConfig,
    ) -> Self {
        Self {
            store,
            bus,
            locks,
            decay_factor: config.decay_factor,
            min_threat: config.min_threat,
            tracked: DashSet::new(),
            cancel: CancellationToken::new(),
        }
    }

    /// Adds threat against `target_id` on `actor_id`'s map.
    ///
    /// A dead actor silently rejects the addition — that is an expected
    /// game-rule outcome, not a caller mistake.
    pub async fn add_threat(&self, actor_id: &str, target_id: &str, amount: i64) -> Result<()> {
        let _guard = self.locks.acquire(actor_id).await;

        // Checked under the lock so a death processed just before cannot be
        // outrun.
        if self.is_dead(actor_id).await? {
            debug!(actor_id, target_id, "dead actor does not accumulate threat");
            return Ok(());
        }

        let mut threat = self.threat_for(actor_id).await?;
        let new_value = threat.add(target_id, amount);
        self.tracked.insert(actor_id.to_string());

        self.persist(&threat).await?;
        self.bus.publish(Update::ThreatDelta(ThreatUpdate {
            actor_id: actor_id.to_string(),
            add_threat: Some(HashMap::from([(target_id.to_string(), new_value)])),
            remove_threat: None,
        }));
        Ok(())
    }

    /// Removes the listed targets from the actor's map.
    ///
    /// An empty removal list, or a list naming only absent targets, is an
    /// idempotent no-op: no store write, no broadcast. When the map empties,
    /// the actor is untracked and its record reset.
    pub async fn remove_threat(&self, actor_id: &str, target_ids: &[String]) -> Result<()> {
        if target_ids.is_empty() {
            return Ok(());
        }
        let _guard = self.locks.acquire(actor_id).await;

        let mut threat = match self.store.find_actor_threat(actor_id).await {
            Ok(threat) => threat,
            Err(StoreError::NotFound { .. }) => return Ok(()),
            Err(err) => return Err(err.into()),
        };

        let removed = threat.remove(target_ids);
        if removed.is_empty() {
            return Ok(());
        }

        if threat.is_empty() {
            self.untrack_and_reset(actor_id).await?;
        } else {
            self.persist(&threat).await?;
        }
        self.bus.publish(Update::ThreatDelta(ThreatUpdate {
            actor_id: actor_id.to_string(),
            add_threat: None,
            remove_threat: Some(removed),
        }));
        Ok(())
    }

    /// Unconditionally clears the actor's threat map and untracks it.
    ///
    /// Broadcasts a remove-delta naming every previously present target, if
    /// there were any.
    pub async fn reset_threat(&self, actor_id: &str) -> Result<()> {
        info!(actor_id, "resetting actor threat");
        let _guard = self.locks.acquire(actor_id).await;

        let removed: Vec<String> = match self.store.find_actor_threat(actor_id).await {
            Ok(threat) => threat.threat.keys().cloned().collect(),
            Err(StoreError::NotFound { .. }) => Vec::new(),
            Err(err) => return Err(err.into()),
        };

        self.untrack_and_reset(actor_id).await?;
        if !removed.is_empty() {
            self.bus.publish(Update::ThreatDelta(ThreatUpdate {
                actor_id: actor_id.to_string(),
                add_threat: None,
                remove_threat: Some(removed),
            }));
        }
        Ok(())
    }

    /// Runs one decay pass over the full tracked set. A store or lock
    /// failure on one actor is logged and never aborts the remaining batch.
    pub async fn decay_tick(&self) {
        if self.tracked.is_empty() {
            return;
        }
        let actors: Vec<String> = self.tracked.iter().map(|entry| entry.key().clone()).collect();
        debug!(actors = actors.len(), "threat decay tick");
        metrics::counter!("aggro_threat_decay_ticks_total").increment(1);

        for actor_id in actors {
            if let Err(err) = self.decay_actor(&actor_id).await {
                error!(actor_id, %err, "threat decay failed for actor");
            }
        }
    }

    /// Decays one actor's map under its lock.
    async fn decay_actor(&self, actor_id: &str) -> Result<()> {
        let _guard = self.locks.acquire(actor_id).await;

        let mut threat = match self.store.find_actor_threat(actor_id).await {
            Ok(threat) => threat,
            Err(StoreError::NotFound { .. }) => {
                // Already reset elsewhere; nothing left to decay.
                self.tracked.remove(actor_id);
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        };

        let removed = threat.decay(self.decay_factor, self.min_threat);

        if threat.is_empty() {
            self.untrack_and_reset(actor_id).await?;
        } else {
            self.persist(&threat).await?;
        }

        let add_threat = (!threat.is_empty()).then(|| threat.threat.clone());
        let remove_threat = (!removed.is_empty()).then_some(removed);
        if add_threat.is_some() || remove_threat.is_some() {
            self.bus.publish(Update::ThreatDelta(ThreatUpdate {
                actor_id: actor_id.to_string(),
                add_threat,
                remove_threat,
            }));
        }
        Ok(())
    }

    /// Spawns the fixed-interval decay loop. The task stops when
    /// [`shutdown`](Self::shutdown) is called.
    pub fn spawn_decay_loop(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let tracker = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    () = tracker.cancel.cancelled() => {
                        debug!("threat decay loop cancelled");
                        break;
                    }
                    _ = ticker.tick() => {
                        tracker.decay_tick().await;
                    }
                }
            }
        })
    }

    /// Stops the decay loop. An in-flight pass completes; no new one starts.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Whether the actor is currently under active decay.
    #[must_use]
    pub fn is_tracked(&self, actor_id: &str) -> bool {
        self.tracked.contains(actor_id)
    }

    /// Number of actors under active decay.
    #[must_use]
    pub fn tracked_count(&self) -> usize {
        self.tracked.len()
    }

    /// Fetches the actor's threat document, lazily defaulting to empty.
    async fn threat_for(&self, actor_id: &str) -> Result<ActorThreat> {
        match self.store.find_actor_threat(actor_id).await {
            Ok(threat) => Ok(threat),
            Err(StoreError::NotFound { .. }) => Ok(ActorThreat::new(actor_id)),
            Err(err) => Err(err.into()),
        }
    }

    /// Death check against the stored status document. Statuses expired but
    /// not yet swept by the tick loop are disregarded.
    async fn is_dead(&self, actor_id: &str) -> Result<bool> {
        match self.store.find_actor_status(actor_id).await {
            Ok(mut status) => {
                status.remove_expired(Utc::now());
                Ok(status.is_dead())
            }
            Err(StoreError::NotFound { .. }) => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    /// Untracks the actor and resets its stored record under the caller's
    /// lock.
    async fn untrack_and_reset(&self, actor_id: &str) -> Result<()> {
        self.tracked.remove(actor_id);
        Ok(self.store.reset_actor_threat(actor_id).await?)
    }

    /// Persists the threat document while the caller holds the actor's lock,
    /// so the next read on this actor observes the write.
    async fn persist(&self, threat: &ActorThreat) -> Result<()> {
        Ok(self.store.save_actor_threat(threat).await?)
    }
}

impl std::fmt::Debug for ThreatTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreatTracker")
            .field("decay_factor", &self.decay_factor)
            .field("min_threat", &self.min_threat)
            .field("tracked", &self.tracked.len())
            .finish_non_exhaustive()
    }
}
