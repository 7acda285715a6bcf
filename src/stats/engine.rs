//! The stats service: initialization, item updates, damage and regen entry
//! points, and diff persistence/broadcast.
//!
//! Every mutating path locks the actor, reloads the document, applies the
//! pure model transformation, and hands the resulting diff to
//! [`StatsEngine::finish`], which persists the document before the lock is
//! released and publishes the minimal diff.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info};

use crate::broadcast::{Update, UpdateBus};
use crate::error::Result;
use crate::status::model::StatusAggregate;
use crate::store::{ActorStore, StoreError};
use crate::sync::ActorLocks;

use super::model::{Archetype, Stats, StatsDiff};
use super::types::{DamageType, StatType};

/// Stat derivation, damage, and regen service.
pub struct StatsEngine {
    store: Arc<dyn ActorStore>,
    bus: UpdateBus,
    locks: Arc<ActorLocks>,
}

impl StatsEngine {
    /// Creates the engine over the shared store, bus, and lock registry.
    #[must_use]
    pub fn new(store: Arc<dyn ActorStore>, bus: UpdateBus, locks: Arc<ActorLocks>) -> Self {
        Self { store, bus, locks }
    }

    /// Builds and persists default stats for a newly joined player or
    /// spawned mob, then broadcasts the full derived map.
    ///
    /// The save is awaited: a duplicate-initialization conflict must surface
    /// to the caller rather than be swallowed.
    pub async fn initialize(&self, actor_id: &str, archetype: Archetype) -> Result<Stats> {
        let _guard = self.locks.acquire(actor_id).await;

        let stats = Stats::new(actor_id, archetype);
        self.store.save_stats(&stats).await?;
        debug!(actor_id, ?archetype, "initialized actor stats");

        self.bus.publish(Update::StatsDiff {
            actor_id: stats.actor_id.clone(),
            derived_stats: stats.derived_stats.clone(),
        });
        Ok(stats)
    }

    /// Fetches the actor's stats document.
    pub async fn stats_for(&self, actor_id: &str) -> Result<Stats> {
        Ok(self.store.find_stats(actor_id).await?)
    }

    /// Deletes the actor's stats and drops its lock entry. Used on permanent
    /// actor removal.
    pub async fn delete(&self, actor_id: &str) -> Result<()> {
        self.store.delete_stats(actor_id).await?;
        self.locks.remove(actor_id);
        Ok(())
    }

    /// Replaces the actor's item-effect contributions and recalculates the
    /// derived map, broadcasting only what changed.
    pub async fn update_item_effects(
        &self,
        actor_id: &str,
        item_effects: HashMap<StatType, f64>,
    ) -> Result<()> {
        let _guard = self.locks.acquire(actor_id).await;

        let mut stats = self.store.find_stats(actor_id).await?;
        let aggregate = self.status_aggregate(actor_id).await?;
        stats.item_effects = item_effects;
        let diff = stats.recalculate(&aggregate.derived);
        self.finish(&stats, diff).await
    }

    /// Spends one available attribute point on a base stat and recalculates.
    ///
    /// A request with no points available is ignored (logged at debug), not
    /// an error: double-clicks are an expected client behavior.
    pub async fn add_attribute_point(&self, actor_id: &str, stat: StatType) -> Result<()> {
        let _guard = self.locks.acquire(actor_id).await;

        let mut stats = self.store.find_stats(actor_id).await?;
        if !stats.spend_attribute_point(stat) {
            debug!(actor_id, %stat, "no attribute points available");
            return Ok(());
        }
        let aggregate = self.status_aggregate(actor_id).await?;
        let diff = stats.recalculate(&aggregate.derived);
        self.finish(&stats, diff).await
    }

    /// Grants experience and handles any level-ups it completes, awarding
    /// attribute points per level gained.
    ///
    /// Mobs carry no level data and silently ignore xp grants.
    pub async fn add_xp(&self, actor_id: &str, amount: i32) -> Result<()> {
        let _guard = self.locks.acquire(actor_id).await;

        let mut stats = self.store.find_stats(actor_id).await?;
        let levels = stats.add_xp(amount);
        if levels > 0 {
            info!(actor_id, levels, "actor leveled up");
        }
        let aggregate = self.status_aggregate(actor_id).await?;
        let diff = stats.recalculate(&aggregate.derived);
        self.finish(&stats, diff).await
    }

    /// Applies typed damage to the actor under its lock.
    ///
    /// This is the raw application path; attaching a DEAD status when the
    /// pool reaches 0 is the status engine's responsibility
    /// ([`crate::StatusEngine::deal_damage`] is the orchestrated entry point).
    pub async fn take_damage(
        &self,
        actor_id: &str,
        damage: &HashMap<DamageType, f64>,
        source_id: &str,
    ) -> Result<StatsDiff> {
        let _guard = self.locks.acquire(actor_id).await;

        let mut stats = self.store.find_stats(actor_id).await?;
        let diff = stats.apply_damage(damage);
        debug!(actor_id, source_id, ?diff, "damage applied");
        self.finish(&stats, diff.clone()).await?;
        Ok(diff)
    }

    /// Applies one round of HP/MP regeneration, gated on the actor being
    /// able to act: a dead actor yields an empty diff and no writes.
    pub async fn apply_regen(&self, actor_id: &str) -> Result<StatsDiff> {
        let _guard = self.locks.acquire(actor_id).await;

        if self.is_dead(actor_id).await? {
            return Ok(StatsDiff::new());
        }
        let mut stats = self.store.find_stats(actor_id).await?;
        let diff = stats.apply_regen();
        self.finish(&stats, diff.clone()).await?;
        Ok(diff)
    }

    /// Recalculates the derived map against the current status aggregate and
    /// broadcasts the change. Called after any status-set mutation.
    pub async fn recalculate(&self, actor_id: &str) -> Result<StatsDiff> {
        let _guard = self.locks.acquire(actor_id).await;

        let mut stats = self.store.find_stats(actor_id).await?;
        let aggregate = self.status_aggregate(actor_id).await?;
        let diff = stats.recalculate(&aggregate.derived);
        self.finish(&stats, diff.clone()).await?;
        Ok(diff)
    }

    /// The actor's current status aggregate; an uninitialized status
    /// document aggregates to nothing.
    async fn status_aggregate(&self, actor_id: &str) -> Result<StatusAggregate> {
        match self.store.find_actor_status(actor_id).await {
            Ok(status) => Ok(status.aggregate()),
            Err(StoreError::NotFound { .. }) => Ok(StatusAggregate::default()),
            Err(err) => Err(err.into()),
        }
    }

    /// Death check against the stored status document, bypassing the status
    /// engine to keep the dependency one-way.
    async fn is_dead(&self, actor_id: &str) -> Result<bool> {
        match self.store.find_actor_status(actor_id).await {
            Ok(status) => Ok(status.is_dead()),
            Err(StoreError::NotFound { .. }) => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    /// Persists the mutated document and broadcasts the diff.
    ///
    /// The save is awaited while the caller still holds the actor's lock:
    /// the store is the authoritative copy, so the next read-modify-write on
    /// this actor must observe this write. Only the broadcast is
    /// fire-and-forget.
    pub(crate) async fn finish(&self, stats: &Stats, diff: StatsDiff) -> Result<()> {
        if diff.is_empty() {
            return Ok(());
        }
        self.store.save_stats(stats).await?;

        self.bus.publish(Update::StatsDiff {
            actor_id: stats.actor_id.clone(),
            derived_stats: diff,
        });
        Ok(())
    }
}

impl std::fmt::Debug for StatsEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatsEngine").finish_non_exhaustive()
    }
}
