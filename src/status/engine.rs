//! The status service: apply/stack/refresh, cure, the shared status/regen
//! tick loop, and the death transition.
//!
//! One actor's tick runs entirely under that actor's lock: expirations are
//! processed strictly before damage application so a just-expired effect
//! never deals damage, then regen runs for living actors. Failures are
//! isolated per actor — one broken document never aborts the batch.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashSet;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::broadcast::UpdateBus;
use crate::error::Result;
use crate::stats::engine::StatsEngine;
use crate::stats::model::StatsDiff;
use crate::stats::types::{DamageType, StatType};
use crate::store::{ActorStore, StoreError};
use crate::sync::ActorLocks;

use super::effect::StatusCategory;
use super::model::{ActorStatus, Status};

/// Status-effect lifecycle service.
pub struct StatusEngine {
    store: Arc<dyn ActorStore>,
    bus: UpdateBus,
    locks: Arc<ActorLocks>,
    stats: Arc<StatsEngine>,
    /// Actors with a non-empty ACTIVE set, driving the tick loop.
    active: DashSet<String>,
    cancel: CancellationToken,
}

impl StatusEngine {
    /// Creates the engine over the shared store, bus, locks, and stats
    /// service.
    #[must_use]
    pub fn new(
        store: Arc<dyn ActorStore>,
        bus: UpdateBus,
        locks: Arc<ActorLocks>,
        stats: Arc<StatsEngine>,
    ) -> Self {
        Self {
            store,
            bus,
            locks,
            stats,
            active: DashSet::new(),
            cancel: CancellationToken::new(),
        }
    }

    /// Fetches the actor's status document, lazily defaulting to an empty
    /// one: an uninitialized actor simply has no effects yet.
    pub async fn actor_status(&self, actor_id: &str) -> Result<ActorStatus> {
        match self.store.find_actor_status(actor_id).await {
            Ok(status) => Ok(status),
            Err(StoreError::NotFound { .. }) => Ok(ActorStatus::new(actor_id)),
            Err(err) => Err(err.into()),
        }
    }

    /// Whether the actor currently has an ACTIVE DEAD status. Consulted by
    /// the threat tracker and the regen gate.
    pub async fn is_dead(&self, actor_id: &str) -> Result<bool> {
        Ok(self.actor_status(actor_id).await?.is_dead())
    }

    /// Applies a batch of statuses to the actor under the stacking rules,
    /// then reconciles the derived stats against the new aggregate.
    pub async fn add_statuses(&self, actor_id: &str, incoming: Vec<Status>) -> Result<()> {
        if incoming.is_empty() {
            return Ok(());
        }
        let _guard = self.locks.acquire(actor_id).await;

        let mut status = self.actor_status(actor_id).await?;
        status.merge(incoming);
        self.active.insert(actor_id.to_string());
        debug!(actor_id, active = status.statuses.len(), "statuses applied");

        self.persist_status(&status).await?;
        self.reconcile_stats(&status).await;
        Ok(())
    }

    /// Explicitly removes (cures) the named categories. Absent categories
    /// are a silent no-op; nothing is persisted or broadcast for them.
    pub async fn cure(&self, actor_id: &str, categories: &[StatusCategory]) -> Result<()> {
        let _guard = self.locks.acquire(actor_id).await;

        let mut status = self.actor_status(actor_id).await?;
        let cured = status.cure(categories);
        if cured.is_empty() {
            return Ok(());
        }
        debug!(actor_id, cured = cured.len(), "statuses cured");

        if status.statuses.is_empty() {
            self.active.remove(actor_id);
        }
        self.persist_status(&status).await?;
        self.reconcile_stats(&status).await;
        Ok(())
    }

    /// Orchestrated damage entry point: applies the damage and attaches a
    /// DEAD status when CURRENT_HP reaches 0.
    pub async fn deal_damage(
        &self,
        actor_id: &str,
        damage: &std::collections::HashMap<DamageType, f64>,
        source_id: &str,
    ) -> Result<StatsDiff> {
        let _guard = self.locks.acquire(actor_id).await;

        let mut stats = self.stats.stats_for(actor_id).await?;
        let diff = stats.apply_damage(damage);
        let died = stats.derived(StatType::CurrentHp) <= 0.0;
        self.stats.finish(&stats, diff.clone()).await?;

        if died {
            let mut status = self.actor_status(actor_id).await?;
            if !status.is_dead() {
                status.merge(vec![Status::dead(source_id)]);
                self.active.insert(actor_id.to_string());
                debug!(actor_id, source_id, "actor died");
                self.persist_status(&status).await?;
            }
        }
        Ok(diff)
    }

    /// Runs one shared status/regen tick over every actor with active
    /// effects. Per-actor failures are logged and do not abort the batch.
    pub async fn tick(&self, now: DateTime<Utc>) {
        let actors: Vec<String> = self.active.iter().map(|entry| entry.key().clone()).collect();
        if actors.is_empty() {
            return;
        }
        metrics::counter!("aggro_status_ticks_total").increment(1);

        for actor_id in actors {
            if let Err(err) = self.tick_actor(&actor_id, now).await {
                error!(actor_id, %err, "status tick failed for actor");
            }
        }
    }

    /// One actor's tick: expire, apply damage-over-time, regen.
    async fn tick_actor(&self, actor_id: &str, now: DateTime<Utc>) -> Result<()> {
        let _guard = self.locks.acquire(actor_id).await;

        let mut status = match self.store.find_actor_status(actor_id).await {
            Ok(status) => status,
            Err(StoreError::NotFound { .. }) => {
                self.active.remove(actor_id);
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        };

        // Expirations strictly first: an effect that lapsed this tick must
        // not deal damage below.
        let expired = status.remove_expired(now);
        if !expired.is_empty() {
            metrics::counter!("aggro_statuses_expired_total").increment(expired.len() as u64);
            debug!(actor_id, expired = expired.len(), "statuses expired");
        }

        let mut stats = match self.stats.stats_for(actor_id).await {
            Ok(stats) => Some(stats),
            Err(crate::EngineError::Store(StoreError::NotFound { .. })) => None,
            Err(err) => return Err(err),
        };

        let mut status_changed = !expired.is_empty();
        let mut diff = StatsDiff::new();
        if let Some(stats) = stats.as_mut() {
            if !expired.is_empty() {
                // Lapsed buffs must stop contributing to derived stats.
                diff.extend(stats.recalculate(&status.aggregate().derived));
            }

            let mut dead = status.is_dead();
            for active in status.statuses.clone() {
                if !active.kind.requires_damage_apply() {
                    continue;
                }
                // A malformed catalog definition aborts this actor's tick.
                let damage = active.kind.compute_effect(stats)?;
                diff.extend(stats.apply_damage(&damage));

                if !dead && stats.derived(StatType::CurrentHp) <= 0.0 {
                    status.merge(vec![Status::dead(&active.origin)]);
                    debug!(actor_id, origin = %active.origin, "actor died to damage over time");
                    dead = true;
                    status_changed = true;
                }
            }

            if !dead {
                diff.extend(stats.apply_regen());
            }
        }

        if status.statuses.is_empty() {
            self.active.remove(actor_id);
        }
        if status_changed {
            self.persist_status(&status).await?;
        }
        if let Some(stats) = &stats {
            self.stats.finish(stats, diff).await?;
        }
        Ok(())
    }

    /// Spawns the fixed-interval tick loop. The task stops when
    /// [`shutdown`](Self::shutdown) is called.
    pub fn spawn_tick_loop(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let engine = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    () = engine.cancel.cancelled() => {
                        debug!("status tick loop cancelled");
                        break;
                    }
                    _ = ticker.tick() => {
                        engine.tick(Utc::now()).await;
                    }
                }
            }
        })
    }

    /// Stops the tick loop. In-flight ticks complete; no new ones start.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Number of actors currently driving the tick loop.
    #[must_use]
    pub fn active_actor_count(&self) -> usize {
        self.active.len()
    }

    /// Persists the status document while the caller holds the actor's lock,
    /// so the next read on this actor observes the write.
    async fn persist_status(&self, status: &ActorStatus) -> Result<()> {
        Ok(self.store.save_actor_status(status).await?)
    }

    /// Recalculates the actor's derived stats against the new status
    /// aggregate and broadcasts the change. An actor without stats (status
    /// applied before initialization) is tolerated.
    async fn reconcile_stats(&self, status: &ActorStatus) {
        match self.stats.stats_for(&status.actor_id).await {
            Ok(mut stats) => {
                let diff = stats.recalculate(&status.aggregate().derived);
                if let Err(err) = self.stats.finish(&stats, diff).await {
                    warn!(actor_id = %status.actor_id, %err, "failed to persist reconciled stats");
                }
            }
            Err(crate::EngineError::Store(StoreError::NotFound { .. })) => {}
            Err(err) => {
                warn!(actor_id = %status.actor_id, %err, "failed to reconcile derived stats");
            }
        }
    }

    /// Access to the underlying bus, mainly for wiring tests.
    #[must_use]
    pub const fn bus(&self) -> &UpdateBus {
        &self.bus
    }
}

impl std::fmt::Debug for StatusEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusEngine")
            .field("active_actors", &self.active.len())
            .finish_non_exhaustive()
    }
}
