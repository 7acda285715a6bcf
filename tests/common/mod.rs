//! Shared harness wiring the three engines over the in-memory store and a
//! single update bus, the way a game server composes them.

use std::sync::Arc;

use aggro::broadcast::UpdateBus;
use aggro::config::EngineConfig;
use aggro::stats::engine::StatsEngine;
use aggro::status::engine::StatusEngine;
use aggro::store::MemoryStore;
use aggro::sync::ActorLocks;
use aggro::threat::tracker::ThreatTracker;

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub bus: UpdateBus,
    pub stats: Arc<StatsEngine>,
    pub status: Arc<StatusEngine>,
    pub threat: Arc<ThreatTracker>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(&EngineConfig::default())
    }

    pub fn with_config(config: &EngineConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        let bus = UpdateBus::new(config.bus_capacity);
        let locks = Arc::new(ActorLocks::new());

        let stats = Arc::new(StatsEngine::new(
            store.clone(),
            bus.clone(),
            locks.clone(),
        ));
        let status = Arc::new(StatusEngine::new(
            store.clone(),
            bus.clone(),
            locks.clone(),
            stats.clone(),
        ));
        let threat = Arc::new(ThreatTracker::new(
            store.clone(),
            bus.clone(),
            locks,
            config,
        ));

        Self {
            store,
            bus,
            stats,
            status,
            threat,
        }
    }
}
