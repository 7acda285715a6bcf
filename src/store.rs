//! Durable repository boundary.
//!
//! The engines only depend on the [`ActorStore`] trait; the durable
//! technology behind it is a deployment concern. [`MemoryStore`] is the
//! in-process implementation used for tests and single-node setups.
//!
//! `NotFound` is a normal condition: callers lazily initialize missing
//! documents rather than treating the lookup as fatal.

use async_trait::async_trait;
use dashmap::DashMap;
use thiserror::Error;

use crate::stats::model::Stats;
use crate::status::model::ActorStatus;
use crate::threat::model::ActorThreat;

/// Store lookup and write errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No document for the actor in the named collection.
    #[error("no {collection} document for actor '{actor_id}'")]
    NotFound {
        /// Collection the lookup ran against (`"stats"`, `"status"`, `"threat"`)
        collection: &'static str,
        /// Actor the lookup was for
        actor_id: String,
    },

    /// Backend failure (connection, serialization, write conflict).
    #[error("store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Whether this error is a plain missing-document lookup.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Repository contract for the three per-actor documents.
#[async_trait]
pub trait ActorStore: Send + Sync {
    async fn find_stats(&self, actor_id: &str) -> Result<Stats, StoreError>;
    async fn save_stats(&self, stats: &Stats) -> Result<(), StoreError>;
    async fn delete_stats(&self, actor_id: &str) -> Result<(), StoreError>;

    async fn find_actor_status(&self, actor_id: &str) -> Result<ActorStatus, StoreError>;
    async fn save_actor_status(&self, status: &ActorStatus) -> Result<(), StoreError>;

    async fn find_actor_threat(&self, actor_id: &str) -> Result<ActorThreat, StoreError>;
    async fn find_actor_threats(&self, actor_ids: &[String]) -> Result<Vec<ActorThreat>, StoreError>;
    async fn save_actor_threat(&self, threat: &ActorThreat) -> Result<(), StoreError>;
    async fn reset_actor_threat(&self, actor_id: &str) -> Result<(), StoreError>;
}

/// In-memory store over sharded concurrent maps.
#[derive(Debug, Default)]
pub struct MemoryStore {
    stats: DashMap<String, Stats>,
    statuses: DashMap<String, ActorStatus>,
    threat: DashMap<String, ActorThreat>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ActorStore for MemoryStore {
    async fn find_stats(&self, actor_id: &str) -> Result<Stats, StoreError> {
        self.stats
            .get(actor_id)
            .map(|entry| entry.clone())
            .ok_or_else(|| StoreError::NotFound {
                collection: "stats",
                actor_id: actor_id.to_string(),
            })
    }

    async fn save_stats(&self, stats: &Stats) -> Result<(), StoreError> {
        self.stats.insert(stats.actor_id.clone(), stats.clone());
        Ok(())
    }

    async fn delete_stats(&self, actor_id: &str) -> Result<(), StoreError> {
        self.stats.remove(actor_id);
        Ok(())
    }

    async fn find_actor_status(&self, actor_id: &str) -> Result<ActorStatus, StoreError> {
        self.statuses
            .get(actor_id)
            .map(|entry| entry.clone())
            .ok_or_else(|| StoreError::NotFound {
                collection: "status",
                actor_id: actor_id.to_string(),
            })
    }

    async fn save_actor_status(&self, status: &ActorStatus) -> Result<(), StoreError> {
        self.statuses.insert(status.actor_id.clone(), status.clone());
        Ok(())
    }

    async fn find_actor_threat(&self, actor_id: &str) -> Result<ActorThreat, StoreError> {
        self.threat
            .get(actor_id)
            .map(|entry| entry.clone())
            .ok_or_else(|| StoreError::NotFound {
                collection: "threat",
                actor_id: actor_id.to_string(),
            })
    }

    async fn find_actor_threats(&self, actor_ids: &[String]) -> Result<Vec<ActorThreat>, StoreError> {
        // Missing documents are skipped, not errors; the decay loop treats an
        // absent record as already reset.
        Ok(actor_ids
            .iter()
            .filter_map(|id| self.threat.get(id).map(|entry| entry.clone()))
            .collect())
    }

    async fn save_actor_threat(&self, threat: &ActorThreat) -> Result<(), StoreError> {
        self.threat.insert(threat.actor_id.clone(), threat.clone());
        Ok(())
    }

    async fn reset_actor_threat(&self, actor_id: &str) -> Result<(), StoreError> {
        self.threat.remove(actor_id);
        Ok(())
    }
}
