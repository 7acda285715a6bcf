//! Per-actor threat document and broadcast delta.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Per-actor threat document: how much aggro each target has generated on
/// this actor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorThreat {
    /// Unique actor key.
    pub actor_id: String,
    /// Threat level per target.
    #[serde(default)]
    pub threat: HashMap<String, i64>,
}

impl ActorThreat {
    /// Creates an empty threat document.
    #[must_use]
    pub fn new(actor_id: impl Into<String>) -> Self {
        Self {
            actor_id: actor_id.into(),
            threat: HashMap::new(),
        }
    }

    /// Adds `amount` to the target's threat, creating the entry if absent.
    /// Returns the new value.
    pub fn add(&mut self, target_id: &str, amount: i64) -> i64 {
        let entry = self.threat.entry(target_id.to_string()).or_insert(0);
        *entry = entry.saturating_add(amount);
        *entry
    }

    /// Removes each listed target if present, returning only the ids that
    /// were actually removed.
    pub fn remove(&mut self, target_ids: &[String]) -> Vec<String> {
        target_ids
            .iter()
            .filter(|id| self.threat.remove(*id).is_some())
            .cloned()
            .collect()
    }

    /// Multiplies every entry by `decay_factor` (flooring), dropping entries
    /// that fall below `min_threat`.
    ///
    /// Returns the removed target ids; surviving entries keep their decayed
    /// values in place.
    pub fn decay(&mut self, decay_factor: f64, min_threat: i64) -> Vec<String> {
        let mut removed = Vec::new();
        self.threat.retain(|target_id, value| {
            #[allow(clippy::cast_possible_truncation)]
            let decayed = ((*value as f64) * decay_factor).floor() as i64;
            if decayed < min_threat {
                removed.push(target_id.clone());
                false
            } else {
                *value = decayed;
                true
            }
        });
        removed
    }

    /// Whether no target currently holds threat.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.threat.is_empty()
    }
}

/// Minimal threat delta pushed to observers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreatUpdate {
    /// Actor whose threat map changed.
    pub actor_id: String,
    /// Targets whose values were added or updated, with the new values.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub add_threat: Option<HashMap<String, i64>>,
    /// Targets removed from the map.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remove_threat: Option<Vec<String>>,
}
