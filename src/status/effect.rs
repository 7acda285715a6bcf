//! The status-effect catalog.
//!
//! Every effect variant exposes the same capability surface — category,
//! stacking rule, whether it needs the damage tick, its per-tick damage
//! payload, and its derived-stat contributions. Engine logic depends only on
//! these capabilities; adding an effect means adding a variant here, never
//! touching the engines.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::StatusError;
use crate::stats::model::Stats;
use crate::stats::types::{DamageType, StatType};

/// Effect categories. One actor holds at most one ACTIVE entry per
/// non-stacking category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusCategory {
    Bleeding,
    Burning,
    Fortified,
    Dead,
}

impl std::fmt::Display for StatusCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Bleeding => "BLEEDING",
            Self::Burning => "BURNING",
            Self::Fortified => "FORTIFIED",
            Self::Dead => "DEAD",
        };
        f.write_str(name)
    }
}

/// Catalog of effect variants, tagged by category on the wire.
///
/// Payload maps are part of the stored document; a variant whose payload is
/// missing the damage type it claims to deal is a corrupt definition and
/// fails fast at apply time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "category", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusKind {
    /// Stacking physical damage-over-time.
    Bleeding {
        /// Per-tick damage magnitudes by type.
        derived_effects: HashMap<DamageType, f64>,
    },

    /// Non-stacking magical damage-over-time; re-application refreshes.
    Burning {
        /// Per-tick damage magnitudes by type.
        derived_effects: HashMap<DamageType, f64>,
    },

    /// Non-stacking defensive buff contributing flat derived-stat bonuses.
    Fortified {
        /// Flat derived-stat contributions while active.
        derived_effects: HashMap<StatType, f64>,
    },

    /// Death marker. Permanent until revival, gates regen and threat.
    Dead,
}

impl StatusKind {
    /// The category of this effect.
    #[must_use]
    pub const fn category(&self) -> StatusCategory {
        match self {
            Self::Bleeding { .. } => StatusCategory::Bleeding,
            Self::Burning { .. } => StatusCategory::Burning,
            Self::Fortified { .. } => StatusCategory::Fortified,
            Self::Dead => StatusCategory::Dead,
        }
    }

    /// Whether multiple simultaneous instances of this category are legal.
    #[must_use]
    pub const fn can_stack(&self) -> bool {
        matches!(self, Self::Bleeding { .. })
    }

    /// Whether this effect is evaluated on the shared damage tick.
    #[must_use]
    pub const fn requires_damage_apply(&self) -> bool {
        matches!(self, Self::Bleeding { .. } | Self::Burning { .. })
    }

    /// Computes this tick's damage map against the actor's stats.
    ///
    /// Non-damaging variants return an empty map.
    ///
    /// # Errors
    ///
    /// [`StatusError::MalformedEffect`] when the variant requires the damage
    /// tick but its payload lacks an entry for its own damage type.
    pub fn compute_effect(
        &self,
        _stats: &Stats,
    ) -> Result<HashMap<DamageType, f64>, StatusError> {
        let (payload, damage_type) = match self {
            Self::Bleeding { derived_effects } => (derived_effects, DamageType::Physical),
            Self::Burning { derived_effects } => (derived_effects, DamageType::Magical),
            Self::Fortified { .. } | Self::Dead => return Ok(HashMap::new()),
        };

        let magnitude =
            payload
                .get(&damage_type)
                .copied()
                .ok_or(StatusError::MalformedEffect {
                    category: self.category(),
                    damage_type,
                })?;

        Ok(HashMap::from([(damage_type, magnitude)]))
    }

    /// Flat derived-stat contributions while this effect is active.
    #[must_use]
    pub fn derived_contributions(&self) -> Option<&HashMap<StatType, f64>> {
        match self {
            Self::Fortified { derived_effects } => Some(derived_effects),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::model::Archetype;

    fn bleeding(damage: f64) -> StatusKind {
        StatusKind::Bleeding {
            derived_effects: HashMap::from([(DamageType::Physical, damage)]),
        }
    }

    #[test]
    fn capability_surface() {
        let bleed = bleeding(40.0);
        assert_eq!(bleed.category(), StatusCategory::Bleeding);
        assert!(bleed.can_stack());
        assert!(bleed.requires_damage_apply());

        assert!(!StatusKind::Dead.can_stack());
        assert!(!StatusKind::Dead.requires_damage_apply());
    }

    #[test]
    fn bleeding_computes_physical_damage() {
        let stats = Stats::new("actor1", Archetype::Player);
        let damage = bleeding(40.0).compute_effect(&stats).unwrap();
        assert!((damage[&DamageType::Physical] - 40.0).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_payload_fails_fast() {
        let stats = Stats::new("actor1", Archetype::Player);
        let broken = StatusKind::Bleeding {
            derived_effects: HashMap::new(),
        };
        let err = broken.compute_effect(&stats).unwrap_err();
        assert!(matches!(
            err,
            StatusError::MalformedEffect {
                category: StatusCategory::Bleeding,
                damage_type: DamageType::Physical,
            }
        ));
    }

    #[test]
    fn wrong_channel_payload_fails_fast() {
        let stats = Stats::new("actor1", Archetype::Player);
        // A burning effect whose payload only names PHYSICAL is corrupt
        let broken = StatusKind::Burning {
            derived_effects: HashMap::from([(DamageType::Physical, 40.0)]),
        };
        assert!(broken.compute_effect(&stats).is_err());
    }

    #[test]
    fn dead_has_no_damage_and_no_contributions() {
        let stats = Stats::new("actor1", Archetype::Player);
        assert!(StatusKind::Dead.compute_effect(&stats).unwrap().is_empty());
        assert!(StatusKind::Dead.derived_contributions().is_none());
    }

    #[test]
    fn serializes_tagged_by_category() {
        let json = serde_json::to_value(bleeding(40.0)).unwrap();
        assert_eq!(json["category"], "BLEEDING");
        assert!((json["derived_effects"]["PHYSICAL"].as_f64().unwrap() - 40.0).abs() < 1e-9);

        let back: StatusKind = serde_json::from_value(json).unwrap();
        assert_eq!(back.category(), StatusCategory::Bleeding);
    }
}
