//! Actor attribute derivation, damage, and regeneration.

pub mod engine;
pub mod model;
pub mod types;

pub use engine::StatsEngine;
pub use model::{Archetype, Stats, StatsDiff};
pub use types::{DamageType, StatType};
