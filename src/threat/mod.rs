//! Threat/aggro accumulation and periodic decay.

pub mod model;
pub mod tracker;

pub use model::{ActorThreat, ThreatUpdate};
pub use tracker::ThreatTracker;
