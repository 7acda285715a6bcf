//! Timed status effects: apply, stack/refresh, tick, expire.

pub mod effect;
pub mod engine;
pub mod model;

pub use effect::{StatusCategory, StatusKind};
pub use engine::StatusEngine;
pub use model::{ActorStatus, Status, StatusAggregate};
