//! `aggro` - Actor attribute, status-effect, and threat engine
//!
//! The computational core of a game server: per-actor base/derived stat
//! derivation, timed status effects (damage-over-time, death markers,
//! buffs/debuffs), and threat accumulation with periodic decay.
//!
//! Engines mutate one actor at a time under a per-actor async lock, persist
//! to an [`store::ActorStore`] before releasing it, and publish minimal-diff
//! change notifications on a [`broadcast::UpdateBus`].

pub mod broadcast;
pub mod config;
pub mod error;
pub mod logging;
pub mod stats;
pub mod status;
pub mod store;
pub mod sync;
pub mod threat;

pub use broadcast::{Update, UpdateBus};
pub use config::EngineConfig;
pub use error::{EngineError, Result};
pub use stats::engine::StatsEngine;
pub use status::engine::StatusEngine;
pub use store::{ActorStore, MemoryStore, StoreError};
pub use threat::tracker::ThreatTracker;
