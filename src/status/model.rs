//! Status instances and the per-actor status document.
//!
//! A [`Status`] is immutable once created: refreshing a non-stacking effect
//! replaces the old instance with a new one carrying the new expiration,
//! never mutates it in place.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::effect::{StatusCategory, StatusKind};
use crate::stats::types::{DamageType, StatType};

/// One applied instance of a catalog effect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Status {
    /// Opaque unique instance id.
    pub id: Uuid,
    /// Catalog variant carrying category, stacking rule, and payload.
    #[serde(flatten)]
    pub kind: StatusKind,
    /// Actor that applied the effect.
    pub origin: String,
    /// Absolute expiry; `None` means permanent.
    pub expiration: Option<DateTime<Utc>>,
}

impl Status {
    /// Creates a fresh instance of `kind`.
    #[must_use]
    pub fn new(kind: StatusKind, origin: impl Into<String>, expiration: Option<DateTime<Utc>>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            origin: origin.into(),
            expiration,
        }
    }

    /// Stacking physical damage-over-time.
    #[must_use]
    pub fn bleeding(expiration: DateTime<Utc>, origin: impl Into<String>, damage: f64) -> Self {
        Self::new(
            StatusKind::Bleeding {
                derived_effects: HashMap::from([(DamageType::Physical, damage)]),
            },
            origin,
            Some(expiration),
        )
    }

    /// Non-stacking magical damage-over-time.
    #[must_use]
    pub fn burning(expiration: DateTime<Utc>, origin: impl Into<String>, damage: f64) -> Self {
        Self::new(
            StatusKind::Burning {
                derived_effects: HashMap::from([(DamageType::Magical, damage)]),
            },
            origin,
            Some(expiration),
        )
    }

    /// Non-stacking defensive buff with flat derived-stat bonuses.
    #[must_use]
    pub fn fortified(
        expiration: DateTime<Utc>,
        origin: impl Into<String>,
        derived_effects: HashMap<StatType, f64>,
    ) -> Self {
        Self::new(
            StatusKind::Fortified { derived_effects },
            origin,
            Some(expiration),
        )
    }

    /// Permanent death marker.
    #[must_use]
    pub fn dead(origin: impl Into<String>) -> Self {
        Self::new(StatusKind::Dead, origin, None)
    }

    /// The effect category.
    #[must_use]
    pub const fn category(&self) -> StatusCategory {
        self.kind.category()
    }

    /// Whether this instance has expired at `now`. Permanent statuses never
    /// expire.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expiration.is_some_and(|expiration| expiration <= now)
    }
}

/// Aggregated view over an actor's ACTIVE set, recomputed on demand.
#[derive(Debug, Clone, Default)]
pub struct StatusAggregate {
    /// Categories currently active.
    pub categories: HashSet<StatusCategory>,
    /// Summed derived-stat contributions of all active effects.
    pub derived: HashMap<StatType, f64>,
}

/// Per-actor status document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorStatus {
    /// Unique actor key.
    pub actor_id: String,
    /// The ACTIVE set. Entries leave via expiration or cure, never mutate.
    #[serde(default)]
    pub statuses: Vec<Status>,
}

impl ActorStatus {
    /// Creates an empty document for `actor_id`.
    #[must_use]
    pub fn new(actor_id: impl Into<String>) -> Self {
        Self {
            actor_id: actor_id.into(),
            statuses: Vec::new(),
        }
    }

    /// Whether a DEAD-category status is active.
    #[must_use]
    pub fn is_dead(&self) -> bool {
        self.statuses
            .iter()
            .any(|status| status.category() == StatusCategory::Dead)
    }

    /// Merges incoming statuses under the stacking rules.
    ///
    /// For each incoming status with an ACTIVE entry of the same category:
    /// non-stacking kinds replace the existing entry (a refresh — the old
    /// instance expires implicitly), stacking kinds are added alongside as
    /// independent entries with their own timers.
    ///
    /// Returns `true` if the ACTIVE set changed.
    pub fn merge(&mut self, incoming: Vec<Status>) -> bool {
        let mut changed = false;
        for status in incoming {
            if !status.kind.can_stack() {
                self.statuses
                    .retain(|existing| existing.category() != status.category());
            }
            self.statuses.push(status);
            changed = true;
        }
        changed
    }

    /// Drops every entry expired at `now`, returning the removed instances.
    pub fn remove_expired(&mut self, now: DateTime<Utc>) -> Vec<Status> {
        let (expired, active): (Vec<Status>, Vec<Status>) = self
            .statuses
            .drain(..)
            .partition(|status| status.is_expired(now));
        self.statuses = active;
        expired
    }

    /// Explicitly removes (cures) all entries of the named categories,
    /// returning the removed instances. Absent categories are a no-op.
    pub fn cure(&mut self, categories: &[StatusCategory]) -> Vec<Status> {
        let (cured, active): (Vec<Status>, Vec<Status>) = self
            .statuses
            .drain(..)
            .partition(|status| categories.contains(&status.category()));
        self.statuses = active;
        cured
    }

    /// Recomputes the aggregated view from the current ACTIVE set.
    ///
    /// There is no auto-invalidation: call this after any mutation before
    /// reading aggregated state.
    #[must_use]
    pub fn aggregate(&self) -> StatusAggregate {
        let mut aggregate = StatusAggregate::default();
        for status in &self.statuses {
            aggregate.categories.insert(status.category());
            if let Some(contributions) = status.kind.derived_contributions() {
                for (stat, value) in contributions {
                    *aggregate.derived.entry(*stat).or_insert(0.0) += value;
                }
            }
        }
        aggregate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn in_secs(secs: i64) -> DateTime<Utc> {
        Utc::now() + Duration::seconds(secs)
    }

    #[test]
    fn non_stacking_reapply_replaces() {
        let mut actor = ActorStatus::new("actor1");
        let first = Status::burning(in_secs(5), "actor2", 40.0);
        let second = Status::burning(in_secs(10), "actor2", 40.0);
        let second_id = second.id;

        actor.merge(vec![first]);
        actor.merge(vec![second]);

        assert_eq!(actor.statuses.len(), 1);
        assert_eq!(actor.statuses[0].id, second_id);
        assert!(actor.statuses[0].expiration.unwrap() > in_secs(8));
    }

    #[test]
    fn stacking_reapply_piles_up() {
        let mut actor = ActorStatus::new("actor1");
        actor.merge(vec![Status::bleeding(in_secs(5), "actor2", 40.0)]);
        actor.merge(vec![Status::bleeding(in_secs(10), "actor3", 40.0)]);

        assert_eq!(actor.statuses.len(), 2);
        let expirations: Vec<_> = actor
            .statuses
            .iter()
            .map(|status| status.expiration.unwrap())
            .collect();
        assert_ne!(expirations[0], expirations[1]);
    }

    #[test]
    fn expired_entries_are_dropped() {
        let mut actor = ActorStatus::new("actor1");
        actor.merge(vec![
            Status::bleeding(in_secs(-1), "actor2", 40.0),
            Status::bleeding(in_secs(60), "actor2", 40.0),
        ]);

        let expired = actor.remove_expired(Utc::now());
        assert_eq!(expired.len(), 1);
        assert_eq!(actor.statuses.len(), 1);
    }

    #[test]
    fn permanent_statuses_never_expire() {
        let mut actor = ActorStatus::new("actor1");
        actor.merge(vec![Status::dead("actor2")]);
        assert!(actor.remove_expired(in_secs(3600)).is_empty());
        assert!(actor.is_dead());
    }

    #[test]
    fn cure_removes_only_named_categories() {
        let mut actor = ActorStatus::new("actor1");
        actor.merge(vec![
            Status::bleeding(in_secs(60), "actor2", 40.0),
            Status::burning(in_secs(60), "actor2", 40.0),
        ]);

        let cured = actor.cure(&[StatusCategory::Burning]);
        assert_eq!(cured.len(), 1);
        assert_eq!(cured[0].category(), StatusCategory::Burning);
        assert_eq!(actor.statuses.len(), 1);

        // Curing an absent category is a no-op
        assert!(actor.cure(&[StatusCategory::Fortified]).is_empty());
        assert_eq!(actor.statuses.len(), 1);
    }

    #[test]
    fn aggregate_sums_contributions_and_categories() {
        let mut actor = ActorStatus::new("actor1");
        actor.merge(vec![
            Status::bleeding(in_secs(60), "actor2", 40.0),
            Status::fortified(
                in_secs(60),
                "actor1",
                HashMap::from([(StatType::Def, 10.0), (StatType::PhyReduction, 0.25)]),
            ),
        ]);

        let aggregate = actor.aggregate();
        assert!(aggregate.categories.contains(&StatusCategory::Bleeding));
        assert!(aggregate.categories.contains(&StatusCategory::Fortified));
        assert!((aggregate.derived[&StatType::Def] - 10.0).abs() < f64::EPSILON);
        assert!((aggregate.derived[&StatType::PhyReduction] - 0.25).abs() < f64::EPSILON);
    }

    #[test]
    fn aggregate_is_recomputed_not_cached() {
        let mut actor = ActorStatus::new("actor1");
        actor.merge(vec![Status::fortified(
            in_secs(60),
            "actor1",
            HashMap::from([(StatType::Def, 10.0)]),
        )]);
        assert!(!actor.aggregate().derived.is_empty());

        actor.cure(&[StatusCategory::Fortified]);
        assert!(actor.aggregate().derived.is_empty());
    }

    #[test]
    fn status_document_round_trips_through_json() {
        let mut actor = ActorStatus::new("actor1");
        actor.merge(vec![
            Status::bleeding(in_secs(60), "actor2", 40.0),
            Status::dead("actor3"),
        ]);

        let json = serde_json::to_string(&actor).unwrap();
        let back: ActorStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(back.statuses.len(), 2);
        assert!(back.is_dead());
        assert_eq!(back.statuses[0].kind, actor.statuses[0].kind);
    }
}
