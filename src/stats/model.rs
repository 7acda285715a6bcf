//! The `Stats` document and its pure transformations.
//!
//! Derived stats are always a deterministic function of base stats, item
//! effects, and the aggregated status-effect modifiers. The only exceptions
//! are the CURRENT_HP / CURRENT_MP pools, which persist across recalculation
//! and are clamped when a recalculation lowers their maximum.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::types::{DamageType, StatType};

/// Comparison slack for diffing recomputed floats.
const DIFF_EPSILON: f64 = 1e-9;

/// XP required to finish a level: `LEVEL * XP_PER_LEVEL`.
const XP_PER_LEVEL: i32 = 1000;

/// Attribute points awarded per level gained.
const POINTS_PER_LEVEL: i32 = 5;

/// Minimal diff of derived-stat changes, keyed by stat.
pub type StatsDiff = HashMap<StatType, f64>;

/// Starting template for a newly initialized actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Archetype {
    /// Player character: balanced base spread, earns attribute points.
    Player,
    /// Server-spawned mob: flatter spread, no attribute points.
    Mob,
}

impl Archetype {
    /// Starting base stats for this archetype. Only players carry level
    /// data; mobs never gain xp.
    fn base_stats(self) -> HashMap<StatType, i32> {
        let spread = match self {
            Self::Player => 15,
            Self::Mob => 10,
        };
        let mut base = HashMap::from([
            (StatType::Str, spread),
            (StatType::Sta, spread),
            (StatType::Dex, spread),
            (StatType::Int, spread),
        ]);
        if self == Self::Player {
            base.insert(StatType::Level, 1);
            base.insert(StatType::Xp, 0);
            base.insert(StatType::XpToNextLevel, XP_PER_LEVEL);
        }
        base
    }
}

/// Per-actor attribute document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stats {
    /// Unique actor key.
    pub actor_id: String,
    /// Base attributes (STR/DEX/INT/STA, base regen rates, level data).
    pub base_stats: HashMap<StatType, i32>,
    /// Flat contributions from equipped items, keyed by derived stat.
    #[serde(default)]
    pub item_effects: HashMap<StatType, f64>,
    /// Fully recomputed derived view; see module docs for the invariants.
    #[serde(default)]
    pub derived_stats: HashMap<StatType, f64>,
    /// Unspent attribute points.
    #[serde(default)]
    pub attribute_points: i32,
}

impl Stats {
    /// Builds the starting document for `archetype`, seeds the two pools
    /// (CURRENT_HP = 100, CURRENT_MP = 50), and runs a full recalculation.
    #[must_use]
    pub fn new(actor_id: impl Into<String>, archetype: Archetype) -> Self {
        let mut stats = Self {
            actor_id: actor_id.into(),
            base_stats: archetype.base_stats(),
            item_effects: HashMap::new(),
            derived_stats: HashMap::from([
                (StatType::CurrentHp, 100.0),
                (StatType::CurrentMp, 50.0),
            ]),
            attribute_points: 0,
        };
        stats.recalculate(&HashMap::new());
        stats
    }

    /// Base-stat lookup; missing keys default to 0.
    #[must_use]
    pub fn base(&self, stat: StatType) -> f64 {
        f64::from(self.base_stats.get(&stat).copied().unwrap_or(0))
    }

    /// Derived-stat lookup; missing keys default to 0.
    #[must_use]
    pub fn derived(&self, stat: StatType) -> f64 {
        self.derived_stats.get(&stat).copied().unwrap_or(0.0)
    }

    /// Recomputes the full derived map from base stats, item effects, and the
    /// aggregated status modifiers, preserving CURRENT_HP / CURRENT_MP.
    ///
    /// Returns only the entries whose value changed, to bound notification
    /// size.
    pub fn recalculate(&mut self, status_derived: &HashMap<StatType, f64>) -> StatsDiff {
        let mut fresh = self.formula_stats();

        // Flat additive contributions; the pools are never contributed to
        // directly, they only move through damage/regen.
        for (stat, value) in self.item_effects.iter().chain(status_derived) {
            if !stat.is_current_pool() {
                *fresh.entry(*stat).or_insert(0.0) += value;
            }
        }

        // A stat that lost its last contribution collapses to zero rather
        // than silently vanishing from the diff.
        for stat in self.derived_stats.keys() {
            if !stat.is_current_pool() {
                fresh.entry(*stat).or_insert(0.0);
            }
        }

        // Pools persist, clamped into [0, new max].
        for (pool, max) in [
            (StatType::CurrentHp, StatType::MaxHp),
            (StatType::CurrentMp, StatType::MaxMp),
        ] {
            if let Some(current) = self.derived_stats.get(&pool) {
                let max = fresh.get(&max).copied().unwrap_or(0.0);
                fresh.insert(pool, current.clamp(0.0, max));
            }
        }

        let diff = diff_maps(&self.derived_stats, &fresh);
        self.derived_stats = fresh;
        diff
    }

    /// The deterministic base-stat derivation.
    ///
    /// Reduction stats carry no base term so an unmodified actor takes raw
    /// damage; they enter only through items and statuses.
    fn formula_stats(&self) -> HashMap<StatType, f64> {
        let str_ = self.base(StatType::Str);
        let dex = self.base(StatType::Dex);
        let int = self.base(StatType::Int);
        let sta = self.base(StatType::Sta);

        let mut derived = HashMap::from([
            (StatType::MaxHp, 100.0 + sta * 10.0),
            (StatType::MaxMp, 50.0 + int * 5.0),
            (StatType::HpRegen, self.base(StatType::BaseHpRegen) + sta * 0.2),
            (StatType::MpRegen, self.base(StatType::BaseMpRegen) + int * 0.2),
            (StatType::PhyAmp, str_ * 0.01),
            (StatType::MagAmp, int * 0.01),
            (StatType::Def, sta * 0.5),
            (StatType::MagDef, int * 0.5),
            (
                StatType::AttackSpeed,
                self.base(StatType::BaseAttackSpeed) + dex * 0.02,
            ),
            (
                StatType::CastSpeed,
                self.base(StatType::BaseCastSpeed) + dex * 0.02,
            ),
            (StatType::PhyCrit, dex * 0.25),
            (StatType::MgcCrit, int * 0.25),
        ]);

        // Leveling actors mirror their progression into the derived view so
        // xp grants and point awards flow through the same diff broadcasts.
        if self.base_stats.contains_key(&StatType::Xp) {
            for stat in [StatType::Xp, StatType::XpToNextLevel, StatType::Level] {
                derived.insert(stat, self.base(stat));
            }
            derived.insert(StatType::AvailablePts, f64::from(self.attribute_points));
        }
        derived
    }

    /// Applies typed damage to CURRENT_HP, mitigated per type by the
    /// corresponding reduction stat and clamped at 0.
    ///
    /// Returns a diff holding CURRENT_HP only when it changed. Attaching a
    /// DEAD status when the pool reaches 0 is the status engine's job.
    pub fn apply_damage(&mut self, damage: &HashMap<DamageType, f64>) -> StatsDiff {
        let hp = self.derived(StatType::CurrentHp);
        let mut taken = 0.0;
        for (damage_type, amount) in damage {
            let reduction = self.derived(damage_type.reduction_stat()).clamp(0.0, 1.0);
            taken += amount * (1.0 - reduction);
        }

        let new_hp = (hp - taken).max(0.0);
        if (new_hp - hp).abs() <= DIFF_EPSILON {
            return StatsDiff::new();
        }
        self.derived_stats.insert(StatType::CurrentHp, new_hp);
        StatsDiff::from([(StatType::CurrentHp, new_hp)])
    }

    /// Adds the derived regen rates to the pools, clamped at their maxima.
    ///
    /// The caller gates this on the actor being able to act; a dead actor
    /// never reaches this method.
    pub fn apply_regen(&mut self) -> StatsDiff {
        let mut diff = StatsDiff::new();
        for (pool, max, rate) in [
            (StatType::CurrentHp, StatType::MaxHp, StatType::HpRegen),
            (StatType::CurrentMp, StatType::MaxMp, StatType::MpRegen),
        ] {
            let current = self.derived(pool);
            let updated = (current + self.derived(rate)).clamp(0.0, self.derived(max));
            if (updated - current).abs() > DIFF_EPSILON {
                self.derived_stats.insert(pool, updated);
                diff.insert(pool, updated);
            }
        }
        diff
    }

    /// Grants experience, completing any level-ups the new total covers.
    ///
    /// XP carries over across a level-up; the threshold to finish level `n`
    /// is `n × 1000`. Every level gained awards attribute points. Returns
    /// the number of levels gained. Actors without level data (mobs) ignore
    /// xp entirely.
    pub fn add_xp(&mut self, amount: i32) -> u32 {
        let Some(current) = self.base_stats.get(&StatType::Xp).copied() else {
            return 0;
        };
        if amount <= 0 {
            return 0;
        }

        let mut xp = current.saturating_add(amount);
        let mut level = self.base_stats.get(&StatType::Level).copied().unwrap_or(1);
        let mut threshold = level * XP_PER_LEVEL;
        let mut gained = 0;
        while xp >= threshold {
            xp -= threshold;
            level += 1;
            threshold = level * XP_PER_LEVEL;
            self.attribute_points += POINTS_PER_LEVEL;
            gained += 1;
        }

        self.base_stats.insert(StatType::Xp, xp);
        self.base_stats.insert(StatType::Level, level);
        self.base_stats.insert(StatType::XpToNextLevel, threshold);
        gained
    }

    /// Spends one attribute point on a base stat.
    ///
    /// Returns `false` (no mutation) when no points are available.
    pub fn spend_attribute_point(&mut self, stat: StatType) -> bool {
        if self.attribute_points <= 0 {
            return false;
        }
        *self.base_stats.entry(stat).or_insert(0) += 1;
        self.attribute_points -= 1;
        true
    }
}

/// Entries of `fresh` that differ from `prior` (or are new).
fn diff_maps(prior: &HashMap<StatType, f64>, fresh: &HashMap<StatType, f64>) -> StatsDiff {
    fresh
        .iter()
        .filter(|(stat, value)| {
            prior
                .get(stat)
                .is_none_or(|old| (old - **value).abs() > DIFF_EPSILON)
        })
        .map(|(stat, value)| (*stat, *value))
        .collect()
}
