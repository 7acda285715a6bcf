//! Stat and damage-type keys.
//!
//! String-keyed on the wire (`"MAX_HP"`, `"PHYSICAL"`) to match the stored
//! document format and broadcast payloads.

use serde::{Deserialize, Serialize};

/// Keys of the base and derived stat maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatType {
    // Base stats
    Str,
    Dex,
    Int,
    Sta,

    AvailablePts,

    // Derived stats
    MaxHp,
    MaxMp,
    CurrentHp,
    CurrentMp,

    PhyAmp,
    MagAmp,

    BaseHpRegen,
    HpRegen,

    BaseMpRegen,
    MpRegen,

    Def,
    MagDef,

    BaseAttackSpeed,
    AttackSpeed,
    BaseCastSpeed,
    CastSpeed,
    AttackDistance,

    PhyCrit,
    MgcCrit,

    WeaponDamage,
    MagicDamage,

    PhyReduction,
    MgcReduction,

    // Level stats
    Xp,
    XpToNextLevel,
    Level,
}

impl StatType {
    /// The wire/storage key for this stat.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Str => "STR",
            Self::Dex => "DEX",
            Self::Int => "INT",
            Self::Sta => "STA",
            Self::AvailablePts => "AVAILABLE_PTS",
            Self::MaxHp => "MAX_HP",
            Self::MaxMp => "MAX_MP",
            Self::CurrentHp => "CURRENT_HP",
            Self::CurrentMp => "CURRENT_MP",
            Self::PhyAmp => "PHY_AMP",
            Self::MagAmp => "MAG_AMP",
            Self::BaseHpRegen => "BASE_HP_REGEN",
            Self::HpRegen => "HP_REGEN",
            Self::BaseMpRegen => "BASE_MP_REGEN",
            Self::MpRegen => "MP_REGEN",
            Self::Def => "DEF",
            Self::MagDef => "MAG_DEF",
            Self::BaseAttackSpeed => "BASE_ATTACK_SPEED",
            Self::AttackSpeed => "ATTACK_SPEED",
            Self::BaseCastSpeed => "BASE_CAST_SPEED",
            Self::CastSpeed => "CAST_SPEED",
            Self::AttackDistance => "ATTACK_DISTANCE",
            Self::PhyCrit => "PHY_CRIT",
            Self::MgcCrit => "MGC_CRIT",
            Self::WeaponDamage => "WEAPON_DAMAGE",
            Self::MagicDamage => "MAGIC_DAMAGE",
            Self::PhyReduction => "PHY_REDUCTION",
            Self::MgcReduction => "MGC_REDUCTION",
            Self::Xp => "XP",
            Self::XpToNextLevel => "XP_TO_NEXT_LEVEL",
            Self::Level => "LEVEL",
        }
    }

    /// Whether this key is one of the two persistent pools that survive a
    /// full derived recalculation.
    #[must_use]
    pub const fn is_current_pool(self) -> bool {
        matches!(self, Self::CurrentHp | Self::CurrentMp)
    }
}

impl std::fmt::Display for StatType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Damage channels. All types currently route to CURRENT_HP; each has its
/// own reduction stat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DamageType {
    Physical,
    Magical,
}

impl DamageType {
    /// The derived stat holding this channel's fractional damage reduction.
    #[must_use]
    pub const fn reduction_stat(self) -> StatType {
        match self {
            Self::Physical => StatType::PhyReduction,
            Self::Magical => StatType::MgcReduction,
        }
    }

    /// The wire/storage key for this damage type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Physical => "PHYSICAL",
            Self::Magical => "MAGICAL",
        }
    }
}

impl std::fmt::Display for DamageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stat_keys_serialize_screaming() {
        assert_eq!(serde_json::to_string(&StatType::MaxHp).unwrap(), "\"MAX_HP\"");
        assert_eq!(
            serde_json::to_string(&StatType::AvailablePts).unwrap(),
            "\"AVAILABLE_PTS\""
        );
        assert_eq!(serde_json::to_string(&StatType::Str).unwrap(), "\"STR\"");
    }

    #[test]
    fn stat_keys_round_trip() {
        for stat in [
            StatType::CurrentHp,
            StatType::PhyReduction,
            StatType::XpToNextLevel,
        ] {
            let json = serde_json::to_string(&stat).unwrap();
            let back: StatType = serde_json::from_str(&json).unwrap();
            assert_eq!(back, stat);
            assert_eq!(json, format!("\"{}\"", stat.as_str()));
        }
    }

    #[test]
    fn reduction_stat_mapping() {
        assert_eq!(DamageType::Physical.reduction_stat(), StatType::PhyReduction);
        assert_eq!(DamageType::Magical.reduction_stat(), StatType::MgcReduction);
    }

    #[test]
    fn current_pool_flags() {
        assert!(StatType::CurrentHp.is_current_pool());
        assert!(StatType::CurrentMp.is_current_pool());
        assert!(!StatType::MaxHp.is_current_pool());
    }
}
