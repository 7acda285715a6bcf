//! Engine configuration.
//!
//! Tick intervals and threat-decay tuning, deserialized from YAML with
//! explicit validation. Durations are written as humantime strings
//! (`"2s"`, `"1500ms"`).

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Runtime configuration for the engines.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Interval of the shared status/regen tick loop.
    #[serde(default = "default_status_tick", with = "duration_str")]
    pub status_tick: Duration,

    /// Interval of the threat decay loop.
    #[serde(default = "default_threat_decay_tick", with = "duration_str")]
    pub threat_decay_tick: Duration,

    /// Multiplicative decay applied to every tracked threat value per decay
    /// tick. Must lie strictly between 0 and 1 so threat decreases over time.
    #[serde(default = "default_decay_factor")]
    pub decay_factor: f64,

    /// Threat values decayed below this threshold are dropped from the map.
    #[serde(default = "default_min_threat")]
    pub min_threat: i64,

    /// Capacity of the update broadcast channel.
    #[serde(default = "default_bus_capacity")]
    pub bus_capacity: usize,
}

const fn default_status_tick() -> Duration {
    Duration::from_millis(1500)
}

const fn default_threat_decay_tick() -> Duration {
    Duration::from_secs(2)
}

const fn default_decay_factor() -> f64 {
    0.5
}

const fn default_min_threat() -> i64 {
    6
}

const fn default_bus_capacity() -> usize {
    256
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            status_tick: default_status_tick(),
            threat_decay_tick: default_threat_decay_tick(),
            decay_factor: default_decay_factor(),
            min_threat: default_min_threat(),
            bus_capacity: default_bus_capacity(),
        }
    }
}

impl EngineConfig {
    /// Loads and validates a configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read, parsed, or fails
    /// validation.
    pub fn from_yaml_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config: Self =
            serde_yaml::from_str(&contents).map_err(|err| ConfigError::Parse {
                path: path.display().to_string(),
                message: err.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Validates field ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for out-of-range fields.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.decay_factor > 0.0 && self.decay_factor < 1.0) {
            return Err(ConfigError::InvalidValue {
                field: "decay_factor".to_string(),
                value: self.decay_factor.to_string(),
                expected: "a value strictly between 0 and 1".to_string(),
            });
        }
        if self.min_threat < 0 {
            return Err(ConfigError::InvalidValue {
                field: "min_threat".to_string(),
                value: self.min_threat.to_string(),
                expected: "a non-negative threshold".to_string(),
            });
        }
        if self.status_tick.is_zero() || self.threat_decay_tick.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "status_tick / threat_decay_tick".to_string(),
                value: "0s".to_string(),
                expected: "a non-zero interval".to_string(),
            });
        }
        if self.bus_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                field: "bus_capacity".to_string(),
                value: "0".to_string(),
                expected: "a non-zero channel capacity".to_string(),
            });
        }
        Ok(())
    }
}

/// Serde adapter for humantime duration strings.
mod duration_str {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(&humantime::format_duration(*d))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(d)?;
        humantime::parse_duration(&raw).map_err(D::Error::custom)
    }
}
