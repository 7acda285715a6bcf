//! Error types for the `aggro` engine.
//!
//! Domain-specific error enums aggregated under a single top-level
//! [`EngineError`] so callers can match on the failure domain.

use thiserror::Error;

use crate::stats::types::DamageType;
use crate::status::effect::StatusCategory;
use crate::store::StoreError;

// ============================================================================
// Top-Level Error
// ============================================================================

/// Top-level error type for engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Store lookup or write error
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Status-effect catalog or lifecycle error
    #[error(transparent)]
    Status(#[from] StatusError),

    /// Configuration loading or validation error
    #[error(transparent)]
    Config(#[from] ConfigError),
}

// ============================================================================
// Status Errors
// ============================================================================

/// Status-effect lifecycle errors.
#[derive(Debug, Error)]
pub enum StatusError {
    /// An effect declares `requires_damage_apply` but carries no payload for
    /// the damage type it was invoked with. This indicates a corrupt catalog
    /// definition and must fail fast rather than silently skip damage.
    #[error("malformed {category} effect: no payload for damage type {damage_type}")]
    MalformedEffect {
        /// Category of the broken effect definition
        category: StatusCategory,
        /// Damage type the payload lookup failed for
        damage_type: DamageType,
    },
}

// ============================================================================
// Configuration Errors
// ============================================================================

/// Configuration loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file could not be read
    #[error("failed to read config {path}: {source}")]
    Io {
        /// Path to the configuration file
        path: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// YAML parsing failed
    #[error("failed to parse config {path}: {message}")]
    Parse {
        /// Path to the configuration file
        path: String,
        /// Error message from the parser
        message: String,
    },

    /// Field has an invalid value
    #[error("invalid value for '{field}': got '{value}', expected {expected}")]
    InvalidValue {
        /// Name of the field with invalid value
        field: String,
        /// The actual value provided
        value: String,
        /// Description of what was expected
        expected: String,
    },
}

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_effect_display() {
        let err = StatusError::MalformedEffect {
            category: StatusCategory::Bleeding,
            damage_type: DamageType::Physical,
        };
        let msg = err.to_string();
        assert!(msg.contains("BLEEDING"), "{msg}");
        assert!(msg.contains("PHYSICAL"), "{msg}");
    }

    #[test]
    fn config_error_display() {
        let err = ConfigError::InvalidValue {
            field: "decay_factor".to_string(),
            value: "1.5".to_string(),
            expected: "a value in (0, 1)".to_string(),
        };
        assert!(err.to_string().contains("decay_factor"));
        assert!(err.to_string().contains("1.5"));
    }

    #[test]
    fn engine_error_wraps_store_not_found() {
        let err: EngineError = StoreError::NotFound {
            collection: "stats",
            actor_id: "mob-1".to_string(),
        }
        .into();
        assert!(matches!(err, EngineError::Store(StoreError::NotFound { .. })));
    }
}
