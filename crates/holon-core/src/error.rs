//! Error types for Holon operations.
//!
//! Only input-validation and configuration problems are errors. Engine
//! preconditions that are not met are ordinary outcomes (see
//! `CompositionOutcome` and `DecompositionCheck`), and numeric drift is
//! clamped where it happens.

use thiserror::Error;

/// Result type for Holon operations.
pub type Result<T> = std::result::Result<T, HolonError>;

/// Errors that can occur during Holon operations.
#[derive(Debug, Clone, Error)]
pub enum HolonError {
    /// Malformed reality snapshot.
    #[error("Reality error: {0}")]
    Reality(#[from] RealityError),
    /// Configuration errors.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    /// Caller passed an argument the swarm cannot act on.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// I/O errors (wrapped).
    #[error("I/O error: {0}")]
    Io(String),
    /// Serialization errors.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<std::io::Error> for HolonError {
    fn from(e: std::io::Error) -> Self {
        HolonError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for HolonError {
    fn from(e: serde_json::Error) -> Self {
        HolonError::Serialization(e.to_string())
    }
}

impl From<toml::de::Error> for HolonError {
    fn from(e: toml::de::Error) -> Self {
        HolonError::Serialization(e.to_string())
    }
}

impl From<toml::ser::Error> for HolonError {
    fn from(e: toml::ser::Error) -> Self {
        HolonError::Serialization(e.to_string())
    }
}

/// Problems with a reality snapshot.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RealityError {
    /// A required metric is absent.
    #[error("Missing metric: {0}")]
    MissingMetric(String),
    /// A metric is NaN or infinite.
    #[error("Metric {name} is not finite: {value}")]
    NonFiniteMetric { name: String, value: f64 },
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// Invalid value.
    #[error("Invalid value for {field}: {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
    /// Out of range.
    #[error("{field} out of range: {value} (must be {min}-{max})")]
    OutOfRange {
        field: String,
        min: f64,
        max: f64,
        value: f64,
    },
}

// Convenience constructors
impl HolonError {
    pub fn missing_metric(name: impl Into<String>) -> Self {
        HolonError::Reality(RealityError::MissingMetric(name.into()))
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        HolonError::InvalidInput(msg.into())
    }

    pub fn invalid_config(
        field: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        HolonError::Config(ConfigError::InvalidValue {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
        })
    }

    pub fn out_of_range(field: impl Into<String>, min: f64, max: f64, value: f64) -> Self {
        HolonError::Config(ConfigError::OutOfRange {
            field: field.into(),
            min,
            max,
            value,
        })
    }
}
