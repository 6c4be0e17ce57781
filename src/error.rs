//! Error types for configuration loading and the physics world.
//!
//! Nothing in the tick loop is fatal: callers inside the simulation log these
//! and skip the offending operation instead of propagating further.

use std::fmt;

/// Failure to load or validate a [`crate::GameConfig`].
#[derive(Debug)]
pub enum ConfigError {
    /// The config file could not be read.
    Io(std::io::Error),
    /// The config document is not valid JSON for `GameConfig`.
    Parse(serde_json::Error),
    /// A tunable is outside its usable range.
    Invalid {
        /// Name of the offending field.
        field: &'static str,
        /// Human-readable description of the constraint.
        reason: String,
    },
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(err) => write!(f, "failed to read config: {}", err),
            ConfigError::Parse(err) => write!(f, "failed to parse config: {}", err),
            ConfigError::Invalid { field, reason } => {
                write!(f, "invalid config value '{}': {}", field, reason)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(err) => Some(err),
            ConfigError::Parse(err) => Some(err),
            ConfigError::Invalid { .. } => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::Io(err)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Parse(err)
    }
}

/// Rejected input to the physics world.
#[derive(Debug, Clone, PartialEq)]
pub enum PhysicsError {
    /// Step size was zero, negative or not finite.
    InvalidTimestep(f32),
    /// A position or size was NaN or infinite.
    NonFinite {
        /// What was being written when the value was rejected.
        what: &'static str,
    },
    /// The handle refers to a body that was removed.
    StaleHandle,
}

impl fmt::Display for PhysicsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhysicsError::InvalidTimestep(dt) => write!(f, "invalid physics timestep: {}", dt),
            PhysicsError::NonFinite { what } => write!(f, "non-finite value rejected for {}", what),
            PhysicsError::StaleHandle => write!(f, "body handle refers to a removed body"),
        }
    }
}

impl std::error::Error for PhysicsError {}
