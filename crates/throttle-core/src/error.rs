//! Domain-level error types.

use thiserror::Error;

use crate::domain::ActionCategory;
use crate::ports::StoreError;

/// Configuration errors - raised while building or consulting the policy set.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Unknown action category: {0}")]
    UnknownAction(String),

    #[error("No rate limit policy registered for action {0}")]
    MissingPolicy(ActionCategory),

    #[error("Invalid value for {name}: {reason}")]
    InvalidValue { name: String, reason: String },

    #[error("Identity must not be empty")]
    EmptyIdentity,
}

/// Rate limiter errors.
#[derive(Debug, Error)]
pub enum RateLimitError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("Window store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),
}
