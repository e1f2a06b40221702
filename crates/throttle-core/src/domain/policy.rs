use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// What the limiter does when the window store cannot be reached.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Deny the action. Protects the third-party budget.
    #[default]
    Closed,
    /// Allow the action without counting it.
    Open,
}

/// Immutable limit for one action category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitPolicy {
    max_requests: u32,
    window_seconds: u64,
    on_store_failure: FailurePolicy,
}

impl RateLimitPolicy {
    /// Create a fail-closed policy. Both values must be positive.
    pub fn new(max_requests: u32, window_seconds: u64) -> Result<Self, ConfigError> {
        if max_requests == 0 {
            return Err(ConfigError::InvalidValue {
                name: "max_requests".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        if window_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                name: "window_seconds".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(Self {
            max_requests,
            window_seconds,
            on_store_failure: FailurePolicy::Closed,
        })
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.on_store_failure = policy;
        self
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    pub fn window_seconds(&self) -> u64 {
        self.window_seconds
    }

    pub fn on_store_failure(&self) -> FailurePolicy {
        self.on_store_failure
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_defaults_to_fail_closed() {
        let policy = RateLimitPolicy::new(3, 60).unwrap();
        assert_eq!(policy.on_store_failure(), FailurePolicy::Closed);
    }

    #[test]
    fn test_zero_values_rejected() {
        assert!(RateLimitPolicy::new(0, 60).is_err());
        assert!(RateLimitPolicy::new(3, 0).is_err());
    }
}
