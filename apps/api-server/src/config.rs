//! Application configuration loaded from environment variables.

use std::env;
use std::time::Duration;

use throttle_core::{ConfigError, PolicySet};

#[cfg(feature = "redis")]
use throttle_infra::RedisConfig;

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// Prefix for every window key written to the store.
    pub key_prefix: String,
    /// Per-action limits, validated to cover every action category.
    pub policies: PolicySet,
    /// How often the in-memory store drops expired windows.
    pub sweep_interval: Duration,
    /// Shared window store; `None` keeps windows in process memory.
    #[cfg(feature = "redis")]
    pub redis: Option<RedisConfig>,
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// Malformed rate limit settings are an error rather than a silent default.
    pub fn from_env() -> Result<Self, ConfigError> {
        let policies = PolicySet::from_env()?;
        policies.validate_complete()?;

        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            key_prefix: env::var("RATE_LIMIT_KEY_PREFIX")
                .unwrap_or_else(|_| "ratelimit".to_string()),
            policies,
            sweep_interval: Duration::from_secs(
                env::var("MEMORY_STORE_SWEEP_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .filter(|secs| *secs > 0)
                    .unwrap_or(60),
            ),
            #[cfg(feature = "redis")]
            redis: env::var("REDIS_URL").ok().map(|_| RedisConfig::from_env()),
        })
    }
}
