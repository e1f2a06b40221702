//! Application state - shared across all handlers.

use std::sync::Arc;

use throttle_core::RateLimiter;
use throttle_core::ports::{StoreError, WindowStore};
use throttle_infra::InMemoryWindowStore;

#[cfg(feature = "redis")]
use throttle_infra::RedisWindowStore;

use crate::config::AppConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub limiter: Arc<RateLimiter>,
    /// Which window store backs the limiter, for health reporting.
    pub store_backend: &'static str,
}

impl AppState {
    /// Build state around an already constructed limiter.
    pub fn with_limiter(limiter: Arc<RateLimiter>, store_backend: &'static str) -> Self {
        Self {
            limiter,
            store_backend,
        }
    }

    /// Build the application state with the configured window store.
    pub async fn new(config: &AppConfig) -> Result<Self, StoreError> {
        let (store, store_backend) = Self::build_store(config).await?;

        let limiter = RateLimiter::new(store, config.policies.clone())
            .with_key_prefix(config.key_prefix.clone());

        for (action, policy) in limiter.policies().iter() {
            tracing::info!(
                %action,
                max_requests = policy.max_requests(),
                window_seconds = policy.window_seconds(),
                on_store_failure = ?policy.on_store_failure(),
                "Rate limit policy loaded"
            );
        }

        tracing::info!(store = store_backend, "Application state initialized");

        Ok(Self::with_limiter(Arc::new(limiter), store_backend))
    }

    #[cfg(feature = "redis")]
    async fn build_store(
        config: &AppConfig,
    ) -> Result<(Arc<dyn WindowStore>, &'static str), StoreError> {
        let Some(redis_config) = &config.redis else {
            tracing::warn!("REDIS_URL not set. Limits are enforced per process (in-memory mode).");
            return Ok((Self::memory_store(config), "memory"));
        };

        match RedisWindowStore::new(redis_config.clone()).await {
            Ok(store) => Ok((Arc::new(store), "redis")),
            Err(e) if redis_config.fallback_to_memory => {
                tracing::error!(
                    "Failed to connect to Redis: {}. Falling back to per-process windows.",
                    e
                );
                Ok((Self::memory_store(config), "memory"))
            }
            Err(e) => Err(e),
        }
    }

    #[cfg(not(feature = "redis"))]
    async fn build_store(
        config: &AppConfig,
    ) -> Result<(Arc<dyn WindowStore>, &'static str), StoreError> {
        tracing::info!("Running without redis feature - using in-memory window store");
        Ok((Self::memory_store(config), "memory"))
    }

    /// Per-process store with a background sweep of expired windows.
    fn memory_store(config: &AppConfig) -> Arc<dyn WindowStore> {
        let store = Arc::new(InMemoryWindowStore::new());
        store.spawn_sweeper(config.sweep_interval);
        store
    }
}
