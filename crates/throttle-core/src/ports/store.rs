use async_trait::async_trait;
use std::time::Duration;

/// Window store - key-value cache with per-key expiration.
///
/// Implementations are not required to report remaining TTL, and callers
/// must never rely on it.
#[async_trait]
pub trait WindowStore: Send + Sync {
    /// Atomically add one to `key` and return the new count.
    /// An absent key is created at 1 with `ttl`; an existing key keeps its TTL.
    async fn increment(&self, key: &str, ttl: Duration) -> Result<u64, StoreError>;

    /// Write `value` only if `key` is absent. Returns `true` when the write happened.
    async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, StoreError>;

    /// Write `value` unconditionally, replacing any previous value and TTL.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError>;

    /// Read a live value. Backend failures are errors, never `None`.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
}

/// Window store errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Operation failed: {0}")]
    Operation(String),
}
