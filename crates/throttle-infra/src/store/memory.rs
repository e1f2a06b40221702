//! In-memory window store - used when Redis is unavailable or not configured.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use throttle_core::ports::{Clock, StoreError, SystemClock, WindowStore};

struct StoreEntry {
    value: String,
    /// Unix seconds at which the entry stops being visible.
    expires_at: i64,
}

/// In-memory window store using a HashMap behind an async RwLock.
///
/// Every mutation takes the write lock, which makes `increment` and
/// `set_if_absent` atomic within the process.
/// Note: Limits are per-process, not distributed across instances.
pub struct InMemoryWindowStore {
    entries: RwLock<HashMap<String, StoreEntry>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryWindowStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Use `clock` for expiry so the store and the limiter agree on time.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            clock,
        }
    }

    /// Drop every expired entry. Reads already ignore them.
    pub async fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| !Self::is_expired(entry, now));
        before - entries.len()
    }

    /// Periodically purge expired entries in the background.
    ///
    /// Lazy eviction only covers keys that are read again; windows of
    /// identities that never come back are reclaimed here. The task ends
    /// once the store is dropped.
    pub fn spawn_sweeper(self: &Arc<Self>, period: Duration) -> JoinHandle<()> {
        let store = Arc::downgrade(self);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                let Some(store) = store.upgrade() else {
                    break;
                };
                let purged = store.purge_expired().await;
                if purged > 0 {
                    tracing::debug!(purged, "Purged expired windows");
                }
            }
        })
    }

    fn is_expired(entry: &StoreEntry, now: i64) -> bool {
        now >= entry.expires_at
    }

    fn expiry_for(&self, ttl: Duration) -> i64 {
        let secs = ttl.as_secs() + u64::from(ttl.subsec_nanos() > 0);
        self.clock.now().saturating_add_unsigned(secs.max(1))
    }
}

impl Default for InMemoryWindowStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WindowStore for InMemoryWindowStore {
    async fn increment(&self, key: &str, ttl: Duration) -> Result<u64, StoreError> {
        let now = self.clock.now();
        let mut entries = self.entries.write().await;

        match entries.get_mut(key) {
            Some(entry) if !Self::is_expired(entry, now) => {
                let count = entry.value.parse::<u64>().map_err(|_| {
                    StoreError::Operation(format!("value at {key} is not an integer"))
                })? + 1;
                entry.value = count.to_string();
                return Ok(count);
            }
            _ => {}
        }

        entries.insert(
            key.to_string(),
            StoreEntry {
                value: "1".to_string(),
                expires_at: self.expiry_for(ttl),
            },
        );
        Ok(1)
    }

    async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, StoreError> {
        let now = self.clock.now();
        let mut entries = self.entries.write().await;

        if entries
            .get(key)
            .is_some_and(|entry| !Self::is_expired(entry, now))
        {
            return Ok(false);
        }

        entries.insert(
            key.to_string(),
            StoreEntry {
                value: value.to_string(),
                expires_at: self.expiry_for(ttl),
            },
        );
        Ok(true)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        let mut entries = self.entries.write().await;

        entries.insert(
            key.to_string(),
            StoreEntry {
                value: value.to_string(),
                expires_at: self.expiry_for(ttl),
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let now = self.clock.now();
        let entries = self.entries.read().await;
        let Some(entry) = entries.get(key) else {
            return Ok(None);
        };

        if Self::is_expired(entry, now) {
            drop(entries);
            // Clean up expired entry with write lock; a concurrent writer may
            // have replaced it with a live one in between
            let mut entries = self.entries.write().await;
            if entries
                .get(key)
                .is_some_and(|entry| Self::is_expired(entry, now))
            {
                entries.remove(key);
            }
            return Ok(None);
        }

        Ok(Some(entry.value.clone()))
    }
}
