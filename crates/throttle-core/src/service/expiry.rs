//! Expiry tracking for fixed windows.
//!
//! The window store can expire keys but cannot be trusted to report how long
//! a key has left to live. The tracker persists the absolute reset instant
//! beside each counter, with the same TTL, so retry-after can be computed
//! from plain reads.

use std::sync::Arc;
use std::time::Duration;

use crate::domain::{ActionCategory, Identity};
use crate::ports::{Clock, StoreError, WindowStore};
use crate::service::KeySpace;

/// Records and reads the reset instant of each window.
#[derive(Clone)]
pub struct ExpiryTracker {
    store: Arc<dyn WindowStore>,
    clock: Arc<dyn Clock>,
    keys: KeySpace,
}

impl ExpiryTracker {
    pub fn new(store: Arc<dyn WindowStore>, clock: Arc<dyn Clock>, keys: KeySpace) -> Self {
        Self { store, clock, keys }
    }

    /// Record `now + window_seconds` as the reset instant of a fresh window.
    ///
    /// Concurrent creators of the same window compute the same instant, so
    /// only the first write lands and the rest return `false`. A record left
    /// over from a previous window (the counter expired first) is replaced,
    /// since the new window must not inherit the old reset instant.
    pub async fn record_expiry(
        &self,
        identity: &Identity,
        action: ActionCategory,
        window_seconds: u64,
    ) -> Result<bool, StoreError> {
        let key = self.keys.expiry(identity, action);
        let expires_at = self.clock.now().saturating_add_unsigned(window_seconds);
        let value = expires_at.to_string();
        let ttl = Duration::from_secs(window_seconds);

        if self.store.set_if_absent(&key, &value, ttl).await? {
            tracing::debug!(%identity, %action, expires_at, "Window opened");
            return Ok(true);
        }

        let existing = self.read_expiry(identity, action).await?;
        if existing == Some(expires_at) {
            tracing::debug!(%identity, %action, "Expiry already recorded for window");
            return Ok(false);
        }

        tracing::warn!(
            %identity,
            %action,
            stale = ?existing,
            expires_at,
            "Replacing expiry record outliving its counter"
        );
        self.store.set(&key, &value, ttl).await?;
        Ok(true)
    }

    /// Read the reset instant (Unix seconds) of the active window, if any.
    pub async fn read_expiry(
        &self,
        identity: &Identity,
        action: ActionCategory,
    ) -> Result<Option<i64>, StoreError> {
        let key = self.keys.expiry(identity, action);

        let Some(raw) = self.store.get(&key).await? else {
            return Ok(None);
        };

        match raw.parse::<i64>() {
            Ok(expires_at) => Ok(Some(expires_at)),
            Err(_) => {
                tracing::warn!(key = %key, value = %raw, "Unparsable expiry record, ignoring");
                Ok(None)
            }
        }
    }
}
