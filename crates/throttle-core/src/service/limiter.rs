//! Fixed-window rate limiter.
//!
//! Each (identity, action) pair owns a counter that is created at 1 on the
//! first request of a window and expires after the policy's window length.
//! Exactly `max_requests` calls are allowed per window; denied calls still
//! count, so retrying early never buys a free attempt.

use std::sync::Arc;
use std::time::Duration;

use crate::config::PolicySet;
use crate::domain::{ActionCategory, Decision, FailurePolicy, Identity, RateLimitPolicy, Usage};
use crate::error::RateLimitError;
use crate::ports::{Clock, StoreError, SystemClock, WindowStore};
use crate::service::{ExpiryTracker, KeySpace};

/// Admission gate for quota-consuming actions.
pub struct RateLimiter {
    store: Arc<dyn WindowStore>,
    expiry: ExpiryTracker,
    policies: PolicySet,
    clock: Arc<dyn Clock>,
    keys: KeySpace,
}

impl RateLimiter {
    /// Create a limiter over `store` using the system clock and default key prefix.
    pub fn new(store: Arc<dyn WindowStore>, policies: PolicySet) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let keys = KeySpace::default();
        let expiry = ExpiryTracker::new(store.clone(), clock.clone(), keys.clone());

        Self {
            store,
            expiry,
            policies,
            clock,
            keys,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self.rebuild_tracker();
        self
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.keys = KeySpace::new(prefix);
        self.rebuild_tracker();
        self
    }

    fn rebuild_tracker(&mut self) {
        self.expiry = ExpiryTracker::new(self.store.clone(), self.clock.clone(), self.keys.clone());
    }

    /// Policy registered for `action`.
    pub fn policy(&self, action: ActionCategory) -> Result<&RateLimitPolicy, RateLimitError> {
        Ok(self.policies.get(action)?)
    }

    pub fn policies(&self) -> &PolicySet {
        &self.policies
    }

    /// Count one request against the window and decide whether it may proceed.
    ///
    /// Store failures are returned as [`RateLimitError::StoreUnavailable`]
    /// without applying the category's failure policy; see [`RateLimiter::admit`].
    pub async fn check_rate_limit(
        &self,
        identity: &Identity,
        action: ActionCategory,
    ) -> Result<Decision, RateLimitError> {
        let policy = *self.policy(action)?;
        let counter_key = self.keys.counter(identity, action);

        let count = self
            .store
            .increment(&counter_key, Duration::from_secs(policy.window_seconds()))
            .await?;

        if count == 1 {
            self.expiry
                .record_expiry(identity, action, policy.window_seconds())
                .await?;
        }

        let max_requests = u64::from(policy.max_requests());

        if count > max_requests {
            let retry_after = match self.expiry.read_expiry(identity, action).await? {
                Some(expires_at) => self.seconds_until(expires_at, &policy),
                None => {
                    tracing::warn!(
                        %identity,
                        %action,
                        count,
                        "Counter present without expiry record, assuming full window"
                    );
                    policy.window_seconds()
                }
            };

            tracing::warn!(
                %identity,
                %action,
                count,
                limit = max_requests,
                retry_after,
                "Rate limit exceeded"
            );
            return Ok(Decision::denied(retry_after));
        }

        // count <= max_requests, which fits in u32
        let remaining = (max_requests - count) as u32;
        tracing::debug!(%identity, %action, count, remaining, "Request admitted");

        Ok(Decision::allowed(remaining))
    }

    /// [`RateLimiter::check_rate_limit`] with the category's failure policy applied.
    pub async fn admit(
        &self,
        identity: &Identity,
        action: ActionCategory,
    ) -> Result<Decision, RateLimitError> {
        match self.check_rate_limit(identity, action).await {
            Err(RateLimitError::StoreUnavailable(err)) => {
                match self.policy(action)?.on_store_failure() {
                    FailurePolicy::Open => {
                        tracing::warn!(%identity, %action, error = %err, "Window store unavailable, failing open");
                        Ok(Decision::allowed(0))
                    }
                    FailurePolicy::Closed => {
                        tracing::error!(%identity, %action, error = %err, "Window store unavailable, failing closed");
                        Err(RateLimitError::StoreUnavailable(err))
                    }
                }
            }
            other => other,
        }
    }

    /// Seconds until the active window resets, without consuming a slot.
    /// Returns 0 when no window is recorded.
    pub async fn get_retry_after(
        &self,
        identity: &Identity,
        action: ActionCategory,
    ) -> Result<u64, RateLimitError> {
        let policy = *self.policy(action)?;

        Ok(match self.expiry.read_expiry(identity, action).await? {
            Some(expires_at) => self.seconds_until(expires_at, &policy),
            None => 0,
        })
    }

    /// Read-only snapshot of the current window.
    pub async fn usage(
        &self,
        identity: &Identity,
        action: ActionCategory,
    ) -> Result<Usage, RateLimitError> {
        let policy = *self.policy(action)?;
        let counter_key = self.keys.counter(identity, action);

        let used = match self.store.get(&counter_key).await? {
            Some(raw) => raw.parse::<u64>().map_err(|_| {
                StoreError::Operation(format!("value at {counter_key} is not an integer"))
            })?,
            None => 0,
        };
        let resets_at = self.expiry.read_expiry(identity, action).await?;

        let limit = policy.max_requests();
        let exhausted = used >= u64::from(limit);
        let retry_after_seconds = match (exhausted, resets_at) {
            (false, _) => 0,
            (true, Some(expires_at)) => self.seconds_until(expires_at, &policy),
            (true, None) => policy.window_seconds(),
        };

        Ok(Usage {
            limit,
            used,
            remaining: (u64::from(limit).saturating_sub(used)) as u32,
            retry_after_seconds,
            resets_at,
        })
    }

    fn seconds_until(&self, expires_at: i64, policy: &RateLimitPolicy) -> u64 {
        let left = expires_at.saturating_sub(self.clock.now()).max(0) as u64;
        left.min(policy.window_seconds())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;
    use crate::ports::ManualClock;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// HashMap store that honours TTLs against a shared manual clock.
    struct ScriptedStore {
        clock: Arc<ManualClock>,
        entries: Mutex<HashMap<String, (String, i64)>>,
        down: AtomicBool,
    }

    impl ScriptedStore {
        fn new(clock: Arc<ManualClock>) -> Self {
            Self {
                clock,
                entries: Mutex::new(HashMap::new()),
                down: AtomicBool::new(false),
            }
        }

        fn check_up(&self) -> Result<(), StoreError> {
            if self.down.load(Ordering::SeqCst) {
                return Err(StoreError::Connection("store is down".to_string()));
            }
            Ok(())
        }

        fn live(&self, key: &str) -> Option<String> {
            let now = self.clock.now();
            let mut entries = self.entries.lock().unwrap();
            match entries.get(key) {
                Some((_, expires_at)) if *expires_at <= now => {
                    entries.remove(key);
                    None
                }
                Some((value, _)) => Some(value.clone()),
                None => None,
            }
        }

        fn remove(&self, key: &str) {
            self.entries.lock().unwrap().remove(key);
        }
    }

    #[async_trait]
    impl WindowStore for ScriptedStore {
        async fn increment(&self, key: &str, ttl: Duration) -> Result<u64, StoreError> {
            self.check_up()?;
            let current = self.live(key);
            let mut entries = self.entries.lock().unwrap();
            let next = match current {
                Some(value) => {
                    let count = value.parse::<u64>().unwrap() + 1;
                    entries.get_mut(key).unwrap().0 = count.to_string();
                    count
                }
                None => {
                    let expires_at = self.clock.now() + ttl.as_secs() as i64;
                    entries.insert(key.to_string(), ("1".to_string(), expires_at));
                    1
                }
            };
            Ok(next)
        }

        async fn set_if_absent(
            &self,
            key: &str,
            value: &str,
            ttl: Duration,
        ) -> Result<bool, StoreError> {
            self.check_up()?;
            if self.live(key).is_some() {
                return Ok(false);
            }
            let expires_at = self.clock.now() + ttl.as_secs() as i64;
            self.entries
                .lock()
                .unwrap()
                .insert(key.to_string(), (value.to_string(), expires_at));
            Ok(true)
        }

        async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
            self.check_up()?;
            let expires_at = self.clock.now() + ttl.as_secs() as i64;
            self.entries
                .lock()
                .unwrap()
                .insert(key.to_string(), (value.to_string(), expires_at));
            Ok(())
        }

        async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
            self.check_up()?;
            Ok(self.live(key))
        }
    }

    fn setup(
        max_requests: u32,
        window_seconds: u64,
    ) -> (RateLimiter, Arc<ScriptedStore>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(1_700_000_000));
        let store = Arc::new(ScriptedStore::new(clock.clone()));
        let policies = PolicySet::empty().with_policy(
            ActionCategory::RepoFetch,
            RateLimitPolicy::new(max_requests, window_seconds).unwrap(),
        );
        let limiter = RateLimiter::new(store.clone(), policies).with_clock(clock.clone());
        (limiter, store, clock)
    }

    fn user(id: &str) -> Identity {
        Identity::new(id).unwrap()
    }

    #[tokio::test]
    async fn test_fixed_window_scenario() {
        let (limiter, _store, clock) = setup(3, 60);
        let alice = user("alice");

        for expected in [2, 1, 0] {
            let decision = limiter
                .check_rate_limit(&alice, ActionCategory::RepoFetch)
                .await
                .unwrap();
            assert!(decision.allowed);
            assert_eq!(decision.remaining, expected);
            assert_eq!(decision.retry_after_seconds, 0);
        }

        clock.advance(10);
        let denied = limiter
            .check_rate_limit(&alice, ActionCategory::RepoFetch)
            .await
            .unwrap();
        assert!(!denied.allowed);
        assert_eq!(denied.remaining, 0);
        assert_eq!(denied.retry_after_seconds, 50);

        clock.advance(51);
        let fresh = limiter
            .check_rate_limit(&alice, ActionCategory::RepoFetch)
            .await
            .unwrap();
        assert!(fresh.allowed);
        assert_eq!(fresh.remaining, 2);
    }

    #[tokio::test]
    async fn test_denials_still_count() {
        let (limiter, store, _clock) = setup(1, 60);
        let alice = user("alice");
        let counter_key = KeySpace::default().counter(&alice, ActionCategory::RepoFetch);

        limiter.check_rate_limit(&alice, ActionCategory::RepoFetch).await.unwrap();
        limiter.check_rate_limit(&alice, ActionCategory::RepoFetch).await.unwrap();
        assert_eq!(store.get(&counter_key).await.unwrap().as_deref(), Some("2"));

        let denied = limiter
            .check_rate_limit(&alice, ActionCategory::RepoFetch)
            .await
            .unwrap();
        assert!(!denied.allowed);
        assert_eq!(store.get(&counter_key).await.unwrap().as_deref(), Some("3"));
    }

    #[tokio::test]
    async fn test_retry_after_decreases_towards_reset() {
        let (limiter, _store, clock) = setup(1, 30);
        let alice = user("alice");

        limiter.check_rate_limit(&alice, ActionCategory::RepoFetch).await.unwrap();

        let mut previous = u64::MAX;
        for _ in 0..5 {
            clock.advance(5);
            let decision = limiter
                .check_rate_limit(&alice, ActionCategory::RepoFetch)
                .await
                .unwrap();
            assert!(!decision.allowed);
            assert!(decision.retry_after_seconds <= 30);
            assert!(decision.retry_after_seconds < previous);
            previous = decision.retry_after_seconds;
        }
        assert_eq!(previous, 5);
    }

    #[tokio::test]
    async fn test_expiry_not_postponed_by_trickle() {
        let (limiter, _store, clock) = setup(100, 60);
        let alice = user("alice");

        limiter.check_rate_limit(&alice, ActionCategory::RepoFetch).await.unwrap();
        for _ in 0..5 {
            clock.advance(10);
            limiter.check_rate_limit(&alice, ActionCategory::RepoFetch).await.unwrap();
        }

        assert_eq!(
            limiter.get_retry_after(&alice, ActionCategory::RepoFetch).await.unwrap(),
            10
        );
    }

    #[tokio::test]
    async fn test_identities_and_actions_are_independent() {
        let clock = Arc::new(ManualClock::new(0));
        let store = Arc::new(ScriptedStore::new(clock.clone()));
        let policies = PolicySet::empty()
            .with_policy(ActionCategory::RepoFetch, RateLimitPolicy::new(1, 60).unwrap())
            .with_policy(ActionCategory::RepoImport, RateLimitPolicy::new(1, 60).unwrap());
        let limiter = RateLimiter::new(store, policies).with_clock(clock);

        let alice = user("alice");
        let bob = user("bob");

        assert!(limiter.check_rate_limit(&alice, ActionCategory::RepoFetch).await.unwrap().allowed);
        assert!(!limiter.check_rate_limit(&alice, ActionCategory::RepoFetch).await.unwrap().allowed);
        assert!(limiter.check_rate_limit(&alice, ActionCategory::RepoImport).await.unwrap().allowed);
        assert!(limiter.check_rate_limit(&bob, ActionCategory::RepoFetch).await.unwrap().allowed);
    }

    #[tokio::test]
    async fn test_retry_after_without_prior_calls_is_zero() {
        let (limiter, _store, _clock) = setup(3, 60);
        let retry = limiter
            .get_retry_after(&user("nobody"), ActionCategory::RepoFetch)
            .await
            .unwrap();
        assert_eq!(retry, 0);
    }

    #[tokio::test]
    async fn test_missing_expiry_falls_back_to_full_window() {
        let (limiter, store, clock) = setup(1, 60);
        let alice = user("alice");

        limiter.check_rate_limit(&alice, ActionCategory::RepoFetch).await.unwrap();
        store.remove(&KeySpace::default().expiry(&alice, ActionCategory::RepoFetch));
        clock.advance(20);

        let denied = limiter
            .check_rate_limit(&alice, ActionCategory::RepoFetch)
            .await
            .unwrap();
        assert!(!denied.allowed);
        assert_eq!(denied.retry_after_seconds, 60);
    }

    #[tokio::test]
    async fn test_unknown_policy_is_configuration_error() {
        let (limiter, _store, _clock) = setup(3, 60);
        let err = limiter
            .check_rate_limit(&user("alice"), ActionCategory::RepoImport)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RateLimitError::Configuration(ConfigError::MissingPolicy(ActionCategory::RepoImport))
        ));
    }

    #[tokio::test]
    async fn test_store_failure_fails_closed_by_default() {
        let (limiter, store, _clock) = setup(3, 60);
        store.down.store(true, Ordering::SeqCst);

        let err = limiter
            .admit(&user("alice"), ActionCategory::RepoFetch)
            .await
            .unwrap_err();
        assert!(matches!(err, RateLimitError::StoreUnavailable(_)));
    }

    #[tokio::test]
    async fn test_store_failure_fails_open_when_declared() {
        let clock = Arc::new(ManualClock::new(0));
        let store = Arc::new(ScriptedStore::new(clock.clone()));
        store.down.store(true, Ordering::SeqCst);
        let policies = PolicySet::empty().with_policy(
            ActionCategory::RepoFetch,
            RateLimitPolicy::new(3, 60)
                .unwrap()
                .with_failure_policy(FailurePolicy::Open),
        );
        let limiter = RateLimiter::new(store, policies).with_clock(clock);

        let decision = limiter
            .admit(&user("alice"), ActionCategory::RepoFetch)
            .await
            .unwrap();
        assert!(decision.allowed);

        // the raw check still reports the failure
        assert!(limiter
            .check_rate_limit(&user("alice"), ActionCategory::RepoFetch)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_usage_does_not_consume() {
        let (limiter, _store, clock) = setup(2, 60);
        let alice = user("alice");

        let empty = limiter.usage(&alice, ActionCategory::RepoFetch).await.unwrap();
        assert_eq!(empty.used, 0);
        assert_eq!(empty.remaining, 2);
        assert_eq!(empty.resets_at, None);

        limiter.check_rate_limit(&alice, ActionCategory::RepoFetch).await.unwrap();
        limiter.check_rate_limit(&alice, ActionCategory::RepoFetch).await.unwrap();
        clock.advance(15);

        let usage = limiter.usage(&alice, ActionCategory::RepoFetch).await.unwrap();
        let again = limiter.usage(&alice, ActionCategory::RepoFetch).await.unwrap();
        assert_eq!(usage, again);
        assert_eq!(usage.used, 2);
        assert_eq!(usage.remaining, 0);
        assert_eq!(usage.retry_after_seconds, 45);
        assert_eq!(usage.resets_at, Some(1_700_000_060));
    }

    #[tokio::test]
    async fn test_stale_expiry_is_replaced_for_new_window() {
        let (limiter, store, clock) = setup(1, 60);
        let alice = user("alice");
        let keys = KeySpace::default();

        limiter.check_rate_limit(&alice, ActionCategory::RepoFetch).await.unwrap();

        // counter gone, expiry record from the old window still live
        store.remove(&keys.counter(&alice, ActionCategory::RepoFetch));
        clock.advance(59);

        let fresh = limiter
            .check_rate_limit(&alice, ActionCategory::RepoFetch)
            .await
            .unwrap();
        assert!(fresh.allowed);

        let denied = limiter
            .check_rate_limit(&alice, ActionCategory::RepoFetch)
            .await
            .unwrap();
        assert!(!denied.allowed);
        assert_eq!(denied.retry_after_seconds, 60);
        assert_eq!(
            limiter.get_retry_after(&alice, ActionCategory::RepoFetch).await.unwrap(),
            60
        );

        clock.advance(1);
        assert_eq!(
            limiter.get_retry_after(&alice, ActionCategory::RepoFetch).await.unwrap(),
            59
        );
    }

    #[tokio::test]
    async fn test_usage_rejects_corrupt_counter() {
        let (limiter, store, _clock) = setup(3, 60);
        let alice = user("alice");
        let counter_key = KeySpace::default().counter(&alice, ActionCategory::RepoFetch);

        store
            .set(&counter_key, "garbage", Duration::from_secs(60))
            .await
            .unwrap();

        let err = limiter
            .usage(&alice, ActionCategory::RepoFetch)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RateLimitError::StoreUnavailable(StoreError::Operation(_))
        ));
    }
}
