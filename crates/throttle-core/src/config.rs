//! Policy configuration - per-category limits loaded once at startup.

use std::collections::BTreeMap;
use std::str::FromStr;

use crate::domain::{ActionCategory, FailurePolicy, RateLimitPolicy};
use crate::error::ConfigError;

/// Immutable mapping from action category to its rate limit policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicySet {
    policies: BTreeMap<ActionCategory, RateLimitPolicy>,
}

impl PolicySet {
    /// A set with no policies. Every lookup fails until policies are added.
    pub fn empty() -> Self {
        Self {
            policies: BTreeMap::new(),
        }
    }

    /// Register (or replace) the policy for `action`.
    pub fn with_policy(mut self, action: ActionCategory, policy: RateLimitPolicy) -> Self {
        self.policies.insert(action, policy);
        self
    }

    /// Built-in limits used when the environment does not override them.
    pub fn default_limits(action: ActionCategory) -> (u32, u64) {
        match action {
            ActionCategory::RepoFetch => (60, 3600),
            ActionCategory::RepoImport => (10, 3600),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// For every category `C` (see [`ActionCategory::env_name`]):
    /// `RATE_LIMIT_{C}_MAX_REQUESTS`, `RATE_LIMIT_{C}_WINDOW_SECS` and
    /// `RATE_LIMIT_{C}_FAIL_OPEN`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`PolicySet::from_env`] but reading from an arbitrary source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut set = Self::empty();

        for action in ActionCategory::ALL {
            let prefix = format!("RATE_LIMIT_{}", action.env_name());
            let (default_max, default_window) = Self::default_limits(action);

            let max_requests =
                parse_number(&lookup, &format!("{prefix}_MAX_REQUESTS"), default_max)?;
            let window_seconds =
                parse_number(&lookup, &format!("{prefix}_WINDOW_SECS"), default_window)?;
            let fail_open = parse_flag(&lookup, &format!("{prefix}_FAIL_OPEN"))?;

            let policy = RateLimitPolicy::new(max_requests, window_seconds)
                .map_err(|e| match e {
                    ConfigError::InvalidValue { name, reason } => ConfigError::InvalidValue {
                        name: format!("{prefix} {name}"),
                        reason,
                    },
                    other => other,
                })?
                .with_failure_policy(if fail_open {
                    FailurePolicy::Open
                } else {
                    FailurePolicy::Closed
                });

            set = set.with_policy(action, policy);
        }

        Ok(set)
    }

    /// Look up the policy for `action`.
    pub fn get(&self, action: ActionCategory) -> Result<&RateLimitPolicy, ConfigError> {
        self.policies
            .get(&action)
            .ok_or(ConfigError::MissingPolicy(action))
    }

    /// Confirm that every known category has a policy.
    pub fn validate_complete(&self) -> Result<(), ConfigError> {
        for action in ActionCategory::ALL {
            self.get(action)?;
        }
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = (ActionCategory, &RateLimitPolicy)> {
        self.policies.iter().map(|(action, policy)| (*action, policy))
    }
}

fn parse_number<F, T>(lookup: &F, name: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
            name: name.to_string(),
            reason: format!("expected a positive integer, got {raw:?}"),
        }),
        None => Ok(default),
    }
}

fn parse_flag<F>(lookup: &F, name: &str) -> Result<bool, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name).as_deref().map(str::trim) {
        None | Some("") => Ok(false),
        Some(v) if v.eq_ignore_ascii_case("true") || v == "1" => Ok(true),
        Some(v) if v.eq_ignore_ascii_case("false") || v == "0" => Ok(false),
        Some(v) => Err(ConfigError::InvalidValue {
            name: name.to_string(),
            reason: format!("expected true/false, got {v:?}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let set = PolicySet::from_lookup(lookup_from(&[])).unwrap();
        set.validate_complete().unwrap();

        let fetch = set.get(ActionCategory::RepoFetch).unwrap();
        assert_eq!(fetch.max_requests(), 60);
        assert_eq!(fetch.window_seconds(), 3600);
        assert_eq!(fetch.on_store_failure(), FailurePolicy::Closed);

        let import = set.get(ActionCategory::RepoImport).unwrap();
        assert_eq!(import.max_requests(), 10);
    }

    #[test]
    fn test_overrides_are_independent() {
        let set = PolicySet::from_lookup(lookup_from(&[
            ("RATE_LIMIT_REPO_IMPORT_MAX_REQUESTS", "3"),
            ("RATE_LIMIT_REPO_IMPORT_WINDOW_SECS", "60"),
            ("RATE_LIMIT_REPO_IMPORT_FAIL_OPEN", "true"),
        ]))
        .unwrap();

        let import = set.get(ActionCategory::RepoImport).unwrap();
        assert_eq!(import.max_requests(), 3);
        assert_eq!(import.window_seconds(), 60);
        assert_eq!(import.on_store_failure(), FailurePolicy::Open);

        let fetch = set.get(ActionCategory::RepoFetch).unwrap();
        assert_eq!(fetch.max_requests(), 60);
        assert_eq!(fetch.on_store_failure(), FailurePolicy::Closed);
    }

    #[test]
    fn test_malformed_values_fail_startup() {
        let err = PolicySet::from_lookup(lookup_from(&[(
            "RATE_LIMIT_REPO_FETCH_MAX_REQUESTS",
            "lots",
        )]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));

        let err = PolicySet::from_lookup(lookup_from(&[("RATE_LIMIT_REPO_FETCH_WINDOW_SECS", "0")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));

        let err = PolicySet::from_lookup(lookup_from(&[("RATE_LIMIT_REPO_FETCH_FAIL_OPEN", "maybe")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_missing_category_is_reported() {
        let set = PolicySet::empty().with_policy(
            ActionCategory::RepoFetch,
            RateLimitPolicy::new(3, 60).unwrap(),
        );
        assert_eq!(
            set.validate_complete(),
            Err(ConfigError::MissingPolicy(ActionCategory::RepoImport))
        );
    }
}
