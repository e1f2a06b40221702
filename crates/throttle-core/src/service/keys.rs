use crate::domain::{ActionCategory, Identity};

/// Default prefix for every key the limiter writes.
pub const DEFAULT_KEY_PREFIX: &str = "ratelimit";

/// Deterministic store keys for a (identity, action) window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySpace {
    prefix: String,
}

impl KeySpace {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn counter(&self, identity: &Identity, action: ActionCategory) -> String {
        format!("{}:{}:{}:count", self.prefix, action, identity)
    }

    pub fn expiry(&self, identity: &Identity, action: ActionCategory) -> String {
        format!("{}:{}:{}:expiry", self.prefix, action, identity)
    }
}

impl Default for KeySpace {
    fn default() -> Self {
        Self::new(DEFAULT_KEY_PREFIX)
    }
}
