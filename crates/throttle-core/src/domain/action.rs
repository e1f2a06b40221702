use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Closed set of quota-consuming operations guarded by the limiter.
///
/// Each category carries its own policy and its own windows per identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionCategory {
    /// Listing repositories from the upstream provider.
    RepoFetch,
    /// Importing a single repository from the upstream provider.
    RepoImport,
}

impl ActionCategory {
    pub const ALL: [ActionCategory; 2] = [ActionCategory::RepoFetch, ActionCategory::RepoImport];

    /// Stable wire name, also used inside store keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionCategory::RepoFetch => "repo_fetch",
            ActionCategory::RepoImport => "repo_import",
        }
    }

    /// Upper-snake name used for environment variables, e.g. `REPO_FETCH`.
    pub fn env_name(&self) -> &'static str {
        match self {
            ActionCategory::RepoFetch => "REPO_FETCH",
            ActionCategory::RepoImport => "REPO_IMPORT",
        }
    }
}

impl fmt::Display for ActionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionCategory {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActionCategory::ALL
            .into_iter()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| ConfigError::UnknownAction(s.to_string()))
    }
}
