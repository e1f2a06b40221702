//! Data Transfer Objects - request/response types for the API.

use serde::{Deserialize, Serialize};

/// Current window for one identity and action, as reported by the status endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitStatusResponse {
    pub action: String,
    pub limit: u32,
    pub used: u64,
    pub remaining: u32,
    pub retry_after_seconds: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resets_at: Option<i64>,
}

/// Request to import a repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportRepositoryRequest {
    /// Repository in `owner/name` form.
    pub repository: String,
}

/// Acknowledgement that a quota-consuming action was admitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionAcceptedResponse {
    pub action: String,
    pub identity: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}
