use serde::{Deserialize, Serialize};

/// Outcome of a single admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub allowed: bool,
    pub remaining: u32,
    /// Seconds to wait before retrying. Zero whenever `allowed` is true.
    pub retry_after_seconds: u64,
}

impl Decision {
    pub fn allowed(remaining: u32) -> Self {
        Self {
            allowed: true,
            remaining,
            retry_after_seconds: 0,
        }
    }

    pub fn denied(retry_after_seconds: u64) -> Self {
        Self {
            allowed: false,
            remaining: 0,
            retry_after_seconds,
        }
    }
}

/// Read-only view of a window, taken without consuming a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub limit: u32,
    pub used: u64,
    pub remaining: u32,
    pub retry_after_seconds: u64,
    /// Unix seconds at which the active window resets, if one is recorded.
    pub resets_at: Option<i64>,
}
