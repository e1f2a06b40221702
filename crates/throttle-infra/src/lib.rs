//! # Throttle Infrastructure
//!
//! Concrete implementations of the ports defined in `throttle-core`.
//!
//! ## Feature Flags
//!
//! - `full` (default) - All features enabled
//! - `minimal` - No external dependencies, in-memory only
//! - `redis` - Redis-backed window store shared across instances

pub mod store;

// Re-exports - In-Memory
pub use store::InMemoryWindowStore;

// Re-exports - Redis
#[cfg(feature = "redis")]
pub use store::{RedisConfig, RedisWindowStore};
