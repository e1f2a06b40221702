//! Window store implementations - Redis and in-memory fallback.

mod memory;

pub use memory::InMemoryWindowStore;

#[cfg(feature = "redis")]
mod redis;
#[cfg(feature = "redis")]
pub use self::redis::{RedisConfig, RedisWindowStore};
