//! # Throttle Core
//!
//! The domain layer of Throttle: fixed-window admission control for
//! quota-consuming actions.
//! This crate contains pure rate limiting logic with zero infrastructure dependencies.

pub mod config;
pub mod domain;
pub mod error;
pub mod ports;
pub mod service;

pub use config::PolicySet;
pub use error::{ConfigError, RateLimitError};
pub use service::{ExpiryTracker, RateLimiter};
