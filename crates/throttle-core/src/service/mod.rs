//! Application services - the rate limiter and its expiry bookkeeping.

mod expiry;
mod keys;
mod limiter;

pub use expiry::ExpiryTracker;
pub use keys::KeySpace;
pub use limiter::RateLimiter;
