//! Domain types - identities, action categories, policies and decisions.

mod action;
mod decision;
mod identity;
mod policy;

pub use action::ActionCategory;
pub use decision::{Decision, Usage};
pub use identity::Identity;
pub use policy::{FailurePolicy, RateLimitPolicy};
