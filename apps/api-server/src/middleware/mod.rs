//! Middleware modules.

pub mod error;
pub mod identity;
pub mod quota;
