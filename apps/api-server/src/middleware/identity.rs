//! Caller identity extraction.
//!
//! Authentication happens upstream; the authenticating proxy forwards the
//! resolved user id in `X-User-Id`. Requests without it never reach the limiter.

use actix_web::{FromRequest, HttpRequest, dev::Payload, http::header::HeaderMap};
use std::future::{Ready, ready};

use throttle_core::domain::Identity;

use crate::middleware::error::AppError;

/// Header carrying the authenticated user id.
pub static USER_ID_HEADER: &str = "X-User-Id";

/// Resolve the caller identity from request headers.
pub fn identity_from_headers(headers: &HeaderMap) -> Result<Identity, AppError> {
    let raw = headers
        .get(USER_ID_HEADER)
        .ok_or_else(|| AppError::Unauthorized(format!("Missing {} header", USER_ID_HEADER)))?
        .to_str()
        .map_err(|_| AppError::Unauthorized(format!("Invalid {} header", USER_ID_HEADER)))?;

    Identity::new(raw)
        .map_err(|_| AppError::Unauthorized(format!("Empty {} header", USER_ID_HEADER)))
}

/// Identity extractor for handlers.
#[derive(Debug, Clone)]
pub struct Caller(pub Identity);

impl FromRequest for Caller {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(identity_from_headers(req.headers()).map(Caller))
    }
}
