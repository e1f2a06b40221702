//! Error handling middleware - RFC 7807 compliant responses.

use actix_web::{HttpResponse, ResponseError, http::StatusCode, http::header};
use std::fmt;

use throttle_core::{ConfigError, RateLimitError};
use throttle_shared::ErrorResponse;

/// Application-level error type that converts to RFC 7807 responses.
#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    Unauthorized(String),
    /// Quota exhausted for the current window.
    RateLimited {
        retry_after: u64,
        limit: Option<u32>,
    },
    /// Window store unreachable under a fail-closed policy.
    StoreUnavailable,
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            AppError::RateLimited { retry_after, .. } => {
                write!(f, "Rate limited, retry after {}s", retry_after)
            }
            AppError::StoreUnavailable => write!(f, "Rate limit store unavailable"),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl AppError {
    fn problem(&self) -> ErrorResponse {
        match self {
            AppError::BadRequest(detail) => ErrorResponse::bad_request(detail),
            AppError::Unauthorized(detail) => ErrorResponse::unauthorized(detail),
            AppError::RateLimited { retry_after, .. } => {
                ErrorResponse::too_many_requests(*retry_after)
            }
            AppError::StoreUnavailable => ErrorResponse::service_unavailable(
                "Quota could not be verified. The action was not performed.",
            ),
            AppError::Internal(detail) => {
                // Log internal errors
                tracing::error!("Internal error: {}", detail);
                ErrorResponse::internal_error()
            }
        }
    }

    /// Build the HTTP response, tagging the problem body with `request_id` when known.
    pub fn to_response(&self, request_id: Option<&str>) -> HttpResponse {
        let mut problem = self.problem();
        if let Some(id) = request_id {
            problem = problem.with_request_id(id);
        }

        let mut builder = HttpResponse::build(self.status_code());
        if let AppError::RateLimited { retry_after, limit } = self {
            builder
                .insert_header((header::RETRY_AFTER, retry_after.to_string()))
                .insert_header(("X-RateLimit-Remaining", "0"));
            if let Some(limit) = limit {
                builder.insert_header(("X-RateLimit-Limit", limit.to_string()));
            }
        }
        builder.json(problem)
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::StoreUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        self.to_response(None)
    }
}

// Conversion from limiter errors
impl From<RateLimitError> for AppError {
    fn from(err: RateLimitError) -> Self {
        match err {
            RateLimitError::Configuration(ConfigError::UnknownAction(action)) => {
                AppError::BadRequest(format!("Unknown action category: {}", action))
            }
            RateLimitError::Configuration(ConfigError::EmptyIdentity) => {
                AppError::Unauthorized("Caller identity is empty".to_string())
            }
            RateLimitError::Configuration(e) => {
                tracing::error!("Rate limit configuration error: {}", e);
                AppError::Internal("Rate limit misconfigured".to_string())
            }
            RateLimitError::StoreUnavailable(e) => {
                tracing::error!("Window store error: {}", e);
                AppError::StoreUnavailable
            }
        }
    }
}

/// Result type alias for handlers.
pub type AppResult<T> = Result<T, AppError>;
