//! Rate limit status endpoint.

use actix_web::{HttpResponse, web};

use throttle_core::domain::ActionCategory;
use throttle_shared::ApiResponse;
use throttle_shared::dto::RateLimitStatusResponse;

use crate::middleware::error::{AppError, AppResult};
use crate::middleware::identity::Caller;
use crate::state::AppState;

/// GET /api/rate-limit/{action}
///
/// Reports the caller's current window without consuming a slot.
pub async fn status(
    state: web::Data<AppState>,
    caller: Caller,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let action: ActionCategory = path
        .parse()
        .map_err(|e: throttle_core::ConfigError| AppError::BadRequest(e.to_string()))?;

    let usage = state.limiter.usage(&caller.0, action).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(RateLimitStatusResponse {
        action: action.to_string(),
        limit: usage.limit,
        used: usage.used,
        remaining: usage.remaining,
        retry_after_seconds: usage.retry_after_seconds,
        resets_at: usage.resets_at,
    })))
}
