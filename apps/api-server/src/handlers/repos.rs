//! Repository handlers.
//!
//! Both routes sit behind a `QuotaGuard`; by the time a handler runs the
//! request has already been counted and admitted. The upstream provider call
//! itself belongs to the integration that mounts these routes.

use actix_web::{HttpResponse, web};

use throttle_core::domain::ActionCategory;
use throttle_shared::ApiResponse;
use throttle_shared::dto::{ActionAcceptedResponse, ImportRepositoryRequest};

use crate::middleware::error::{AppError, AppResult};
use crate::middleware::identity::Caller;

/// GET /api/repos
pub async fn list_repositories(caller: Caller) -> AppResult<HttpResponse> {
    tracing::info!(identity = %caller.0, "Repository listing admitted");

    Ok(HttpResponse::Ok().json(ApiResponse::ok(ActionAcceptedResponse {
        action: ActionCategory::RepoFetch.to_string(),
        identity: caller.0.to_string(),
        target: None,
    })))
}

/// POST /api/repos/import
pub async fn import_repository(
    caller: Caller,
    body: web::Json<ImportRepositoryRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();

    let valid = req
        .repository
        .split_once('/')
        .is_some_and(|(owner, name)| !owner.is_empty() && !name.is_empty() && !name.contains('/'));
    if !valid {
        return Err(AppError::BadRequest(
            "Repository must be given as owner/name".to_string(),
        ));
    }

    tracing::info!(identity = %caller.0, repository = %req.repository, "Repository import admitted");

    Ok(HttpResponse::Accepted().json(ApiResponse::ok(ActionAcceptedResponse {
        action: ActionCategory::RepoImport.to_string(),
        identity: caller.0.to_string(),
        target: Some(req.repository),
    })))
}
