//! HTTP handlers and route configuration.

mod health;
mod rate_limit;
mod repos;

use actix_web::web;

use throttle_core::domain::ActionCategory;

use crate::middleware::quota::QuotaGuard;
use crate::state::AppState;

/// Configure all application routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig, state: &AppState) {
    cfg.service(
        web::scope("/api")
            // Public routes
            .route("/health", web::get().to(health::health_check))
            // Read-only quota status, never consumes a slot
            .route("/rate-limit/{action}", web::get().to(rate_limit::status))
            // Quota-consuming routes
            .service(
                web::scope("/repos")
                    .service(
                        web::resource("")
                            .wrap(QuotaGuard::new(
                                state.limiter.clone(),
                                ActionCategory::RepoFetch,
                            ))
                            .route(web::get().to(repos::list_repositories)),
                    )
                    .service(
                        web::resource("/import")
                            .wrap(QuotaGuard::new(
                                state.limiter.clone(),
                                ActionCategory::RepoImport,
                            ))
                            .route(web::post().to(repos::import_repository)),
                    ),
            ),
    );
}
