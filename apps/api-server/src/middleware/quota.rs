//! Quota guard middleware.
//!
//! Wraps a quota-consuming route with an admission check for one action
//! category. Denied requests never reach the handler.

use actix_web::{
    Error, HttpMessage, HttpResponse,
    body::EitherBody,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
    http::header::{HeaderName, HeaderValue},
};
use std::future::{Future, Ready, ready};
use std::pin::Pin;
use std::rc::Rc;
use std::sync::Arc;

use throttle_core::RateLimiter;
use throttle_core::domain::{ActionCategory, Decision};

use crate::middleware::error::AppError;
use crate::middleware::identity::identity_from_headers;
use crate::observability::RequestId;

/// Quota guard middleware factory.
pub struct QuotaGuard {
    limiter: Arc<RateLimiter>,
    action: ActionCategory,
}

impl QuotaGuard {
    pub fn new(limiter: Arc<RateLimiter>, action: ActionCategory) -> Self {
        Self { limiter, action }
    }
}

impl<S, B> Transform<S, ServiceRequest> for QuotaGuard
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = QuotaGuardService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(QuotaGuardService {
            service: Rc::new(service),
            limiter: self.limiter.clone(),
            action: self.action,
        }))
    }
}

pub struct QuotaGuardService<S> {
    service: Rc<S>,
    limiter: Arc<RateLimiter>,
    action: ActionCategory,
}

impl<S, B> Service<ServiceRequest> for QuotaGuardService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let limiter = self.limiter.clone();
        let action = self.action;

        Box::pin(async move {
            let identity = match identity_from_headers(req.headers()) {
                Ok(identity) => identity,
                Err(e) => return Ok(reject(req, e)),
            };

            let decision = match limiter.admit(&identity, action).await {
                Ok(decision) => decision,
                Err(e) => return Ok(reject(req, AppError::from(e))),
            };

            let limit = limiter.policy(action).map(|p| p.max_requests()).ok();

            if !decision.allowed {
                tracing::warn!(
                    %identity,
                    %action,
                    retry_after = decision.retry_after_seconds,
                    "Throttled request"
                );
                return Ok(reject(
                    req,
                    AppError::RateLimited {
                        retry_after: decision.retry_after_seconds,
                        limit,
                    },
                ));
            }

            let mut res = service.call(req).await?;
            annotate(&mut res, limit, &decision);
            Ok(res.map_into_left_body())
        })
    }
}

/// Short-circuit with an error response; the wrapped handler is never called.
fn reject<B>(req: ServiceRequest, error: AppError) -> ServiceResponse<EitherBody<B>> {
    let request_id = req.extensions().get::<RequestId>().cloned();
    let response: HttpResponse = error.to_response(request_id.as_ref().map(RequestId::as_str));

    let (http_req, _payload) = req.into_parts();
    ServiceResponse::new(http_req, response).map_into_right_body()
}

fn annotate<B>(res: &mut ServiceResponse<B>, limit: Option<u32>, decision: &Decision) {
    let headers = res.headers_mut();
    if let Some(limit) = limit {
        headers.insert(
            HeaderName::from_static("x-ratelimit-limit"),
            HeaderValue::from(limit),
        );
    }
    headers.insert(
        HeaderName::from_static("x-ratelimit-remaining"),
        HeaderValue::from(decision.remaining),
    );
}
