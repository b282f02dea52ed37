//! 每客户端限流中间件

use actix_service::{Service, Transform};
use actix_web::{
    Error,
    body::EitherBody,
    dev::{ServiceRequest, ServiceResponse},
    http::StatusCode,
};
use futures_util::future::{LocalBoxFuture, Ready, ready};
use std::rc::Rc;
use std::sync::Arc;
use tracing::debug;

use crate::api::services::types::{client_error, reason};
use crate::services::rate_limit::RateLimiterRegistry;
use crate::utils::client_identity;

#[derive(Clone)]
pub struct RateLimit {
    registry: Arc<RateLimiterRegistry>,
}

impl RateLimit {
    pub fn new(registry: Arc<RateLimiterRegistry>) -> Self {
        Self { registry }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RateLimit
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = RateLimitMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RateLimitMiddleware {
            service: Rc::new(service),
            registry: Arc::clone(&self.registry),
        }))
    }
}

pub struct RateLimitMiddleware<S> {
    service: Rc<S>,
    registry: Arc<RateLimiterRegistry>,
}

impl<S, B> Service<ServiceRequest> for RateLimitMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &self,
        ctx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.service.poll_ready(ctx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let identity = client_identity(req.request());

        if !self.registry.allow(&identity) {
            debug!("Rate limit exceeded for {}", identity);
            let response = client_error(
                StatusCode::TOO_MANY_REQUESTS,
                reason(StatusCode::TOO_MANY_REQUESTS),
            );
            return Box::pin(async move { Ok(req.into_response(response).map_into_right_body()) });
        }

        let srv = self.service.clone();
        Box::pin(async move {
            let res = srv.call(req).await?;
            Ok(res.map_into_left_body())
        })
    }
}
