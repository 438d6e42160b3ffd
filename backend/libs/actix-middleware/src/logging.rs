//! Logging middleware
//!
//! Logs request start and completion with the current logging context.
//! Place it inside [`ContextMiddleware`](crate::ContextMiddleware) so the
//! scope is already open; the completion line then also carries identity
//! merged by the guards.

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error,
};
use futures::future::LocalBoxFuture;
use request_context::ContextService;
use std::future::{ready, Ready};
use std::rc::Rc;
use std::time::Instant;

/// Middleware that logs HTTP requests and responses
#[derive(Clone, Default)]
pub struct Logging {
    context: ContextService,
}

impl Logging {
    pub fn new(context: ContextService) -> Self {
        Self { context }
    }
}

impl<S, B> Transform<S, ServiceRequest> for Logging
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = LoggingService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(LoggingService {
            service: Rc::new(service),
            context: self.context.clone(),
        }))
    }
}

pub struct LoggingService<S> {
    service: Rc<S>,
    context: ContextService,
}

impl<S, B> Service<ServiceRequest> for LoggingService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let context = self.context.clone();

        Box::pin(async move {
            let start = Instant::now();
            let started = context.get_logging_context();

            tracing::info!(
                correlation_id = %started.correlation_id,
                method = %req.method(),
                path = %req.path(),
                "HTTP request started"
            );

            let res = service.call(req).await?;
            let finished = context.get_logging_context();

            tracing::info!(
                correlation_id = %finished.correlation_id,
                user_id = finished.user_id.as_deref().unwrap_or("-"),
                org_id = finished.org_id.as_deref().unwrap_or("-"),
                method = finished.method.as_deref().unwrap_or("-"),
                path = finished.path.as_deref().unwrap_or("-"),
                status = %res.status().as_u16(),
                duration_ms = start.elapsed().as_millis() as u64,
                "HTTP request completed"
            );

            Ok(res)
        })
    }
}
