//! Request context middleware
//!
//! Opens one context scope per request:
//! - Honors an inbound correlation header or generates one
//! - Populates the record from the request (identity headers in header
//!   mode, request details, configured custom headers)
//! - Runs the rest of the chain inside the scope and a `request` span
//! - Echoes the correlation id on the response
//!
//! Must be the outermost context-aware middleware: [`AccessGuard`] and any
//! handler reading [`ContextService`] only see the record inside this scope.
//!
//! [`AccessGuard`]: crate::AccessGuard

use crate::http_adapter::HttpAdapter;
use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::{HeaderName, HeaderValue},
    Error,
};
use futures::future::LocalBoxFuture;
use request_context::{ContextConfig, ContextPopulator, ContextService, ExecutionContextAdapter};
use std::future::{ready, Ready};
use std::rc::Rc;
use tracing::{info_span, warn, Instrument};

/// Middleware that installs the per-request context
#[derive(Clone)]
pub struct ContextMiddleware {
    populator: ContextPopulator,
    context: ContextService,
}

impl ContextMiddleware {
    pub fn new(config: ContextConfig) -> Self {
        Self {
            context: ContextService::from_config(&config),
            populator: ContextPopulator::new(config),
        }
    }

    /// Service sharing this middleware's storage backend
    pub fn context_service(&self) -> ContextService {
        self.context.clone()
    }
}

impl Default for ContextMiddleware {
    fn default() -> Self {
        Self::new(ContextConfig::default())
    }
}

impl<S, B> Transform<S, ServiceRequest> for ContextMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = ContextMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        let correlation_header =
            HeaderName::from_bytes(self.populator.config().header_names.correlation_id.as_bytes())
                .ok();
        if correlation_header.is_none() {
            warn!(
                header = %self.populator.config().header_names.correlation_id,
                "invalid correlation header name, response echo disabled"
            );
        }

        ready(Ok(ContextMiddlewareService {
            service: Rc::new(service),
            populator: self.populator.clone(),
            context: self.context.clone(),
            correlation_header,
        }))
    }
}

pub struct ContextMiddlewareService<S> {
    service: Rc<S>,
    populator: ContextPopulator,
    context: ContextService,
    correlation_header: Option<HeaderName>,
}

impl<S, B> Service<ServiceRequest> for ContextMiddlewareService<S>
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
        let raw = HttpAdapter.extract_raw_request(&req);
        let meta = self.populator.populate(&raw);
        let correlation_id = meta.correlation_id.clone();

        let span = info_span!(
            "request",
            correlation_id = %correlation_id,
            method = %req.method(),
            path = %req.path(),
        );

        let service = Rc::clone(&self.service);
        let context = self.context.clone();
        let correlation_header = self.correlation_header.clone();

        Box::pin(async move {
            let inner = async move { service.call(req).await }.instrument(span);
            let mut res = context.run(meta, inner).await?;

            if let (Some(name), Ok(value)) =
                (correlation_header, HeaderValue::from_str(&correlation_id))
            {
                res.headers_mut().insert(name, value);
            }
            Ok(res)
        })
    }
}
