//! Access guard middleware
//!
//! Wraps a single resource or scope with the markers resolved for it at
//! registration time and runs the guard pipeline before the handler.
//! Rejections short-circuit with an [`HttpRejection`] response.

use crate::error::HttpRejection;
use crate::http_adapter::HttpAdapter;
use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error, ResponseError,
};
use auth_guard::{EffectiveMarkers, GuardPipeline, MarkerTable};
use futures::future::LocalBoxFuture;
use request_context::ExecutionContextAdapter;
use std::future::{ready, Ready};
use std::rc::Rc;
use std::sync::Arc;

/// Guard middleware for one handler
///
/// ## Example
/// ```rust,ignore
/// let table = MarkerTable::new()
///     .class("ProjectController", HandlerMarkers::roles(["client"]));
///
/// web::resource("/projects")
///     .wrap(AccessGuard::for_handler(pipeline.clone(), &table, "ProjectController", "create"))
///     .route(web::post().to(create_project))
/// ```
#[derive(Clone)]
pub struct AccessGuard {
    pipeline: Arc<GuardPipeline>,
    markers: Arc<EffectiveMarkers>,
}

impl AccessGuard {
    pub fn new(pipeline: GuardPipeline, markers: EffectiveMarkers) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            markers: Arc::new(markers),
        }
    }

    /// Resolve `class::handler` from `table`
    pub fn for_handler(
        pipeline: GuardPipeline,
        table: &MarkerTable,
        class: &str,
        handler: &str,
    ) -> Self {
        Self::new(pipeline, table.resolve(class, handler))
    }

    pub fn markers(&self) -> &EffectiveMarkers {
        &self.markers
    }
}

impl<S, B> Transform<S, ServiceRequest> for AccessGuard
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = AccessGuardService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AccessGuardService {
            service: Rc::new(service),
            pipeline: Arc::clone(&self.pipeline),
            markers: Arc::clone(&self.markers),
        }))
    }
}

pub struct AccessGuardService<S> {
    service: Rc<S>,
    pipeline: Arc<GuardPipeline>,
    markers: Arc<EffectiveMarkers>,
}

impl<S, B> Service<ServiceRequest> for AccessGuardService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let pipeline = Arc::clone(&self.pipeline);
        let markers = Arc::clone(&self.markers);

        Box::pin(async move {
            let raw = HttpAdapter.extract_raw_request(&req);

            match pipeline.check(&markers, &raw).await {
                Ok(()) => service
                    .call(req)
                    .await
                    .map(ServiceResponse::map_into_left_body),
                Err(rejection) => {
                    let response = HttpRejection::from(rejection).error_response();
                    Ok(req.into_response(response).map_into_right_body())
                }
            }
        })
    }
}
