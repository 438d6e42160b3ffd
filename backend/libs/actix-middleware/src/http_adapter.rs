//! Actix request adapter
//!
//! Builds a [`RawRequest`] from an actix request. The principal slot lives in
//! the request extensions, so every stage of one request (populator, guard,
//! extractors) shares it.

use actix_web::dev::ServiceRequest;
use actix_web::{HttpMessage, HttpRequest};
use request_context::{ExecutionContextAdapter, PrincipalSlot, RawRequest, Transport};

/// Principal slot stored in request extensions
#[derive(Clone, Default)]
pub(crate) struct RequestPrincipalSlot(pub(crate) PrincipalSlot);

#[derive(Debug, Clone, Copy, Default)]
pub struct HttpAdapter;

impl HttpAdapter {
    fn principal_slot(req: &HttpRequest) -> PrincipalSlot {
        if let Some(existing) = req.extensions().get::<RequestPrincipalSlot>() {
            return existing.0.clone();
        }
        let slot = RequestPrincipalSlot::default();
        req.extensions_mut().insert(slot.clone());
        slot.0
    }
}

impl ExecutionContextAdapter<HttpRequest> for HttpAdapter {
    fn extract_raw_request(&self, req: &HttpRequest) -> RawRequest {
        let mut raw = RawRequest::new(Transport::Http, req.method().as_str(), req.path())
            .with_principal_slot(Self::principal_slot(req));

        for (name, value) in req.headers().iter() {
            // non-visible-ASCII values are skipped
            if let Ok(value) = value.to_str() {
                raw.insert_header(name.as_str(), value);
            }
        }

        match req.peer_addr() {
            Some(addr) => raw.with_peer_addr(addr.ip().to_string()),
            None => raw,
        }
    }
}

impl ExecutionContextAdapter<ServiceRequest> for HttpAdapter {
    fn extract_raw_request(&self, req: &ServiceRequest) -> RawRequest {
        self.extract_raw_request(req.request())
    }
}
