//! GraphQL request adapter
//!
//! The HTTP handler builds one [`RawRequest`] per GraphQL operation and puts
//! it in the request data. Every resolver of that operation reads the same
//! request back, so a principal attached while guarding one field is visible
//! to the rest.

use actix_middleware::HttpAdapter;
use actix_web::HttpRequest;
use async_graphql::Context;
use request_context::{ExecutionContextAdapter, RawRequest, Transport};

pub const GRAPHQL_PATH: &str = "/graphql";

#[derive(Debug, Clone, Copy, Default)]
pub struct GraphQlAdapter;

impl ExecutionContextAdapter<HttpRequest> for GraphQlAdapter {
    fn extract_raw_request(&self, req: &HttpRequest) -> RawRequest {
        // shares the principal slot stored on the HTTP request
        let http = HttpAdapter.extract_raw_request(req);

        let mut raw = RawRequest::new(Transport::GraphQl, http.method(), http.path())
            .with_principal_slot(http.principal_slot());
        for (name, value) in http.headers() {
            raw.insert_header(name, value);
        }
        match http.peer_addr() {
            Some(peer) => raw.with_peer_addr(peer),
            None => raw,
        }
    }
}

impl<'a> ExecutionContextAdapter<Context<'a>> for GraphQlAdapter {
    fn extract_raw_request(&self, ctx: &Context<'a>) -> RawRequest {
        ctx.data_opt::<RawRequest>()
            .cloned()
            .unwrap_or_else(|| RawRequest::new(Transport::GraphQl, "POST", GRAPHQL_PATH))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;
    use request_context::AuthenticatedPrincipal;

    #[actix_web::test]
    async fn test_tags_transport_and_shares_slot() {
        let req = TestRequest::post()
            .uri("/graphql")
            .insert_header(("Authorization", "Bearer tok1"))
            .to_http_request();

        let raw = GraphQlAdapter.extract_raw_request(&req);
        assert_eq!(raw.transport(), Transport::GraphQl);
        assert_eq!(raw.path(), "/graphql");
        assert_eq!(raw.bearer_token(), Some("tok1"));

        raw.attach_principal(AuthenticatedPrincipal::new("u1", "ext-1", "a@b.c", "client"));
        assert!(HttpAdapter.extract_raw_request(&req).has_principal());
    }
}
