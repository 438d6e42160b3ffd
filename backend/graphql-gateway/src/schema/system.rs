//! Public system fields

use async_graphql::{Context, Object, Result as GraphQLResult, SimpleObject};
use request_context::ContextService;

use crate::middleware::ResolverGuard;

#[derive(SimpleObject, Clone, Debug)]
pub struct RequestInfo {
    pub correlation_id: String,
    pub user_id: Option<String>,
    pub path: Option<String>,
}

#[derive(Default)]
pub struct SystemQuery;

#[Object]
impl SystemQuery {
    #[graphql(guard = "ResolverGuard::new(\"SystemQuery\", \"health\")")]
    async fn health(&self) -> &str {
        "ok"
    }

    /// What the context layer knows about this operation
    #[graphql(guard = "ResolverGuard::new(\"SystemQuery\", \"request_info\")")]
    async fn request_info(&self, ctx: &Context<'_>) -> GraphQLResult<RequestInfo> {
        let context = ctx
            .data::<ContextService>()
            .map_err(|_| "Context service not available")?;
        let snapshot = context.get_context();

        Ok(RequestInfo {
            correlation_id: snapshot.correlation_id,
            user_id: snapshot.user_id,
            path: snapshot.path,
        })
    }
}
