//! Review queue for supervisors and universities

use async_graphql::{Context, Object, Result as GraphQLResult, SimpleObject};
use request_context::ContextService;

use crate::middleware::{require_auth, ResolverGuard};

#[derive(SimpleObject, Clone, Debug)]
pub struct ReviewQueue {
    pub reviewer_id: String,
    pub reviewer_role: String,
    pub tenant_id: Option<String>,
    pub correlation_id: String,
}

#[derive(Default)]
pub struct ReviewQuery;

#[Object]
impl ReviewQuery {
    #[graphql(guard = "ResolverGuard::new(\"ReviewQuery\", \"review_queue\")")]
    async fn review_queue(&self, ctx: &Context<'_>) -> GraphQLResult<ReviewQueue> {
        let reviewer = require_auth(ctx)?;
        let context = ctx
            .data::<ContextService>()
            .map_err(|_| "Context service not available")?;

        Ok(ReviewQueue {
            reviewer_id: reviewer.id,
            reviewer_role: reviewer.role,
            tenant_id: context.get_tenant_id(),
            correlation_id: context.get_correlation_id(),
        })
    }
}
