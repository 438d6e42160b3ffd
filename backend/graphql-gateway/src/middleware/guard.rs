//! Resolver guard
//!
//! Runs the shared guard pipeline for one resolver. Markers are looked up
//! by object type and field name in the [`MarkerTable`] registered as
//! schema data.
//!
//! ```rust,ignore
//! #[graphql(guard = "ResolverGuard::new(\"ReviewQuery\", \"review_queue\")")]
//! async fn review_queue(&self, ctx: &Context<'_>) -> Result<ReviewQueue> { ... }
//! ```

use super::auth::guard_error;
use super::graphql_adapter::GraphQlAdapter;
use async_graphql::{Context, Guard, Result};
use auth_guard::{GuardPipeline, MarkerTable};
use request_context::ExecutionContextAdapter;

pub struct ResolverGuard {
    class: &'static str,
    handler: &'static str,
}

impl ResolverGuard {
    pub fn new(class: &'static str, handler: &'static str) -> Self {
        Self { class, handler }
    }
}

#[async_trait::async_trait]
impl Guard for ResolverGuard {
    async fn check(&self, ctx: &Context<'_>) -> Result<()> {
        let table = ctx
            .data::<MarkerTable>()
            .map_err(|_| "Marker table not available")?;
        let pipeline = ctx
            .data::<GuardPipeline>()
            .map_err(|_| "Guard pipeline not available")?;

        let markers = table.resolve(self.class, self.handler);
        let request = GraphQlAdapter.extract_raw_request(ctx);

        pipeline
            .check(&markers, &request)
            .await
            .map_err(|e| guard_error(&e))
    }
}
