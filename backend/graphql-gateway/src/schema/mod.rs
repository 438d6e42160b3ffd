//! GraphQL Schema
//!
//! Every field carries a [`ResolverGuard`](crate::middleware::ResolverGuard)
//! keyed by its object type and field name.

pub mod project;
pub mod review;
pub mod system;
pub mod viewer;

use async_graphql::{EmptySubscription, MergedObject, Schema};
use auth_guard::{GuardPipeline, MarkerTable};
use request_context::ContextService;

use crate::config::GraphQLConfig;

/// Root query object
#[derive(MergedObject, Default)]
pub struct QueryRoot(system::SystemQuery, viewer::ViewerQuery, review::ReviewQuery);

/// Root mutation object
#[derive(MergedObject, Default)]
pub struct MutationRoot(project::ProjectMutation);

pub type AppSchema = Schema<QueryRoot, MutationRoot, EmptySubscription>;

/// Build the schema with the guard pipeline, context service and marker
/// table as schema data
pub fn build_schema(
    pipeline: GuardPipeline,
    context: ContextService,
    markers: MarkerTable,
    config: &GraphQLConfig,
) -> AppSchema {
    let builder = Schema::build(QueryRoot::default(), MutationRoot::default(), EmptySubscription)
        .data(pipeline)
        .data(context)
        .data(markers)
        .limit_depth(config.max_depth)
        .limit_complexity(config.max_complexity);

    if config.introspection {
        builder.finish()
    } else {
        builder.disable_introspection().finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markers::marker_table;
    use auth_guard::test_utils::{InMemoryDirectory, StaticTokenVerifier};
    use std::sync::Arc;

    fn schema() -> AppSchema {
        let context = ContextService::default();
        let pipeline = GuardPipeline::builder(
            Arc::new(StaticTokenVerifier::new()),
            Arc::new(InMemoryDirectory::new()),
        )
        .context(context.clone())
        .build();
        build_schema(pipeline, context, marker_table(), &GraphQLConfig::default())
    }

    #[test]
    fn test_schema_builds() {
        let sdl = schema().sdl();
        assert!(sdl.contains("type Query"));
        assert!(sdl.contains("reviewQueue"));
        assert!(sdl.contains("createProject"));
    }

    #[tokio::test]
    async fn test_health_query() {
        let result = schema().execute("{ health }").await;

        assert!(result.errors.is_empty());
        assert_eq!(result.data.to_string(), r#"{health: "ok"}"#);
    }

    #[tokio::test]
    async fn test_guarded_field_without_request() {
        let result = schema().execute("{ me { id } }").await;

        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].message, "Invalid or expired credential");
    }
}
