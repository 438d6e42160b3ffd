//! Project mutations for clients

use async_graphql::{Context, Object, Result as GraphQLResult, SimpleObject};
use chrono::Utc;
use request_context::ContextService;
use tracing::info;
use uuid::Uuid;

use crate::middleware::{require_auth, require_tenant, ResolverGuard};

#[derive(SimpleObject, Clone, Debug)]
pub struct ProjectDraft {
    pub id: String,
    pub title: String,
    pub owner_id: String,
    pub organization_id: String,
    pub status: String,
    pub correlation_id: String,
    pub updated_at: String,
}

#[derive(Default)]
pub struct ProjectMutation;

#[Object]
impl ProjectMutation {
    #[graphql(guard = "ResolverGuard::new(\"ProjectMutation\", \"create_project\")")]
    async fn create_project(&self, ctx: &Context<'_>, title: String) -> GraphQLResult<ProjectDraft> {
        let title = title.trim();
        if title.is_empty() {
            return Err("Title must not be empty".into());
        }

        let owner = require_auth(ctx)?;
        let organization_id = require_tenant(ctx)?;
        let correlation_id = correlation_id(ctx)?;
        let id = Uuid::new_v4().to_string();

        info!(
            correlation_id = %correlation_id,
            project_id = %id,
            owner_id = %owner.id,
            "project draft created"
        );

        Ok(ProjectDraft {
            id,
            title: title.to_string(),
            owner_id: owner.id,
            organization_id,
            status: "draft".to_string(),
            correlation_id,
            updated_at: Utc::now().to_rfc3339(),
        })
    }

    #[graphql(guard = "ResolverGuard::new(\"ProjectMutation\", \"archive_project\")")]
    async fn archive_project(&self, ctx: &Context<'_>, id: String) -> GraphQLResult<ProjectDraft> {
        let actor = require_auth(ctx)?;
        let organization_id = require_tenant(ctx)?;
        let correlation_id = correlation_id(ctx)?;

        info!(
            correlation_id = %correlation_id,
            project_id = %id,
            actor_id = %actor.id,
            "project archived"
        );

        Ok(ProjectDraft {
            id,
            title: String::new(),
            owner_id: actor.id,
            organization_id,
            status: "archived".to_string(),
            correlation_id,
            updated_at: Utc::now().to_rfc3339(),
        })
    }
}

fn correlation_id(ctx: &Context<'_>) -> GraphQLResult<String> {
    let context = ctx
        .data::<ContextService>()
        .map_err(|_| "Context service not available")?;
    Ok(context.get_correlation_id())
}
