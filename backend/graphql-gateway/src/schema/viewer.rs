//! Authenticated viewer

use async_graphql::{Context, Object, Result as GraphQLResult, SimpleObject};
use request_context::AuthenticatedPrincipal;

use crate::middleware::{require_auth, require_tenant, ResolverGuard};

#[derive(SimpleObject, Clone, Debug)]
pub struct Viewer {
    pub id: String,
    pub email: String,
    pub role: String,
    pub username: Option<String>,
    pub organization_id: Option<String>,
    pub university_id: Option<String>,
}

impl From<AuthenticatedPrincipal> for Viewer {
    fn from(principal: AuthenticatedPrincipal) -> Self {
        Self {
            id: principal.id,
            email: principal.email,
            role: principal.role,
            username: principal.username,
            organization_id: principal.organization_id,
            university_id: principal.university_id,
        }
    }
}

#[derive(Default)]
pub struct ViewerQuery;

#[Object]
impl ViewerQuery {
    #[graphql(guard = "ResolverGuard::new(\"ViewerQuery\", \"me\")")]
    async fn me(&self, ctx: &Context<'_>) -> GraphQLResult<Viewer> {
        require_auth(ctx).map(Viewer::from)
    }

    /// Organization, or university for university-scoped roles
    #[graphql(guard = "ResolverGuard::new(\"ViewerQuery\", \"tenant_id\")")]
    async fn tenant_id(&self, ctx: &Context<'_>) -> GraphQLResult<String> {
        require_tenant(ctx)
    }
}
