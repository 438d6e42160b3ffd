//! Authorization helpers for GraphQL resolvers

use async_graphql::{Context, Error, ErrorExtensions};
use auth_guard::GuardError;
use request_context::{AuthenticatedPrincipal, ContextService, RawRequest};

/// Convert a guard rejection into a GraphQL error
///
/// The message is the user-facing text; `code` and `status` go into the
/// extensions together with the role details of a role rejection.
pub fn guard_error(err: &GuardError) -> Error {
    let payload = err.payload();
    let status = i32::from(err.status_code());

    Error::new(payload.error).extend_with(|_, e| {
        e.set("code", payload.code);
        e.set("status", status);
        if let Some(roles) = &payload.required_roles {
            e.set("requiredRoles", roles.clone());
        }
        if let Some(role) = &payload.user_role {
            e.set("userRole", role.clone());
        }
    })
}

/// Principal attached to the current operation, if any
pub fn current_principal(ctx: &Context<'_>) -> Option<AuthenticatedPrincipal> {
    ctx.data_opt::<RawRequest>().and_then(RawRequest::principal)
}

/// Verify the operation is authenticated and return the principal
pub fn require_auth(ctx: &Context<'_>) -> Result<AuthenticatedPrincipal, Error> {
    current_principal(ctx).ok_or_else(|| {
        guard_error(&GuardError::unauthenticated(
            "resolver requires a principal but none was attached",
        ))
    })
}

/// Tenant id of the current call, or a `MISSING_TENANT_CONTEXT` error
pub fn require_tenant(ctx: &Context<'_>) -> Result<String, Error> {
    let context = ctx
        .data::<ContextService>()
        .map_err(|_| "Context service not available")?;

    context
        .require_tenant_id()
        .map_err(|e| guard_error(&GuardError::from(e)))
}
