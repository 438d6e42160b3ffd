//! GraphQL Gateway Middleware

pub mod auth;
pub mod graphql_adapter;
pub mod guard;

pub use auth::{current_principal, guard_error, require_auth, require_tenant};
pub use graphql_adapter::GraphQlAdapter;
pub use guard::ResolverGuard;
