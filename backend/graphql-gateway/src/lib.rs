//! GraphQL Gateway Library
//! Re-exports modules for testing and integration

pub mod config;
pub mod directory;
pub mod markers;
pub mod middleware;
pub mod routes;
pub mod schema;
pub mod verifier;

pub use directory::PgPrincipalDirectory;
pub use routes::GatewayState;
pub use verifier::JwtTokenVerifier;
