use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContextError {
    /// Populator could not assemble the full record; logged, never surfaced
    #[error("Context population failed: {0}")]
    ContextPopulationFailure(String),

    /// Business logic needed a tenant id that was never populated
    #[error("Missing tenant context")]
    MissingTenantContext,
}

pub type Result<T> = std::result::Result<T, ContextError>;
