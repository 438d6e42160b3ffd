//! Request-scoped context propagation
//!
//! Gives every inbound call an implicit, immutable-snapshot bag of identity
//! and tenant metadata that business code reads through [`ContextService`]
//! without threading parameters through its call chains.
//!
//! ## Components
//!
//! - **ContextMetadata / ContextPatch**: the record and its merge unit
//! - **ContextStorage**: task-local or explicit-scope backend
//! - **ContextService**: total accessors (never fails a request)
//! - **RawRequest / ExecutionContextAdapter**: transport-agnostic call view
//! - **ContextPopulator**: builds the initial record once per call
//!
//! ## Usage
//!
//! ```rust,no_run
//! use request_context::{ContextConfig, ContextPopulator, ContextService, RawRequest, Transport};
//!
//! # async fn example() {
//! let config = ContextConfig::from_env();
//! let service = ContextService::from_config(&config);
//! let populator = ContextPopulator::new(config);
//!
//! let request = RawRequest::new(Transport::Http, "GET", "/api/v1/me")
//!     .with_header("x-correlation-id", "corr-123");
//!
//! let meta = populator.populate(&request);
//! service
//!     .run(meta, async {
//!         assert_eq!(service.get_correlation_id(), "corr-123");
//!     })
//!     .await;
//! # }
//! ```

pub mod config;
pub mod error;
pub mod metadata;
pub mod populator;
pub mod principal;
pub mod raw_request;
pub mod service;
pub mod storage;

pub use config::{ContextConfig, HeaderNames, IdentitySource};
pub use error::ContextError;
pub use metadata::{ContextMetadata, ContextPatch, MAX_EXTENSION_ENTRIES};
pub use populator::ContextPopulator;
pub use principal::{roles, AuthenticatedPrincipal};
pub use raw_request::{ExecutionContextAdapter, PrincipalSlot, RawRequest, Transport};
pub use service::{ContextService, LoggingContext, RequestContext, UNKNOWN_CORRELATION_ID};
pub use storage::{ContextStorage, ScopedStorage, StorageAdapter, StorageKind, TaskLocalStorage};
