//! Authentication and authorization guards
//!
//! Transport-agnostic guard pipeline for inbound calls. Each transport turns
//! its call into a [`RawRequest`](request_context::RawRequest), resolves the
//! handler's [`EffectiveMarkers`], and asks the [`GuardPipeline`].
//!
//! ## Flow
//!
//! ```text
//! Start
//!   ├─ public? ─────────────────────────────► Allow
//!   ├─ no Bearer token ─────────────────────► Unauthenticated
//!   ├─ issuer rejects (invalid/expired) ────► Unauthenticated
//!   ├─ no principal for external id ────────► Unauthenticated
//!   ├─ principal inactive ──────────────────► Forbidden
//!   ├─ attach principal, merge into context
//!   ├─ role not in allow-list ──────────────► Forbidden
//!   └─────────────────────────────────────────► Allow
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use auth_guard::{GuardPipeline, MarkerTable, HandlerMarkers};
//! use auth_guard::test_utils::{InMemoryDirectory, StaticTokenVerifier};
//! use request_context::{RawRequest, Transport};
//! use std::sync::Arc;
//!
//! # async fn example() {
//! let pipeline = GuardPipeline::builder(
//!     Arc::new(StaticTokenVerifier::new()),
//!     Arc::new(InMemoryDirectory::new()),
//! )
//! .build();
//!
//! let markers = MarkerTable::new()
//!     .class("ProjectController", HandlerMarkers::roles(["client"]))
//!     .resolve("ProjectController", "create");
//!
//! let request = RawRequest::new(Transport::Http, "POST", "/api/v1/projects");
//! let result = pipeline.check(&markers, &request).await;
//! assert!(result.is_err());
//! # }
//! ```

pub mod auth_guard;
pub mod collaborators;
pub mod error;
pub mod markers;
pub mod pipeline;
pub mod role_guard;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use auth_guard::AuthGuard;
pub use collaborators::{
    emit_best_effort, AuthFailureEvent, DirectoryError, ExternalIdentity, FailureKind,
    LogNotificationSink, NotificationSink, PrincipalDirectory, TokenError, TokenVerifier,
};
pub use error::{GuardError, RejectionPayload};
pub use markers::{EffectiveMarkers, HandlerMarkers, MarkerTable};
pub use pipeline::{GuardPipeline, GuardPipelineBuilder};
pub use role_guard::RoleGuard;
