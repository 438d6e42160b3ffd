//! External collaborators consumed by the guards
//!
//! The token issuer, the principal directory and the notification sink are
//! owned elsewhere. Timeouts and retries are their concern; the guards
//! simply await them and map failure to a rejection.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::FutureExt;
use request_context::{AuthenticatedPrincipal, Transport};
use serde::Serialize;
use std::panic::AssertUnwindSafe;
use thiserror::Error;
use tracing::{error, warn};

/// Identity asserted by the token issuer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalIdentity {
    /// Subject id at the issuer
    pub id: String,
    pub email: Option<String>,
}

impl ExternalIdentity {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("Token expired")]
    Expired,

    #[error("Invalid token: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DirectoryError {
    #[error("Principal directory unavailable: {0}")]
    Unavailable(String),
}

/// Verifies a raw bearer token
///
/// The guard never decodes tokens itself.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify_token(&self, raw_token: &str) -> Result<ExternalIdentity, TokenError>;
}

/// Resolves an issuer identity to the internal principal
#[async_trait]
pub trait PrincipalDirectory: Send + Sync {
    async fn find_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<AuthenticatedPrincipal>, DirectoryError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Unauthenticated,
    Forbidden,
}

/// Emitted whenever a guard rejects a call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthFailureEvent {
    pub kind: FailureKind,
    pub reason: String,
    pub correlation_id: String,
    pub transport: &'static str,
    pub method: String,
    pub path: String,
    pub user_id: Option<String>,
    pub user_role: Option<String>,
    pub required_roles: Vec<String>,
    pub occurred_at: DateTime<Utc>,
}

impl AuthFailureEvent {
    pub fn new(
        kind: FailureKind,
        reason: impl Into<String>,
        correlation_id: impl Into<String>,
        transport: Transport,
    ) -> Self {
        Self {
            kind,
            reason: reason.into(),
            correlation_id: correlation_id.into(),
            transport: transport.as_str(),
            method: String::new(),
            path: String::new(),
            user_id: None,
            user_role: None,
            required_roles: Vec::new(),
            occurred_at: Utc::now(),
        }
    }
}

/// Outbound notification sink
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify_auth_failure(&self, event: &AuthFailureEvent) -> anyhow::Result<()>;
}

/// Sink that records failures as structured log events
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotificationSink;

#[async_trait]
impl NotificationSink for LogNotificationSink {
    async fn notify_auth_failure(&self, event: &AuthFailureEvent) -> anyhow::Result<()> {
        warn!(
            kind = ?event.kind,
            reason = %event.reason,
            correlation_id = %event.correlation_id,
            transport = event.transport,
            method = %event.method,
            path = %event.path,
            user_id = ?event.user_id,
            user_role = ?event.user_role,
            required_roles = ?event.required_roles,
            "auth failure"
        );
        Ok(())
    }
}

/// Emit without letting a failing or panicking sink escape
pub async fn emit_best_effort(sink: &dyn NotificationSink, event: AuthFailureEvent) {
    match AssertUnwindSafe(sink.notify_auth_failure(&event))
        .catch_unwind()
        .await
    {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            warn!(
                correlation_id = %event.correlation_id,
                error = %e,
                "failed to emit auth failure notification"
            );
        }
        Err(_) => {
            error!(
                correlation_id = %event.correlation_id,
                "notification sink panicked while emitting auth failure"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingSink;

    #[async_trait]
    impl NotificationSink for FailingSink {
        async fn notify_auth_failure(&self, _event: &AuthFailureEvent) -> anyhow::Result<()> {
            anyhow::bail!("sink offline")
        }
    }

    struct PanickingSink;

    #[async_trait]
    impl NotificationSink for PanickingSink {
        async fn notify_auth_failure(&self, _event: &AuthFailureEvent) -> anyhow::Result<()> {
            panic!("sink bug")
        }
    }

    fn event() -> AuthFailureEvent {
        AuthFailureEvent::new(FailureKind::Unauthenticated, "missing token", "corr-1", Transport::Http)
    }

    #[tokio::test]
    async fn test_emit_swallows_sink_errors() {
        emit_best_effort(&FailingSink, event()).await;
        emit_best_effort(&PanickingSink, event()).await;
        emit_best_effort(&LogNotificationSink, event()).await;
    }

    #[test]
    fn test_event_serializes_kind() {
        let json = serde_json::to_value(event()).expect("serialize");
        assert_eq!(json["kind"], "unauthenticated");
        assert_eq!(json["transport"], "http");
    }
}
