//! In-memory collaborators for tests
//!
//! Enabled for this crate's own tests and, for downstream crates, through
//! the `test-utils` feature.

use crate::collaborators::{
    AuthFailureEvent, DirectoryError, ExternalIdentity, NotificationSink, PrincipalDirectory,
    TokenError, TokenVerifier,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use request_context::AuthenticatedPrincipal;
use std::collections::HashMap;
use std::sync::Arc;

/// Verifier backed by a fixed token table
#[derive(Debug, Default)]
pub struct StaticTokenVerifier {
    tokens: HashMap<String, Result<ExternalIdentity, TokenError>>,
    calls: Mutex<Vec<String>>,
}

impl StaticTokenVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn valid(mut self, token: &str, external_id: &str) -> Self {
        self.tokens
            .insert(token.to_string(), Ok(ExternalIdentity::new(external_id)));
        self
    }

    pub fn expired(mut self, token: &str) -> Self {
        self.tokens.insert(token.to_string(), Err(TokenError::Expired));
        self
    }

    /// Tokens the guard asked about, in order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl TokenVerifier for StaticTokenVerifier {
    async fn verify_token(&self, raw_token: &str) -> Result<ExternalIdentity, TokenError> {
        self.calls.lock().push(raw_token.to_string());
        // a real issuer round trip suspends the call
        tokio::task::yield_now().await;
        self.tokens
            .get(raw_token)
            .cloned()
            .unwrap_or_else(|| Err(TokenError::Invalid("unknown token".to_string())))
    }
}

/// Directory backed by a map keyed by external id
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    principals: HashMap<String, AuthenticatedPrincipal>,
    unavailable: bool,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, principal: AuthenticatedPrincipal) -> Self {
        self.principals
            .insert(principal.external_id.clone(), principal);
        self
    }

    /// Every lookup fails as if the backing store were down
    pub fn unavailable() -> Self {
        Self {
            principals: HashMap::new(),
            unavailable: true,
        }
    }
}

#[async_trait]
impl PrincipalDirectory for InMemoryDirectory {
    async fn find_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<AuthenticatedPrincipal>, DirectoryError> {
        tokio::task::yield_now().await;
        if self.unavailable {
            return Err(DirectoryError::Unavailable("connection refused".to_string()));
        }
        Ok(self.principals.get(external_id).cloned())
    }
}

/// Sink that keeps every event it receives
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<AuthFailureEvent>>>,
    fail: bool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records, then reports failure
    pub fn failing() -> Self {
        Self {
            events: Arc::default(),
            fail: true,
        }
    }

    pub fn events(&self) -> Vec<AuthFailureEvent> {
        self.events.lock().clone()
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn notify_auth_failure(&self, event: &AuthFailureEvent) -> anyhow::Result<()> {
        self.events.lock().push(event.clone());
        if self.fail {
            anyhow::bail!("notification transport unavailable");
        }
        Ok(())
    }
}
