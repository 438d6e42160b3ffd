//! Context service façade
//!
//! The only handle business logic needs for "who is calling and for which
//! tenant". Every accessor is total: a missing scope, a missing record or a
//! busy slot reads as empty, never as an error.

use crate::config::{ContextConfig, HeaderNames};
use crate::error::ContextError;
use crate::metadata::{ContextMetadata, ContextPatch};
use crate::storage::{ContextStorage, StorageAdapter, StorageKind};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;

/// Returned by [`ContextService::get_correlation_id`] when no record exists
pub const UNKNOWN_CORRELATION_ID: &str = "unknown";

#[derive(Debug, Clone, Default)]
pub struct ContextService {
    storage: StorageAdapter,
    header_names: Arc<HeaderNames>,
}

/// Identity snapshot for business logic
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestContext {
    pub correlation_id: String,
    pub user_id: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub org_id: Option<String>,
    pub organization_id: Option<String>,
    pub university_id: Option<String>,
    pub student_id: Option<String>,
    pub supervisor_id: Option<String>,
    pub path: Option<String>,
    pub method: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
}

/// Reduced snapshot that is safe to attach to log lines
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingContext {
    pub correlation_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub org_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
}

impl ContextService {
    pub fn new(storage: StorageAdapter) -> Self {
        Self {
            storage,
            header_names: Arc::new(HeaderNames::default()),
        }
    }

    pub fn from_config(config: &ContextConfig) -> Self {
        Self {
            storage: StorageAdapter::from_kind(config.storage),
            header_names: Arc::new(config.header_names.clone()),
        }
    }

    pub fn storage_kind(&self) -> StorageKind {
        self.storage.kind()
    }

    /// Run `fut` as one call with `meta` installed
    pub async fn run<F>(&self, meta: ContextMetadata, fut: F) -> F::Output
    where
        F: Future,
    {
        self.storage.scope(Some(meta), fut).await
    }

    /// Run `fut` inside an empty scope; the first `set_meta` fills it
    pub async fn scope<F>(&self, fut: F) -> F::Output
    where
        F: Future,
    {
        self.storage.scope(None, fut).await
    }

    pub fn set_meta(&self, meta: ContextMetadata) {
        self.storage.set(meta);
    }

    pub fn get_meta(&self) -> Option<Arc<ContextMetadata>> {
        self.storage.get()
    }

    /// Merge into the current record; no-op when there is none
    pub fn update_meta(&self, patch: ContextPatch) {
        if patch.is_empty() {
            return;
        }
        self.storage.update(&patch);
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.get_meta().and_then(|meta| meta.field(key))
    }

    pub fn set(&self, key: &str, value: impl Into<String>) {
        self.update_meta(ContextPatch::field(key, value));
    }

    pub fn has_context(&self) -> bool {
        self.storage.has()
    }

    pub fn clear(&self) {
        self.storage.clear();
    }

    pub fn get_user_id(&self) -> Option<String> {
        self.get_meta().and_then(|meta| meta.user_id.clone())
    }

    pub fn get_org_id(&self) -> Option<String> {
        self.get_meta()
            .and_then(|meta| meta.org_id.clone().or_else(|| meta.organization_id.clone()))
    }

    pub fn get_tenant_id(&self) -> Option<String> {
        self.get_meta()
            .and_then(|meta| meta.tenant_id().map(str::to_string))
    }

    pub fn get_role(&self) -> Option<String> {
        self.get_meta().and_then(|meta| meta.role.clone())
    }

    pub fn get_email(&self) -> Option<String> {
        self.get_meta().and_then(|meta| meta.email.clone())
    }

    /// Always loggable: falls back to [`UNKNOWN_CORRELATION_ID`]
    pub fn get_correlation_id(&self) -> String {
        self.get_meta()
            .map(|meta| meta.correlation_id.clone())
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| UNKNOWN_CORRELATION_ID.to_string())
    }

    /// Tenant id for business logic that cannot proceed without one
    pub fn require_tenant_id(&self) -> Result<String, ContextError> {
        self.get_tenant_id().ok_or(ContextError::MissingTenantContext)
    }

    pub fn get_context(&self) -> RequestContext {
        let Some(meta) = self.get_meta() else {
            return RequestContext {
                correlation_id: UNKNOWN_CORRELATION_ID.to_string(),
                user_id: None,
                email: None,
                role: None,
                org_id: None,
                organization_id: None,
                university_id: None,
                student_id: None,
                supervisor_id: None,
                path: None,
                method: None,
                timestamp: None,
            };
        };

        RequestContext {
            correlation_id: meta.correlation_id.clone(),
            user_id: meta.user_id.clone(),
            email: meta.email.clone(),
            role: meta.role.clone(),
            org_id: meta.tenant_id().map(str::to_string),
            organization_id: meta.organization_id.clone(),
            university_id: meta.university_id.clone(),
            student_id: meta.student_id.clone(),
            supervisor_id: meta.supervisor_id.clone(),
            path: meta.path.clone(),
            method: meta.method.clone(),
            timestamp: Some(meta.timestamp),
        }
    }

    pub fn get_logging_context(&self) -> LoggingContext {
        match self.get_meta() {
            Some(meta) => LoggingContext {
                correlation_id: meta.correlation_id.clone(),
                user_id: meta.user_id.clone(),
                org_id: meta.tenant_id().map(str::to_string),
                path: meta.path.clone(),
                method: meta.method.clone(),
            },
            None => LoggingContext {
                correlation_id: UNKNOWN_CORRELATION_ID.to_string(),
                user_id: None,
                org_id: None,
                path: None,
                method: None,
            },
        }
    }

    /// Headers to forward on outbound calls made on behalf of this call
    pub fn propagation_headers(&self) -> Vec<(String, String)> {
        let Some(meta) = self.get_meta() else {
            return Vec::new();
        };

        let mut headers = vec![(
            self.header_names.correlation_id.clone(),
            meta.correlation_id.clone(),
        )];
        if let Some(user_id) = &meta.user_id {
            headers.push((self.header_names.user_id.clone(), user_id.clone()));
        }
        if let Some(tenant_id) = meta.tenant_id() {
            headers.push((self.header_names.org_id.clone(), tenant_id.to_string()));
        }
        headers
    }
}
