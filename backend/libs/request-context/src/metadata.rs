//! Per-call context metadata
//!
//! A `ContextMetadata` is an immutable snapshot. Storage hands out
//! `Arc<ContextMetadata>` and every change goes through [`ContextPatch`],
//! which produces a new merged record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Upper bound on custom header entries carried in the extension map
pub const MAX_EXTENSION_ENTRIES: usize = 32;

/// Identity, tenant and diagnostic data bound to one inbound call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextMetadata {
    pub correlation_id: String,
    pub timestamp: DateTime<Utc>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub org_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub university_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supervisor_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,

    /// Custom header passthrough, bounded by [`MAX_EXTENSION_ENTRIES`]
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extensions: BTreeMap<String, String>,
}

impl ContextMetadata {
    /// Create metadata for a call with the given correlation id
    ///
    /// An empty correlation id is replaced by a generated one so the
    /// record never violates the non-empty invariant.
    pub fn new(correlation_id: impl Into<String>) -> Self {
        let correlation_id = correlation_id.into();
        let correlation_id = if correlation_id.trim().is_empty() {
            generate_correlation_id()
        } else {
            correlation_id
        };

        Self {
            correlation_id,
            timestamp: Utc::now(),
            user_id: None,
            org_id: None,
            organization_id: None,
            university_id: None,
            student_id: None,
            supervisor_id: None,
            role: None,
            email: None,
            username: None,
            path: None,
            method: None,
            ip: None,
            user_agent: None,
            extensions: BTreeMap::new(),
        }
    }

    /// Create metadata with a freshly generated correlation id
    pub fn generate() -> Self {
        Self::new(generate_correlation_id())
    }

    /// Return a new record with `patch` merged on top of this one
    ///
    /// Fields set in the patch win; unset fields keep their current value.
    /// `correlation_id` and `timestamp` are never cleared.
    #[must_use]
    pub fn merged(&self, patch: &ContextPatch) -> Self {
        let mut next = self.clone();

        if let Some(id) = patch.correlation_id.as_ref().filter(|id| !id.is_empty()) {
            next.correlation_id = id.clone();
        }

        merge_field(&mut next.user_id, &patch.user_id);
        merge_field(&mut next.org_id, &patch.org_id);
        merge_field(&mut next.organization_id, &patch.organization_id);
        merge_field(&mut next.university_id, &patch.university_id);
        merge_field(&mut next.student_id, &patch.student_id);
        merge_field(&mut next.supervisor_id, &patch.supervisor_id);
        merge_field(&mut next.role, &patch.role);
        merge_field(&mut next.email, &patch.email);
        merge_field(&mut next.username, &patch.username);
        merge_field(&mut next.path, &patch.path);
        merge_field(&mut next.method, &patch.method);
        merge_field(&mut next.ip, &patch.ip);
        merge_field(&mut next.user_agent, &patch.user_agent);

        for (key, value) in &patch.extensions {
            next.insert_extension(key.clone(), value.clone());
        }

        next
    }

    /// Insert a custom entry, ignoring new keys once the map is full
    ///
    /// Returns `false` when the entry was dropped.
    pub fn insert_extension(&mut self, key: String, value: String) -> bool {
        if self.extensions.len() >= MAX_EXTENSION_ENTRIES && !self.extensions.contains_key(&key) {
            tracing::debug!(key = %key, "context extension map full, dropping entry");
            return false;
        }
        self.extensions.insert(key, value);
        true
    }

    /// Tenant id: organization first, then university
    pub fn tenant_id(&self) -> Option<&str> {
        self.org_id
            .as_deref()
            .or(self.organization_id.as_deref())
            .or(self.university_id.as_deref())
    }

    /// Look up a field by its snake_case or camelCase name, falling back
    /// to the extension map
    pub fn field(&self, key: &str) -> Option<String> {
        let value = match normalize_key(key).as_str() {
            "correlation_id" => Some(&self.correlation_id),
            "timestamp" => return Some(self.timestamp.to_rfc3339()),
            "user_id" => self.user_id.as_ref(),
            "org_id" => self.org_id.as_ref(),
            "organization_id" => self.organization_id.as_ref(),
            "university_id" => self.university_id.as_ref(),
            "student_id" => self.student_id.as_ref(),
            "supervisor_id" => self.supervisor_id.as_ref(),
            "role" => self.role.as_ref(),
            "email" => self.email.as_ref(),
            "username" => self.username.as_ref(),
            "path" => self.path.as_ref(),
            "method" => self.method.as_ref(),
            "ip" => self.ip.as_ref(),
            "user_agent" => self.user_agent.as_ref(),
            _ => self.extensions.get(key),
        };
        value.cloned()
    }
}

fn merge_field(target: &mut Option<String>, source: &Option<String>) {
    if let Some(value) = source {
        *target = Some(value.clone());
    }
}

/// Generate a new correlation id (UUID v4)
pub fn generate_correlation_id() -> String {
    Uuid::new_v4().to_string()
}

/// Convert `userId` / `user-id` / `user_id` to `user_id`
fn normalize_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    for ch in key.chars() {
        if ch.is_ascii_uppercase() {
            out.push('_');
            out.push(ch.to_ascii_lowercase());
        } else if ch == '-' {
            out.push('_');
        } else {
            out.push(ch);
        }
    }
    out
}

/// Partial update merged onto the current [`ContextMetadata`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContextPatch {
    pub correlation_id: Option<String>,
    pub user_id: Option<String>,
    pub org_id: Option<String>,
    pub organization_id: Option<String>,
    pub university_id: Option<String>,
    pub student_id: Option<String>,
    pub supervisor_id: Option<String>,
    pub role: Option<String>,
    pub email: Option<String>,
    pub username: Option<String>,
    pub path: Option<String>,
    pub method: Option<String>,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub extensions: BTreeMap<String, String>,
}

impl ContextPatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a patch that sets a single field by name
    ///
    /// Unknown keys land in the extension map.
    pub fn field(key: &str, value: impl Into<String>) -> Self {
        let value = Some(value.into());
        let mut patch = Self::default();
        match normalize_key(key).as_str() {
            "correlation_id" => patch.correlation_id = value,
            "user_id" => patch.user_id = value,
            "org_id" => patch.org_id = value,
            "organization_id" => patch.organization_id = value,
            "university_id" => patch.university_id = value,
            "student_id" => patch.student_id = value,
            "supervisor_id" => patch.supervisor_id = value,
            "role" => patch.role = value,
            "email" => patch.email = value,
            "username" => patch.username = value,
            "path" => patch.path = value,
            "method" => patch.method = value,
            "ip" => patch.ip = value,
            "user_agent" => patch.user_agent = value,
            _ => {
                if let Some(value) = value {
                    patch.extensions.insert(key.to_string(), value);
                }
            }
        }
        patch
    }

    pub fn user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn org_id(mut self, org_id: impl Into<String>) -> Self {
        self.org_id = Some(org_id.into());
        self
    }

    pub fn role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
