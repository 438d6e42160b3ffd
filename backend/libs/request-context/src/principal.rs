//! Authenticated principal attached to a call

use crate::metadata::ContextPatch;
use serde::{Deserialize, Serialize};

/// Internal identity resolved from a verified token
///
/// Lives for one call. Never persisted by the context layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatedPrincipal {
    pub id: String,
    /// Subject id at the identity provider
    pub external_id: String,
    pub email: String,
    pub role: String,
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub university_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supervisor_id: Option<String>,
}

impl AuthenticatedPrincipal {
    pub fn new(
        id: impl Into<String>,
        external_id: impl Into<String>,
        email: impl Into<String>,
        role: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            external_id: external_id.into(),
            email: email.into(),
            role: role.into(),
            is_active: true,
            username: None,
            organization_id: None,
            university_id: None,
            student_id: None,
            supervisor_id: None,
        }
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    pub fn with_organization(mut self, organization_id: impl Into<String>) -> Self {
        self.organization_id = Some(organization_id.into());
        self
    }

    pub fn with_university(mut self, university_id: impl Into<String>) -> Self {
        self.university_id = Some(university_id.into());
        self
    }

    /// Identity and tenant fields to merge into the call's context
    ///
    /// `org_id` mirrors the organization, falling back to the university,
    /// so tenant lookups behave the same as in header mode.
    pub fn context_patch(&self) -> ContextPatch {
        ContextPatch {
            user_id: Some(self.id.clone()),
            email: Some(self.email.clone()),
            role: Some(self.role.clone()),
            username: self.username.clone(),
            org_id: self
                .organization_id
                .clone()
                .or_else(|| self.university_id.clone()),
            organization_id: self.organization_id.clone(),
            university_id: self.university_id.clone(),
            student_id: self.student_id.clone(),
            supervisor_id: self.supervisor_id.clone(),
            ..ContextPatch::default()
        }
    }
}

/// Known role names
pub mod roles {
    pub const CLIENT: &str = "client";
    pub const SUPERVISOR: &str = "supervisor";
    pub const STUDENT: &str = "student";
    pub const UNIVERSITY: &str = "university";
}
