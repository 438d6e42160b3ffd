//! Guard rejection taxonomy
//!
//! `Display` is the user-facing copy. The `reason` carried by each variant is
//! internal detail for logs and notifications, never sent to the caller.

use request_context::ContextError;
use serde::Serialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, GuardError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GuardError {
    /// No/invalid/expired token, unknown principal, or a role check that ran
    /// without an authenticated principal
    #[error("Invalid or expired credential")]
    Unauthenticated { reason: String },

    /// Principal is inactive or its role is not allowed
    #[error("Insufficient permissions{}", required_roles_suffix(.required_roles))]
    Forbidden {
        reason: String,
        required_roles: Vec<String>,
        user_role: Option<String>,
    },

    /// Business logic needed a tenant id that was never populated
    #[error("Missing tenant context")]
    MissingTenantContext,
}

fn required_roles_suffix(roles: &[String]) -> String {
    if roles.is_empty() {
        String::new()
    } else {
        format!(": requires one of [{}]", roles.join(", "))
    }
}

/// Wire-safe payload for transports to render
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectionPayload {
    pub error: String,
    pub code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_roles: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_role: Option<String>,
}

impl GuardError {
    pub fn unauthenticated(reason: impl Into<String>) -> Self {
        Self::Unauthenticated {
            reason: reason.into(),
        }
    }

    pub fn forbidden(
        reason: impl Into<String>,
        required_roles: Vec<String>,
        user_role: Option<String>,
    ) -> Self {
        Self::Forbidden {
            reason: reason.into(),
            required_roles,
            user_role,
        }
    }

    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unauthenticated { .. } => "UNAUTHENTICATED",
            Self::Forbidden { .. } => "FORBIDDEN",
            Self::MissingTenantContext => "MISSING_TENANT_CONTEXT",
        }
    }

    /// HTTP status a request/response transport should use
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Unauthenticated { .. } => 401,
            Self::Forbidden { .. } => 403,
            Self::MissingTenantContext => 400,
        }
    }

    /// Internal cause, for logs only
    pub fn reason(&self) -> &str {
        match self {
            Self::Unauthenticated { reason } | Self::Forbidden { reason, .. } => reason,
            Self::MissingTenantContext => "tenant id not present in request context",
        }
    }

    pub fn payload(&self) -> RejectionPayload {
        let (required_roles, user_role) = match self {
            Self::Forbidden {
                required_roles,
                user_role,
                ..
            } if !required_roles.is_empty() => (Some(required_roles.clone()), user_role.clone()),
            _ => (None, None),
        };

        RejectionPayload {
            error: self.to_string(),
            code: self.code(),
            required_roles,
            user_role,
        }
    }
}

impl From<ContextError> for GuardError {
    fn from(err: ContextError) -> Self {
        match err {
            ContextError::MissingTenantContext => GuardError::MissingTenantContext,
            ContextError::ContextPopulationFailure(reason) => GuardError::Unauthenticated { reason },
        }
    }
}
