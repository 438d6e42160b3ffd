//! Context configuration
//!
//! Read once at wiring time. Loaded from environment variables with
//! defaults for anything missing or unparsable.

use crate::storage::StorageKind;
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

pub const DEFAULT_USER_ID_HEADER: &str = "x-user-id";
pub const DEFAULT_ORG_ID_HEADER: &str = "x-org-id";
pub const DEFAULT_CORRELATION_ID_HEADER: &str = "x-correlation-id";

/// Where caller identity comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentitySource {
    /// Trusted upstream headers (internal gateway)
    Header,
    /// Bearer token resolved by the auth guard
    #[default]
    Token,
}

impl FromStr for IdentitySource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "header" | "headers" => Ok(Self::Header),
            "token" | "jwt" => Ok(Self::Token),
            other => Err(format!("unknown identity source: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeaderNames {
    pub user_id: String,
    pub org_id: String,
    pub correlation_id: String,
}

impl Default for HeaderNames {
    fn default() -> Self {
        Self {
            user_id: DEFAULT_USER_ID_HEADER.to_string(),
            org_id: DEFAULT_ORG_ID_HEADER.to_string(),
            correlation_id: DEFAULT_CORRELATION_ID_HEADER.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    pub storage: StorageKind,
    pub identity_source: IdentitySource,
    pub header_names: HeaderNames,
    /// Attach `path` and `method`
    pub include_request_details: bool,
    pub include_ip: bool,
    pub include_user_agent: bool,
    /// Headers copied verbatim into the extension map
    pub custom_headers: Vec<String>,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            storage: StorageKind::default(),
            identity_source: IdentitySource::default(),
            header_names: HeaderNames::default(),
            include_request_details: true,
            include_ip: true,
            include_user_agent: true,
            custom_headers: Vec::new(),
        }
    }
}

impl ContextConfig {
    /// Load from `CONTEXT_*` environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            storage: parse_env("CONTEXT_STORAGE").unwrap_or(defaults.storage),
            identity_source: parse_env("CONTEXT_IDENTITY_SOURCE")
                .unwrap_or(defaults.identity_source),
            header_names: HeaderNames {
                user_id: header_env("CONTEXT_USER_ID_HEADER")
                    .unwrap_or(defaults.header_names.user_id),
                org_id: header_env("CONTEXT_ORG_ID_HEADER")
                    .unwrap_or(defaults.header_names.org_id),
                correlation_id: header_env("CONTEXT_CORRELATION_ID_HEADER")
                    .unwrap_or(defaults.header_names.correlation_id),
            },
            include_request_details: parse_env("CONTEXT_INCLUDE_REQUEST_DETAILS")
                .unwrap_or(defaults.include_request_details),
            include_ip: parse_env("CONTEXT_INCLUDE_IP").unwrap_or(defaults.include_ip),
            include_user_agent: parse_env("CONTEXT_INCLUDE_USER_AGENT")
                .unwrap_or(defaults.include_user_agent),
            custom_headers: env::var("CONTEXT_CUSTOM_HEADERS")
                .map(|v| parse_header_list(&v))
                .unwrap_or(defaults.custom_headers),
        }
    }

    pub fn with_identity_source(mut self, source: IdentitySource) -> Self {
        self.identity_source = source;
        self
    }

    pub fn with_storage(mut self, storage: StorageKind) -> Self {
        self.storage = storage;
        self
    }

    pub fn with_custom_headers<I, S>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.custom_headers = headers
            .into_iter()
            .map(|h| h.into().to_ascii_lowercase())
            .collect();
        self
    }
}

fn parse_env<T: FromStr>(key: &str) -> Option<T> {
    let raw = env::var(key).ok()?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key = %key, value = %raw, "invalid context config value, using default");
            None
        }
    }
}

fn header_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_ascii_lowercase())
        .filter(|v| !v.is_empty())
}

fn parse_header_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|h| h.trim().to_ascii_lowercase())
        .filter(|h| !h.is_empty())
        .collect()
}
