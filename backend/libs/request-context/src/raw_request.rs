//! Transport-agnostic view of an inbound call
//!
//! Each transport provides an [`ExecutionContextAdapter`] that turns its
//! native call type into a [`RawRequest`]. The populator and both guards
//! only ever see `RawRequest`.

use crate::principal::AuthenticatedPrincipal;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

pub const AUTHORIZATION_HEADER: &str = "authorization";
pub const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";
pub const REAL_IP_HEADER: &str = "x-real-ip";
pub const USER_AGENT_HEADER: &str = "user-agent";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transport {
    /// Plain request/response handler
    Http,
    /// Query-language resolver
    GraphQl,
}

impl Transport {
    pub fn as_str(&self) -> &'static str {
        match self {
            Transport::Http => "http",
            Transport::GraphQl => "graphql",
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shared slot holding the principal attached by the auth guard
///
/// Clones of a `RawRequest` share the same slot, so an attachment made by
/// one stage is visible to every later stage of the same call.
pub type PrincipalSlot = Arc<RwLock<Option<AuthenticatedPrincipal>>>;

#[derive(Clone)]
pub struct RawRequest {
    transport: Transport,
    headers: BTreeMap<String, String>,
    path: String,
    method: String,
    peer_addr: Option<String>,
    principal: PrincipalSlot,
}

impl RawRequest {
    pub fn new(transport: Transport, method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            transport,
            headers: BTreeMap::new(),
            path: path.into(),
            method: method.into(),
            peer_addr: None,
            principal: PrincipalSlot::default(),
        }
    }

    /// Add a header; names are case-insensitive, repeated names are joined
    /// with `", "`
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.insert_header(name, value);
        self
    }

    pub fn insert_header(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
        let value = value.into();
        self.headers
            .entry(name.as_ref().to_ascii_lowercase())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert(value);
    }

    pub fn with_peer_addr(mut self, peer_addr: impl Into<String>) -> Self {
        self.peer_addr = Some(peer_addr.into());
        self
    }

    /// Reuse a slot that already belongs to this call
    pub fn with_principal_slot(mut self, slot: PrincipalSlot) -> Self {
        self.principal = slot;
        self
    }

    pub fn transport(&self) -> Transport {
        self.transport
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        match self.headers.get(name) {
            Some(value) => Some(value.as_str()),
            None => self
                .headers
                .get(&name.to_ascii_lowercase())
                .map(String::as_str),
        }
    }

    /// Header value, trimmed, `None` when blank
    pub fn non_empty_header(&self, name: &str) -> Option<&str> {
        self.header(name).map(str::trim).filter(|v| !v.is_empty())
    }

    pub fn headers(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn peer_addr(&self) -> Option<&str> {
        self.peer_addr.as_deref()
    }

    /// Token from a well-formed `Authorization: Bearer <token>` header
    ///
    /// Any other shape (missing header, other scheme, empty token) is
    /// treated as no token at all.
    pub fn bearer_token(&self) -> Option<&str> {
        let value = self.header(AUTHORIZATION_HEADER)?.trim();
        let (scheme, token) = value.split_once(' ')?;
        if !scheme.eq_ignore_ascii_case("bearer") {
            return None;
        }
        let token = token.trim();
        if token.is_empty() || token.contains(char::is_whitespace) {
            return None;
        }
        Some(token)
    }

    /// Client address: forwarded-for, then real-ip, then the peer, else
    /// `"unknown"`
    pub fn client_ip(&self) -> String {
        if let Some(forwarded) = self.non_empty_header(FORWARDED_FOR_HEADER) {
            if let Some(first) = forwarded.split(',').map(str::trim).find(|ip| !ip.is_empty()) {
                return first.to_string();
            }
        }
        if let Some(real_ip) = self.non_empty_header(REAL_IP_HEADER) {
            return real_ip.to_string();
        }
        self.peer_addr
            .clone()
            .unwrap_or_else(|| "unknown".to_string())
    }

    pub fn attach_principal(&self, principal: AuthenticatedPrincipal) {
        *self.principal.write() = Some(principal);
    }

    pub fn principal(&self) -> Option<AuthenticatedPrincipal> {
        self.principal.read().clone()
    }

    pub fn has_principal(&self) -> bool {
        self.principal.read().is_some()
    }

    pub fn principal_slot(&self) -> PrincipalSlot {
        Arc::clone(&self.principal)
    }
}

impl fmt::Debug for RawRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // header values may carry credentials
        f.debug_struct("RawRequest")
            .field("transport", &self.transport)
            .field("method", &self.method)
            .field("path", &self.path)
            .field("peer_addr", &self.peer_addr)
            .field("headers", &self.headers.keys().collect::<Vec<_>>())
            .field("has_principal", &self.has_principal())
            .finish()
    }
}

/// Normalizes a transport's native call into a [`RawRequest`]
///
/// Implementations must return the same principal slot every time they are
/// asked about the same call.
pub trait ExecutionContextAdapter<C: ?Sized> {
    fn extract_raw_request(&self, call: &C) -> RawRequest;
}
