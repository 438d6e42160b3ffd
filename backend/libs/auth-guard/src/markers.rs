//! Per-handler access markers
//!
//! Markers are registered at wiring time, either on a class (a controller,
//! a GraphQL object type) or on one of its handlers. Each key is resolved
//! independently, handler first: a handler that only declares roles still
//! inherits a class-level `public` flag, and vice versa.

use std::collections::HashMap;

/// Markers declared on a class or a handler; `None` means "not declared"
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HandlerMarkers {
    pub public: Option<bool>,
    pub roles: Option<Vec<String>>,
}

impl HandlerMarkers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Skip authentication entirely
    pub fn public() -> Self {
        Self {
            public: Some(true),
            roles: None,
        }
    }

    /// Require one of `roles` (exact match, no hierarchy)
    pub fn roles<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            public: None,
            roles: Some(roles.into_iter().map(Into::into).collect()),
        }
    }

    /// Explicitly not public, overriding a public class
    pub fn authenticated() -> Self {
        Self {
            public: Some(false),
            roles: None,
        }
    }

    pub fn with_public(mut self, public: bool) -> Self {
        self.public = Some(public);
        self
    }

    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles = Some(roles.into_iter().map(Into::into).collect());
        self
    }
}

/// What the guard pipeline enforces for one call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EffectiveMarkers {
    pub is_public: bool,
    pub required_roles: Vec<String>,
}

impl EffectiveMarkers {
    pub fn public() -> Self {
        Self {
            is_public: true,
            required_roles: Vec::new(),
        }
    }

    pub fn authenticated() -> Self {
        Self::default()
    }

    pub fn roles<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            is_public: false,
            required_roles: roles.into_iter().map(Into::into).collect(),
        }
    }

    /// Handler-level value wins over class-level, per key
    pub fn resolve(handler: Option<&HandlerMarkers>, class: Option<&HandlerMarkers>) -> Self {
        let is_public = handler
            .and_then(|m| m.public)
            .or_else(|| class.and_then(|m| m.public))
            .unwrap_or(false);
        let required_roles = handler
            .and_then(|m| m.roles.clone())
            .or_else(|| class.and_then(|m| m.roles.clone()))
            .unwrap_or_default();

        Self {
            is_public,
            required_roles,
        }
    }
}

/// Registration-time table of class and handler markers
#[derive(Debug, Clone, Default)]
pub struct MarkerTable {
    classes: HashMap<String, HandlerMarkers>,
    handlers: HashMap<(String, String), HandlerMarkers>,
}

impl MarkerTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn class(mut self, class: impl Into<String>, markers: HandlerMarkers) -> Self {
        self.classes.insert(class.into(), markers);
        self
    }

    pub fn handler(
        mut self,
        class: impl Into<String>,
        handler: impl Into<String>,
        markers: HandlerMarkers,
    ) -> Self {
        self.handlers.insert((class.into(), handler.into()), markers);
        self
    }

    /// Effective markers for `class::handler`
    ///
    /// Unregistered handlers resolve to "authenticated, any role".
    pub fn resolve(&self, class: &str, handler: &str) -> EffectiveMarkers {
        let handler_markers = self.handlers.get(&(class.to_string(), handler.to_string()));
        EffectiveMarkers::resolve(handler_markers, self.classes.get(class))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unregistered_defaults_to_authenticated() {
        let table = MarkerTable::new();
        assert_eq!(table.resolve("Projects", "list"), EffectiveMarkers::authenticated());
    }

    #[test]
    fn test_class_markers_apply_to_handlers() {
        let table = MarkerTable::new().class("Health", HandlerMarkers::public());
        assert!(table.resolve("Health", "check").is_public);

        let table = MarkerTable::new().class("Projects", HandlerMarkers::roles(["client"]));
        assert_eq!(table.resolve("Projects", "create").required_roles, vec!["client"]);
    }

    #[test]
    fn test_handler_overrides_class_per_key() {
        let table = MarkerTable::new()
            .class("Projects", HandlerMarkers::roles(["client"]))
            .handler("Projects", "feed", HandlerMarkers::public())
            .handler(
                "Projects",
                "review",
                HandlerMarkers::roles(["supervisor", "university"]),
            );

        // public on the handler, roles inherited from the class
        let feed = table.resolve("Projects", "feed");
        assert!(feed.is_public);
        assert_eq!(feed.required_roles, vec!["client"]);

        let review = table.resolve("Projects", "review");
        assert!(!review.is_public);
        assert_eq!(review.required_roles, vec!["supervisor", "university"]);

        assert_eq!(table.resolve("Projects", "create").required_roles, vec!["client"]);
    }

    #[test]
    fn test_handler_can_opt_out_of_public_class() {
        let table = MarkerTable::new()
            .class("Auth", HandlerMarkers::public())
            .handler("Auth", "logout", HandlerMarkers::authenticated());

        assert!(table.resolve("Auth", "login").is_public);
        assert!(!table.resolve("Auth", "logout").is_public);
    }

    #[test]
    fn test_empty_handler_roles_clear_class_roles() {
        let table = MarkerTable::new()
            .class("Projects", HandlerMarkers::roles(["client"]))
            .handler("Projects", "detail", HandlerMarkers::new().with_roles(Vec::<String>::new()));

        assert!(table.resolve("Projects", "detail").required_roles.is_empty());
    }
}
