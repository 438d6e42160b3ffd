//! Access markers for every guarded entry point
//!
//! HTTP controllers and GraphQL object types share one table. Anything not
//! listed here requires an authenticated caller with any role.

use auth_guard::{HandlerMarkers, MarkerTable};
use request_context::roles;

pub fn marker_table() -> MarkerTable {
    MarkerTable::new()
        // HTTP
        .class("HealthController", HandlerMarkers::public())
        .class(
            "ReviewController",
            HandlerMarkers::roles([roles::SUPERVISOR, roles::UNIVERSITY]),
        )
        // GraphQL
        .class("SystemQuery", HandlerMarkers::public())
        .class(
            "ReviewQuery",
            HandlerMarkers::roles([roles::SUPERVISOR, roles::UNIVERSITY]),
        )
        .class("ProjectMutation", HandlerMarkers::roles([roles::CLIENT]))
        .handler(
            "ProjectMutation",
            "archive_project",
            HandlerMarkers::roles([roles::CLIENT, roles::UNIVERSITY]),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_and_overrides() {
        let table = marker_table();

        assert!(table.resolve("HealthController", "check").is_public);
        assert!(table.resolve("SystemQuery", "health").is_public);

        let me = table.resolve("MeController", "show");
        assert!(!me.is_public);
        assert!(me.required_roles.is_empty());

        assert_eq!(
            table.resolve("ProjectMutation", "create_project").required_roles,
            vec!["client"]
        );
        assert_eq!(
            table.resolve("ProjectMutation", "archive_project").required_roles,
            vec!["client", "university"]
        );
    }
}
