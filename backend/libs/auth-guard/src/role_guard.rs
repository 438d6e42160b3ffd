//! Role guard
//!
//! Runs after [`AuthGuard`](crate::AuthGuard). Exact string membership of the
//! attached principal's role in the handler's allow-list; no hierarchy.

use crate::collaborators::{emit_best_effort, AuthFailureEvent, FailureKind, NotificationSink};
use crate::error::GuardError;
use crate::markers::EffectiveMarkers;
use request_context::{ContextService, RawRequest};
use std::sync::Arc;
use tracing::{error, warn};

#[derive(Clone)]
pub struct RoleGuard {
    notifier: Arc<dyn NotificationSink>,
    context: ContextService,
}

impl RoleGuard {
    pub fn new(notifier: Arc<dyn NotificationSink>, context: ContextService) -> Self {
        Self { notifier, context }
    }

    pub async fn can_activate(
        &self,
        markers: &EffectiveMarkers,
        request: &RawRequest,
    ) -> Result<(), GuardError> {
        if markers.required_roles.is_empty() {
            return Ok(());
        }

        let Some(principal) = request.principal() else {
            // the auth guard must have run for any non-public handler
            error!(
                correlation_id = %self.context.get_correlation_id(),
                path = %request.path(),
                "role check reached without an authenticated principal"
            );
            let rejection =
                GuardError::unauthenticated("role check without an authenticated principal");
            self.notify(request, &rejection, None).await;
            return Err(rejection);
        };

        if markers.required_roles.iter().any(|role| role == &principal.role) {
            return Ok(());
        }

        warn!(
            correlation_id = %self.context.get_correlation_id(),
            user_id = %principal.id,
            user_role = %principal.role,
            required_roles = ?markers.required_roles,
            "role not allowed"
        );
        let rejection = GuardError::forbidden(
            format!("role {} not in allow-list", principal.role),
            markers.required_roles.clone(),
            Some(principal.role.clone()),
        );
        self.notify(request, &rejection, Some(principal.id)).await;
        Err(rejection)
    }

    async fn notify(&self, request: &RawRequest, rejection: &GuardError, user_id: Option<String>) {
        let mut event = match rejection {
            GuardError::Forbidden {
                required_roles,
                user_role,
                ..
            } => {
                let mut event = AuthFailureEvent::new(
                    FailureKind::Forbidden,
                    rejection.reason(),
                    self.context.get_correlation_id(),
                    request.transport(),
                );
                event.required_roles = required_roles.clone();
                event.user_role = user_role.clone();
                event
            }
            _ => AuthFailureEvent::new(
                FailureKind::Unauthenticated,
                rejection.reason(),
                self.context.get_correlation_id(),
                request.transport(),
            ),
        };
        event.method = request.method().to_string();
        event.path = request.path().to_string();
        event.user_id = user_id;

        emit_best_effort(self.notifier.as_ref(), event).await;
    }
}
