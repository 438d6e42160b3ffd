//! Authentication guard
//!
//! Per call:
//! 1. Public handler: allow, nothing else runs
//! 2. Extract a `Bearer <token>`; anything else counts as no token
//! 3. Verify with the token issuer
//! 4. Resolve the internal principal from the directory
//! 5. Reject inactive principals as Forbidden
//! 6. Attach the principal to the call and merge it into the context
//!
//! Every rejection emits a best-effort notification.

use crate::collaborators::{
    emit_best_effort, AuthFailureEvent, FailureKind, NotificationSink, PrincipalDirectory,
    TokenError, TokenVerifier,
};
use crate::error::GuardError;
use crate::markers::EffectiveMarkers;
use request_context::{AuthenticatedPrincipal, ContextService, RawRequest};
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Clone)]
pub struct AuthGuard {
    verifier: Arc<dyn TokenVerifier>,
    directory: Arc<dyn PrincipalDirectory>,
    notifier: Arc<dyn NotificationSink>,
    context: ContextService,
}

impl AuthGuard {
    pub fn new(
        verifier: Arc<dyn TokenVerifier>,
        directory: Arc<dyn PrincipalDirectory>,
        notifier: Arc<dyn NotificationSink>,
        context: ContextService,
    ) -> Self {
        Self {
            verifier,
            directory,
            notifier,
            context,
        }
    }

    pub async fn can_activate(
        &self,
        markers: &EffectiveMarkers,
        request: &RawRequest,
    ) -> Result<(), GuardError> {
        if markers.is_public {
            debug!(path = %request.path(), "public handler, skipping authentication");
            return Ok(());
        }

        match self.authenticate(request).await {
            Ok(principal) => {
                self.context.update_meta(principal.context_patch());
                debug!(
                    correlation_id = %self.context.get_correlation_id(),
                    user_id = %principal.id,
                    role = %principal.role,
                    "principal authenticated"
                );
                request.attach_principal(principal);
                Ok(())
            }
            Err(rejection) => {
                warn!(
                    correlation_id = %self.context.get_correlation_id(),
                    path = %request.path(),
                    reason = %rejection.reason(),
                    "authentication rejected"
                );
                self.notify(request, &rejection).await;
                Err(rejection)
            }
        }
    }

    async fn authenticate(&self, request: &RawRequest) -> Result<AuthenticatedPrincipal, GuardError> {
        let token = request
            .bearer_token()
            .ok_or_else(|| GuardError::unauthenticated("missing or malformed bearer token"))?;

        let identity = self.verifier.verify_token(token).await.map_err(|e| match e {
            TokenError::Expired => GuardError::unauthenticated("token expired"),
            TokenError::Invalid(detail) => {
                GuardError::unauthenticated(format!("token rejected by issuer: {}", detail))
            }
        })?;

        let principal = self
            .directory
            .find_by_external_id(&identity.id)
            .await
            .map_err(|e| GuardError::unauthenticated(format!("principal lookup failed: {}", e)))?
            .ok_or_else(|| {
                GuardError::unauthenticated(format!(
                    "no principal for external id {}",
                    identity.id
                ))
            })?;

        if !principal.is_active {
            return Err(GuardError::forbidden(
                format!("principal {} is inactive", principal.id),
                Vec::new(),
                Some(principal.role.clone()),
            ));
        }

        Ok(principal)
    }

    async fn notify(&self, request: &RawRequest, rejection: &GuardError) {
        let kind = match rejection {
            GuardError::Forbidden { .. } => FailureKind::Forbidden,
            _ => FailureKind::Unauthenticated,
        };
        let mut event = AuthFailureEvent::new(
            kind,
            rejection.reason(),
            self.context.get_correlation_id(),
            request.transport(),
        );
        event.method = request.method().to_string();
        event.path = request.path().to_string();
        if let GuardError::Forbidden { user_role, .. } = rejection {
            event.user_role = user_role.clone();
        }

        emit_best_effort(self.notifier.as_ref(), event).await;
    }
}
