//! Guard pipeline shared by every transport

use crate::auth_guard::AuthGuard;
use crate::collaborators::{LogNotificationSink, NotificationSink, PrincipalDirectory, TokenVerifier};
use crate::error::GuardError;
use crate::markers::EffectiveMarkers;
use crate::role_guard::RoleGuard;
use request_context::{ContextService, RawRequest};
use std::sync::Arc;

/// AuthGuard followed by RoleGuard, in strict sequence
#[derive(Clone)]
pub struct GuardPipeline {
    auth: AuthGuard,
    roles: RoleGuard,
    context: ContextService,
}

impl GuardPipeline {
    pub fn builder(
        verifier: Arc<dyn TokenVerifier>,
        directory: Arc<dyn PrincipalDirectory>,
    ) -> GuardPipelineBuilder {
        GuardPipelineBuilder {
            verifier,
            directory,
            notifier: Arc::new(LogNotificationSink),
            context: ContextService::default(),
        }
    }

    pub fn context(&self) -> &ContextService {
        &self.context
    }

    /// Decide whether `request` may reach its handler
    ///
    /// Public handlers bypass both guards. Otherwise the auth guard must
    /// succeed before the role guard is consulted.
    pub async fn check(
        &self,
        markers: &EffectiveMarkers,
        request: &RawRequest,
    ) -> Result<(), GuardError> {
        if markers.is_public {
            return Ok(());
        }
        self.auth.can_activate(markers, request).await?;
        self.roles.can_activate(markers, request).await
    }
}

pub struct GuardPipelineBuilder {
    verifier: Arc<dyn TokenVerifier>,
    directory: Arc<dyn PrincipalDirectory>,
    notifier: Arc<dyn NotificationSink>,
    context: ContextService,
}

impl GuardPipelineBuilder {
    pub fn notifier(mut self, notifier: Arc<dyn NotificationSink>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Context service the guards merge identity into; must share the
    /// storage backend used by the populator
    pub fn context(mut self, context: ContextService) -> Self {
        self.context = context;
        self
    }

    pub fn build(self) -> GuardPipeline {
        GuardPipeline {
            auth: AuthGuard::new(
                self.verifier,
                self.directory,
                Arc::clone(&self.notifier),
                self.context.clone(),
            ),
            roles: RoleGuard::new(self.notifier, self.context.clone()),
            context: self.context,
        }
    }
}
