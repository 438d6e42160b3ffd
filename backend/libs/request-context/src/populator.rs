//! Context populator
//!
//! Derives the initial [`ContextMetadata`] for a call from its
//! [`RawRequest`]. Population is best-effort: a failing step is logged and
//! the call continues with whatever was assembled, which always includes
//! the correlation id and timestamp.

use crate::config::{ContextConfig, IdentitySource};
use crate::error::ContextError;
use crate::metadata::{generate_correlation_id, ContextMetadata};
use crate::raw_request::{RawRequest, USER_AGENT_HEADER};
use crate::service::ContextService;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Clone, Default)]
pub struct ContextPopulator {
    config: Arc<ContextConfig>,
}

impl ContextPopulator {
    pub fn new(config: ContextConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    /// Honor the inbound correlation header when present, else generate
    pub fn correlation_id(&self, request: &RawRequest) -> String {
        request
            .non_empty_header(&self.config.header_names.correlation_id)
            .map(str::to_string)
            .unwrap_or_else(generate_correlation_id)
    }

    /// Build the initial record for `request`
    pub fn populate(&self, request: &RawRequest) -> ContextMetadata {
        let mut meta = ContextMetadata::new(self.correlation_id(request));

        let steps: [(&str, fn(&Self, &RawRequest, &mut ContextMetadata) -> Result<(), ContextError>); 3] = [
            ("identity", Self::apply_identity),
            ("request_details", Self::apply_request_details),
            ("custom_headers", Self::apply_custom_headers),
        ];

        for (step, apply) in steps {
            if let Err(e) = apply(self, request, &mut meta) {
                warn!(
                    correlation_id = %meta.correlation_id,
                    step = step,
                    error = %e,
                    "context population step failed, continuing with partial metadata"
                );
            }
        }

        debug!(
            correlation_id = %meta.correlation_id,
            transport = %request.transport(),
            identity_source = ?self.config.identity_source,
            "request context populated"
        );

        meta
    }

    /// Build and install the record through `service`
    pub fn install(&self, service: &ContextService, request: &RawRequest) -> ContextMetadata {
        let meta = self.populate(request);
        service.set_meta(meta.clone());
        meta
    }

    fn apply_identity(
        &self,
        request: &RawRequest,
        meta: &mut ContextMetadata,
    ) -> Result<(), ContextError> {
        // token mode waits for the auth guard
        if self.config.identity_source != IdentitySource::Header {
            return Ok(());
        }

        let names = &self.config.header_names;
        meta.user_id = request.non_empty_header(&names.user_id).map(str::to_string);
        meta.org_id = request.non_empty_header(&names.org_id).map(str::to_string);
        Ok(())
    }

    fn apply_request_details(
        &self,
        request: &RawRequest,
        meta: &mut ContextMetadata,
    ) -> Result<(), ContextError> {
        if self.config.include_request_details {
            meta.path = Some(request.path().to_string());
            meta.method = Some(request.method().to_string());
        }
        if self.config.include_ip {
            meta.ip = Some(request.client_ip());
        }
        if self.config.include_user_agent {
            meta.user_agent = request
                .non_empty_header(USER_AGENT_HEADER)
                .map(str::to_string);
        }
        Ok(())
    }

    fn apply_custom_headers(
        &self,
        request: &RawRequest,
        meta: &mut ContextMetadata,
    ) -> Result<(), ContextError> {
        let mut dropped = Vec::new();
        for name in &self.config.custom_headers {
            let Some(value) = request.header(name) else {
                continue;
            };
            if !meta.insert_extension(name.clone(), value.to_string()) {
                dropped.push(name.as_str());
            }
        }

        if dropped.is_empty() {
            Ok(())
        } else {
            Err(ContextError::ContextPopulationFailure(format!(
                "extension map full, dropped headers: {}",
                dropped.join(", ")
            )))
        }
    }
}
