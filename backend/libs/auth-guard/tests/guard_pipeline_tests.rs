//! Guard pipeline behavior against in-memory collaborators
//!
//! Runs every call the way a transport would: populate the context, then
//! ask the pipeline, inside one context scope.

use auth_guard::test_utils::{InMemoryDirectory, RecordingSink, StaticTokenVerifier};
use auth_guard::{
    EffectiveMarkers, FailureKind, GuardError, GuardPipeline, HandlerMarkers, MarkerTable,
    RoleGuard,
};
use request_context::{
    roles, AuthenticatedPrincipal, ContextConfig, ContextMetadata, ContextPopulator,
    ContextService, RawRequest, StorageAdapter, StorageKind, Transport,
};
use std::sync::Arc;

struct Harness {
    pipeline: GuardPipeline,
    context: ContextService,
    populator: ContextPopulator,
    sink: RecordingSink,
    verifier: Arc<StaticTokenVerifier>,
}

fn harness_with(kind: StorageKind, directory: InMemoryDirectory) -> Harness {
    let context = ContextService::new(StorageAdapter::from_kind(kind));
    let sink = RecordingSink::new();
    let verifier = Arc::new(
        StaticTokenVerifier::new()
            .valid("tok1", "ext-1")
            .valid("tok-inactive", "ext-2")
            .valid("tok-orphan", "ext-404")
            .valid("tok-client", "ext-3")
            .expired("tok-expired"),
    );

    let pipeline = GuardPipeline::builder(verifier.clone(), Arc::new(directory))
        .notifier(Arc::new(sink.clone()))
        .context(context.clone())
        .build();

    Harness {
        pipeline,
        context,
        populator: ContextPopulator::new(ContextConfig::default().with_storage(kind)),
        sink,
        verifier,
    }
}

fn directory() -> InMemoryDirectory {
    InMemoryDirectory::new()
        .with(
            AuthenticatedPrincipal::new("u1", "ext-1", "sup@uni.edu", roles::SUPERVISOR)
                .with_university("uni-1"),
        )
        .with(AuthenticatedPrincipal::new("u2", "ext-2", "gone@corp.io", roles::CLIENT).inactive())
        .with(
            AuthenticatedPrincipal::new("u3", "ext-3", "client@corp.io", roles::CLIENT)
                .with_organization("org-3"),
        )
}

fn harness(kind: StorageKind) -> Harness {
    harness_with(kind, directory())
}

const KINDS: [StorageKind; 2] = [StorageKind::TaskLocal, StorageKind::ExplicitScope];

fn request() -> RawRequest {
    RawRequest::new(Transport::Http, "GET", "/api/v1/projects")
}

impl Harness {
    /// Run the pipeline as one call; returns the result plus what the
    /// handler would have seen in the context
    async fn call(
        &self,
        markers: &EffectiveMarkers,
        request: &RawRequest,
    ) -> (Result<(), GuardError>, Option<String>, String) {
        let meta = self.populator.populate(request);
        self.context
            .run(meta, async {
                let result = self.pipeline.check(markers, request).await;
                (
                    result,
                    self.context.get_user_id(),
                    self.context.get_correlation_id(),
                )
            })
            .await
    }
}

#[tokio::test]
async fn test_public_handler_needs_no_token() {
    for kind in KINDS {
        let h = harness(kind);
        let req = request().with_header("x-correlation-id", "corr-123");

        let (result, user_id, correlation_id) = h.call(&EffectiveMarkers::public(), &req).await;

        assert_eq!(result, Ok(()));
        assert_eq!(user_id, None);
        assert_eq!(correlation_id, "corr-123");
        assert!(h.verifier.calls().is_empty());
        assert!(h.sink.events().is_empty());
    }
}

#[tokio::test]
async fn test_supervisor_allowed_for_supervisor_or_university() {
    for kind in KINDS {
        let h = harness(kind);
        let req = request().with_header("Authorization", "Bearer tok1");
        let markers = EffectiveMarkers::roles([roles::SUPERVISOR, roles::UNIVERSITY]);

        let (result, user_id, _) = h.call(&markers, &req).await;

        assert_eq!(result, Ok(()));
        assert_eq!(user_id.as_deref(), Some("u1"));
        let principal = req.principal().expect("principal attached");
        assert_eq!(principal.role, "supervisor");
        assert!(h.sink.events().is_empty());
    }
}

#[tokio::test]
async fn test_supervisor_forbidden_for_client_handler() {
    for kind in KINDS {
        let h = harness(kind);
        let req = request().with_header("Authorization", "Bearer tok1");

        let (result, _, _) = h.call(&EffectiveMarkers::roles([roles::CLIENT]), &req).await;

        let err = result.expect_err("should be forbidden");
        let payload = err.payload();
        assert_eq!(payload.code, "FORBIDDEN");
        assert_eq!(payload.required_roles, Some(vec!["client".to_string()]));
        assert_eq!(payload.user_role.as_deref(), Some("supervisor"));

        let events = h.sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, FailureKind::Forbidden);
        assert_eq!(events[0].user_id.as_deref(), Some("u1"));
    }
}

#[tokio::test]
async fn test_student_role_rejected_client_role_allowed() {
    let directory = InMemoryDirectory::new()
        .with(AuthenticatedPrincipal::new("s1", "ext-s", "s@uni.edu", roles::STUDENT))
        .with(AuthenticatedPrincipal::new("c1", "ext-c", "c@corp.io", roles::CLIENT));
    let context = ContextService::default();
    let pipeline = GuardPipeline::builder(
        Arc::new(
            StaticTokenVerifier::new()
                .valid("student-token", "ext-s")
                .valid("client-token", "ext-c"),
        ),
        Arc::new(directory),
    )
    .context(context.clone())
    .build();
    let markers = EffectiveMarkers::roles([roles::CLIENT]);

    let student = request().with_header("Authorization", "Bearer student-token");
    let result = context.scope(pipeline.check(&markers, &student)).await;
    assert!(matches!(result, Err(GuardError::Forbidden { .. })));

    let client = request().with_header("Authorization", "Bearer client-token");
    let result = context.scope(pipeline.check(&markers, &client)).await;
    assert_eq!(result, Ok(()));
}

#[tokio::test]
async fn test_expired_token_is_unauthenticated_and_attaches_nothing() {
    for kind in KINDS {
        let h = harness(kind);
        let req = request().with_header("Authorization", "Bearer tok-expired");

        let (result, user_id, _) = h.call(&EffectiveMarkers::authenticated(), &req).await;

        let err = result.expect_err("expired token");
        assert!(matches!(err, GuardError::Unauthenticated { .. }));
        assert_eq!(err.to_string(), "Invalid or expired credential");
        assert_eq!(err.reason(), "token expired");
        assert!(!req.has_principal());
        assert_eq!(user_id, None);

        let events = h.sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, FailureKind::Unauthenticated);
        assert_eq!(events[0].path, "/api/v1/projects");
    }
}

#[tokio::test]
async fn test_verified_token_without_principal_is_unauthenticated() {
    let h = harness(StorageKind::TaskLocal);
    let req = request().with_header("Authorization", "Bearer tok-orphan");

    let (result, _, _) = h.call(&EffectiveMarkers::authenticated(), &req).await;

    assert!(matches!(result, Err(GuardError::Unauthenticated { .. })));
    assert!(!req.has_principal());
}

#[tokio::test]
async fn test_inactive_principal_is_forbidden() {
    let h = harness(StorageKind::TaskLocal);
    let req = request().with_header("Authorization", "Bearer tok-inactive");

    let (result, user_id, _) = h.call(&EffectiveMarkers::authenticated(), &req).await;

    let err = result.expect_err("inactive principal");
    assert!(matches!(err, GuardError::Forbidden { .. }));
    assert_eq!(err.status_code(), 403);
    assert!(!req.has_principal());
    assert_eq!(user_id, None);
}

#[tokio::test]
async fn test_basic_scheme_is_treated_as_no_token() {
    for kind in KINDS {
        let h = harness(kind);
        let req = request().with_header("Authorization", "Basic abc");

        let (result, _, _) = h.call(&EffectiveMarkers::authenticated(), &req).await;

        assert!(matches!(result, Err(GuardError::Unauthenticated { .. })));
        assert!(h.verifier.calls().is_empty());
    }
}

#[tokio::test]
async fn test_unknown_token_is_unauthenticated() {
    let h = harness(StorageKind::ExplicitScope);
    let req = request().with_header("Authorization", "Bearer forged");

    let (result, _, _) = h.call(&EffectiveMarkers::authenticated(), &req).await;
    assert!(matches!(result, Err(GuardError::Unauthenticated { .. })));
    assert_eq!(h.verifier.calls(), vec!["forged".to_string()]);
}

#[tokio::test]
async fn test_directory_outage_is_unauthenticated() {
    let h = harness_with(StorageKind::TaskLocal, InMemoryDirectory::unavailable());
    let req = request().with_header("Authorization", "Bearer tok1");

    let (result, _, _) = h.call(&EffectiveMarkers::authenticated(), &req).await;
    let err = result.expect_err("directory down");
    assert!(err.reason().contains("connection refused"));
}

#[tokio::test]
async fn test_principal_fields_merged_into_context() {
    for kind in KINDS {
        let h = harness(kind);
        let req = request()
            .with_header("Authorization", "Bearer tok-client")
            .with_header("x-correlation-id", "corr-merge");
        let meta = h.populator.populate(&req);

        h.context
            .run(meta, async {
                h.pipeline
                    .check(&EffectiveMarkers::authenticated(), &req)
                    .await
                    .expect("authenticated");

                let ctx = h.context.get_context();
                assert_eq!(ctx.correlation_id, "corr-merge");
                assert_eq!(ctx.user_id.as_deref(), Some("u3"));
                assert_eq!(ctx.email.as_deref(), Some("client@corp.io"));
                assert_eq!(ctx.role.as_deref(), Some("client"));
                assert_eq!(h.context.get_tenant_id().as_deref(), Some("org-3"));
                assert_eq!(ctx.path.as_deref(), Some("/api/v1/projects"));
            })
            .await;
    }
}

#[tokio::test]
async fn test_role_guard_without_principal_is_unauthenticated() {
    let sink = RecordingSink::new();
    let context = ContextService::default();
    let guard = RoleGuard::new(Arc::new(sink.clone()), context.clone());

    let result = context
        .run(
            ContextMetadata::new("corr-role"),
            guard.can_activate(&EffectiveMarkers::roles([roles::CLIENT]), &request()),
        )
        .await;

    assert!(matches!(result, Err(GuardError::Unauthenticated { .. })));
    let events = sink.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].correlation_id, "corr-role");

    // no roles declared: nothing to check
    let result = context
        .scope(guard.can_activate(&EffectiveMarkers::authenticated(), &request()))
        .await;
    assert_eq!(result, Ok(()));
}

#[tokio::test]
async fn test_public_class_bypasses_handler_roles() {
    // a roles-only handler inherits the class-level public flag
    let table = MarkerTable::new()
        .class("Feed", HandlerMarkers::public())
        .handler("Feed", "curated", HandlerMarkers::roles([roles::UNIVERSITY]));
    let h = harness(StorageKind::TaskLocal);

    let (result, _, _) = h.call(&table.resolve("Feed", "curated"), &request()).await;
    assert_eq!(result, Ok(()));
}

#[tokio::test]
async fn test_failing_sink_does_not_mask_rejection() {
    let sink = RecordingSink::failing();
    let context = ContextService::default();
    let pipeline = GuardPipeline::builder(
        Arc::new(StaticTokenVerifier::new()),
        Arc::new(InMemoryDirectory::new()),
    )
    .notifier(Arc::new(sink.clone()))
    .context(context.clone())
    .build();

    let result = context
        .scope(pipeline.check(&EffectiveMarkers::authenticated(), &request()))
        .await;

    assert!(matches!(result, Err(GuardError::Unauthenticated { .. })));
    assert_eq!(sink.events().len(), 1);
}

#[tokio::test]
async fn test_concurrent_calls_keep_their_own_principal() {
    for kind in KINDS {
        let h = harness(kind);
        let markers = EffectiveMarkers::authenticated();
        let req_a = request().with_header("Authorization", "Bearer tok1");
        let req_b = request().with_header("Authorization", "Bearer tok-client");

        let (a, b) = tokio::join!(h.call(&markers, &req_a), h.call(&markers, &req_b));

        assert_eq!(a.1.as_deref(), Some("u1"));
        assert_eq!(b.1.as_deref(), Some("u3"));
        assert_ne!(a.2, b.2);
    }
}
