//! Isolation between concurrent calls
//!
//! Two calls interleaving suspension points on one thread (and on a
//! multi-threaded runtime) must never observe each other's metadata, for
//! either storage backend.

use request_context::{ContextMetadata, ContextPatch, ContextService, StorageAdapter, StorageKind};
use std::time::Duration;

const KINDS: [StorageKind; 2] = [StorageKind::TaskLocal, StorageKind::ExplicitScope];

async fn call(service: ContextService, name: &'static str, steps: usize) -> Vec<Option<String>> {
    let meta = ContextMetadata::new(format!("corr-{}", name));
    let svc = service.clone();

    service
        .run(meta, async move {
            let mut observed = Vec::new();
            svc.update_meta(ContextPatch::new().user_id(name));
            for _ in 0..steps {
                tokio::task::yield_now().await;
                observed.push(svc.get_user_id());
                svc.set("step", format!("{}-{}", name, observed.len()));
            }
            observed
        })
        .await
}

#[tokio::test]
async fn test_interleaved_calls_on_one_thread_are_isolated() {
    for kind in KINDS {
        let service = ContextService::new(StorageAdapter::from_kind(kind));

        let (a, b) = tokio::join!(
            call(service.clone(), "A", 25),
            call(service.clone(), "B", 25)
        );

        assert!(a.iter().all(|id| id.as_deref() == Some("A")), "{:?}: A saw {:?}", kind, a);
        assert!(b.iter().all(|id| id.as_deref() == Some("B")), "{:?}: B saw {:?}", kind, b);
        assert!(!service.has_context());
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_calls_spawned_across_workers_are_isolated() {
    for kind in KINDS {
        let service = ContextService::new(StorageAdapter::from_kind(kind));

        let handles: Vec<_> = ["A", "B", "C", "D", "E", "F", "G", "H"]
            .into_iter()
            .map(|name| tokio::spawn(call(service.clone(), name, 20)))
            .collect();

        for (handle, name) in handles.into_iter().zip(["A", "B", "C", "D", "E", "F", "G", "H"]) {
            let observed = handle.await.expect("call task");
            assert!(
                observed.iter().all(|id| id.as_deref() == Some(name)),
                "{:?}: {} saw {:?}",
                kind,
                name,
                observed
            );
        }
    }
}

#[tokio::test]
async fn test_local_set_calls_are_isolated() {
    // actix-web workers drive !Send handler futures on a LocalSet
    let local = tokio::task::LocalSet::new();

    local
        .run_until(async {
            for kind in KINDS {
                let service = ContextService::new(StorageAdapter::from_kind(kind));
                let a = tokio::task::spawn_local(call(service.clone(), "A", 10));
                let b = tokio::task::spawn_local(call(service.clone(), "B", 10));

                let a = a.await.expect("call A");
                let b = b.await.expect("call B");
                assert!(a.iter().all(|id| id.as_deref() == Some("A")));
                assert!(b.iter().all(|id| id.as_deref() == Some("B")));
            }
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn test_context_survives_timer_suspension() {
    for kind in KINDS {
        let service = ContextService::new(StorageAdapter::from_kind(kind));
        let svc = service.clone();

        let seen = service
            .run(ContextMetadata::new("corr-timer"), async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                svc.get_correlation_id()
            })
            .await;

        assert_eq!(seen, "corr-timer");
    }
}

#[tokio::test]
async fn test_correlation_id_always_non_empty_once_installed() {
    for kind in KINDS {
        let service = ContextService::new(StorageAdapter::from_kind(kind));
        let svc = service.clone();

        service
            .run(ContextMetadata::new(""), async move {
                assert!(!svc.get_correlation_id().is_empty());
                svc.set("correlationId", "");
                assert!(!svc.get_correlation_id().is_empty());
                svc.clear();
                assert!(!svc.get_correlation_id().is_empty());
            })
            .await;
    }
}
