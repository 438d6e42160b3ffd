//! Task-local context storage
//!
//! Backed by `tokio::task_local!`. The record follows the scoped future
//! through every suspension point, and two calls interleaved on the same
//! worker thread each see only their own slot.

use super::slot::{self, Slot};
use super::ContextStorage;
use crate::metadata::{ContextMetadata, ContextPatch};
use std::cell::RefCell;
use std::future::Future;
use std::sync::Arc;

tokio::task_local! {
    static CONTEXT: RefCell<Slot>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskLocalStorage;

impl TaskLocalStorage {
    /// Run `fut` with its own context slot
    pub async fn scope<F>(initial: Option<ContextMetadata>, fut: F) -> F::Output
    where
        F: Future,
    {
        CONTEXT
            .scope(RefCell::new(initial.map(Arc::new)), fut)
            .await
    }

    /// Whether the caller is running inside a scope at all
    pub fn in_scope() -> bool {
        CONTEXT.try_with(|_| ()).is_ok()
    }
}

impl ContextStorage for TaskLocalStorage {
    fn set(&self, meta: ContextMetadata) {
        if CONTEXT
            .try_with(|cell| slot::write(cell, Some(Arc::new(meta))))
            .is_err()
        {
            tracing::debug!("set called outside a task-local context scope, ignoring");
        }
    }

    fn get(&self) -> Option<Arc<ContextMetadata>> {
        CONTEXT.try_with(slot::read).ok().flatten()
    }

    fn update(&self, patch: &ContextPatch) {
        // outside a scope there is nothing to merge into
        let _ = CONTEXT.try_with(|cell| slot::merge(cell, patch));
    }

    fn clear(&self) {
        let _ = CONTEXT.try_with(|cell| slot::write(cell, None));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_outside_scope_is_empty_and_inert() {
        let storage = TaskLocalStorage;
        assert!(!TaskLocalStorage::in_scope());

        storage.set(ContextMetadata::new("ignored"));
        assert!(storage.get().is_none());
        assert!(!storage.has());
    }

    #[tokio::test]
    async fn test_set_and_get_within_scope() {
        let storage = TaskLocalStorage;

        TaskLocalStorage::scope(None, async {
            assert!(TaskLocalStorage::in_scope());
            assert!(!storage.has());

            storage.set(ContextMetadata::new("corr-1"));
            tokio::task::yield_now().await;

            let meta = storage.get().expect("context should be set");
            assert_eq!(meta.correlation_id, "corr-1");
        })
        .await;

        assert!(storage.get().is_none());
    }

    #[tokio::test]
    async fn test_update_without_context_is_noop() {
        let storage = TaskLocalStorage;

        TaskLocalStorage::scope(None, async {
            storage.update(&ContextPatch::new().user_id("u1"));
            assert!(!storage.has());
        })
        .await;
    }

    #[tokio::test]
    async fn test_update_replaces_snapshot() {
        let storage = TaskLocalStorage;

        TaskLocalStorage::scope(Some(ContextMetadata::new("corr-1")), async {
            let before = storage.get().expect("context");
            storage.update(&ContextPatch::new().user_id("u1"));
            let after = storage.get().expect("context");

            assert_eq!(before.user_id, None);
            assert_eq!(after.user_id.as_deref(), Some("u1"));
            assert!(!Arc::ptr_eq(&before, &after));
        })
        .await;
    }

    #[tokio::test]
    async fn test_clear_keeps_scope_open() {
        let storage = TaskLocalStorage;

        TaskLocalStorage::scope(Some(ContextMetadata::new("corr-1")), async {
            storage.clear();
            assert!(!storage.has());

            storage.set(ContextMetadata::new("corr-2"));
            assert_eq!(storage.get().map(|m| m.correlation_id.clone()).as_deref(), Some("corr-2"));
        })
        .await;
    }
}
