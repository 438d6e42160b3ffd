//! Explicit-scope context storage
//!
//! The container belongs to the [`Scoped`] future returned by
//! [`ScopedStorage::run`]. Around every poll it is moved into a
//! thread-local slot and moved back out afterwards, so interleaved calls on
//! one thread never observe each other's record.
//!
//! Propagation is only as wide as the wrapped future: anything awaited from
//! inside `run` sees the record, anything handed to another task (spawn,
//! channel, detached timer) does not. Embedding layers must call `run`
//! around exactly one call.

use super::slot::{self, Slot};
use super::ContextStorage;
use crate::metadata::{ContextMetadata, ContextPatch};
use pin_project::pin_project;
use std::cell::RefCell;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

thread_local! {
    /// `None` = no active scope; `Some(slot)` = inside a scope
    static ACTIVE: RefCell<Option<RefCell<Slot>>> = const { RefCell::new(None) };
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScopedStorage;

impl ScopedStorage {
    /// Wrap `fut` so that it runs with its own container
    pub fn run<F>(initial: Option<ContextMetadata>, fut: F) -> Scoped<F>
    where
        F: Future,
    {
        Scoped {
            inner: fut,
            container: Some(initial.map(Arc::new)),
        }
    }

    /// Run a synchronous callback with its own container
    pub fn run_sync<R>(initial: Option<ContextMetadata>, f: impl FnOnce() -> R) -> R {
        let mut container = Some(initial.map(Arc::new));
        let _restore = Activation::enter(&mut container);
        f()
    }

    pub fn in_scope() -> bool {
        ACTIVE
            .try_with(|active| active.try_borrow().map(|a| a.is_some()).unwrap_or(false))
            .unwrap_or(false)
    }

    fn with_active<R>(f: impl FnOnce(&RefCell<Slot>) -> R) -> Option<R> {
        ACTIVE
            .try_with(|active| {
                let active = active.try_borrow().ok()?;
                active.as_ref().map(f)
            })
            .ok()
            .flatten()
    }
}

impl ContextStorage for ScopedStorage {
    fn set(&self, meta: ContextMetadata) {
        if Self::with_active(|cell| slot::write(cell, Some(Arc::new(meta)))).is_none() {
            tracing::debug!("set called outside an explicit context scope, ignoring");
        }
    }

    fn get(&self) -> Option<Arc<ContextMetadata>> {
        Self::with_active(slot::read).flatten()
    }

    fn update(&self, patch: &ContextPatch) {
        let _ = Self::with_active(|cell| slot::merge(cell, patch));
    }

    fn clear(&self) {
        let _ = Self::with_active(|cell| slot::write(cell, None));
    }
}

/// Moves a container into the thread-local slot and back out on drop
struct Activation<'a> {
    container: &'a mut Option<Slot>,
    previous: Option<RefCell<Slot>>,
}

impl<'a> Activation<'a> {
    fn enter(container: &'a mut Option<Slot>) -> Self {
        let own = container.take().map(RefCell::new);
        let previous = ACTIVE
            .try_with(|active| match active.try_borrow_mut() {
                Ok(mut active) => std::mem::replace(&mut *active, own),
                Err(_) => None,
            })
            .unwrap_or(None);

        Self { container, previous }
    }
}

impl Drop for Activation<'_> {
    fn drop(&mut self) {
        let previous = self.previous.take();
        let own = ACTIVE
            .try_with(|active| match active.try_borrow_mut() {
                Ok(mut active) => std::mem::replace(&mut *active, previous),
                Err(_) => None,
            })
            .unwrap_or(None);

        *self.container = Some(own.map(RefCell::into_inner).unwrap_or(None));
    }
}

/// Future returned by [`ScopedStorage::run`]
#[pin_project]
pub struct Scoped<F> {
    #[pin]
    inner: F,
    container: Option<Slot>,
}

impl<F: Future> Future for Scoped<F> {
    type Output = F::Output;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();
        let _restore = Activation::enter(this.container);
        this.inner.poll(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_sync_scopes_container() {
        let storage = ScopedStorage;
        assert!(!ScopedStorage::in_scope());

        let seen = ScopedStorage::run_sync(Some(ContextMetadata::new("corr-sync")), || {
            assert!(ScopedStorage::in_scope());
            storage.get().map(|m| m.correlation_id.clone())
        });

        assert_eq!(seen.as_deref(), Some("corr-sync"));
        assert!(!ScopedStorage::in_scope());
        assert!(storage.get().is_none());
    }

    #[test]
    fn test_set_outside_scope_is_noop() {
        let storage = ScopedStorage;
        storage.set(ContextMetadata::new("ignored"));
        storage.update(&ContextPatch::new().user_id("u1"));
        storage.clear();
        assert!(!storage.has());
    }

    #[test]
    fn test_nested_run_sync_restores_outer() {
        let storage = ScopedStorage;

        ScopedStorage::run_sync(Some(ContextMetadata::new("outer")), || {
            ScopedStorage::run_sync(Some(ContextMetadata::new("inner")), || {
                assert_eq!(storage.get().map(|m| m.correlation_id.clone()).as_deref(), Some("inner"));
            });
            assert_eq!(storage.get().map(|m| m.correlation_id.clone()).as_deref(), Some("outer"));
        });
    }

    #[tokio::test]
    async fn test_writes_survive_across_polls() {
        let storage = ScopedStorage;

        ScopedStorage::run(None, async {
            storage.set(ContextMetadata::new("corr-1"));
            tokio::task::yield_now().await;
            storage.update(&ContextPatch::new().user_id("u1"));
            tokio::task::yield_now().await;

            let meta = storage.get().expect("context");
            assert_eq!(meta.correlation_id, "corr-1");
            assert_eq!(meta.user_id.as_deref(), Some("u1"));
        })
        .await;
    }

    #[tokio::test]
    async fn test_update_without_record_is_noop() {
        let storage = ScopedStorage;

        ScopedStorage::run(None, async {
            storage.update(&ContextPatch::new().user_id("u1"));
            assert!(!storage.has());
        })
        .await;
    }

    #[tokio::test]
    async fn test_spawned_task_does_not_inherit_scope() {
        let storage = ScopedStorage;

        ScopedStorage::run(Some(ContextMetadata::new("corr-parent")), async {
            let spawned = tokio::spawn(async move { ScopedStorage.get().is_some() })
                .await
                .expect("spawned task");
            assert!(!spawned);
            assert!(storage.has());
        })
        .await;
    }
}
