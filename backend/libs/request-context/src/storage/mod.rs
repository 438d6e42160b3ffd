//! Where the current call's metadata lives
//!
//! Two backends implement [`ContextStorage`]:
//! - [`TaskLocalStorage`]: `tokio::task_local!`, follows the call across
//!   every `.await` inside the scoped future.
//! - [`ScopedStorage`]: a thread-local container swapped in around each
//!   poll of the future passed to [`ScopedStorage::run`], plus
//!   [`ScopedStorage::run_sync`] for plain callbacks.
//!
//! Neither backend leaks into `tokio::spawn`ed tasks: work spawned off the
//! call sees no context unless it is scoped again explicitly.
//!
//! `get`/`has` never fail. `set`/`update`/`clear` outside a scope are
//! silent no-ops.

mod scoped;
mod task_local;

pub use scoped::{Scoped, ScopedStorage};
pub use task_local::TaskLocalStorage;

use crate::metadata::{ContextMetadata, ContextPatch};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;

/// Storage contract shared by both backends
pub trait ContextStorage: Send + Sync {
    /// Replace the current record. No-op outside a scope.
    fn set(&self, meta: ContextMetadata);

    /// Current snapshot, if a scope is active and holds one
    fn get(&self) -> Option<Arc<ContextMetadata>>;

    fn has(&self) -> bool {
        self.get().is_some()
    }

    /// Merge `patch` onto the current record
    ///
    /// Does nothing when there is no current record; it never creates one.
    fn update(&self, patch: &ContextPatch);

    /// Drop the current record while keeping the scope open
    fn clear(&self);
}

/// Storage backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageKind {
    #[default]
    TaskLocal,
    ExplicitScope,
}

impl FromStr for StorageKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "task_local" | "continuation_local" | "async_local" => Ok(Self::TaskLocal),
            "explicit_scope" | "scoped" | "cls" => Ok(Self::ExplicitScope),
            other => Err(format!("unknown context storage: {}", other)),
        }
    }
}

/// Backend chosen at wiring time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageAdapter {
    TaskLocal(TaskLocalStorage),
    Scoped(ScopedStorage),
}

impl StorageAdapter {
    pub fn from_kind(kind: StorageKind) -> Self {
        match kind {
            StorageKind::TaskLocal => Self::TaskLocal(TaskLocalStorage),
            StorageKind::ExplicitScope => Self::Scoped(ScopedStorage),
        }
    }

    pub fn kind(&self) -> StorageKind {
        match self {
            Self::TaskLocal(_) => StorageKind::TaskLocal,
            Self::Scoped(_) => StorageKind::ExplicitScope,
        }
    }

    /// Run `fut` inside a fresh scope holding `initial`
    pub async fn scope<F>(&self, initial: Option<ContextMetadata>, fut: F) -> F::Output
    where
        F: Future,
    {
        match self {
            Self::TaskLocal(_) => TaskLocalStorage::scope(initial, fut).await,
            Self::Scoped(_) => ScopedStorage::run(initial, fut).await,
        }
    }

    fn backend(&self) -> &dyn ContextStorage {
        match self {
            Self::TaskLocal(storage) => storage,
            Self::Scoped(storage) => storage,
        }
    }
}

impl Default for StorageAdapter {
    fn default() -> Self {
        Self::from_kind(StorageKind::default())
    }
}

impl ContextStorage for StorageAdapter {
    fn set(&self, meta: ContextMetadata) {
        self.backend().set(meta);
    }

    fn get(&self) -> Option<Arc<ContextMetadata>> {
        self.backend().get()
    }

    fn has(&self) -> bool {
        self.backend().has()
    }

    fn update(&self, patch: &ContextPatch) {
        self.backend().update(patch);
    }

    fn clear(&self) {
        self.backend().clear();
    }
}

/// Shared slot logic: both backends keep `Option<Arc<ContextMetadata>>`
/// inside a `RefCell` and must never panic on re-entrant access.
pub(crate) mod slot {
    use super::{ContextMetadata, ContextPatch};
    use std::cell::RefCell;
    use std::sync::Arc;

    pub(crate) type Slot = Option<Arc<ContextMetadata>>;

    pub(crate) fn read(cell: &RefCell<Slot>) -> Slot {
        cell.try_borrow().ok().and_then(|slot| slot.clone())
    }

    pub(crate) fn write(cell: &RefCell<Slot>, value: Slot) {
        match cell.try_borrow_mut() {
            Ok(mut slot) => *slot = value,
            Err(_) => tracing::debug!("context slot busy, write skipped"),
        }
    }

    pub(crate) fn merge(cell: &RefCell<Slot>, patch: &ContextPatch) {
        let Ok(mut slot) = cell.try_borrow_mut() else {
            tracing::debug!("context slot busy, update skipped");
            return;
        };
        if let Some(current) = slot.as_ref() {
            *slot = Some(Arc::new(current.merged(patch)));
        }
    }
}
