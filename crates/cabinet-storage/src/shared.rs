//! Storage shared by several handles, with a change bus.

use crate::{MemoryStorage, StorageBackend, StorageResult, TokenStore};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tokio::sync::broadcast;
use uuid::Uuid;

const EVENT_BUS_CAPACITY: usize = 64;

/// Identifies one handle (one "tab") on a [`SharedStorage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TabId(Uuid);

impl TabId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TabId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Notification that a key changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEvent {
    /// Key that changed.
    pub key: String,
    /// Handle that performed the change.
    pub origin: TabId,
    /// Whether the key holds a value after the change.
    pub present: bool,
}

struct SharedInner {
    backend: Box<dyn StorageBackend>,
    events: broadcast::Sender<StorageEvent>,
    /// Serializes compound operations (compare-and-clear) across handles.
    mutation_lock: Mutex<()>,
}

/// One storage backend shared by every handle opened on it.
///
/// Cheap to clone; clones refer to the same backend and event bus.
#[derive(Clone)]
pub struct SharedStorage {
    inner: Arc<SharedInner>,
}

impl SharedStorage {
    pub fn new(backend: impl StorageBackend + 'static) -> Self {
        let (events, _) = broadcast::channel(EVENT_BUS_CAPACITY);
        Self {
            inner: Arc::new(SharedInner {
                backend: Box::new(backend),
                events,
                mutation_lock: Mutex::new(()),
            }),
        }
    }

    /// Shared storage over a fresh [`MemoryStorage`].
    pub fn in_memory() -> Self {
        Self::new(MemoryStorage::new())
    }

    /// Open a new handle on the entry stored under `key`.
    pub fn open(&self, key: impl Into<String>) -> TokenStore {
        TokenStore::new(self.clone(), key)
    }

    /// Subscribe to every change on this storage, all keys and origins.
    pub fn subscribe(&self) -> broadcast::Receiver<StorageEvent> {
        self.inner.events.subscribe()
    }

    pub(crate) fn get(&self, key: &str) -> StorageResult<Option<String>> {
        self.inner.backend.get(key)
    }

    pub(crate) fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let _guard = self.inner.mutation_lock.lock();
        self.inner.backend.set(key, value)
    }

    pub(crate) fn delete(&self, key: &str) -> StorageResult<bool> {
        let _guard = self.inner.mutation_lock.lock();
        self.inner.backend.delete(key)
    }

    /// Delete `key` only while it still holds `expected`.
    pub(crate) fn delete_if(&self, key: &str, expected: &str) -> StorageResult<bool> {
        let _guard = self.inner.mutation_lock.lock();
        match self.inner.backend.get(key)? {
            Some(current) if current == expected => self.inner.backend.delete(key),
            _ => Ok(false),
        }
    }

    pub(crate) fn publish(&self, event: StorageEvent) {
        // No receivers is fine: nobody is listening yet.
        let _ = self.inner.events.send(event);
    }
}
