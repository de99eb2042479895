//! Bearer-token adapter over [`SharedStorage`].

use crate::{SharedStorage, StorageError, StorageEvent, StorageResult, TabId};
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tracing::{debug, warn};

/// Where a token change came from, relative to the observing handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeSource {
    /// The observing handle made the change itself.
    Local,
    /// Another handle on the same storage made the change.
    CrossTab,
}

/// A change of the token entry as seen by one handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenChange {
    pub source: ChangeSource,
    /// Whether a token is stored after the change.
    pub present: bool,
}

/// Reads, writes and clears the single bearer token of one handle.
///
/// Every mutation is broadcast to all handles on the same storage, including
/// this one. There is no locking across handles: the last writer wins.
#[derive(Clone)]
pub struct TokenStore {
    storage: SharedStorage,
    key: Arc<str>,
    tab: TabId,
}

impl TokenStore {
    /// Open a handle with a fresh [`TabId`].
    pub fn new(storage: SharedStorage, key: impl Into<String>) -> Self {
        let key: String = key.into();
        Self {
            storage,
            key: Arc::from(key),
            tab: TabId::new(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn tab_id(&self) -> TabId {
        self.tab
    }

    /// The storage this handle is opened on.
    pub fn storage(&self) -> &SharedStorage {
        &self.storage
    }

    /// Current token. An unreadable backend counts as no token.
    pub fn read(&self) -> Option<String> {
        match self.storage.get(&self.key) {
            Ok(token) => token.filter(|t| !t.is_empty()),
            Err(e) => {
                warn!(key = %self.key, error = %e, "token storage unavailable, treating as absent");
                None
            }
        }
    }

    /// Persist `token`, then broadcast the change.
    pub fn write(&self, token: &str) -> StorageResult<()> {
        if token.trim().is_empty() {
            return Err(StorageError::EmptyValue(self.key.to_string()));
        }

        self.storage.set(&self.key, token)?;
        debug!(tab = %self.tab, token_len = token.len(), "token written");
        self.broadcast(true);
        Ok(())
    }

    /// Remove the token, then broadcast the change.
    pub fn clear(&self) -> StorageResult<()> {
        let removed = self.storage.delete(&self.key)?;
        debug!(tab = %self.tab, removed, "token cleared");
        self.broadcast(false);
        Ok(())
    }

    /// Remove the token only if it is still `expected`.
    ///
    /// Returns whether the token was removed; nothing is broadcast otherwise.
    pub fn clear_if(&self, expected: &str) -> StorageResult<bool> {
        let removed = self.storage.delete_if(&self.key, expected)?;
        if removed {
            debug!(tab = %self.tab, "token cleared");
            self.broadcast(false);
        } else {
            debug!(tab = %self.tab, "token changed since read, left in place");
        }
        Ok(removed)
    }

    /// Observe changes to this handle's key, from this handle or any other.
    pub fn subscribe(&self) -> TokenChanges {
        TokenChanges {
            rx: self.storage.subscribe(),
            key: self.key.clone(),
            tab: self.tab,
        }
    }

    fn broadcast(&self, present: bool) {
        self.storage.publish(StorageEvent {
            key: self.key.to_string(),
            origin: self.tab,
            present,
        });
    }
}

/// Stream of [`TokenChange`]s for one handle.
pub struct TokenChanges {
    rx: broadcast::Receiver<StorageEvent>,
    key: Arc<str>,
    tab: TabId,
}

impl TokenChanges {
    /// Wait for the next change. Returns `None` once the storage is gone.
    ///
    /// If this receiver fell behind, a single cross-tab change is reported in
    /// place of the dropped ones; its `present` flag is a guess, so consumers
    /// should re-read the store rather than trust it.
    pub async fn recv(&mut self) -> Option<TokenChange> {
        loop {
            match self.rx.recv().await {
                Ok(event) => {
                    if let Some(change) = self.translate(&event) {
                        return Some(change);
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "token change listener lagged");
                    return Some(TokenChange {
                        source: ChangeSource::CrossTab,
                        present: true,
                    });
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Next already-delivered change, if any.
    pub fn try_recv(&mut self) -> Option<TokenChange> {
        loop {
            match self.rx.try_recv() {
                Ok(event) => {
                    if let Some(change) = self.translate(&event) {
                        return Some(change);
                    }
                }
                Err(TryRecvError::Lagged(_)) => {
                    return Some(TokenChange {
                        source: ChangeSource::CrossTab,
                        present: true,
                    });
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return None,
            }
        }
    }

    fn translate(&self, event: &StorageEvent) -> Option<TokenChange> {
        if event.key != *self.key {
            return None;
        }

        let source = if event.origin == self.tab {
            ChangeSource::Local
        } else {
            ChangeSource::CrossTab
        };

        Some(TokenChange {
            source,
            present: event.present,
        })
    }
}
