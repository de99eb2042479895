//! Persistent token storage for the cabinet client.
//!
//! - [`StorageBackend`]: key/value persistence ([`MemoryStorage`], [`FileStorage`])
//! - [`SharedStorage`]: one backend shared by several handles, with a change bus
//! - [`TokenStore`]: per-handle adapter for the single bearer-token entry
//!
//! A `SharedStorage` plays the part of a browser profile's persistent storage
//! and every `TokenStore` opened on it plays the part of one tab: a write from
//! one handle is observed by the others as a cross-tab change and by the
//! writer itself as a local change.

mod file;
mod memory;
mod shared;
mod token_store;
mod traits;

pub use file::FileStorage;
pub use memory::MemoryStorage;
pub use shared::{SharedStorage, StorageEvent, TabId};
pub use token_store::{ChangeSource, TokenChange, TokenChanges, TokenStore};
pub use traits::StorageBackend;

use thiserror::Error;

/// Error type for storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Stored data could not be decoded
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Attempted to persist an empty value
    #[error("Refusing to store an empty value for key {0}")]
    EmptyValue(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
