//! Persistent local key-value storage.
//!
//! The storefront keeps a handful of small string values on the operator's
//! machine: the session date, the selected currency, the cart and the catalog
//! cache. Everything goes through [`LocalStorage`] so the backing can be a
//! JSON file in production and a map in tests.
//!
//! # Keys
//!
//! | Key | Value |
//! |-----|-------|
//! | `zonagamer_session_date` | `YYYY-MM-DD` of the last sign-in |
//! | `selectedCurrency` | `USD` or `COP` |
//! | `zona_gamer_cart` | JSON array of cart lines |
//! | `games_cache_{platform}` / `combos_cache_{platform}` | JSON array of item summaries |
//! | `…_timestamp` | millisecond timestamp of the cache entry |

mod file;
mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;

use thiserror::Error;

/// Errors raised by a storage backend.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Reading or writing the backing file failed.
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The backing file is not a JSON object of strings.
    #[error("storage serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A writer panicked while holding the storage lock.
    #[error("storage lock poisoned")]
    Poisoned,

    /// The backend refused the write (quota exceeded, read-only media).
    #[error("storage write rejected: {0}")]
    WriteRejected(String),
}

/// String key-value store with the semantics of browser local storage.
///
/// Calls are synchronous; implementations must be cheap enough to call from
/// async code without blocking the runtime for long.
pub trait LocalStorage: Send + Sync {
    /// Read a value, `None` when the key is absent.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write a value, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend rejects the write.
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove a key. Removing an absent key is not an error.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend rejects the write.
    fn remove_item(&self, key: &str) -> Result<(), StorageError>;

    /// Every key currently stored.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    fn keys(&self) -> Result<Vec<String>, StorageError>;
}
