//! In-memory storage for tests and ephemeral sessions.

use std::collections::BTreeMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

use super::{LocalStorage, StorageError};

/// Map-backed [`LocalStorage`].
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: RwLock<BTreeMap<String, String>>,
    reject_writes: AtomicBool,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following `set_item` fail, as a full browser quota would.
    pub fn reject_writes(&self, reject: bool) {
        self.reject_writes.store(reject, Ordering::SeqCst);
    }

    /// Number of stored keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().map_or(0, |entries| entries.len())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl LocalStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let entries = self.entries.read().map_err(|_| StorageError::Poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if self.reject_writes.load(Ordering::SeqCst) {
            return Err(StorageError::WriteRejected(format!("quota exceeded for {key}")));
        }
        let mut entries = self.entries.write().map_err(|_| StorageError::Poisoned)?;
        entries.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.write().map_err(|_| StorageError::Poisoned)?;
        entries.remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        let entries = self.entries.read().map_err(|_| StorageError::Poisoned)?;
        Ok(entries.keys().cloned().collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_remove() {
        let storage = MemoryStorage::new();
        assert_eq!(storage.get_item("selectedCurrency").unwrap(), None);

        storage.set_item("selectedCurrency", "COP").unwrap();
        assert_eq!(
            storage.get_item("selectedCurrency").unwrap().as_deref(),
            Some("COP")
        );

        storage.remove_item("selectedCurrency").unwrap();
        assert!(storage.is_empty());
        storage.remove_item("selectedCurrency").unwrap();
    }

    #[test]
    fn test_rejected_writes_leave_state_untouched() {
        let storage = MemoryStorage::new();
        storage.set_item("a", "1").unwrap();
        storage.reject_writes(true);

        assert!(matches!(
            storage.set_item("a", "2"),
            Err(StorageError::WriteRejected(_))
        ));
        assert_eq!(storage.get_item("a").unwrap().as_deref(), Some("1"));
    }
}
