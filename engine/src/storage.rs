//! Key-value persistence boundary.
//!
//! The engine never touches files or browser storage directly. Hosts provide
//! a [`KeyValueStore`] and the [`RecordStore`](crate::RecordStore) serializes
//! its whole state into a single value under one key.

use crate::{error::Result, Error};
use std::collections::HashMap;
use std::sync::Mutex;

/// Byte-oriented persistence collaborator.
///
/// `set` must replace the stored value as a unit: a concurrent or later `get`
/// observes either the previous value or the new one, never a mix.
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`, `None` if absent.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Replace the value stored under `key`.
    fn set(&self, key: &str, value: &[u8]) -> Result<()>;
}

/// In-memory [`KeyValueStore`], used by tests and ephemeral hosts.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    values: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStorage {
    /// Create an empty storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a storage pre-populated with one value.
    pub fn with_value(key: &str, value: impl Into<Vec<u8>>) -> Self {
        let storage = Self::new();
        if let Ok(mut values) = storage.values.lock() {
            values.insert(key.to_string(), value.into());
        }
        storage
    }
}

impl KeyValueStore for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let values = self
            .values
            .lock()
            .map_err(|e| Error::Storage(e.to_string()))?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        let mut values = self
            .values
            .lock()
            .map_err(|e| Error::Storage(e.to_string()))?;
        values.insert(key.to_string(), value.to_vec());
        Ok(())
    }
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for std::sync::Arc<T> {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        (**self).set(key, value)
    }
}
