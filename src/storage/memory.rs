//! In-memory backend for tests.
//!
//! Behaves like the durable backends for a single process lifetime and can
//! be told to fail every write, which is how failure paths of the record
//! store and migration runner are exercised.

use std::collections::BTreeMap;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use tracing::debug;

use super::{validate_key, validate_value, StorageBackend};
use crate::config::DEFAULT_MAX_VALUE_SIZE;
use crate::error::{Result, StorageError};

/// `BTreeMap`-backed store with write-failure injection.
#[derive(Debug)]
pub struct MemoryStorage {
    entries: RwLock<BTreeMap<String, Vec<u8>>>,
    fail_writes: AtomicBool,
    max_value_size: usize,
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStorage {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::with_max_value_size(DEFAULT_MAX_VALUE_SIZE)
    }

    /// Creates an empty store with a custom value size limit.
    pub fn with_max_value_size(max_value_size: usize) -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
            fail_writes: AtomicBool::new(false),
            max_value_size,
        }
    }

    /// When `true`, every `put` and `delete` fails with an I/O error and
    /// leaves the contents unchanged.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    /// Returns true if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_writable(&self, key: &str) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            debug!(key = key, "Injected write failure");
            return Err(io::Error::other(format!("injected write failure for '{}'", key)).into());
        }
        Ok(())
    }
}

impl StorageBackend for MemoryStorage {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn put(&self, key: &str, bytes: &[u8]) -> Result<()> {
        validate_key(key)?;
        validate_value(bytes, self.max_value_size)?;
        self.check_writable(key)?;

        let mut entries = self
            .entries
            .write()
            .map_err(|e| StorageError::poisoned(e.to_string()))?;
        entries.insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        validate_key(key)?;

        let entries = self
            .entries
            .read()
            .map_err(|e| StorageError::poisoned(e.to_string()))?;
        Ok(entries.get(key).cloned())
    }

    fn delete(&self, key: &str) -> Result<bool> {
        validate_key(key)?;
        self.check_writable(key)?;

        let mut entries = self
            .entries
            .write()
            .map_err(|e| StorageError::poisoned(e.to_string()))?;
        Ok(entries.remove(key).is_some())
    }

    fn list_keys(&self, prefix: &str) -> Result<Vec<String>> {
        let entries = self
            .entries
            .read()
            .map_err(|e| StorageError::poisoned(e.to_string()))?;
        Ok(entries
            .range(prefix.to_string()..)
            .map(|(k, _)| k)
            .take_while(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }
}
