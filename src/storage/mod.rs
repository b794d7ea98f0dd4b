//! Storage layer abstractions for StashDB.
//!
//! This module provides a trait-based abstraction over byte-level
//! persistence, so record stores work unchanged on top of different
//! backends.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    RecordStore<R>                            │
//! │                         │                                    │
//! │                         ▼                                    │
//! │              ┌─────────────────────┐                         │
//! │              │   StorageBackend    │  ← Trait                │
//! │              └─────────────────────┘                         │
//! │               ▲          ▲         ▲                         │
//! │               │          │         │                         │
//! │    ┌──────────┴┐  ┌──────┴─────┐  ┌┴────────────┐            │
//! │    │RedbStorage│  │FileStorage │  │MemoryStorage│            │
//! │    └───────────┘  └────────────┘  └─────────────┘            │
//! │     (key-value)  (file per doc)       (test)                 │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Failure Semantics
//!
//! A `put` that returns an error has not replaced the previous value.
//! Callers must not assume a write happened unless it returned `Ok`.

pub mod file;
pub mod memory;
pub mod redb;
pub mod schema;

pub use self::file::FileStorage;
pub use self::memory::MemoryStorage;
pub use self::redb::RedbStorage;
pub use schema::{DatabaseMetadata, MIGRATION_MARKER_KEY, SCHEMA_VERSION};

use std::path::Path;

use crate::config::Config;
use crate::error::{Result, ValidationError};
use schema::MAX_KEY_LENGTH;

/// Byte-level persistence contract shared by all backends.
///
/// Keys are stable names chosen at development time. Values are opaque
/// bytes; the codec layer decides their format.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` so a backend handle can be shared
/// between the stores built on top of it. Each call is independently
/// atomic; sequencing several calls is the caller's responsibility.
///
/// # Example
///
/// ```rust
/// use stashdb::storage::{MemoryStorage, StorageBackend};
///
/// let backend = MemoryStorage::new();
/// backend.put("settings", b"{}").unwrap();
/// assert_eq!(backend.get("settings").unwrap().as_deref(), Some(&b"{}"[..]));
/// assert_eq!(backend.list_keys("set").unwrap(), vec!["settings".to_string()]);
/// ```
pub trait StorageBackend: Send + Sync {
    /// Short backend name used in logs.
    fn name(&self) -> &'static str;

    /// Durably stores `bytes` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the key or value is rejected or the write fails.
    /// On error, the previous value (if any) is still in place.
    fn put(&self, key: &str, bytes: &[u8]) -> Result<()>;

    /// Reads the bytes stored under `key`.
    ///
    /// Returns `None` if the key is absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying read fails.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Removes `key`.
    ///
    /// Returns `true` if the key existed, `false` otherwise.
    fn delete(&self, key: &str) -> Result<bool>;

    /// Lists all keys starting with `prefix`, sorted ascending.
    ///
    /// An empty prefix lists every key.
    fn list_keys(&self, prefix: &str) -> Result<Vec<String>>;

    /// Returns the on-disk location of this backend, if any.
    fn path(&self) -> Option<&Path> {
        None
    }
}

/// Rejects keys that could not be stored portably by every backend.
///
/// Accepted keys are non-empty, at most [`MAX_KEY_LENGTH`] bytes, use only
/// `[A-Za-z0-9._-]` and do not start with `.` (hidden names are reserved for
/// temporary files).
pub fn validate_key(key: &str) -> std::result::Result<(), ValidationError> {
    if key.is_empty() {
        return Err(ValidationError::required_field("key"));
    }
    if key.len() > MAX_KEY_LENGTH {
        return Err(ValidationError::invalid_key(
            key,
            format!("must be at most {} bytes, got {}", MAX_KEY_LENGTH, key.len()),
        ));
    }
    if key.starts_with('.') {
        return Err(ValidationError::invalid_key(key, "must not start with '.'"));
    }
    if let Some(c) = key
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')))
    {
        return Err(ValidationError::invalid_key(
            key,
            format!("contains unsupported character {:?}", c),
        ));
    }
    Ok(())
}

/// Rejects values above the configured size limit.
pub(crate) fn validate_value(bytes: &[u8], max: usize) -> std::result::Result<(), ValidationError> {
    if bytes.len() > max {
        return Err(ValidationError::content_too_large(bytes.len(), max));
    }
    Ok(())
}

/// Opens the key-value backend at the given path.
///
/// This is a convenience function that creates a [`RedbStorage`] instance.
/// For more control, use `RedbStorage::open()` directly.
///
/// # Errors
///
/// Returns an error if:
/// - The database file is corrupted
/// - The database is locked by another process
/// - Schema version doesn't match
pub fn open_key_value(path: impl AsRef<Path>, config: &Config) -> Result<RedbStorage> {
    RedbStorage::open(path, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_open_key_value() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");

        let storage = open_key_value(&path, &Config::default()).unwrap();

        assert_eq!(storage.metadata().schema_version, SCHEMA_VERSION);
        assert!(StorageBackend::path(&storage).is_some());
    }

    #[test]
    fn test_backends_are_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<RedbStorage>();
        assert_send_sync::<FileStorage>();
        assert_send_sync::<MemoryStorage>();
    }

    #[test]
    fn test_validate_key_accepts_stable_names() {
        assert!(validate_key("plants").is_ok());
        assert!(validate_key("hasMigrated").is_ok());
        assert!(validate_key("plants-0190b1d2-7f3c-7a9e-8f00-123456789abc").is_ok());
        assert!(validate_key("avatar_1.png").is_ok());
    }

    #[test]
    fn test_validate_key_rejects_bad_names() {
        assert!(validate_key("").is_err());
        assert!(validate_key(".hidden").is_err());
        assert!(validate_key("../escape").is_err());
        assert!(validate_key("a/b").is_err());
        assert!(validate_key("white space").is_err());
        assert!(validate_key(&"k".repeat(MAX_KEY_LENGTH + 1)).is_err());
        assert!(validate_key(&"k".repeat(MAX_KEY_LENGTH)).is_ok());
    }

    #[test]
    fn test_validate_value_limit() {
        assert!(validate_value(&[0u8; 8], 8).is_ok());
        let err = validate_value(&[0u8; 9], 8).unwrap_err();
        assert!(matches!(err, ValidationError::ContentTooLarge { size: 9, max: 8 }));
    }
}
