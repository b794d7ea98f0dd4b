//! redb key-value backend.
//!
//! This module provides the key-value [`StorageBackend`] for StashDB using
//! [redb](https://docs.rs/redb), a pure Rust embedded key-value store. It
//! suits small, frequently-read-in-full collections: each collection is one
//! blob under one key.
//!
//! # Features
//!
//! - ACID transactions with MVCC
//! - One write transaction per `put`/`delete`, so a failed write leaves the
//!   previous value intact
//! - Automatic crash recovery
//!
//! # File Layout
//!
//! When you open a database at `./stash.db`, redb creates:
//! - `./stash.db` - Main database file
//! - `./stash.db.lock` - Lock file for writer coordination (may not be visible)

use std::path::{Path, PathBuf};

use ::redb::{Database, Durability, WriteTransaction};
use tracing::{debug, info, instrument, warn};

use super::schema::{DatabaseMetadata, BLOBS_TABLE, METADATA_TABLE, SCHEMA_VERSION};
use super::{validate_key, validate_value, StorageBackend};
use crate::config::{Config, SyncMode};
use crate::error::{Result, StashError, StorageError};

/// Metadata key in the metadata table.
const METADATA_KEY: &str = "db_metadata";

/// redb-backed key-value store.
///
/// This struct holds the redb database handle and cached metadata.
///
/// # Thread Safety
///
/// `RedbStorage` is `Send + Sync`. redb handles internal synchronization
/// using MVCC for readers and exclusive locking for writers.
#[derive(Debug)]
pub struct RedbStorage {
    /// The redb database handle.
    db: Database,

    /// Cached database metadata.
    metadata: DatabaseMetadata,

    /// Path to the database file.
    path: PathBuf,

    /// Durability applied to every write transaction.
    sync_mode: SyncMode,

    /// Largest accepted value in bytes.
    max_value_size: usize,
}

impl RedbStorage {
    /// Opens or creates a database at the given path.
    ///
    /// If the database doesn't exist, it will be created and initialized.
    /// If it exists, its metadata is validated against the current schema.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The database file is corrupted or missing its metadata
    /// - The database is locked by another process
    /// - Schema version doesn't match
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// use stashdb::{Config, storage::RedbStorage};
    ///
    /// let storage = RedbStorage::open("./stash.db", &Config::default())?;
    /// ```
    #[instrument(skip(config), fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>, config: &Config) -> Result<Self> {
        let path = path.as_ref();
        let db_exists = path.exists();

        debug!(db_exists = db_exists, "Opening key-value backend");

        let db = Self::create_database(path)?;

        let (metadata, path) = if db_exists {
            Self::open_existing(&db, path.to_path_buf())?
        } else {
            Self::initialize_new(&db, path.to_path_buf())?
        };

        Ok(Self {
            db,
            metadata,
            path,
            sync_mode: config.sync_mode,
            max_value_size: config.max_value_size,
        })
    }

    /// Creates the redb database handle.
    fn create_database(path: &Path) -> Result<Database> {
        // Note: redb doesn't expose a typed error variant for lock conflicts,
        // so we detect them via error message string matching.
        let db = Database::builder().create(path).map_err(|e| {
            if e.to_string().contains("locked") {
                StorageError::DatabaseLocked
            } else {
                StorageError::Redb(e.to_string())
            }
        })?;

        debug!("Database file opened successfully");
        Ok(db)
    }

    /// Initializes a new database with tables and metadata.
    #[instrument(skip(db), fields(path = %path.display()))]
    fn initialize_new(db: &Database, path: PathBuf) -> Result<(DatabaseMetadata, PathBuf)> {
        info!("Initializing new database");

        let metadata = DatabaseMetadata::new();

        let write_txn = db.begin_write().map_err(StorageError::from)?;
        {
            let mut meta_table = write_txn.open_table(METADATA_TABLE)?;
            let metadata_bytes = bincode::serialize(&metadata)
                .map_err(|e| StorageError::serialization(e.to_string()))?;
            meta_table.insert(METADATA_KEY, metadata_bytes.as_slice())?;

            // Tables are created on first open
            let _ = write_txn.open_table(BLOBS_TABLE)?;
        }
        write_txn.commit().map_err(StorageError::from)?;

        info!(schema_version = SCHEMA_VERSION, "Database initialized");
        Ok((metadata, path))
    }

    /// Opens and validates an existing database.
    #[instrument(skip(db), fields(path = %path.display()))]
    fn open_existing(db: &Database, path: PathBuf) -> Result<(DatabaseMetadata, PathBuf)> {
        info!("Opening existing database");

        let read_txn = db.begin_read().map_err(StorageError::from)?;

        let metadata = {
            let meta_table = read_txn.open_table(METADATA_TABLE).map_err(|e| {
                StorageError::corrupted(format!("Cannot open metadata table: {}", e))
            })?;

            let metadata_bytes = meta_table
                .get(METADATA_KEY)
                .map_err(StorageError::from)?
                .ok_or_else(|| StorageError::corrupted("Missing database metadata"))?;

            bincode::deserialize::<DatabaseMetadata>(metadata_bytes.value())
                .map_err(|e| StorageError::corrupted(format!("Invalid metadata format: {}", e)))?
        };

        drop(read_txn);

        if !metadata.is_compatible() {
            warn!(
                expected = SCHEMA_VERSION,
                found = metadata.schema_version,
                "Schema version mismatch"
            );
            return Err(StashError::Storage(StorageError::SchemaVersionMismatch {
                expected: SCHEMA_VERSION,
                found: metadata.schema_version,
            }));
        }

        let mut metadata = metadata;
        metadata.touch();

        let write_txn = db.begin_write().map_err(StorageError::from)?;
        {
            let mut meta_table = write_txn.open_table(METADATA_TABLE)?;
            let metadata_bytes = bincode::serialize(&metadata)
                .map_err(|e| StorageError::serialization(e.to_string()))?;
            meta_table.insert(METADATA_KEY, metadata_bytes.as_slice())?;

            // Databases created before the blobs table existed get it here
            let _ = write_txn.open_table(BLOBS_TABLE)?;
        }
        write_txn.commit().map_err(StorageError::from)?;

        info!(
            schema_version = metadata.schema_version,
            "Database opened successfully"
        );
        Ok((metadata, path))
    }

    /// Returns the database metadata.
    #[inline]
    pub fn metadata(&self) -> &DatabaseMetadata {
        &self.metadata
    }

    /// Returns a reference to the underlying redb database.
    #[inline]
    #[cfg_attr(not(test), allow(dead_code))]
    pub(crate) fn database(&self) -> &Database {
        &self.db
    }

    /// Begins a write transaction with the configured durability.
    fn begin_write(&self) -> Result<WriteTransaction> {
        let mut write_txn = self.db.begin_write().map_err(StorageError::from)?;
        let durability = match self.sync_mode {
            SyncMode::Fast => Durability::Eventual,
            SyncMode::Normal | SyncMode::Paranoid => Durability::Immediate,
        };
        write_txn.set_durability(durability);
        Ok(write_txn)
    }

    /// Closes the database, flushing pending writes.
    ///
    /// redb flushes durably on drop, so this always returns `Ok(())`. The
    /// `Result` is kept so callers handle a future fallible flush.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn close(self) -> Result<()> {
        info!("Closing key-value backend");
        drop(self.db);
        Ok(())
    }
}

impl StorageBackend for RedbStorage {
    fn name(&self) -> &'static str {
        "redb"
    }

    fn put(&self, key: &str, bytes: &[u8]) -> Result<()> {
        validate_key(key)?;
        validate_value(bytes, self.max_value_size)?;

        let write_txn = self.begin_write()?;
        {
            let mut table = write_txn.open_table(BLOBS_TABLE)?;
            table.insert(key, bytes)?;
        }
        write_txn.commit().map_err(StorageError::from)?;

        debug!(key = key, size = bytes.len(), "Blob saved");
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        validate_key(key)?;

        let read_txn = self.db.begin_read().map_err(StorageError::from)?;
        let table = read_txn.open_table(BLOBS_TABLE)?;

        let value = table.get(key)?.map(|guard| guard.value().to_vec());
        Ok(value)
    }

    fn delete(&self, key: &str) -> Result<bool> {
        validate_key(key)?;

        let write_txn = self.begin_write()?;
        let existed;
        {
            let mut table = write_txn.open_table(BLOBS_TABLE)?;
            existed = table.remove(key)?.is_some();
        }
        write_txn.commit().map_err(StorageError::from)?;

        if existed {
            debug!(key = key, "Blob deleted");
        }
        Ok(existed)
    }

    fn list_keys(&self, prefix: &str) -> Result<Vec<String>> {
        let read_txn = self.db.begin_read().map_err(StorageError::from)?;
        let table = read_txn.open_table(BLOBS_TABLE)?;

        let mut keys = Vec::new();
        for entry in table.range(prefix..)? {
            let (key, _) = entry?;
            let key = key.value();
            if !key.starts_with(prefix) {
                break;
            }
            keys.push(key.to_string());
        }
        Ok(keys)
    }

    fn path(&self) -> Option<&Path> {
        Some(&self.path)
    }
}

// RedbStorage is auto Send + Sync: Database, DatabaseMetadata, and PathBuf
// are all Send + Sync.

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;
    use tempfile::tempdir;

    fn default_config() -> Config {
        Config::default()
    }

    fn open_temp() -> (RedbStorage, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");
        let storage = RedbStorage::open(&path, &default_config()).unwrap();
        (storage, dir)
    }

    #[test]
    fn test_open_creates_new_database() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");

        assert!(!path.exists());

        let storage = RedbStorage::open(&path, &default_config()).unwrap();

        assert!(path.exists());
        assert_eq!(storage.metadata().schema_version, SCHEMA_VERSION);
        assert_eq!(StorageBackend::path(&storage), Some(path.as_path()));

        storage.close().unwrap();
    }

    #[test]
    fn test_open_existing_database_preserves_created_at() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");

        let storage = RedbStorage::open(&path, &default_config()).unwrap();
        let created_at = storage.metadata().created_at;
        storage.close().unwrap();

        std::thread::sleep(std::time::Duration::from_millis(10));
        let storage = RedbStorage::open(&path, &default_config()).unwrap();

        assert_eq!(storage.metadata().created_at, created_at);
        assert!(storage.metadata().last_opened_at > created_at);

        storage.close().unwrap();
    }

    #[test]
    fn test_put_get_delete_roundtrip() {
        let (storage, _dir) = open_temp();

        assert!(storage.get("plants").unwrap().is_none());

        storage.put("plants", b"[]").unwrap();
        assert_eq!(storage.get("plants").unwrap().unwrap(), b"[]".to_vec());

        storage.put("plants", b"[1]").unwrap();
        assert_eq!(storage.get("plants").unwrap().unwrap(), b"[1]".to_vec());

        assert!(storage.delete("plants").unwrap());
        assert!(!storage.delete("plants").unwrap());
        assert!(storage.get("plants").unwrap().is_none());
    }

    #[test]
    fn test_list_keys_by_prefix() {
        let (storage, _dir) = open_temp();

        storage.put("tasks-b", b"2").unwrap();
        storage.put("plants", b"0").unwrap();
        storage.put("tasks-a", b"1").unwrap();
        storage.put("tasksettings", b"3").unwrap();

        assert_eq!(
            storage.list_keys("tasks-").unwrap(),
            vec!["tasks-a".to_string(), "tasks-b".to_string()]
        );
        assert_eq!(storage.list_keys("").unwrap().len(), 4);
        assert!(storage.list_keys("zzz").unwrap().is_empty());
    }

    #[test]
    fn test_put_rejects_invalid_key() {
        let (storage, _dir) = open_temp();

        let err = storage.put("a/b", b"x").unwrap_err();
        assert!(err.is_validation());
        assert!(storage.list_keys("").unwrap().is_empty());
    }

    #[test]
    fn test_put_rejects_oversized_value() {
        let dir = tempdir().unwrap();
        let config = Config {
            max_value_size: 4,
            ..Default::default()
        };
        let storage = RedbStorage::open(dir.path().join("test.db"), &config).unwrap();

        storage.put("small", b"1234").unwrap();
        let err = storage.put("small", b"12345").unwrap_err();
        assert!(matches!(
            err,
            StashError::Validation(ValidationError::ContentTooLarge { size: 5, max: 4 })
        ));
        // Previous value untouched
        assert_eq!(storage.get("small").unwrap().unwrap(), b"1234".to_vec());
    }

    #[test]
    fn test_data_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");

        let storage = RedbStorage::open(&path, &default_config()).unwrap();
        storage.put("hasMigrated", b"true").unwrap();
        storage.close().unwrap();

        let storage = RedbStorage::open(&path, &default_config()).unwrap();
        assert_eq!(storage.get("hasMigrated").unwrap().unwrap(), b"true".to_vec());
    }

    #[test]
    fn test_fast_sync_mode_still_visible() {
        let dir = tempdir().unwrap();
        let config = Config {
            sync_mode: SyncMode::Fast,
            ..Default::default()
        };
        let storage = RedbStorage::open(dir.path().join("fast.db"), &config).unwrap();
        storage.put("k", b"v").unwrap();
        assert_eq!(storage.get("k").unwrap().unwrap(), b"v".to_vec());
    }

    #[test]
    fn test_uncommitted_transaction_is_invisible() {
        let (storage, _dir) = open_temp();

        {
            let write_txn = storage.database().begin_write().unwrap();
            {
                let mut table = write_txn.open_table(BLOBS_TABLE).unwrap();
                table.insert("phantom", b"data".as_slice()).unwrap();
            }
            // dropped without commit
        }

        assert!(storage.get("phantom").unwrap().is_none());
    }

    // ====================================================================
    // Corruption Detection Tests
    // ====================================================================

    #[test]
    fn test_corruption_detection_invalid_metadata_bytes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("corrupt.db");

        let storage = RedbStorage::open(&path, &default_config()).unwrap();
        let write_txn = storage.database().begin_write().unwrap();
        {
            let mut meta = write_txn.open_table(METADATA_TABLE).unwrap();
            meta.insert(METADATA_KEY, b"x".as_slice()).unwrap();
        }
        write_txn.commit().unwrap();
        storage.close().unwrap();

        let err = RedbStorage::open(&path, &default_config()).unwrap_err();
        match err {
            StashError::Storage(StorageError::Corrupted(msg)) => {
                assert!(msg.contains("Invalid metadata format"), "got: {}", msg);
            }
            other => panic!("Expected StorageError::Corrupted, got: {:?}", other),
        }
    }

    #[test]
    fn test_corruption_detection_missing_metadata_key() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("no_key.db");

        let storage = RedbStorage::open(&path, &default_config()).unwrap();
        let write_txn = storage.database().begin_write().unwrap();
        {
            let mut meta = write_txn.open_table(METADATA_TABLE).unwrap();
            meta.remove(METADATA_KEY).unwrap();
        }
        write_txn.commit().unwrap();
        storage.close().unwrap();

        let err = RedbStorage::open(&path, &default_config()).unwrap_err();
        match err {
            StashError::Storage(StorageError::Corrupted(msg)) => {
                assert!(msg.contains("Missing database metadata"), "got: {}", msg);
            }
            other => panic!("Expected StorageError::Corrupted, got: {:?}", other),
        }
    }

    #[test]
    fn test_corruption_detection_missing_metadata_table() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("no_table.db");

        {
            let db = ::redb::Database::create(&path).unwrap();
            let write_txn = db.begin_write().unwrap();
            {
                let dummy: ::redb::TableDefinition<&str, &str> =
                    ::redb::TableDefinition::new("dummy");
                let mut table = write_txn.open_table(dummy).unwrap();
                table.insert("key", "value").unwrap();
            }
            write_txn.commit().unwrap();
        }

        let err = RedbStorage::open(&path, &default_config()).unwrap_err();
        match err {
            StashError::Storage(StorageError::Corrupted(msg)) => {
                assert!(msg.contains("Cannot open metadata table"), "got: {}", msg);
            }
            other => panic!("Expected StorageError::Corrupted, got: {:?}", other),
        }
    }

    #[test]
    fn test_schema_version_mismatch() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("future.db");

        let storage = RedbStorage::open(&path, &default_config()).unwrap();
        let future = DatabaseMetadata {
            schema_version: SCHEMA_VERSION + 1,
            ..DatabaseMetadata::new()
        };
        let write_txn = storage.database().begin_write().unwrap();
        {
            let mut meta = write_txn.open_table(METADATA_TABLE).unwrap();
            let bytes = bincode::serialize(&future).unwrap();
            meta.insert(METADATA_KEY, bytes.as_slice()).unwrap();
        }
        write_txn.commit().unwrap();
        storage.close().unwrap();

        let err = RedbStorage::open(&path, &default_config()).unwrap_err();
        assert!(matches!(
            err,
            StashError::Storage(StorageError::SchemaVersionMismatch { .. })
        ));
    }
}
