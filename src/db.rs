//! StashDB main struct and lifecycle operations.
//!
//! The [`StashDB`] struct is the composition root. It provides methods for:
//!
//! - Opening and closing the backends described by a [`Config`]
//! - Running the one-shot migration from a legacy backend
//! - Handing out [`RecordStore`] handles
//!
//! There is no global instance: the application opens one `StashDB` at
//! startup and passes stores to whatever needs them.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use stashdb::{Config, Layout, StashDB};
//!
//! let db = StashDB::open("./stash.db", Config::default())?;
//!
//! // Move legacy data before any store opens
//! db.run_migration(legacy_backend, &[&plants_step])?;
//!
//! // Small, read-together collection in the key-value backend
//! let mut settings = db.open_store::<Setting>(Layout::blob_for::<Setting>())?;
//!
//! // One document per plant in the documents directory
//! let mut plants = db.open_store::<Plant>(Layout::documents_for::<Plant>())?;
//!
//! db.close()?;
//! ```
//!
//! # Thread Safety
//!
//! `StashDB` is `Send + Sync` and can be shared across threads using `Arc`.
//! Stores it hands out are owned by the caller and need a `Mutex` to be
//! mutated from several threads.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, instrument};

use crate::config::Config;
use crate::error::{Result, StashError};
use crate::migration::{MigrationReport, MigrationRunner, MigrationState, MigrationStep};
use crate::record::Record;
use crate::storage::{DatabaseMetadata, FileStorage, RedbStorage, StorageBackend};
use crate::store::{Layout, RecordStore, StoreOptions};

/// The main StashDB handle.
///
/// Create an instance with [`StashDB::open()`] and close it with
/// [`StashDB::close()`].
///
/// # Ownership
///
/// Stores opened through this handle share its backends. Backends stay
/// open until the handle and every store using them are dropped.
pub struct StashDB {
    /// Key-value backend (redb file at `path`).
    key_value: Arc<RedbStorage>,

    /// File-per-document backend.
    documents: Arc<FileStorage>,

    /// Configuration used to open this database.
    config: Config,

    /// Path to the database file.
    path: PathBuf,
}

impl std::fmt::Debug for StashDB {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StashDB")
            .field("path", &self.path)
            .field("documents_dir", &self.documents.dir())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl StashDB {
    /// Opens or creates a StashDB database at the specified path.
    ///
    /// The key-value backend lives at `path`. The documents directory is
    /// [`Config::documents_dir`], or `<path>.documents` when unset; it is
    /// created on the first document write.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration is invalid (see [`Config::validate`])
    /// - The documents directory is the database file itself
    /// - Database file is corrupted
    /// - Database is locked by another process
    /// - Schema version doesn't match
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// use stashdb::{Config, StashDB, SyncMode};
    ///
    /// let db = StashDB::open("./stash.db", Config {
    ///     sync_mode: SyncMode::Paranoid,
    ///     ..Default::default()
    /// })?;
    /// ```
    #[instrument(skip(config), fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>, config: Config) -> Result<Self> {
        let path = path.as_ref();
        config.validate().map_err(StashError::from)?;

        let documents_dir = config.resolve_documents_dir(path);
        if documents_dir == path {
            return Err(StashError::config(
                "documents_dir must differ from the database path",
            ));
        }

        info!("Opening StashDB");

        let key_value = RedbStorage::open(path, &config)?;
        let documents = FileStorage::open(&documents_dir, &config);

        info!(
            documents_dir = %documents_dir.display(),
            sync_mode = ?config.sync_mode,
            "StashDB opened successfully"
        );

        Ok(Self {
            key_value: Arc::new(key_value),
            documents: Arc::new(documents),
            config,
            path: path.to_path_buf(),
        })
    }

    /// Closes the database.
    ///
    /// Consumes the handle. If no store still holds the key-value backend it
    /// is closed here; otherwise it closes when the last store is dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if the key-value backend reports a flush failure.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn close(self) -> Result<()> {
        info!("Closing StashDB");

        if let Ok(key_value) = Arc::try_unwrap(self.key_value) {
            key_value.close()?;
        }

        info!("StashDB closed successfully");
        Ok(())
    }

    /// Returns a reference to the database configuration.
    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the key-value backend metadata.
    #[inline]
    pub fn metadata(&self) -> &DatabaseMetadata {
        self.key_value.metadata()
    }

    /// Path to the key-value database file.
    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The key-value backend.
    pub fn key_value(&self) -> Arc<dyn StorageBackend> {
        self.key_value.clone()
    }

    /// The file-per-document backend.
    pub fn documents(&self) -> Arc<dyn StorageBackend> {
        self.documents.clone()
    }

    // =========================================================================
    // Migration
    // =========================================================================

    /// Current state of the one-shot migration marker.
    pub fn migration_state(&self) -> Result<MigrationState> {
        MigrationState::read(&*self.key_value)
    }

    /// Migrates `legacy` into this database.
    ///
    /// Each step lands where [`open_store`](Self::open_store) will look for
    /// it: [`Layout::Blob`] collections in the key-value backend, everything
    /// else in the documents directory. The `hasMigrated` marker lives in
    /// the key-value backend. Call this before opening stores over the
    /// migrated collections.
    pub fn run_migration(
        &self,
        legacy: Arc<dyn StorageBackend>,
        steps: &[&dyn MigrationStep],
    ) -> Result<MigrationReport> {
        MigrationRunner::new(legacy, self.documents(), self.key_value())
            .with_blob_target(self.key_value())
            .run(steps)
    }

    // =========================================================================
    // Stores
    // =========================================================================

    /// Opens a caller-owned store for `R`.
    ///
    /// [`Layout::Blob`] collections live in the key-value backend,
    /// [`Layout::Documents`] collections in the documents directory.
    pub fn open_store<R: Record>(&self, layout: Layout) -> Result<RecordStore<R>> {
        let backend = self.backend_for(&layout);
        RecordStore::open(backend, layout, StoreOptions::from(&self.config))
    }

    fn backend_for(&self, layout: &Layout) -> Arc<dyn StorageBackend> {
        match layout {
            Layout::Blob { .. } => self.key_value(),
            Layout::Documents { .. } => self.documents(),
        }
    }
}

// StashDB is auto Send + Sync: RedbStorage, FileStorage, Config and PathBuf
// are all Send + Sync.

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SCHEMA_VERSION;
    use tempfile::tempdir;

    #[test]
    fn test_open_creates_database() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");

        let db = StashDB::open(&path, Config::default()).unwrap();

        assert!(path.exists());
        assert_eq!(db.metadata().schema_version, SCHEMA_VERSION);
        assert_eq!(db.path(), path.as_path());
        db.close().unwrap();
    }

    #[test]
    fn test_documents_dir_defaults_next_to_database() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");
        let db = StashDB::open(&path, Config::default()).unwrap();

        assert_eq!(
            db.documents().path(),
            Some(dir.path().join("test.db.documents").as_path())
        );
        assert_eq!(db.key_value().name(), "redb");
        assert_eq!(db.documents().name(), "file");
    }

    #[test]
    fn test_config_validation() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");

        let config = Config {
            max_value_size: 0,
            ..Default::default()
        };
        let err = StashDB::open(&path, config).unwrap_err();
        assert!(err.is_validation());
        assert!(!path.exists());
    }

    #[test]
    fn test_documents_dir_cannot_be_database_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");

        let config = Config {
            documents_dir: Some(path.clone()),
            ..Default::default()
        };
        let err = StashDB::open(&path, config).unwrap_err();
        assert!(matches!(err, StashError::Config { .. }));
    }

    #[test]
    fn test_migration_state_starts_not_migrated() {
        let dir = tempdir().unwrap();
        let db = StashDB::open(dir.path().join("test.db"), Config::default()).unwrap();
        assert_eq!(db.migration_state().unwrap(), MigrationState::NotMigrated);
    }

    #[test]
    fn test_stashdb_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<StashDB>();
    }
}
