//! Configuration types for StashDB.
//!
//! The [`Config`] struct controls database behavior including:
//! - Durability of writes (key-value and document backends)
//! - Location of the file-per-document directory
//! - Value size limits and corrupt-data quarantine
//!
//! # Example
//! ```rust
//! use stashdb::{Config, SyncMode};
//!
//! // Use defaults
//! let config = Config::default();
//!
//! // Customize
//! let config = Config {
//!     sync_mode: SyncMode::Paranoid,
//!     max_value_size: 4 * 1024 * 1024,
//!     ..Default::default()
//! };
//! assert!(config.validate().is_ok());
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Default maximum size of a single stored value (16 MiB).
pub const DEFAULT_MAX_VALUE_SIZE: usize = 16 * 1024 * 1024;

/// Database configuration options.
///
/// All fields have sensible defaults. Use struct update syntax to override
/// specific settings:
///
/// ```rust
/// use stashdb::Config;
///
/// let config = Config {
///     quarantine_corrupt: false,
///     ..Default::default()
/// };
/// ```
#[derive(Clone, Debug)]
pub struct Config {
    /// Durability mode for write operations.
    pub sync_mode: SyncMode,

    /// Directory for the file-per-document backend.
    ///
    /// `None` places it next to the database file as `<db file>.documents`.
    /// The directory is created lazily on the first write.
    pub documents_dir: Option<PathBuf>,

    /// Maximum size in bytes of a single stored value.
    ///
    /// Larger writes are rejected before reaching the backend.
    /// Default: 16 MiB
    pub max_value_size: usize,

    /// Copy undecodable collections to `<key>.corrupt` before opening empty.
    ///
    /// Default: `true`
    pub quarantine_corrupt: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sync_mode: SyncMode::Normal,
            documents_dir: None,
            max_value_size: DEFAULT_MAX_VALUE_SIZE,
            quarantine_corrupt: true,
        }
    }
}

impl Config {
    /// Creates a new Config with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a Config whose documents live in the platform data directory
    /// for `app_name` (e.g. `~/.local/share/<app_name>` on Linux).
    ///
    /// Falls back to the default layout when the platform has no data dir.
    pub fn for_app(app_name: &str) -> Self {
        Self {
            documents_dir: Self::app_documents_dir(app_name),
            ..Default::default()
        }
    }

    /// Resolves the app-private documents directory for `app_name`.
    pub fn app_documents_dir(app_name: &str) -> Option<PathBuf> {
        dirs::data_local_dir().map(|dir| dir.join(app_name).join("documents"))
    }

    /// Validates the configuration.
    ///
    /// Called automatically by `StashDB::open()`. You can also call this
    /// explicitly to check configuration before attempting to open.
    ///
    /// # Errors
    /// Returns `ValidationError` if:
    /// - `max_value_size` is 0
    /// - `documents_dir` is set to an empty path
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.max_value_size == 0 {
            return Err(ValidationError::invalid_field(
                "max_value_size",
                "must be greater than 0",
            ));
        }

        if let Some(ref dir) = self.documents_dir {
            if dir.as_os_str().is_empty() {
                return Err(ValidationError::invalid_field(
                    "documents_dir",
                    "must not be an empty path",
                ));
            }
        }

        Ok(())
    }

    /// Returns the documents directory to use for a database at `db_path`.
    pub fn resolve_documents_dir(&self, db_path: &Path) -> PathBuf {
        match self.documents_dir {
            Some(ref dir) => dir.clone(),
            None => {
                let mut name = db_path
                    .file_name()
                    .map(|n| n.to_os_string())
                    .unwrap_or_else(|| "stash".into());
                name.push(".documents");
                db_path.with_file_name(name)
            }
        }
    }
}

/// Durability mode for write operations.
///
/// Controls the trade-off between write performance and crash safety.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncMode {
    /// Sync to disk on every committed write.
    ///
    /// This is the default and recommended setting.
    #[default]
    Normal,

    /// Skip fsync (faster writes, may lose recent data on crash).
    ///
    /// Use for tests or when losing the last few writes is acceptable.
    Fast,

    /// Sync file data and the containing directory on every write.
    ///
    /// Slowest; also makes renames in the document directory durable.
    Paranoid,
}

impl SyncMode {
    /// Returns true if this mode also syncs directories.
    pub fn is_paranoid(&self) -> bool {
        matches!(self, Self::Paranoid)
    }

    /// Returns true if this mode skips fsync (may lose data on crash).
    pub fn is_fast(&self) -> bool {
        matches!(self, Self::Fast)
    }
}
