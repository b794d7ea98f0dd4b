//! File-per-document backend.
//!
//! Each key is one file inside an app-private directory. The directory is
//! created on the first write, so opening a store that never writes leaves
//! no trace on disk.
//!
//! Writes are atomic: bytes go to a hidden `.<key>.tmp` file which is synced
//! and then renamed over the target. A failed write leaves the previous
//! file untouched. In paranoid mode the directory is synced after the
//! rename; a failure there is logged, not returned, since the new file is
//! already in place.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, instrument, warn};

use super::{validate_key, validate_value, StorageBackend};
use crate::config::{Config, SyncMode};
use crate::error::Result;

/// Directory-backed store with one file per key.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
    sync_mode: SyncMode,
    max_value_size: usize,
}

impl FileStorage {
    /// Creates a backend rooted at `dir`.
    ///
    /// Nothing is touched on disk until the first `put`.
    #[instrument(skip(config), fields(dir = %dir.as_ref().display()))]
    pub fn open(dir: impl AsRef<Path>, config: &Config) -> Self {
        let dir = dir.as_ref().to_path_buf();
        debug!(exists = dir.exists(), "Document backend ready");
        Self {
            dir,
            sync_mode: config.sync_mode,
            max_value_size: config.max_value_size,
        }
    }

    /// Returns the directory holding the documents.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn file_path(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }

    fn temp_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!(".{}.tmp", key))
    }

    fn write_atomic(&self, key: &str, bytes: &[u8]) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;

        let tmp_path = self.temp_path(key);
        let written = (|| {
            let mut file = File::create(&tmp_path)?;
            file.write_all(bytes)?;
            if !self.sync_mode.is_fast() {
                file.sync_all()?;
            }
            fs::rename(&tmp_path, self.file_path(key))
        })();

        if let Err(e) = written {
            let _ = fs::remove_file(&tmp_path);
            return Err(e);
        }

        if self.sync_mode.is_paranoid() {
            self.settle_dir_sync(key, self.sync_dir());
        }
        Ok(())
    }

    /// Records the outcome of the post-rename directory sync.
    ///
    /// The new file is already visible when this runs, so a failed sync is
    /// logged and the write still reports success.
    fn settle_dir_sync(&self, key: &str, synced: io::Result<()>) {
        if let Err(e) = synced {
            warn!(
                key = key,
                dir = %self.dir.display(),
                error = %e,
                "Directory sync failed after rename"
            );
        }
    }

    #[cfg(unix)]
    fn sync_dir(&self) -> io::Result<()> {
        File::open(&self.dir)?.sync_all()
    }

    #[cfg(not(unix))]
    fn sync_dir(&self) -> io::Result<()> {
        Ok(())
    }
}

impl StorageBackend for FileStorage {
    fn name(&self) -> &'static str {
        "file"
    }

    fn put(&self, key: &str, bytes: &[u8]) -> Result<()> {
        validate_key(key)?;
        validate_value(bytes, self.max_value_size)?;

        self.write_atomic(key, bytes).map_err(|e| {
            warn!(key = key, error = %e, "Document write failed");
            e
        })?;

        debug!(key = key, size = bytes.len(), "Document saved");
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        validate_key(key)?;

        match fs::read(self.file_path(key)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn delete(&self, key: &str) -> Result<bool> {
        validate_key(key)?;

        match fs::remove_file(self.file_path(key)) {
            Ok(()) => {
                debug!(key = key, "Document deleted");
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn list_keys(&self, prefix: &str) -> Result<Vec<String>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut keys = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            if name.starts_with('.') || !name.starts_with(prefix) {
                continue;
            }
            keys.push(name);
        }
        keys.sort();
        Ok(keys)
    }

    fn path(&self) -> Option<&Path> {
        Some(&self.dir)
    }
}
