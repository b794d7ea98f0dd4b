//! Individual migration steps.
//!
//! A step owns one legacy key. It decodes what is stored there and writes
//! the converted data into the target backend. Steps must be idempotent:
//! re-running a step whose output already exists overwrites or merges, it
//! never duplicates.

use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::codec::{self, Decoded};
use crate::error::{CodecError, Result};
use crate::record::Record;
use crate::storage::StorageBackend;
use crate::store::Layout;

/// One unit of legacy data to move.
pub trait MigrationStep {
    /// Name used in logs and reports.
    fn name(&self) -> &str;

    /// Key the legacy data lives under.
    fn legacy_key(&self) -> &str;

    /// Decodes `legacy` and writes the converted data to `target`.
    ///
    /// Returns the number of values written.
    ///
    /// # Errors
    ///
    /// Any error means the step is skipped and the legacy key is kept.
    fn transfer(&self, legacy: &[u8], target: &dyn StorageBackend) -> Result<usize>;

    /// Layout the step writes into, if it writes a record collection.
    ///
    /// The runner uses it to pick the backend: blob collections go to the
    /// blob target when one is set.
    fn target_layout(&self) -> Option<&Layout> {
        None
    }
}

/// Moves a legacy collection (`Vec<L>`) into a record collection.
///
/// Records are converted with `R: From<L>`. A documents target overwrites
/// `<prefix><id>` per record; a blob target is merged by id with whatever
/// is already stored there.
pub struct CollectionStep<L, R> {
    name: String,
    legacy_key: String,
    target: Layout,
    _types: PhantomData<fn(L) -> R>,
}

impl<L, R> CollectionStep<L, R>
where
    L: DeserializeOwned,
    R: Record + From<L>,
{
    /// Creates a step moving `legacy_key` into `target`.
    pub fn new(legacy_key: impl Into<String>, target: Layout) -> Self {
        let legacy_key = legacy_key.into();
        Self {
            name: format!("{} -> {}", legacy_key, R::COLLECTION),
            legacy_key,
            target,
            _types: PhantomData,
        }
    }

    /// Creates a step moving `legacy_key` into one document per record.
    pub fn into_documents(legacy_key: impl Into<String>) -> Self {
        Self::new(legacy_key, Layout::documents_for::<R>())
    }

    fn write_documents(&self, records: &[R], target: &dyn StorageBackend) -> Result<usize> {
        for record in records {
            let Some(key) = self.target.document_key(record.id()) else {
                continue;
            };
            target.put(&key, &codec::encode(record)?)?;
        }
        Ok(records.len())
    }

    fn merge_blob(&self, key: &str, records: Vec<R>, target: &dyn StorageBackend) -> Result<usize> {
        let mut merged: Vec<R> = match target.get(key)? {
            None => Vec::new(),
            Some(bytes) => match codec::decode_collection::<R>(&bytes) {
                Decoded::Records(existing) => existing,
                // Refuse to replace a target we cannot read
                Decoded::Corrupt(e) => return Err(e.into()),
            },
        };

        let count = records.len();
        for record in records {
            match merged.iter().position(|r| r.id() == record.id()) {
                Some(i) => merged[i] = record,
                None => merged.push(record),
            }
        }

        target.put(key, &codec::encode(&merged)?)?;
        Ok(count)
    }
}

impl<L, R> MigrationStep for CollectionStep<L, R>
where
    L: DeserializeOwned,
    R: Record + From<L>,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn legacy_key(&self) -> &str {
        &self.legacy_key
    }

    fn transfer(&self, legacy: &[u8], target: &dyn StorageBackend) -> Result<usize> {
        let legacy: Vec<L> = match codec::decode_collection(legacy) {
            Decoded::Records(records) => records,
            Decoded::Corrupt(e) => return Err(e.into()),
        };
        let records: Vec<R> = legacy.into_iter().map(R::from).collect();
        debug!(step = %self.name, count = records.len(), "Legacy collection decoded");

        match &self.target {
            Layout::Documents { .. } => self.write_documents(&records, target),
            Layout::Blob { key } => self.merge_blob(key, records, target),
        }
    }

    fn target_layout(&self) -> Option<&Layout> {
        Some(&self.target)
    }
}

/// Moves a single legacy value (e.g. a profile) to a new key.
///
/// The target is overwritten.
pub struct ValueStep<L, T> {
    name: String,
    legacy_key: String,
    target_key: String,
    _types: PhantomData<fn(L) -> T>,
}

impl<L, T> ValueStep<L, T>
where
    L: DeserializeOwned,
    T: Serialize + From<L>,
{
    /// Creates a step moving `legacy_key` to `target_key`.
    pub fn new(legacy_key: impl Into<String>, target_key: impl Into<String>) -> Self {
        let legacy_key = legacy_key.into();
        let target_key = target_key.into();
        Self {
            name: format!("{} -> {}", legacy_key, target_key),
            legacy_key,
            target_key,
            _types: PhantomData,
        }
    }
}

impl<L, T> MigrationStep for ValueStep<L, T>
where
    L: DeserializeOwned,
    T: Serialize + From<L>,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn legacy_key(&self) -> &str {
        &self.legacy_key
    }

    fn transfer(&self, legacy: &[u8], target: &dyn StorageBackend) -> Result<usize> {
        let value: L = serde_json::from_slice(legacy).map_err(CodecError::from)?;
        target.put(&self.target_key, &codec::encode(&T::from(value))?)?;
        Ok(1)
    }
}
