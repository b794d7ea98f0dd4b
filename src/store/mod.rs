//! Record store: the canonical in-memory copy of one collection.
//!
//! A [`RecordStore`] loads its collection from a [`StorageBackend`] when
//! opened and keeps it in memory. Every mutation is applied to a candidate
//! first, persisted, and only then committed in memory, so the in-memory
//! collection always matches what is durable.
//!
//! # Mutation Flow
//!
//! ```text
//! add / update / delete
//!        │
//!        ▼
//!  build candidate ──► persist via backend ──► error? ──► return Err, memory unchanged
//!                                  │
//!                                  ▼ ok
//!                      commit in memory ──► rebuild derived indexes ──► Ok
//! ```
//!
//! # Thread Safety
//!
//! Mutations take `&mut self`. Share a store across threads behind a
//! `Mutex`; reads through `&self` are free of locking.

mod layout;

pub use layout::Layout;

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::codec;
use crate::config::Config;
use crate::error::{Result, ValidationError};
use crate::index::DerivedIndex;
use crate::query::{self, FilterSpec, SortSpec};
use crate::record::Record;
use crate::storage::StorageBackend;
use crate::types::{RecordId, Timestamp};

/// Per-store behavior switches.
#[derive(Clone, Copy, Debug)]
pub struct StoreOptions {
    /// Copy undecodable payloads to `<key>.corrupt` when loading.
    pub quarantine_corrupt: bool,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            quarantine_corrupt: true,
        }
    }
}

impl From<&Config> for StoreOptions {
    fn from(config: &Config) -> Self {
        Self {
            quarantine_corrupt: config.quarantine_corrupt,
        }
    }
}

/// Durable, indexed collection of `R`.
pub struct RecordStore<R: Record> {
    backend: Arc<dyn StorageBackend>,
    layout: Layout,
    options: StoreOptions,
    records: Vec<R>,
    indexes: Vec<Arc<dyn DerivedIndex<R>>>,
}

impl<R: Record> RecordStore<R> {
    /// Opens the collection stored in `backend` under `layout`.
    ///
    /// Absent data opens an empty collection. Undecodable data also opens
    /// empty (after quarantining it when enabled).
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read. The store refuses to
    /// open empty in that case, since the next write would replace data that
    /// may still be intact.
    #[instrument(skip(backend, options), fields(collection = R::COLLECTION, location = layout.location()))]
    pub fn open(
        backend: Arc<dyn StorageBackend>,
        layout: Layout,
        options: StoreOptions,
    ) -> Result<Self> {
        let mut store = Self {
            backend,
            layout,
            options,
            records: Vec::new(),
            indexes: Vec::new(),
        };
        store.records = store.load()?;

        info!(
            backend = store.backend.name(),
            count = store.records.len(),
            "Record store opened"
        );
        Ok(store)
    }

    /// Re-reads the collection from the backend and rebuilds indexes.
    ///
    /// On error the current in-memory collection is kept.
    pub fn reload(&mut self) -> Result<()> {
        self.records = self.load()?;
        self.rebuild_indexes();
        debug!(collection = R::COLLECTION, count = self.records.len(), "Record store reloaded");
        Ok(())
    }

    fn load(&self) -> Result<Vec<R>> {
        let records = match &self.layout {
            Layout::Blob { key } => self.load_blob(key)?,
            Layout::Documents { prefix } => self.load_documents(prefix)?,
        };
        Ok(dedup_by_id(records))
    }

    fn load_blob(&self, key: &str) -> Result<Vec<R>> {
        let Some(bytes) = self.backend.get(key)? else {
            debug!(key = key, "Collection absent, starting empty");
            return Ok(Vec::new());
        };

        let decoded = codec::decode_collection::<R>(&bytes);
        codec::log_decoded(key, &decoded);
        if decoded.is_corrupt() && self.options.quarantine_corrupt {
            codec::quarantine(self.backend.as_ref(), key, &bytes);
        }
        Ok(decoded.into_records())
    }

    fn load_documents(&self, prefix: &str) -> Result<Vec<R>> {
        let mut records = Vec::new();

        // Keys are sorted, and UUID v7 ids sort by creation time
        for key in self.backend.list_keys(prefix)? {
            if codec::is_quarantine_key(&key) {
                continue;
            }
            let Some(id) = self.layout.id_from_document_key(&key) else {
                warn!(key = %key, "Skipping document with malformed key");
                continue;
            };
            let Some(bytes) = self.backend.get(&key)? else {
                continue;
            };

            match codec::decode::<R>(&bytes) {
                Ok(record) if record.id() == id => records.push(record),
                Ok(record) => {
                    warn!(key = %key, found = %record.id(), "Document id does not match its key, skipping");
                }
                Err(e) => {
                    warn!(key = %key, error = %e, "Skipping undecodable document");
                    if self.options.quarantine_corrupt {
                        codec::quarantine(self.backend.as_ref(), &key, &bytes);
                    }
                }
            }
        }

        debug!(prefix = prefix, count = records.len(), "Documents loaded");
        Ok(records)
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    /// Writes the whole collection as it would be after a mutation.
    fn persist_blob(&self, candidate: &[&R]) -> Result<()> {
        let Layout::Blob { key } = &self.layout else {
            return Ok(());
        };
        let bytes = codec::encode(candidate)?;
        self.backend.put(key, &bytes)
    }

    fn persist_document(&self, record: &R) -> Result<()> {
        let Some(key) = self.layout.document_key(record.id()) else {
            return Ok(());
        };
        let bytes = codec::encode(record)?;
        self.backend.put(&key, &bytes)
    }

    fn remove_document(&self, id: RecordId) -> Result<()> {
        if let Some(key) = self.layout.document_key(id) {
            self.backend.delete(&key)?;
        }
        Ok(())
    }

    /// Persists `record` as the replacement (or appended element) at `pos`.
    fn persist_upsert(&self, pos: Option<usize>, record: &R) -> Result<()> {
        match self.layout {
            Layout::Blob { .. } => {
                let mut candidate: Vec<&R> = self.records.iter().collect();
                match pos {
                    Some(i) => candidate[i] = record,
                    None => candidate.push(record),
                }
                self.persist_blob(&candidate)
            }
            Layout::Documents { .. } => self.persist_document(record),
        }
    }

    fn rebuild_indexes(&self) {
        for index in &self.indexes {
            index.rebuild(&self.records);
        }
    }

    fn position(&self, id: RecordId) -> Option<usize> {
        self.records.iter().position(|r| r.id() == id)
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Appends a record and persists it.
    ///
    /// # Errors
    ///
    /// - [`ValidationError::DuplicateId`] if a record with the same id exists
    /// - Any backend or codec error; the record is then not in the store
    #[instrument(skip(self, record), fields(collection = R::COLLECTION, id = %record.id()))]
    pub fn add(&mut self, record: R) -> Result<RecordId> {
        let id = record.id();
        if self.contains(id) {
            return Err(ValidationError::duplicate_id(R::COLLECTION, id).into());
        }

        self.persist_upsert(None, &record).inspect_err(|e| {
            warn!(error = %e, "Add not persisted, collection unchanged");
        })?;

        self.records.push(record);
        self.rebuild_indexes();
        debug!(count = self.records.len(), "Record added");
        Ok(id)
    }

    /// Creates a record with a fresh id and the current time, then adds it.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let id = plants.insert_with(|id, now| Plant::new(id, "Fern", now))?;
    /// ```
    pub fn insert_with<F>(&mut self, build: F) -> Result<RecordId>
    where
        F: FnOnce(RecordId, Timestamp) -> R,
    {
        let id = RecordId::new();
        let record = build(id, Timestamp::now());
        if record.id() != id {
            return Err(ValidationError::invalid_field("id", "must be the id passed to the builder").into());
        }
        self.add(record)
    }

    /// Replaces the record with the same id.
    ///
    /// Returns `Ok(false)` without touching storage if no record has that
    /// id. Otherwise stamps the record via [`Record::touch`] and persists it.
    #[instrument(skip(self, record), fields(collection = R::COLLECTION, id = %record.id()))]
    pub fn update(&mut self, mut record: R) -> Result<bool> {
        let Some(pos) = self.position(record.id()) else {
            debug!("Update of unknown record ignored");
            return Ok(false);
        };

        record.touch(Timestamp::now());
        self.commit_replacement(pos, record)?;
        Ok(true)
    }

    /// Edits the record with id `id` in place.
    ///
    /// Same contract as [`update`](Self::update). The closure runs on a
    /// copy, so the stored record is unchanged if persisting fails.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the closure changes the record's id.
    #[instrument(skip(self, edit), fields(collection = R::COLLECTION, id = %id))]
    pub fn update_with<F>(&mut self, id: RecordId, edit: F) -> Result<bool>
    where
        F: FnOnce(&mut R),
    {
        let Some(pos) = self.position(id) else {
            debug!("Update of unknown record ignored");
            return Ok(false);
        };

        let mut record = self.records[pos].clone();
        edit(&mut record);
        if record.id() != id {
            return Err(ValidationError::invalid_field("id", "cannot be changed by an update").into());
        }

        record.touch(Timestamp::now());
        self.commit_replacement(pos, record)?;
        Ok(true)
    }

    fn commit_replacement(&mut self, pos: usize, record: R) -> Result<()> {
        self.persist_upsert(Some(pos), &record).inspect_err(|e| {
            warn!(error = %e, "Update not persisted, collection unchanged");
        })?;

        self.records[pos] = record;
        self.rebuild_indexes();
        debug!("Record updated");
        Ok(())
    }

    /// Removes the record with id `id`.
    ///
    /// Returns `Ok(false)` without touching storage if it does not exist.
    #[instrument(skip(self), fields(collection = R::COLLECTION, id = %id))]
    pub fn delete(&mut self, id: RecordId) -> Result<bool> {
        let Some(pos) = self.position(id) else {
            debug!("Delete of unknown record ignored");
            return Ok(false);
        };

        let persisted = match self.layout {
            Layout::Blob { .. } => {
                let candidate: Vec<&R> = self
                    .records
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| *i != pos)
                    .map(|(_, r)| r)
                    .collect();
                self.persist_blob(&candidate)
            }
            Layout::Documents { .. } => self.remove_document(id),
        };
        persisted.inspect_err(|e| {
            warn!(error = %e, "Delete not persisted, collection unchanged");
        })?;

        self.records.remove(pos);
        self.rebuild_indexes();
        debug!(count = self.records.len(), "Record deleted");
        Ok(true)
    }

    /// Removes every record matching `predicate` and returns how many went.
    ///
    /// The blob layout persists once for the whole batch. In the documents
    /// layout each removal is its own write; if one fails, the removals
    /// already persisted are committed in memory and the error is returned.
    #[instrument(skip(self, predicate), fields(collection = R::COLLECTION))]
    pub fn delete_where<P>(&mut self, mut predicate: P) -> Result<usize>
    where
        P: FnMut(&R) -> bool,
    {
        let doomed: Vec<bool> = self.records.iter().map(|r| predicate(r)).collect();
        let total = doomed.iter().filter(|d| **d).count();
        if total == 0 {
            return Ok(0);
        }

        match self.layout {
            Layout::Blob { .. } => {
                let candidate: Vec<&R> = self
                    .records
                    .iter()
                    .zip(&doomed)
                    .filter(|(_, d)| !**d)
                    .map(|(r, _)| r)
                    .collect();
                self.persist_blob(&candidate).inspect_err(|e| {
                    warn!(error = %e, "Batch delete not persisted, collection unchanged");
                })?;
                self.retain_marked(&doomed);
            }
            Layout::Documents { .. } => {
                let mut removed = vec![false; doomed.len()];
                let mut failure = None;
                for (i, record) in self.records.iter().enumerate() {
                    if !doomed[i] {
                        continue;
                    }
                    match self.remove_document(record.id()) {
                        Ok(()) => removed[i] = true,
                        Err(e) => {
                            failure = Some(e);
                            break;
                        }
                    }
                }

                if let Some(e) = failure {
                    let done = removed.iter().filter(|r| **r).count();
                    warn!(removed = done, requested = total, error = %e, "Batch delete stopped early");
                    self.retain_marked(&removed);
                    self.rebuild_indexes();
                    return Err(e);
                }
                self.retain_marked(&doomed);
            }
        }

        self.rebuild_indexes();
        debug!(removed = total, count = self.records.len(), "Records deleted");
        Ok(total)
    }

    fn retain_marked(&mut self, marked: &[bool]) {
        let mut flags = marked.iter();
        self.records
            .retain(|_| !flags.next().copied().unwrap_or(false));
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// All records in collection order.
    #[inline]
    pub fn get_all(&self) -> &[R] {
        &self.records
    }

    /// The record with id `id`, if present.
    pub fn get_by_id(&self, id: RecordId) -> Option<&R> {
        self.records.iter().find(|r| r.id() == id)
    }

    /// Returns true if a record with id `id` exists.
    pub fn contains(&self, id: RecordId) -> bool {
        self.position(id).is_some()
    }

    /// Number of records.
    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if the collection is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Filters and sorts the current collection.
    pub fn query(&self, filter: &FilterSpec<R>, sort: &SortSpec<R>) -> Vec<&R> {
        query::query(&self.records, filter, sort)
    }

    /// Owned copy of the collection, for export.
    pub fn export(&self) -> Vec<R> {
        self.records.clone()
    }

    // ========================================================================
    // Indexes
    // ========================================================================

    /// Registers a derived index and builds it from the current records.
    ///
    /// The store keeps it current after every successful mutation.
    pub fn attach_index(&mut self, index: Arc<dyn DerivedIndex<R>>) {
        index.rebuild(&self.records);
        debug!(collection = R::COLLECTION, index = index.name(), "Index attached");
        self.indexes.push(index);
    }

    /// Number of attached indexes.
    pub fn index_count(&self) -> usize {
        self.indexes.len()
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// The layout this store persists with.
    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// The backend this store persists to.
    pub fn backend(&self) -> &Arc<dyn StorageBackend> {
        &self.backend
    }
}

impl<R: Record> fmt::Debug for RecordStore<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordStore")
            .field("collection", &R::COLLECTION)
            .field("backend", &self.backend.name())
            .field("layout", &self.layout)
            .field("len", &self.records.len())
            .field("indexes", &self.indexes.len())
            .finish()
    }
}

/// Drops later records whose id already appeared, keeping the first.
fn dedup_by_id<R: Record>(records: Vec<R>) -> Vec<R> {
    let mut seen = std::collections::HashSet::with_capacity(records.len());
    let before = records.len();
    let unique: Vec<R> = records.into_iter().filter(|r| seen.insert(r.id())).collect();
    if unique.len() != before {
        warn!(
            collection = R::COLLECTION,
            dropped = before - unique.len(),
            "Duplicate ids in stored collection, keeping first occurrence"
        );
    }
    unique
}
