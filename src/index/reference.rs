//! Parent to child lookup derived from a reference field.

use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::sync::{PoisonError, RwLock};

use tracing::debug;

use super::DerivedIndex;
use crate::record::Record;
use crate::types::RecordId;

/// Denormalized child lists keyed by parent id.
///
/// Built over the *child* collection: each child names its parent through
/// `reference`, and the index groups child ids under that parent in
/// collection order. Children whose reference is `None` are not indexed.
pub struct ReferenceIndex<R> {
    name: &'static str,
    reference: fn(&R) -> Option<RecordId>,
    children: RwLock<BTreeMap<RecordId, Vec<RecordId>>>,
    _record: PhantomData<fn(&R)>,
}

impl<R: Record> ReferenceIndex<R> {
    /// Creates an empty index that reads each record's parent with
    /// `reference`.
    pub fn new(name: &'static str, reference: fn(&R) -> Option<RecordId>) -> Self {
        Self {
            name,
            reference,
            children: RwLock::new(BTreeMap::new()),
            _record: PhantomData,
        }
    }

    /// Child ids referencing `parent`, in collection order.
    pub fn children_of(&self, parent: RecordId) -> Vec<RecordId> {
        self.children
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&parent)
            .cloned()
            .unwrap_or_default()
    }

    /// Number of children referencing `parent`.
    pub fn child_count(&self, parent: RecordId) -> usize {
        self.children
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&parent)
            .map_or(0, Vec::len)
    }

    /// Every parent id referenced by at least one child, ascending.
    ///
    /// May include ids whose parent record no longer exists (orphans).
    pub fn parents(&self) -> Vec<RecordId> {
        self.children
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .copied()
            .collect()
    }
}

impl<R: Record> DerivedIndex<R> for ReferenceIndex<R> {
    fn name(&self) -> &'static str {
        self.name
    }

    fn rebuild(&self, records: &[R]) {
        let mut children: BTreeMap<RecordId, Vec<RecordId>> = BTreeMap::new();
        for record in records {
            if let Some(parent) = (self.reference)(record) {
                children.entry(parent).or_default().push(record.id());
            }
        }
        debug!(index = self.name, parents = children.len(), "Reference index rebuilt");
        *self.children.write().unwrap_or_else(PoisonError::into_inner) = children;
    }
}

impl<R> std::fmt::Debug for ReferenceIndex<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReferenceIndex")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
