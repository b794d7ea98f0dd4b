//! Data types for cross-collection references.
//!
//! A relationship links a *child* collection to a *parent* collection
//! through a field on the child holding the parent's [`RecordId`]. What
//! happens to children when their parent is deleted is declared per
//! relationship, never implied.

use std::fmt;

use crate::types::RecordId;

/// Policy applied to children when their parent is deleted.
///
/// # Example
///
/// ```rust
/// use stashdb::relation::OnDelete;
///
/// // Deleting a plant removes its care tasks
/// let policy = OnDelete::Cascade;
/// assert!(policy.is_cascade());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OnDelete {
    /// Children are deleted together with the parent.
    Cascade,
    /// Children are kept; their reference dangles and resolves to `None`.
    Orphan,
}

impl OnDelete {
    /// Returns true for [`OnDelete::Cascade`].
    pub fn is_cascade(&self) -> bool {
        matches!(self, Self::Cascade)
    }
}

/// A declared reference from child records of type `C` to a parent
/// collection.
pub struct Relationship<C> {
    /// Name used in logs and validation errors (usually the field name).
    pub name: &'static str,

    /// Reads the parent id from a child, `None` if the child is unlinked.
    pub reference: fn(&C) -> Option<RecordId>,

    /// What deleting a parent does to its children.
    pub on_delete: OnDelete,
}

impl<C> Clone for Relationship<C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<C> Copy for Relationship<C> {}

impl<C> fmt::Debug for Relationship<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Relationship")
            .field("name", &self.name)
            .field("on_delete", &self.on_delete)
            .finish_non_exhaustive()
    }
}

/// What a parent deletion did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CascadeOutcome {
    /// Whether the parent existed and was deleted.
    pub parent_deleted: bool,

    /// Children deleted by a cascade.
    pub children_deleted: usize,

    /// Children left with a dangling reference.
    pub orphaned: usize,
}
