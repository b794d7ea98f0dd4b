//! Cross-collection references with explicit delete policies.
//!
//! A [`Relationship`] ties a child collection to a parent collection. The
//! engine never enforces references implicitly: callers route parent
//! deletions through [`Relationship::delete_parent`] so the declared
//! [`OnDelete`] policy is applied, and use [`Relationship::resolve`] to
//! follow a reference, which yields `None` for dangling ones.
//!
//! # Operations
//!
//! - [`add_child`](Relationship::add_child): add a child whose reference must resolve
//! - [`delete_parent`](Relationship::delete_parent): delete a parent and apply the policy
//! - [`resolve`](Relationship::resolve): follow a child's reference
//! - [`children_of`](Relationship::children_of): children of a parent
//! - [`dangling`](Relationship::dangling): children whose parent is gone
//!
//! # Ordering
//!
//! `delete_parent` removes the parent first, then its children. If the
//! children cannot be removed, the parent is already gone and the children
//! are orphans; no state exists where children were removed but the parent
//! survived. Calling `delete_parent` again with the same id removes the
//! leftover children.

pub mod types;

pub use types::{CascadeOutcome, OnDelete, Relationship};

use tracing::{debug, instrument, warn};

use crate::error::{Result, ValidationError};
use crate::record::Record;
use crate::store::RecordStore;
use crate::types::RecordId;

impl<C: Record> Relationship<C> {
    /// Declares a relationship whose children are deleted with the parent.
    pub const fn cascade(name: &'static str, reference: fn(&C) -> Option<RecordId>) -> Self {
        Self {
            name,
            reference,
            on_delete: OnDelete::Cascade,
        }
    }

    /// Declares a relationship whose children survive the parent.
    pub const fn orphan(name: &'static str, reference: fn(&C) -> Option<RecordId>) -> Self {
        Self {
            name,
            reference,
            on_delete: OnDelete::Orphan,
        }
    }

    /// Adds `child` after checking that its reference resolves.
    ///
    /// An unlinked child (reference `None`) is accepted.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the referenced parent does not exist,
    /// plus any error from [`RecordStore::add`].
    pub fn add_child<P: Record>(
        &self,
        parents: &RecordStore<P>,
        children: &mut RecordStore<C>,
        child: C,
    ) -> Result<RecordId> {
        validate_reference(self.name, (self.reference)(&child), parents)?;
        children.add(child)
    }

    /// Deletes parent `id` and applies the delete policy to its children.
    ///
    /// The policy runs even when the parent is already gone. Under
    /// [`OnDelete::Cascade`] the children still referencing `id` are
    /// deleted, so repeating the call completes a cascade that failed
    /// part-way. Under [`OnDelete::Orphan`] nothing is written and the
    /// outcome counts the children that reference `id`.
    ///
    /// # Errors
    ///
    /// Returns the first persistence error. See the module docs for the
    /// state left behind.
    #[instrument(skip(self, parents, children), fields(relationship = self.name, parent = %id))]
    pub fn delete_parent<P: Record>(
        &self,
        parents: &mut RecordStore<P>,
        children: &mut RecordStore<C>,
        id: RecordId,
    ) -> Result<CascadeOutcome> {
        let parent_deleted = parents.delete(id)?;
        let reference = self.reference;

        let outcome = match self.on_delete {
            OnDelete::Cascade => {
                let children_deleted = children
                    .delete_where(|c| reference(c) == Some(id))
                    .inspect_err(|e| {
                        warn!(error = %e, "Cascade interrupted, remaining children are orphaned");
                    })?;
                CascadeOutcome {
                    parent_deleted,
                    children_deleted,
                    orphaned: 0,
                }
            }
            OnDelete::Orphan => CascadeOutcome {
                parent_deleted,
                children_deleted: 0,
                orphaned: self.children_of(children, id).len(),
            },
        };

        debug!(
            parent_deleted = outcome.parent_deleted,
            children_deleted = outcome.children_deleted,
            orphaned = outcome.orphaned,
            "Parent deletion applied"
        );
        Ok(outcome)
    }

    /// Follows `child`'s reference into `parents`.
    ///
    /// Returns `None` if the child is unlinked or its parent no longer
    /// exists.
    pub fn resolve<'p, P: Record>(&self, parents: &'p RecordStore<P>, child: &C) -> Option<&'p P> {
        (self.reference)(child).and_then(|id| parents.get_by_id(id))
    }

    /// Children referencing `parent`, in collection order.
    pub fn children_of<'c>(&self, children: &'c RecordStore<C>, parent: RecordId) -> Vec<&'c C> {
        children
            .get_all()
            .iter()
            .filter(|c| (self.reference)(c) == Some(parent))
            .collect()
    }

    /// Children whose reference points at a parent that does not exist.
    pub fn dangling<'c, P: Record>(
        &self,
        parents: &RecordStore<P>,
        children: &'c RecordStore<C>,
    ) -> Vec<&'c C> {
        children
            .get_all()
            .iter()
            .filter(|c| (self.reference)(c).is_some_and(|id| !parents.contains(id)))
            .collect()
    }
}

/// Checks that a reference names an existing parent.
pub(crate) fn validate_reference<P: Record>(
    name: &str,
    reference: Option<RecordId>,
    parents: &RecordStore<P>,
) -> Result<()> {
    match reference {
        Some(id) if !parents.contains(id) => Err(ValidationError::invalid_field(
            name,
            format!("references missing {} record {}", P::COLLECTION, id),
        )
        .into()),
        _ => Ok(()),
    }
}
