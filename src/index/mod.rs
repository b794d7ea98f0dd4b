//! Derived indexes over a record collection.
//!
//! A derived index is a secondary structure computed from the primary
//! records. It is never a source of truth and never edited by hand: the
//! owning [`RecordStore`](crate::RecordStore) recomputes it from scratch
//! after open, after reload, and after every successful mutation. If an
//! index ever looks wrong, rebuilding it from the records is always correct.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────┐
//! │   DerivedIndex<R> trait          │
//! └──────────┬───────────────────────┘
//!            │
//!    ┌───────┴────────┬─────────────────┐
//!    │   TagIndex     │ ReferenceIndex  │
//!    └────────────────┴─────────────────┘
//! ```

mod reference;
mod tag;

pub use reference::ReferenceIndex;
pub use tag::{compute_distinct_tags, TagIndex};

/// A secondary structure recomputed from a collection.
///
/// `rebuild` takes `&self`; implementations keep their state behind
/// interior mutability so readers can hold the index through an `Arc`
/// while the store rebuilds it.
pub trait DerivedIndex<R>: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Replaces the index contents with values computed from `records`.
    ///
    /// Must be a pure function of `records`: calling it twice with the same
    /// input leaves the same state.
    fn rebuild(&self, records: &[R]);
}
