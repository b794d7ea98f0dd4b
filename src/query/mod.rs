//! Filtering and sorting over a collection.
//!
//! [`query`] is a pure function: it reads a slice of records, keeps those
//! passing a [`FilterSpec`], and orders them by a [`SortSpec`]. It never
//! mutates or copies records, and the same inputs always give the same
//! output.

mod filter;
mod sort;

pub use filter::{Clause, EmptySelection, FilterSpec, SetMatch};
pub use sort::{Direction, SortKey, SortSpec};

/// Returns the records passing `filter`, ordered by `sort`.
///
/// Records equal under every sort key keep their order in `records`.
pub fn query<'a, R>(records: &'a [R], filter: &FilterSpec<R>, sort: &SortSpec<R>) -> Vec<&'a R> {
    let mut matched: Vec<&R> = records.iter().filter(|r| filter.matches(r)).collect();
    sort.sort_refs(&mut matched);
    matched
}
