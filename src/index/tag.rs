//! Distinct tag set across a collection.

use std::collections::BTreeSet;
use std::marker::PhantomData;
use std::sync::{PoisonError, RwLock};

use tracing::debug;

use super::DerivedIndex;

/// Distinct, case-insensitively sorted set of string values drawn from
/// every record.
///
/// Typical use is a tag picker: each record carries a list of tags and the
/// UI offers the union of all of them. Tags appear as soon as one record
/// uses them and disappear when the last record using them changes.
///
/// # Example
///
/// ```rust
/// use stashdb::index::{DerivedIndex, TagIndex};
///
/// struct Plant {
///     tags: Vec<String>,
/// }
///
/// fn plant_tags(p: &Plant) -> Vec<&str> {
///     p.tags.iter().map(String::as_str).collect()
/// }
///
/// let index = TagIndex::new("plant_tags", plant_tags);
/// index.rebuild(&[
///     Plant { tags: vec!["shade".into(), "Indoor".into()] },
///     Plant { tags: vec!["indoor".into(), "".into()] },
/// ]);
/// assert_eq!(index.tags(), vec!["Indoor", "indoor", "shade"]);
/// ```
pub struct TagIndex<R> {
    name: &'static str,
    values: fn(&R) -> Vec<&str>,
    tags: RwLock<Vec<String>>,
    _record: PhantomData<fn(&R)>,
}

impl<R> TagIndex<R> {
    /// Creates an empty index that reads values with `values`.
    pub fn new(name: &'static str, values: fn(&R) -> Vec<&str>) -> Self {
        Self {
            name,
            values,
            tags: RwLock::new(Vec::new()),
            _record: PhantomData,
        }
    }

    /// Returns the current tag set.
    pub fn tags(&self) -> Vec<String> {
        self.tags
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns true if some record currently carries `tag` (exact match).
    pub fn contains(&self, tag: &str) -> bool {
        self.tags
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|t| t == tag)
    }

    /// Number of distinct tags.
    pub fn len(&self) -> usize {
        self.tags.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Returns true if no record carries a tag.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<R> DerivedIndex<R> for TagIndex<R> {
    fn name(&self) -> &'static str {
        self.name
    }

    fn rebuild(&self, records: &[R]) {
        let tags = compute_distinct_tags(records, self.values);
        debug!(index = self.name, count = tags.len(), "Tag index rebuilt");
        *self.tags.write().unwrap_or_else(PoisonError::into_inner) = tags;
    }
}

impl<R> std::fmt::Debug for TagIndex<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TagIndex")
            .field("name", &self.name)
            .field("tags", &self.tags)
            .finish()
    }
}

/// Computes the distinct non-empty values across `records`.
///
/// Distinctness is by exact string, so `"Indoor"` and `"indoor"` are two
/// tags. The result is sorted case-insensitively, with the exact string
/// breaking ties.
pub fn compute_distinct_tags<R>(records: &[R], values: fn(&R) -> Vec<&str>) -> Vec<String> {
    let distinct: BTreeSet<&str> = records
        .iter()
        .flat_map(values)
        .filter(|v| !v.is_empty())
        .collect();

    let mut tags: Vec<String> = distinct.into_iter().map(str::to_string).collect();
    tags.sort_by_cached_key(|t| (t.to_lowercase(), t.clone()));
    tags
}
