//! Multi-key sorting.

use std::cmp::Ordering;
use std::fmt;

use crate::types::Timestamp;

/// Sort direction for one key.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Direction {
    /// Smallest first.
    #[default]
    Ascending,
    /// Largest first.
    Descending,
}

impl Direction {
    fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            Direction::Ascending => ordering,
            Direction::Descending => ordering.reverse(),
        }
    }
}

/// A value to sort by.
pub enum SortKey<R> {
    /// Case-insensitive text.
    Text(fn(&R) -> &str),
    /// Optional number. Records without a value go last in either
    /// direction.
    Number(fn(&R) -> Option<f64>),
    /// Timestamp.
    Time(fn(&R) -> Timestamp),
}

impl<R> SortKey<R> {
    fn compare(&self, a: &R, b: &R, direction: Direction) -> Ordering {
        match self {
            SortKey::Text(text) => {
                direction.apply(text(a).to_lowercase().cmp(&text(b).to_lowercase()))
            }
            SortKey::Number(number) => match (number(a), number(b)) {
                (Some(x), Some(y)) => direction.apply(x.total_cmp(&y)),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            },
            SortKey::Time(time) => direction.apply(time(a).cmp(&time(b))),
        }
    }
}

/// Ordered list of sort keys.
///
/// Records equal under one key are compared by the next. Records equal
/// under every key keep their collection order, since sorting is stable.
///
/// # Example
///
/// ```rust
/// use stashdb::query::{Direction, SortSpec};
///
/// struct Task {
///     title: String,
///     priority: Option<f64>,
/// }
///
/// fn priority(t: &Task) -> Option<f64> {
///     t.priority
/// }
/// fn title(t: &Task) -> &str {
///     &t.title
/// }
///
/// let sort = SortSpec::new()
///     .by_number(priority, Direction::Descending)
///     .by_text(title, Direction::Ascending);
///
/// let mut tasks = vec![
///     Task { title: "b".into(), priority: None },
///     Task { title: "a".into(), priority: Some(1.0) },
///     Task { title: "c".into(), priority: Some(3.0) },
/// ];
/// sort.sort(&mut tasks);
/// let titles: Vec<_> = tasks.iter().map(|t| t.title.as_str()).collect();
/// assert_eq!(titles, ["c", "a", "b"]);
/// ```
pub struct SortSpec<R> {
    keys: Vec<(SortKey<R>, Direction)>,
}

impl<R> Default for SortSpec<R> {
    fn default() -> Self {
        Self { keys: Vec::new() }
    }
}

impl<R> SortSpec<R> {
    /// Creates an empty sort (collection order).
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps collection (insertion) order.
    pub fn insertion() -> Self {
        Self::default()
    }

    /// Appends a key.
    pub fn then(mut self, key: SortKey<R>, direction: Direction) -> Self {
        self.keys.push((key, direction));
        self
    }

    /// Appends a case-insensitive text key.
    pub fn by_text(self, value: fn(&R) -> &str, direction: Direction) -> Self {
        self.then(SortKey::Text(value), direction)
    }

    /// Appends a numeric key.
    pub fn by_number(self, value: fn(&R) -> Option<f64>, direction: Direction) -> Self {
        self.then(SortKey::Number(value), direction)
    }

    /// Appends a timestamp key.
    pub fn by_time(self, value: fn(&R) -> Timestamp, direction: Direction) -> Self {
        self.then(SortKey::Time(value), direction)
    }

    /// Returns true if sorting leaves collection order unchanged.
    pub fn is_insertion(&self) -> bool {
        self.keys.is_empty()
    }

    /// Compares two records under every key in turn.
    pub fn compare(&self, a: &R, b: &R) -> Ordering {
        self.keys
            .iter()
            .map(|(key, direction)| key.compare(a, b, *direction))
            .find(|ordering| ordering.is_ne())
            .unwrap_or(Ordering::Equal)
    }

    /// Sorts `records` in place (stable).
    pub fn sort(&self, records: &mut [R]) {
        if !self.is_insertion() {
            records.sort_by(|a, b| self.compare(a, b));
        }
    }

    /// Sorts a slice of references in place (stable).
    pub fn sort_refs(&self, records: &mut [&R]) {
        if !self.is_insertion() {
            records.sort_by(|a, b| self.compare(a, b));
        }
    }
}

impl<R> fmt::Debug for SortSpec<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.keys.iter().map(|(key, direction)| {
                let kind = match key {
                    SortKey::Text(_) => "text",
                    SortKey::Number(_) => "number",
                    SortKey::Time(_) => "time",
                };
                (kind, direction)
            }))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Entry {
        label: &'static str,
        title: String,
        rating: Option<f64>,
        created: Timestamp,
    }

    fn entry(label: &'static str, title: &str, rating: Option<f64>, created: i64) -> Entry {
        Entry {
            label,
            title: title.to_string(),
            rating,
            created: Timestamp::from_millis(created),
        }
    }

    fn title(e: &Entry) -> &str {
        &e.title
    }
    fn rating(e: &Entry) -> Option<f64> {
        e.rating
    }
    fn created(e: &Entry) -> Timestamp {
        e.created
    }

    fn labels(entries: &[Entry]) -> Vec<&'static str> {
        entries.iter().map(|e| e.label).collect()
    }

    #[test]
    fn test_insertion_keeps_order() {
        let mut entries = vec![entry("x", "b", None, 2), entry("y", "a", None, 1)];
        SortSpec::insertion().sort(&mut entries);
        assert_eq!(labels(&entries), vec!["x", "y"]);
    }

    #[test]
    fn test_text_is_case_insensitive() {
        let mut entries = vec![
            entry("1", "banana", None, 0),
            entry("2", "Apple", None, 0),
            entry("3", "cherry", None, 0),
        ];
        SortSpec::new()
            .by_text(title, Direction::Ascending)
            .sort(&mut entries);
        assert_eq!(labels(&entries), vec!["2", "1", "3"]);
    }

    #[test]
    fn test_number_none_last_in_both_directions() {
        let make = || {
            vec![
                entry("none", "a", None, 0),
                entry("low", "b", Some(1.0), 0),
                entry("high", "c", Some(5.0), 0),
            ]
        };

        let mut asc = make();
        SortSpec::new()
            .by_number(rating, Direction::Ascending)
            .sort(&mut asc);
        assert_eq!(labels(&asc), vec!["low", "high", "none"]);

        let mut desc = make();
        SortSpec::new()
            .by_number(rating, Direction::Descending)
            .sort(&mut desc);
        assert_eq!(labels(&desc), vec!["high", "low", "none"]);
    }

    #[test]
    fn test_ties_fall_through_then_keep_insertion_order() {
        let mut entries = vec![
            entry("first", "same", Some(2.0), 10),
            entry("second", "same", Some(2.0), 10),
            entry("newer", "same", Some(2.0), 20),
            entry("best", "other", Some(9.0), 0),
        ];
        SortSpec::new()
            .by_number(rating, Direction::Descending)
            .by_time(created, Direction::Descending)
            .sort(&mut entries);
        assert_eq!(labels(&entries), vec!["best", "newer", "first", "second"]);
    }

    #[test]
    fn test_sort_refs_matches_sort() {
        let entries = vec![entry("b", "b", None, 0), entry("a", "a", None, 0)];
        let mut refs: Vec<&Entry> = entries.iter().collect();
        SortSpec::new()
            .by_text(title, Direction::Ascending)
            .sort_refs(&mut refs);
        assert_eq!(refs[0].label, "a");
    }
}
