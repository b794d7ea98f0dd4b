//! Composable record filters.
//!
//! A [`FilterSpec`] is a list of [`Clause`]s combined with AND. A clause
//! with nothing to filter on (blank search text, no bounds, an empty
//! selection that means "all") is inactive and skipped, so an untouched
//! filter panel matches every record.

use std::collections::BTreeSet;
use std::fmt;

/// How a membership clause compares the record's values to the selection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SetMatch {
    /// The record has at least one selected value.
    #[default]
    Any,
    /// The record has every selected value.
    All,
}

/// What an empty selection means for a membership clause.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EmptySelection {
    /// Nothing selected means no filtering.
    #[default]
    MatchAll,
    /// Nothing selected means nothing matches.
    MatchNone,
}

/// One filter criterion.
pub enum Clause<R> {
    /// Case-insensitive substring search over one or more text fields.
    ///
    /// Matches if any field contains the query. A field returning `None`
    /// does not match.
    Text {
        /// Search text; surrounding whitespace is ignored.
        query: String,
        /// Fields searched.
        fields: Vec<fn(&R) -> Option<&str>>,
    },

    /// Set comparison between selected values and the record's values.
    Membership {
        /// Values picked by the user.
        selected: BTreeSet<String>,
        /// The record's values.
        values: fn(&R) -> Vec<&str>,
        /// Any or all.
        mode: SetMatch,
        /// Meaning of an empty selection.
        empty: EmptySelection,
    },

    /// Inclusive numeric bounds. A record without a value fails.
    Range {
        /// Lower bound, inclusive.
        min: Option<f64>,
        /// Upper bound, inclusive.
        max: Option<f64>,
        /// The record's value.
        value: fn(&R) -> Option<f64>,
    },

    /// Boolean equality.
    Flag {
        /// The record's flag.
        value: fn(&R) -> bool,
        /// Required flag value.
        expected: bool,
    },
}

impl<R> Clause<R> {
    /// Returns false if the clause currently filters nothing.
    pub fn is_active(&self) -> bool {
        match self {
            Clause::Text { query, fields } => !query.trim().is_empty() && !fields.is_empty(),
            Clause::Membership {
                selected, empty, ..
            } => !selected.is_empty() || *empty == EmptySelection::MatchNone,
            Clause::Range { min, max, .. } => min.is_some() || max.is_some(),
            Clause::Flag { .. } => true,
        }
    }

    /// Evaluates the clause against one record.
    ///
    /// Inactive clauses match everything.
    pub fn matches(&self, record: &R) -> bool {
        if !self.is_active() {
            return true;
        }

        match self {
            Clause::Text { query, fields } => {
                let needle = query.trim().to_lowercase();
                fields.iter().any(|field| {
                    field(record).is_some_and(|text| text.to_lowercase().contains(&needle))
                })
            }
            Clause::Membership {
                selected,
                values,
                mode,
                ..
            } => {
                if selected.is_empty() {
                    // Only reachable with EmptySelection::MatchNone
                    return false;
                }
                let have = values(record);
                match mode {
                    SetMatch::Any => have.iter().any(|v| selected.contains(*v)),
                    SetMatch::All => selected.iter().all(|s| have.contains(&s.as_str())),
                }
            }
            Clause::Range { min, max, value } => match value(record) {
                Some(v) => min.is_none_or(|lo| v >= lo) && max.is_none_or(|hi| v <= hi),
                None => false,
            },
            Clause::Flag { value, expected } => value(record) == *expected,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Clause::Text { .. } => "text",
            Clause::Membership { .. } => "membership",
            Clause::Range { .. } => "range",
            Clause::Flag { .. } => "flag",
        }
    }
}

impl<R> fmt::Debug for Clause<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Clause::Text { query, fields } => f
                .debug_struct("Text")
                .field("query", query)
                .field("fields", &fields.len())
                .finish(),
            Clause::Membership {
                selected,
                mode,
                empty,
                ..
            } => f
                .debug_struct("Membership")
                .field("selected", selected)
                .field("mode", mode)
                .field("empty", empty)
                .finish(),
            Clause::Range { min, max, .. } => f
                .debug_struct("Range")
                .field("min", min)
                .field("max", max)
                .finish(),
            Clause::Flag { expected, .. } => f
                .debug_struct("Flag")
                .field("expected", expected)
                .finish(),
        }
    }
}

/// A conjunction of clauses.
///
/// # Example
///
/// ```rust
/// use stashdb::query::FilterSpec;
///
/// struct Recipe {
///     title: String,
///     minutes: Option<f64>,
///     favourite: bool,
/// }
///
/// fn title(r: &Recipe) -> Option<&str> {
///     Some(&r.title)
/// }
/// fn minutes(r: &Recipe) -> Option<f64> {
///     r.minutes
/// }
/// fn favourite(r: &Recipe) -> bool {
///     r.favourite
/// }
///
/// let filter = FilterSpec::new()
///     .text("soup", title)
///     .range(None, Some(30.0), minutes)
///     .flag(favourite, true);
///
/// let quick = Recipe { title: "Tomato Soup".into(), minutes: Some(20.0), favourite: true };
/// let slow = Recipe { title: "Bone broth soup".into(), minutes: Some(600.0), favourite: true };
/// assert!(filter.matches(&quick));
/// assert!(!filter.matches(&slow));
/// ```
pub struct FilterSpec<R> {
    clauses: Vec<Clause<R>>,
}

impl<R> Default for FilterSpec<R> {
    fn default() -> Self {
        Self {
            clauses: Vec::new(),
        }
    }
}

impl<R> FilterSpec<R> {
    /// Creates a filter with no clauses (matches everything).
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a clause.
    pub fn with(mut self, clause: Clause<R>) -> Self {
        self.clauses.push(clause);
        self
    }

    /// Adds a case-insensitive substring clause over one field.
    pub fn text(self, query: impl Into<String>, field: fn(&R) -> Option<&str>) -> Self {
        self.text_any(query, vec![field])
    }

    /// Adds a case-insensitive substring clause matching if any of
    /// `fields` contains the query.
    pub fn text_any(self, query: impl Into<String>, fields: Vec<fn(&R) -> Option<&str>>) -> Self {
        self.with(Clause::Text {
            query: query.into(),
            fields,
        })
    }

    /// Adds a membership clause matching records with any selected value.
    pub fn any_of<I, S>(self, selected: I, values: fn(&R) -> Vec<&str>, empty: EmptySelection) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.with(Clause::Membership {
            selected: selected.into_iter().map(Into::into).collect(),
            values,
            mode: SetMatch::Any,
            empty,
        })
    }

    /// Adds a membership clause matching records with every selected value.
    pub fn all_of<I, S>(self, selected: I, values: fn(&R) -> Vec<&str>, empty: EmptySelection) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.with(Clause::Membership {
            selected: selected.into_iter().map(Into::into).collect(),
            values,
            mode: SetMatch::All,
            empty,
        })
    }

    /// Adds an inclusive numeric range clause.
    pub fn range(self, min: Option<f64>, max: Option<f64>, value: fn(&R) -> Option<f64>) -> Self {
        self.with(Clause::Range { min, max, value })
    }

    /// Adds a boolean equality clause.
    pub fn flag(self, value: fn(&R) -> bool, expected: bool) -> Self {
        self.with(Clause::Flag { value, expected })
    }

    /// Appends a clause in place.
    pub fn push(&mut self, clause: Clause<R>) {
        self.clauses.push(clause);
    }

    /// Removes and returns the clause at `index`, if any.
    pub fn remove(&mut self, index: usize) -> Option<Clause<R>> {
        (index < self.clauses.len()).then(|| self.clauses.remove(index))
    }

    /// The clauses, in the order they were added.
    pub fn clauses(&self) -> &[Clause<R>] {
        &self.clauses
    }

    /// Returns true if at least one clause filters something.
    pub fn is_active(&self) -> bool {
        self.clauses.iter().any(Clause::is_active)
    }

    /// Returns true if `record` passes every active clause.
    pub fn matches(&self, record: &R) -> bool {
        self.clauses.iter().all(|clause| clause.matches(record))
    }
}

impl<R> fmt::Debug for FilterSpec<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.clauses.iter().map(Clause::kind))
            .finish()
    }
}
