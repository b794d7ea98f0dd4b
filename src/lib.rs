//! # StashDB
//!
//! Embedded persistence engine for small on-device collections of
//! user-authored records.
//!
//! StashDB keeps typed records durable, keeps derived indexes in step with
//! them, answers multi-criteria queries, and moves data once from an old
//! storage layout to a new one without losing or duplicating anything.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use stashdb::prelude::*;
//!
//! // Open or create a database
//! let db = StashDB::open("./stash.db", Config::default())?;
//!
//! // Open a collection
//! let mut plants = db.open_store::<Plant>(Layout::documents_for::<Plant>())?;
//!
//! // Keep the tag picker in sync
//! let tags = std::sync::Arc::new(TagIndex::new("plant_tags", plant_tags));
//! plants.attach_index(tags.clone());
//!
//! // Mutate; success means the change is durable
//! let id = plants.insert_with(|id, now| Plant::new(id, "Fern", now))?;
//!
//! // Query
//! let filter = FilterSpec::new().any_of(["shade"], plant_tags, EmptySelection::MatchAll);
//! let sort = SortSpec::new().by_text(plant_name, Direction::Ascending);
//! let shady = plants.query(&filter, &sort);
//!
//! db.close()?;
//! ```
//!
//! ## Key Concepts
//!
//! ### Record store
//!
//! A [`RecordStore`] is the canonical in-memory copy of one collection. A
//! mutation returns success only after the change reached the backend; a
//! failed write leaves memory exactly as it was.
//!
//! ### Layouts
//!
//! A collection is either one blob ([`Layout::Blob`]) rewritten on every
//! change, or one document per record ([`Layout::Documents`]) written
//! individually.
//!
//! ### Derived indexes
//!
//! Secondary structures such as tag sets are rebuilt from the records after
//! every successful mutation, so they can never drift.
//!
//! ### Migration
//!
//! [`MigrationRunner`] moves legacy data once, guarded by a durable
//! `hasMigrated` marker.
//!
//! ## Thread Safety
//!
//! `StashDB` and every backend are `Send + Sync`. Stores mutate through
//! `&mut self`; wrap one in a `Mutex` to share it between threads.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_op_in_unsafe_fn)]

// ============================================================================
// Module declarations
// ============================================================================

mod config;
mod db;
mod error;
mod record;
mod types;

pub mod codec;
pub mod export;
pub mod index;
pub mod migration;
pub mod query;
pub mod relation;
pub mod storage;
pub mod store;

// ============================================================================
// Public API re-exports
// ============================================================================

// Main database interface
pub use db::StashDB;

// Configuration
pub use config::{Config, SyncMode, DEFAULT_MAX_VALUE_SIZE};

// Error handling
pub use error::{CodecError, Result, StashError, StorageError, ValidationError};

// Core types
pub use record::Record;
pub use types::{RecordId, Timestamp};

// Collections
pub use store::{Layout, RecordStore, StoreOptions};

// Indexes, queries, relations
pub use index::{DerivedIndex, ReferenceIndex, TagIndex};
pub use query::{Direction, EmptySelection, FilterSpec, SetMatch, SortSpec};
pub use relation::{CascadeOutcome, OnDelete, Relationship};

// Migration and export
pub use export::{ExportBundle, EXPORT_FORMAT_VERSION};
pub use migration::{
    CollectionStep, MigrationReport, MigrationRunner, MigrationState, MigrationStep, StepOutcome,
    ValueStep,
};

// Storage (for advanced users)
pub use storage::{DatabaseMetadata, FileStorage, MemoryStorage, RedbStorage, StorageBackend};

// ============================================================================
// Prelude module for convenient imports
// ============================================================================

/// Convenient imports for common StashDB usage.
///
/// ```rust
/// use stashdb::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::{Config, SyncMode};
    pub use crate::db::StashDB;
    pub use crate::error::{Result, StashError};
    pub use crate::index::{DerivedIndex, ReferenceIndex, TagIndex};
    pub use crate::query::{Direction, EmptySelection, FilterSpec, SortSpec};
    pub use crate::record::Record;
    pub use crate::relation::{OnDelete, Relationship};
    pub use crate::store::{Layout, RecordStore};
    pub use crate::types::{RecordId, Timestamp};
}
