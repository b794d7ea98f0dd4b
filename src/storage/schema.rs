//! Persisted layout definitions and versioning.
//!
//! This module defines the table structure for the redb key-value backend
//! and the stable key names shared by every backend. All definitions are
//! compile-time constants so key names never drift between releases.
//!
//! # Schema Versioning
//!
//! The schema version is stored in the metadata table. When opening an
//! existing database, we check the version and fail if it doesn't match.
//! Collection payload changes do not bump this version: record types evolve
//! through field defaults in the JSON codec.
//!
//! # Table Layout
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │ METADATA_TABLE                                               │
//! │   Key: &str                                                  │
//! │   Value: &[u8] (bincode DatabaseMetadata)                    │
//! │   Entries: "db_metadata" -> DatabaseMetadata                 │
//! └─────────────────────────────────────────────────────────────┘
//!
//! ┌─────────────────────────────────────────────────────────────┐
//! │ BLOBS_TABLE                                                  │
//! │   Key: &str (collection key, "hasMigrated", ...)             │
//! │   Value: &[u8] (JSON payload)                                │
//! └─────────────────────────────────────────────────────────────┘
//! ```

use redb::TableDefinition;
use serde::{Deserialize, Serialize};

use crate::types::Timestamp;

/// Current schema version.
///
/// Increment this when making breaking changes to the table layout.
/// The database will refuse to open if versions don't match.
pub const SCHEMA_VERSION: u32 = 1;

/// Maximum length of a storage key in bytes.
pub const MAX_KEY_LENGTH: usize = 200;

/// Durable boolean gating the one-shot migration.
pub const MIGRATION_MARKER_KEY: &str = "hasMigrated";

/// Suffix appended to a key when its undecodable bytes are quarantined.
pub const QUARANTINE_SUFFIX: &str = ".corrupt";

/// Separator between a collection name and a record id in document keys.
pub const DOCUMENT_KEY_SEPARATOR: &str = "-";

// ============================================================================
// Table Definitions
// ============================================================================

/// Metadata table for database-level information.
///
/// Stores schema version and lifecycle timestamps.
pub const METADATA_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("metadata");

/// Named blobs table.
///
/// Key: stable key name chosen at development time
/// Value: opaque bytes (JSON-encoded collections and flags)
pub const BLOBS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("blobs");

// ============================================================================
// Database Metadata
// ============================================================================

/// Database metadata stored in the metadata table.
///
/// This is serialized with bincode and stored under the key "db_metadata".
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DatabaseMetadata {
    /// Schema version for compatibility checking.
    pub schema_version: u32,

    /// Timestamp when the database was created.
    pub created_at: Timestamp,

    /// Last time the database was opened (updated on each open).
    pub last_opened_at: Timestamp,
}

impl DatabaseMetadata {
    /// Creates new metadata for a fresh database.
    pub fn new() -> Self {
        let now = Timestamp::now();
        Self {
            schema_version: SCHEMA_VERSION,
            created_at: now,
            last_opened_at: now,
        }
    }

    /// Updates the last_opened_at timestamp.
    pub fn touch(&mut self) {
        self.last_opened_at = Timestamp::now();
    }

    /// Checks if this metadata is compatible with the current schema.
    pub fn is_compatible(&self) -> bool {
        self.schema_version == SCHEMA_VERSION
    }
}

impl Default for DatabaseMetadata {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Key Helpers
// ============================================================================

/// Key prefix under which a collection's documents are stored.
#[inline]
pub fn document_prefix(collection: &str) -> String {
    format!("{}{}", collection, DOCUMENT_KEY_SEPARATOR)
}

/// Key under which undecodable bytes for `key` are preserved.
#[inline]
pub fn quarantine_key(key: &str) -> String {
    format!("{}{}", key, QUARANTINE_SUFFIX)
}
