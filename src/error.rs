//! Error types for StashDB.
//!
//! StashDB uses a hierarchical error system:
//! - `StashError` is the top-level error returned by all public APIs
//! - Specific error types (`StorageError`, `CodecError`, `ValidationError`)
//!   provide detail
//!
//! # Degradation Rules
//!
//! - Decode failures of stored data are recovered locally (the collection
//!   opens empty) and only surface through logs.
//! - Write failures always reach the caller of the mutating operation.
//! - Library code never panics on bad data.
//!
//! # Error Handling Pattern
//! ```rust,ignore
//! use stashdb::{StashDB, Config, Result};
//!
//! fn example() -> Result<()> {
//!     let db = StashDB::open("./stash.db", Config::default())?;
//!     // ... operations that may fail ...
//!     db.close()?;
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// Result type alias for StashDB operations.
pub type Result<T> = std::result::Result<T, StashError>;

/// Top-level error enum for all StashDB operations.
///
/// This is the only error type returned by public APIs.
/// Use pattern matching to handle specific error cases.
#[derive(Debug, Error)]
pub enum StashError {
    /// Storage layer error (corruption, transactions, engine failures).
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Record encoding or decoding error.
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    /// Input validation error.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Configuration error.
    #[error("Configuration error: {reason}")]
    Config {
        /// Description of what's wrong with the configuration.
        reason: String,
    },

    /// General I/O error (file backend reads and writes).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StashError {
    /// Creates a configuration error with the given reason.
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config {
            reason: reason.into(),
        }
    }

    /// Returns true if this is a validation error.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if this is a storage error.
    pub fn is_storage(&self) -> bool {
        matches!(self, Self::Storage(_))
    }

    /// Returns true if this is a codec error.
    pub fn is_codec(&self) -> bool {
        matches!(self, Self::Codec(_))
    }

    /// Returns true if this is an I/O error.
    pub fn is_io(&self) -> bool {
        matches!(self, Self::Io(_))
    }
}

/// Storage-related errors.
///
/// These errors indicate problems with the underlying storage engine.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Database file or data is corrupted.
    #[error("Database corrupted: {0}")]
    Corrupted(String),

    /// Database is locked by another process.
    #[error("Database is locked by another writer")]
    DatabaseLocked,

    /// Transaction failed (commit, rollback, etc.).
    #[error("Transaction failed: {0}")]
    Transaction(String),

    /// Serialization of internal metadata failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Error from the redb storage engine.
    #[error("Storage engine error: {0}")]
    Redb(String),

    /// Database schema version doesn't match expected version.
    #[error("Schema version mismatch: expected {expected}, found {found}")]
    SchemaVersionMismatch {
        /// Expected schema version.
        expected: u32,
        /// Actual schema version found in database.
        found: u32,
    },

    /// A lock guarding in-memory state was poisoned by a panicking thread.
    #[error("Lock poisoned: {0}")]
    Poisoned(String),
}

impl StorageError {
    /// Creates a corruption error with the given message.
    pub fn corrupted(msg: impl Into<String>) -> Self {
        Self::Corrupted(msg.into())
    }

    /// Creates a serialization error with the given message.
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }

    /// Creates a poisoned-lock error with the given message.
    pub fn poisoned(msg: impl Into<String>) -> Self {
        Self::Poisoned(msg.into())
    }
}

// Conversions from redb error types
impl From<redb::Error> for StorageError {
    fn from(err: redb::Error) -> Self {
        StorageError::Redb(err.to_string())
    }
}

impl From<redb::DatabaseError> for StorageError {
    fn from(err: redb::DatabaseError) -> Self {
        StorageError::Redb(err.to_string())
    }
}

impl From<redb::TransactionError> for StorageError {
    fn from(err: redb::TransactionError) -> Self {
        StorageError::Transaction(err.to_string())
    }
}

impl From<redb::CommitError> for StorageError {
    fn from(err: redb::CommitError) -> Self {
        StorageError::Transaction(format!("Commit failed: {}", err))
    }
}

impl From<redb::TableError> for StorageError {
    fn from(err: redb::TableError) -> Self {
        StorageError::Redb(format!("Table error: {}", err))
    }
}

impl From<redb::StorageError> for StorageError {
    fn from(err: redb::StorageError) -> Self {
        StorageError::Redb(format!("Storage error: {}", err))
    }
}

// Also allow direct conversion to StashError for convenience
impl From<redb::Error> for StashError {
    fn from(err: redb::Error) -> Self {
        StashError::Storage(StorageError::from(err))
    }
}

impl From<redb::DatabaseError> for StashError {
    fn from(err: redb::DatabaseError) -> Self {
        StashError::Storage(StorageError::from(err))
    }
}

impl From<redb::TransactionError> for StashError {
    fn from(err: redb::TransactionError) -> Self {
        StashError::Storage(StorageError::from(err))
    }
}

impl From<redb::CommitError> for StashError {
    fn from(err: redb::CommitError) -> Self {
        StashError::Storage(StorageError::from(err))
    }
}

impl From<redb::TableError> for StashError {
    fn from(err: redb::TableError) -> Self {
        StashError::Storage(StorageError::from(err))
    }
}

impl From<redb::StorageError> for StashError {
    fn from(err: redb::StorageError) -> Self {
        StashError::Storage(StorageError::from(err))
    }
}

/// Record encoding and decoding errors.
///
/// `Encode` should not happen for well-typed records and indicates a
/// programmer error. `Decode` means stored bytes are truncated or
/// structurally invalid.
#[derive(Debug, Error)]
pub enum CodecError {
    /// A value could not be serialized.
    #[error("Encode failed: {0}")]
    Encode(String),

    /// Stored bytes could not be deserialized.
    #[error("Decode failed: {0}")]
    Decode(String),
}

impl CodecError {
    /// Creates an encode error with the given message.
    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }

    /// Returns true if this is a decode error.
    pub fn is_decode(&self) -> bool {
        matches!(self, Self::Decode(_))
    }
}

// serde_json errors surface while reading stored payloads
impl From<serde_json::Error> for CodecError {
    fn from(err: serde_json::Error) -> Self {
        CodecError::Decode(err.to_string())
    }
}

impl From<serde_json::Error> for StashError {
    fn from(err: serde_json::Error) -> Self {
        StashError::Codec(CodecError::from(err))
    }
}

/// Validation errors for input data.
///
/// These errors indicate problems with data provided by the caller.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A field has an invalid value.
    #[error("Invalid field '{field}': {reason}")]
    InvalidField {
        /// Name of the invalid field.
        field: String,
        /// Why the value is invalid.
        reason: String,
    },

    /// A storage key is not acceptable to the backend.
    #[error("Invalid key '{key}': {reason}")]
    InvalidKey {
        /// The rejected key.
        key: String,
        /// Why the key is invalid.
        reason: String,
    },

    /// Value exceeds maximum allowed size.
    #[error("Content too large: {size} bytes (max: {max} bytes)")]
    ContentTooLarge {
        /// Actual content size in bytes.
        size: usize,
        /// Maximum allowed size in bytes.
        max: usize,
    },

    /// A record with this identifier already exists in the collection.
    #[error("Duplicate record id in '{collection}': {id}")]
    DuplicateId {
        /// Collection the insert targeted.
        collection: String,
        /// The identifier that already exists.
        id: String,
    },

    /// A required field is missing or empty.
    #[error("Required field missing: {field}")]
    RequiredField {
        /// Name of the missing field.
        field: String,
    },
}

impl ValidationError {
    /// Creates an invalid field error.
    pub fn invalid_field(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Creates an invalid key error.
    pub fn invalid_key(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidKey {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Creates a content too large error.
    pub fn content_too_large(size: usize, max: usize) -> Self {
        Self::ContentTooLarge { size, max }
    }

    /// Creates a duplicate id error.
    pub fn duplicate_id(collection: impl Into<String>, id: impl ToString) -> Self {
        Self::DuplicateId {
            collection: collection.into(),
            id: id.to_string(),
        }
    }

    /// Creates a required field error.
    pub fn required_field(field: impl Into<String>) -> Self {
        Self::RequiredField {
            field: field.into(),
        }
    }
}
