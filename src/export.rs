//! Typed export bundles.
//!
//! An export is a versioned envelope around application-defined sections.
//! The section type is normally a serde-tagged enum with one variant per
//! exported collection, so the payload is self-describing without falling
//! back to untyped maps.
//!
//! # Example
//!
//! ```rust
//! use serde::{Deserialize, Serialize};
//! use stashdb::export::ExportBundle;
//!
//! #[derive(Debug, PartialEq, Serialize, Deserialize)]
//! #[serde(tag = "kind", content = "items", rename_all = "snake_case")]
//! enum Section {
//!     Plants(Vec<String>),
//!     Settings(bool),
//! }
//!
//! let bundle = ExportBundle::new(vec![
//!     Section::Plants(vec!["Fern".into()]),
//!     Section::Settings(true),
//! ]);
//! let bytes = bundle.to_bytes().unwrap();
//! let restored: ExportBundle<Section> = ExportBundle::from_bytes(&bytes).unwrap();
//! assert_eq!(restored.sections, bundle.sections);
//! ```

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::codec;
use crate::error::{Result, ValidationError};
use crate::record::Record;
use crate::store::RecordStore;
use crate::types::Timestamp;

/// Current export format version.
///
/// Bundles written by newer versions are rejected on import.
pub const EXPORT_FORMAT_VERSION: u32 = 1;

/// Versioned envelope around exported sections.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExportBundle<S> {
    /// Format version the bundle was written with.
    pub format_version: u32,

    /// When the bundle was created.
    pub exported_at: Timestamp,

    /// Exported data, one entry per collection.
    pub sections: Vec<S>,
}

#[derive(Deserialize)]
struct Header {
    format_version: u32,
}

impl<S> ExportBundle<S> {
    /// Creates a bundle stamped with the current version and time.
    pub fn new(sections: Vec<S>) -> Self {
        Self {
            format_version: EXPORT_FORMAT_VERSION,
            exported_at: Timestamp::now(),
            sections,
        }
    }

    /// Appends a section.
    pub fn push(&mut self, section: S) {
        self.sections.push(section);
    }
}

impl<S: Serialize> ExportBundle<S> {
    /// Serializes the bundle to JSON.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        codec::encode(self)
    }
}

impl<S: DeserializeOwned> ExportBundle<S> {
    /// Parses a bundle.
    ///
    /// # Errors
    ///
    /// - [`ValidationError::InvalidField`] if the bundle was written by a
    ///   newer format version
    /// - [`CodecError::Decode`](crate::CodecError::Decode) if the
    ///   bytes are not a bundle
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let header: Header = codec::decode(bytes)?;
        if header.format_version > EXPORT_FORMAT_VERSION {
            return Err(ValidationError::invalid_field(
                "format_version",
                format!(
                    "bundle version {} is newer than supported version {}",
                    header.format_version, EXPORT_FORMAT_VERSION
                ),
            )
            .into());
        }

        let bundle: Self = codec::decode(bytes)?;
        debug!(
            format_version = bundle.format_version,
            sections = bundle.sections.len(),
            "Export bundle parsed"
        );
        Ok(bundle)
    }
}

/// Adds every record whose id is not already in `store`.
///
/// Returns the number of records added. Records already present are left
/// as they are, so importing the same bundle twice adds nothing the second
/// time.
pub fn merge_into<R: Record>(store: &mut RecordStore<R>, records: Vec<R>) -> Result<usize> {
    let mut added = 0;
    for record in records {
        if store.contains(record.id()) {
            continue;
        }
        store.add(record)?;
        added += 1;
    }
    debug!(collection = R::COLLECTION, added = added, "Records imported");
    Ok(added)
}
