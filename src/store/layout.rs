//! How a collection maps onto backend keys.

use crate::record::Record;
use crate::storage::schema::document_prefix;
use crate::types::RecordId;

/// Physical arrangement of a collection in a backend.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Layout {
    /// Whole collection as one JSON array under `key`.
    ///
    /// Every mutation rewrites the array.
    Blob {
        /// Backend key holding the array.
        key: String,
    },

    /// One JSON document per record under `<prefix><id>`.
    ///
    /// Every mutation writes only the documents it touches.
    Documents {
        /// Key prefix shared by the collection's documents.
        prefix: String,
    },
}

impl Layout {
    /// Blob layout keyed by `R::COLLECTION`.
    pub fn blob_for<R: Record>() -> Self {
        Layout::Blob {
            key: R::COLLECTION.to_string(),
        }
    }

    /// Documents layout prefixed by `R::COLLECTION` and a separator.
    pub fn documents_for<R: Record>() -> Self {
        Layout::Documents {
            prefix: document_prefix(R::COLLECTION),
        }
    }

    /// Key of the document holding `id`, or `None` for the blob layout.
    pub fn document_key(&self, id: RecordId) -> Option<String> {
        match self {
            Layout::Blob { .. } => None,
            Layout::Documents { prefix } => Some(format!("{}{}", prefix, id)),
        }
    }

    /// Parses the record id out of a document key.
    pub(crate) fn id_from_document_key(&self, key: &str) -> Option<RecordId> {
        match self {
            Layout::Blob { .. } => None,
            Layout::Documents { prefix } => key.strip_prefix(prefix.as_str())?.parse().ok(),
        }
    }

    /// Key or prefix, for logs.
    pub fn location(&self) -> &str {
        match self {
            Layout::Blob { key } => key,
            Layout::Documents { prefix } => prefix,
        }
    }
}
