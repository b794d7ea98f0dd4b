//! The record contract.
//!
//! A record is a user-authored value with a stable identity. The engine only
//! needs three things from it: where its collection lives, its identifier,
//! and how to stamp a modification time.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::types::{RecordId, Timestamp};

/// A typed value stored in a [`RecordStore`](crate::RecordStore).
///
/// # Example
///
/// ```rust
/// use serde::{Deserialize, Serialize};
/// use stashdb::{Record, RecordId, Timestamp};
///
/// #[derive(Clone, Debug, Serialize, Deserialize)]
/// struct Plant {
///     id: RecordId,
///     name: String,
///     #[serde(default)]
///     tags: Vec<String>,
///     #[serde(default)]
///     updated_at: Timestamp,
/// }
///
/// impl Record for Plant {
///     const COLLECTION: &'static str = "plants";
///
///     fn id(&self) -> RecordId {
///         self.id
///     }
///
///     fn touch(&mut self, now: Timestamp) {
///         self.updated_at = now;
///     }
/// }
/// ```
pub trait Record: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Stable storage name of the collection.
    ///
    /// Used as the blob key and as the document key prefix. Changing it
    /// orphans existing data unless a migration step moves it.
    const COLLECTION: &'static str;

    /// The record's immutable identifier.
    fn id(&self) -> RecordId;

    /// Called with the current time whenever the record is updated.
    fn touch(&mut self, now: Timestamp) {
        let _ = now;
    }
}
