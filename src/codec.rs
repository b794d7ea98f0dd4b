//! Record payload encoding.
//!
//! Payloads are field-named JSON. Unknown fields are ignored on read and
//! fields missing from older payloads take the defaults declared with
//! `#[serde(default)]` on the record type, so records can gain fields
//! without a migration.
//!
//! A collection decodes as one unit: either every record decodes, or the
//! collection is reported [`Decoded::Corrupt`]. Callers never see a partly
//! decoded collection.

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{CodecError, Result};
use crate::storage::schema::quarantine_key;
use crate::storage::StorageBackend;

/// Serializes a value to JSON bytes.
///
/// # Errors
///
/// Returns [`CodecError::Encode`] if the value cannot be represented, e.g. a
/// map with non-string keys. This indicates a programming error in the
/// record type.
pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| CodecError::encode(e.to_string()).into())
}

/// Deserializes a value from JSON bytes.
///
/// # Errors
///
/// Returns [`CodecError::Decode`] if the bytes are truncated or do not match
/// the expected shape.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    serde_json::from_slice(bytes).map_err(|e| CodecError::from(e).into())
}

/// Outcome of decoding a stored collection.
#[derive(Debug)]
pub enum Decoded<R> {
    /// Every record decoded.
    Records(Vec<R>),
    /// The payload could not be decoded as a whole.
    Corrupt(CodecError),
}

impl<R> Decoded<R> {
    /// Returns the records, or an empty collection if the payload was
    /// corrupt.
    pub fn into_records(self) -> Vec<R> {
        match self {
            Decoded::Records(records) => records,
            Decoded::Corrupt(_) => Vec::new(),
        }
    }

    /// Returns true if the payload was undecodable.
    pub fn is_corrupt(&self) -> bool {
        matches!(self, Decoded::Corrupt(_))
    }
}

/// Decodes a whole collection stored as a JSON array.
pub fn decode_collection<R: DeserializeOwned>(bytes: &[u8]) -> Decoded<R> {
    match serde_json::from_slice::<Vec<R>>(bytes) {
        Ok(records) => Decoded::Records(records),
        Err(e) => Decoded::Corrupt(CodecError::from(e)),
    }
}

/// Copies undecodable bytes stored under `key` to `<key>.corrupt`.
///
/// Best effort: a failure is logged and reported as `false`, never
/// propagated. The original key is left in place.
pub fn quarantine(backend: &dyn StorageBackend, key: &str, bytes: &[u8]) -> bool {
    let target = quarantine_key(key);
    match backend.put(&target, bytes) {
        Ok(()) => {
            warn!(
                backend = backend.name(),
                key = key,
                quarantine = %target,
                size = bytes.len(),
                "Undecodable data quarantined"
            );
            true
        }
        Err(e) => {
            warn!(
                backend = backend.name(),
                key = key,
                error = %e,
                "Failed to quarantine undecodable data"
            );
            false
        }
    }
}

/// Returns true if `key` names a quarantine copy rather than live data.
#[inline]
pub fn is_quarantine_key(key: &str) -> bool {
    key.ends_with(crate::storage::schema::QUARANTINE_SUFFIX)
}

pub(crate) fn log_decoded<R>(key: &str, decoded: &Decoded<R>) {
    match decoded {
        Decoded::Records(records) => debug!(key = key, count = records.len(), "Collection decoded"),
        Decoded::Corrupt(e) => warn!(key = key, error = %e, "Collection undecodable, starting empty"),
    }
}
