//! Arbitrary bytes must decode to records or a corrupt marker, never panic.

#![no_main]

use libfuzzer_sys::fuzz_target;
use serde::{Deserialize, Serialize};
use stashdb::codec::{decode_collection, Decoded};
use stashdb::{Record, RecordId};

#[derive(Clone, Debug, Serialize, Deserialize)]
struct Item {
    id: RecordId,
    name: String,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    score: Option<f64>,
}

impl Record for Item {
    const COLLECTION: &'static str = "items";

    fn id(&self) -> RecordId {
        self.id
    }
}

fuzz_target!(|data: &[u8]| {
    if let Decoded::Records(items) = decode_collection::<Item>(data) {
        // Whatever decoded must encode again
        let _ = stashdb::codec::encode(&items).unwrap();
    }
});
