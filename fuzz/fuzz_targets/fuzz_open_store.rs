//! Opening a collection over arbitrary stored bytes must not panic and must
//! leave the original bytes recoverable.

#![no_main]

use std::sync::Arc;

use libfuzzer_sys::fuzz_target;
use serde::{Deserialize, Serialize};
use stashdb::{Layout, MemoryStorage, Record, RecordId, RecordStore, StorageBackend, StoreOptions};

#[derive(Clone, Debug, Serialize, Deserialize)]
struct Item {
    id: RecordId,
    name: String,
}

impl Record for Item {
    const COLLECTION: &'static str = "items";

    fn id(&self) -> RecordId {
        self.id
    }
}

fuzz_target!(|data: &[u8]| {
    let backend = Arc::new(MemoryStorage::new());
    backend.put("items", data).unwrap();

    let store =
        RecordStore::<Item>::open(backend.clone(), Layout::blob_for::<Item>(), StoreOptions::default())
            .unwrap();
    if store.is_empty() && !data.is_empty() {
        let kept = backend.get("items.corrupt").unwrap();
        let original = backend.get("items").unwrap();
        assert!(kept.as_deref() == Some(data) || original.as_deref() == Some(data));
    }
});
