//! Durability and crash recovery integration tests.
//!
//! # Crash Simulation
//!
//! A crash is simulated by dropping the `StashDB` handle and its stores
//! without calling `close()`. A mutation that returned `Ok` has already been
//! committed (redb) or renamed into place (documents), so it must be visible
//! after reopening either way.

mod common;

use common::*;
use stashdb::{Config, Layout, StashDB, SyncMode};
use tempfile::tempdir;

fn open_db(path: &std::path::Path) -> StashDB {
    StashDB::open(path, fast_config()).unwrap()
}

// ============================================================================
// Durability Tests
// ============================================================================

#[test]
fn test_committed_data_survives_normal_close() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("durable.db");

    let db = open_db(&path);
    let mut plants = db.open_store::<Plant>(Layout::blob_for::<Plant>()).unwrap();
    let id = plants.add(plant("Monstera", &["big"])).unwrap();
    drop(plants);
    db.close().unwrap();

    let db = open_db(&path);
    let plants = db.open_store::<Plant>(Layout::blob_for::<Plant>()).unwrap();
    let retrieved = plants.get_by_id(id);
    assert!(retrieved.is_some(), "Data must survive a normal close");
    assert_eq!(retrieved.unwrap().name, "Monstera");
}

#[test]
fn test_committed_data_survives_crash() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("crash.db");

    let (blob_id, doc_id) = {
        let db = open_db(&path);
        let mut blob = db.open_store::<Plant>(Layout::blob_for::<Plant>()).unwrap();
        let mut docs = db
            .open_store::<Recipe>(Layout::documents_for::<Recipe>())
            .unwrap();
        let blob_id = blob.add(plant("Pothos", &[])).unwrap();
        let doc_id = docs.add(recipe("Dal", &["lentils"], Some(40.0), None)).unwrap();
        // NO close(): simulates a crash
        (blob_id, doc_id)
    };

    let db = open_db(&path);
    let blob = db.open_store::<Plant>(Layout::blob_for::<Plant>()).unwrap();
    let docs = db
        .open_store::<Recipe>(Layout::documents_for::<Recipe>())
        .unwrap();
    assert!(
        blob.contains(blob_id),
        "Committed blob data must survive a crash"
    );
    assert!(
        docs.contains(doc_id),
        "Committed documents must survive a crash"
    );
}

#[test]
fn test_deletes_survive_crash() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("deletes.db");

    let kept = {
        let db = open_db(&path);
        let mut docs = db
            .open_store::<Plant>(Layout::documents_for::<Plant>())
            .unwrap();
        let kept = docs.add(plant("Keep", &[])).unwrap();
        let gone = docs.add(plant("Gone", &[])).unwrap();
        assert!(docs.delete(gone).unwrap());
        kept
    };

    let db = open_db(&path);
    let docs = db
        .open_store::<Plant>(Layout::documents_for::<Plant>())
        .unwrap();
    assert_eq!(docs.len(), 1);
    assert!(docs.contains(kept));
}

#[test]
fn test_bulk_writes_all_survive() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bulk.db");

    let ids: Vec<_> = {
        let db = open_db(&path);
        let mut plants = db.open_store::<Plant>(Layout::blob_for::<Plant>()).unwrap();
        (0..200)
            .map(|i| plants.add(plant(&format!("plant-{}", i), &[])).unwrap())
            .collect()
    };

    let db = open_db(&path);
    let plants = db.open_store::<Plant>(Layout::blob_for::<Plant>()).unwrap();
    assert_eq!(plants.len(), 200);
    for (i, id) in ids.iter().enumerate() {
        assert_eq!(plants.get_all()[i].id, *id, "order must survive reopen");
    }
}

#[test]
fn test_multiple_open_close_cycles() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("cycles.db");

    for cycle in 0..5 {
        let db = open_db(&path);
        let mut plants = db
            .open_store::<Plant>(Layout::documents_for::<Plant>())
            .unwrap();
        assert_eq!(plants.len(), cycle, "cycle {} sees previous cycles", cycle);
        plants.add(plant(&format!("cycle-{}", cycle), &[])).unwrap();
        drop(plants);
        db.close().unwrap();
    }

    let db = open_db(&path);
    let plants = db
        .open_store::<Plant>(Layout::documents_for::<Plant>())
        .unwrap();
    let names: Vec<_> = plants.get_all().iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["cycle-0", "cycle-1", "cycle-2", "cycle-3", "cycle-4"]);
}

#[test]
fn test_paranoid_mode_roundtrip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("paranoid.db");
    let config = Config {
        sync_mode: SyncMode::Paranoid,
        ..Default::default()
    };

    {
        let db = StashDB::open(&path, config.clone()).unwrap();
        let mut docs = db
            .open_store::<Plant>(Layout::documents_for::<Plant>())
            .unwrap();
        docs.add(plant("Careful", &[])).unwrap();
    }

    let db = StashDB::open(&path, config).unwrap();
    let docs = db
        .open_store::<Plant>(Layout::documents_for::<Plant>())
        .unwrap();
    assert_eq!(docs.get_all()[0].name, "Careful");
}

// ============================================================================
// Corruption Recovery
// ============================================================================

#[test]
fn test_corrupt_document_is_quarantined_and_rest_load() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("quarantine.db");

    let good = {
        let db = open_db(&path);
        let mut docs = db
            .open_store::<Plant>(Layout::documents_for::<Plant>())
            .unwrap();
        let good = docs.add(plant("Good", &[])).unwrap();
        let bad = docs.add(plant("Bad", &[])).unwrap();
        let bad_key = format!("plants-{}", bad);
        db.documents().put(&bad_key, b"\x00not json").unwrap();
        good
    };

    let db = open_db(&path);
    let docs = db
        .open_store::<Plant>(Layout::documents_for::<Plant>())
        .unwrap();
    assert_eq!(docs.len(), 1);
    assert!(docs.contains(good));

    let quarantined = db.documents().list_keys("plants-").unwrap();
    assert!(quarantined.iter().any(|k| k.ends_with(".corrupt")));
}

#[test]
fn test_corrupt_blob_opens_empty_and_keeps_bytes() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("blob.db");

    {
        let db = open_db(&path);
        db.key_value().put("plants", b"[{\"id\":").unwrap();
    }

    let db = open_db(&path);
    let mut plants = db.open_store::<Plant>(Layout::blob_for::<Plant>()).unwrap();
    assert!(plants.is_empty());
    assert_eq!(
        db.key_value().get("plants.corrupt").unwrap().as_deref(),
        Some(&b"[{\"id\":"[..])
    );

    // The collection is usable again after recovery
    plants.add(plant("Fresh", &[])).unwrap();
    assert_eq!(plants.len(), 1);
}

#[test]
fn test_second_open_of_locked_database_fails() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("locked.db");

    let _db = open_db(&path);
    let err = StashDB::open(&path, fast_config()).unwrap_err();
    assert!(err.is_storage());
}
