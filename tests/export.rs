//! Integration tests for typed export and import.

mod common;

use common::*;
use serde::{Deserialize, Serialize};
use stashdb::export::merge_into;
use stashdb::{ExportBundle, Layout, StashDB, EXPORT_FORMAT_VERSION};
use tempfile::tempdir;

#[derive(Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "section", content = "records", rename_all = "snake_case")]
enum Section {
    Plants(Vec<Plant>),
    Recipes(Vec<Recipe>),
}

#[test]
fn test_export_then_import_into_fresh_database() {
    let source_dir = tempdir().unwrap();
    let bytes = {
        let db = StashDB::open(db_path(source_dir.path()), fast_config()).unwrap();
        let mut plants = db
            .open_store::<Plant>(Layout::documents_for::<Plant>())
            .unwrap();
        let mut recipes = db.open_store::<Recipe>(Layout::blob_for::<Recipe>()).unwrap();
        plants.add(plant("Fern", &["shade"])).unwrap();
        recipes
            .add(recipe("Soup", &["lunch"], Some(20.0), Some(4.0)))
            .unwrap();

        ExportBundle::new(vec![
            Section::Plants(plants.export()),
            Section::Recipes(recipes.export()),
        ])
        .to_bytes()
        .unwrap()
    };

    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["format_version"], EXPORT_FORMAT_VERSION);
    assert_eq!(json["sections"][0]["section"], "plants");

    let target_dir = tempdir().unwrap();
    let db = StashDB::open(db_path(target_dir.path()), fast_config()).unwrap();
    let mut plants = db
        .open_store::<Plant>(Layout::documents_for::<Plant>())
        .unwrap();
    let mut recipes = db.open_store::<Recipe>(Layout::blob_for::<Recipe>()).unwrap();

    let bundle: ExportBundle<Section> = ExportBundle::from_bytes(&bytes).unwrap();
    for section in bundle.sections {
        match section {
            Section::Plants(records) => assert_eq!(merge_into(&mut plants, records).unwrap(), 1),
            Section::Recipes(records) => {
                assert_eq!(merge_into(&mut recipes, records).unwrap(), 1)
            }
        }
    }
    assert_eq!(plants.get_all()[0].name, "Fern");
    assert_eq!(recipes.get_all()[0].title, "Soup");
}

#[test]
fn test_import_twice_adds_nothing_the_second_time() {
    let mut plants = stashdb::RecordStore::<Plant>::open(
        memory(),
        Layout::blob_for::<Plant>(),
        Default::default(),
    )
    .unwrap();
    let existing = plant("Existing", &[]);
    plants.add(existing.clone()).unwrap();

    let incoming = vec![existing.clone(), plant("New", &[])];
    assert_eq!(merge_into(&mut plants, incoming.clone()).unwrap(), 1);
    assert_eq!(merge_into(&mut plants, incoming).unwrap(), 0);
    assert_eq!(plants.len(), 2);
}

#[test]
fn test_bundle_from_newer_version_is_rejected() {
    let bytes = serde_json::to_vec(&serde_json::json!({
        "format_version": EXPORT_FORMAT_VERSION + 1,
        "exported_at": 0,
        "sections": []
    }))
    .unwrap();
    let err = ExportBundle::<Section>::from_bytes(&bytes).unwrap_err();
    assert!(err.is_validation());
}
