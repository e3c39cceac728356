//! File-backed layout cache behaviour.

use std::fs;

use kg_nav::graph::ManualPosition;
use kg_nav::{FileStorage, LayoutPersistenceStore, ScopeKey};

#[test]
fn test_positions_round_trip_through_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("layouts.json");
    let scope = ScopeKey::from("tree:NB>PROB");

    {
        let mut store = LayoutPersistenceStore::load(FileStorage::new(&path));
        store.set_position(&scope, "PROB", ManualPosition::new(120.0, 40.0));
        store.set_position(&scope, "NB", ManualPosition::new(-15.5, 300.0));
    }

    let store = LayoutPersistenceStore::load(FileStorage::new(&path));
    assert_eq!(
        store.position(&scope, "PROB"),
        Some(ManualPosition::new(120.0, 40.0))
    );
    assert_eq!(store.positions(&scope).unwrap().len(), 2);

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(json["tree:NB>PROB"]["PROB"]["x"], 120.0);
}

#[test]
fn test_missing_file_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let store = LayoutPersistenceStore::load(FileStorage::new(dir.path().join("none.json")));
    assert!(store.cache().is_empty());
}

#[test]
fn test_corrupt_file_is_empty_and_recovers() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("layouts.json");
    fs::write(&path, "{\"full\": {\"A\": {\"x\": ").unwrap();

    let mut store = LayoutPersistenceStore::load(FileStorage::new(&path));
    assert!(store.cache().is_empty());

    // The next mutation overwrites the corrupt record
    store.set_position(&ScopeKey::full(), "A", ManualPosition::new(1.0, 2.0));
    let reloaded = LayoutPersistenceStore::load(FileStorage::new(&path));
    assert_eq!(
        reloaded.position(&ScopeKey::full(), "A"),
        Some(ManualPosition::new(1.0, 2.0))
    );
}

#[test]
fn test_clear_scope_leaves_other_scopes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("layouts.json");
    let tree = ScopeKey::from("tree:NB");
    let sub = ScopeKey::from("subtopic:NB.priors");

    let mut store = LayoutPersistenceStore::load(FileStorage::new(&path));
    store.set_position(&tree, "PROB", ManualPosition::new(1.0, 1.0));
    store.set_position(&sub, "nb-1C-01", ManualPosition::new(2.0, 2.0));
    store.clear_scope(&tree);

    let reloaded = LayoutPersistenceStore::load(FileStorage::new(&path));
    assert!(reloaded.positions(&tree).is_none());
    assert_eq!(
        reloaded.position(&sub, "nb-1C-01"),
        Some(ManualPosition::new(2.0, 2.0))
    );
}

#[test]
fn test_unwritable_location_keeps_memory_copy() {
    let dir = tempfile::tempdir().unwrap();
    // A directory where the file should be makes every write fail
    let path = dir.path().join("layouts.json");
    fs::create_dir(&path).unwrap();

    let mut store = LayoutPersistenceStore::load(FileStorage::new(&path));
    store.set_position(&ScopeKey::full(), "A", ManualPosition::new(3.0, 4.0));
    assert!(!store.save());
    assert_eq!(
        store.position(&ScopeKey::full(), "A"),
        Some(ManualPosition::new(3.0, 4.0))
    );
}
