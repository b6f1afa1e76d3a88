//! Copyright © 2025-2026 Wenze Wei. All Rights Reserved.
//!
//! This file is part of Halo.
//! The Halo project belongs to the Dunimd Team.

use std::sync::Arc;

use halox::{HaloFileStateBackend, HaloMemoryStateBackend, HaloStateStore};
use serde_json::json;

#[test]
fn test_file_backend_round_trip() {
    let tmp = tempfile::tempdir().unwrap();
    let store = HaloStateStore::new(Arc::new(HaloFileStateBackend::new(tmp.path())));

    store
        .save("demo.counter", "progress", &json!({"done": 10, "total": 100}))
        .unwrap();

    let loaded = store.load("demo.counter", "progress", json!(null)).unwrap();
    assert_eq!(loaded, json!({"done": 10, "total": 100}));

    assert!(store.delete("demo.counter", "progress").unwrap());
    assert!(!store.delete("demo.counter", "progress").unwrap());
}

#[test]
fn test_file_backend_survives_reopen() {
    let tmp = tempfile::tempdir().unwrap();

    {
        let store = HaloStateStore::new(Arc::new(HaloFileStateBackend::new(tmp.path())));
        store.save("p", "cursor", &json!("abc")).unwrap();
    }

    // A fresh backend over the same root sees the committed entry.
    let store = HaloStateStore::new(Arc::new(HaloFileStateBackend::new(tmp.path())));
    assert_eq!(store.load("p", "cursor", json!(null)).unwrap(), json!("abc"));
}

#[test]
fn test_file_backend_overwrite_replaces_value() {
    let tmp = tempfile::tempdir().unwrap();
    let store = HaloStateStore::new(Arc::new(HaloFileStateBackend::new(tmp.path())));

    store.save("p", "k", &json!(1)).unwrap();
    store.save("p", "k", &json!({"v": 2})).unwrap();

    assert_eq!(store.load("p", "k", json!(null)).unwrap(), json!({"v": 2}));
}

#[test]
fn test_missing_key_returns_default() {
    let tmp = tempfile::tempdir().unwrap();
    let store = HaloStateStore::new(Arc::new(HaloFileStateBackend::new(tmp.path())));

    assert_eq!(
        store.load("p", "nothing", json!({"fresh": true})).unwrap(),
        json!({"fresh": true})
    );
}

#[test]
fn test_plugins_are_namespaced() {
    let tmp = tempfile::tempdir().unwrap();
    let store = HaloStateStore::new(Arc::new(HaloFileStateBackend::new(tmp.path())));

    let a = store.handle_for("plugin.a");
    let b = store.handle_for("plugin.b");

    a.save("shared-key", &json!("from a")).unwrap();
    b.save("shared-key", &json!("from b")).unwrap();

    assert_eq!(a.load("shared-key", json!(null)).unwrap(), json!("from a"));
    assert_eq!(b.load("shared-key", json!(null)).unwrap(), json!("from b"));

    assert!(a.delete("shared-key").unwrap());
    assert_eq!(b.load("shared-key", json!(null)).unwrap(), json!("from b"));
}

#[test]
fn test_hostile_ids_and_keys_stay_inside_root() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path().join("state-root");
    let store = HaloStateStore::new(Arc::new(HaloFileStateBackend::new(&root)));

    store.save("../escape", "a/b\\c", &json!(1)).unwrap();
    assert_eq!(store.load("../escape", "a/b\\c", json!(0)).unwrap(), json!(1));

    // A dot-only id must not resolve to the parent directory.
    store.save("..", "escaped", &json!(2)).unwrap();
    assert_eq!(store.load("..", "escaped", json!(0)).unwrap(), json!(2));

    // Everything written lands under the backend root.
    assert!(!tmp.path().join("escaped.json").exists());
    assert!(!tmp.path().parent().unwrap().join("escape").exists());
    for entry in std::fs::read_dir(tmp.path()).unwrap() {
        assert_eq!(entry.unwrap().file_name(), "state-root");
    }
}

#[test]
fn test_distinct_ids_never_share_a_directory() {
    let tmp = tempfile::tempdir().unwrap();
    let store = HaloStateStore::new(Arc::new(HaloFileStateBackend::new(tmp.path())));

    // "a/b" and "a_b" differ only in a character the encoding escapes.
    let slash = store.handle_for("a/b");
    let underscore = store.handle_for("a_b");

    slash.save("k", &json!("slash")).unwrap();
    underscore.save("k", &json!("underscore")).unwrap();

    assert_eq!(slash.load("k", json!(null)).unwrap(), json!("slash"));
    assert_eq!(
        underscore.load("k", json!(null)).unwrap(),
        json!("underscore")
    );

    assert!(slash.delete("k").unwrap());
    assert_eq!(
        underscore.load("k", json!(null)).unwrap(),
        json!("underscore")
    );
}

#[test]
fn test_memory_backend_matches_file_semantics() {
    let store = HaloStateStore::new(Arc::new(HaloMemoryStateBackend::new()));

    store.save("p", "k", &json!([1, 2, 3])).unwrap();
    assert_eq!(store.load("p", "k", json!(null)).unwrap(), json!([1, 2, 3]));
    assert!(store.delete("p", "k").unwrap());
    assert_eq!(store.load("p", "k", json!("gone")).unwrap(), json!("gone"));
}
