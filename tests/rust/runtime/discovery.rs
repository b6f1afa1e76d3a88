//! Copyright © 2025-2026 Wenze Wei. All Rights Reserved.
//!
//! This file is part of Halo.
//! The Halo project belongs to the Dunimd Team.

use std::fs;
use std::path::Path;

use halox::{HaloManifestStore, HaloRuntime, HaloRuntimeConfig};

fn write_plugin(root: &Path, dir: &str, file_name: &str, body: &str) {
    let plugin_dir = root.join(dir);
    fs::create_dir_all(&plugin_dir).unwrap();
    fs::write(plugin_dir.join(file_name), body).unwrap();
}

fn basic_manifest(id: &str) -> String {
    format!(
        "id: {id}\nname: {id}\nversion: 1.0.0\nentry_point: test.{id}\n",
        id = id
    )
}

#[test]
fn test_discover_accepts_valid_manifests() {
    let tmp = tempfile::tempdir().unwrap();
    write_plugin(tmp.path(), "alpha", "halo_plugin.yaml", &basic_manifest("alpha"));
    write_plugin(tmp.path(), "beta", "halo_plugin.yml", &basic_manifest("beta"));
    write_plugin(
        tmp.path(),
        "gamma",
        "halo_plugin.json",
        r#"{"id": "gamma", "name": "Gamma", "version": "2.0.0", "entry_point": "test.gamma"}"#,
    );

    let mut store = HaloManifestStore::new();
    let accepted = store.discover(&[tmp.path().to_path_buf()]);

    assert_eq!(accepted, 3);
    assert_eq!(store.get("gamma").unwrap().version.to_string(), "2.0.0");
}

#[test]
fn test_invalid_manifest_does_not_abort_scan() {
    let tmp = tempfile::tempdir().unwrap();
    write_plugin(tmp.path(), "good", "halo_plugin.yaml", &basic_manifest("good"));
    write_plugin(tmp.path(), "broken", "halo_plugin.yaml", "id: [not, a, string]\n");
    write_plugin(
        tmp.path(),
        "incomplete",
        "halo_plugin.yaml",
        "id: incomplete\nname: Incomplete\n",
    );

    let mut store = HaloManifestStore::new();
    let accepted = store.discover(&[tmp.path().to_path_buf()]);

    assert_eq!(accepted, 1);
    assert!(store.get("good").is_some());
    assert!(store.get("incomplete").is_none());
}

#[test]
fn test_duplicate_id_first_wins() {
    let tmp = tempfile::tempdir().unwrap();
    write_plugin(
        tmp.path(),
        "a_first",
        "halo_plugin.yaml",
        "id: dup\nname: First\nversion: 1.0.0\nentry_point: test.first\n",
    );
    write_plugin(
        tmp.path(),
        "b_second",
        "halo_plugin.yaml",
        "id: dup\nname: Second\nversion: 2.0.0\nentry_point: test.second\n",
    );

    let mut store = HaloManifestStore::new();
    store.discover(&[tmp.path().to_path_buf()]);

    assert_eq!(store.len(), 1);
}

#[test]
fn test_directory_without_manifest_skipped() {
    let tmp = tempfile::tempdir().unwrap();
    fs::create_dir_all(tmp.path().join("empty")).unwrap();
    write_plugin(tmp.path(), "real", "halo_plugin.yaml", &basic_manifest("real"));

    let mut store = HaloManifestStore::new();
    assert_eq!(store.discover(&[tmp.path().to_path_buf()]), 1);
}

#[test]
fn test_unreadable_root_skipped() {
    let tmp = tempfile::tempdir().unwrap();
    write_plugin(tmp.path(), "only", "halo_plugin.yaml", &basic_manifest("only"));

    let mut store = HaloManifestStore::new();
    let roots = vec![
        tmp.path().join("does-not-exist"),
        tmp.path().to_path_buf(),
    ];
    assert_eq!(store.discover(&roots), 1);
}

#[tokio::test]
async fn test_runtime_discovery_and_verdicts() {
    let tmp = tempfile::tempdir().unwrap();
    write_plugin(tmp.path(), "base", "halo_plugin.yaml", &basic_manifest("base"));
    write_plugin(
        tmp.path(),
        "app",
        "halo_plugin.yaml",
        "id: app\nname: App\nversion: 1.0.0\nentry_point: test.app\n\
         dependencies:\n  plugins:\n    base: \">=1.0.0\"\n",
    );

    let mut config = HaloRuntimeConfig::default();
    config.plugin_roots.push(tmp.path().to_path_buf());

    let runtime = HaloRuntime::new(config);
    assert_eq!(runtime.discover().await, 2);

    let record = runtime.record("app").await.unwrap();
    assert!(record.deps_satisfied);
    assert!(runtime.manifest("base").await.is_some());
}

#[tokio::test]
async fn test_disabled_plugin_visible_but_unregistered() {
    let tmp = tempfile::tempdir().unwrap();
    write_plugin(
        tmp.path(),
        "off",
        "halo_plugin.yaml",
        "id: off\nname: Off\nversion: 1.0.0\nentry_point: test.off\nenabled: false\n",
    );

    let mut config = HaloRuntimeConfig::default();
    config.plugin_roots.push(tmp.path().to_path_buf());

    let runtime = HaloRuntime::new(config);
    runtime.discover().await;

    assert!(runtime.plugins(false).await.is_empty());
    assert_eq!(runtime.plugins(true).await.len(), 1);
    // Disabled manifests never get a lifecycle record.
    assert!(runtime.state("off").await.is_none());
}
