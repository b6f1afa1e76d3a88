//! Copyright © 2025-2026 Wenze Wei. All Rights Reserved.
//!
//! This file is part of Halo.
//! The Halo project belongs to the Dunimd Team.

use std::sync::Arc;

use halox::{
    HaloDependencyResolver, HaloHostLibraries, HaloLibraryDependency, HaloLibraryVersionPolicy,
    HaloManifest, HaloPluginDependency, HaloVersion, HaloVersionReq,
};

fn manifest(id: &str, version: &str, deps: &[(&str, Option<&str>)]) -> Arc<HaloManifest> {
    Arc::new(HaloManifest {
        id: id.to_string(),
        name: id.to_string(),
        version: HaloVersion::parse(version).unwrap(),
        description: None,
        author: None,
        entry_point: format!("test.{}", id),
        enabled: true,
        actions: Vec::new(),
        plugin_dependencies: deps
            .iter()
            .map(|(dep, constraint)| HaloPluginDependency {
                id: dep.to_string(),
                constraint: constraint.map(|c| HaloVersionReq::parse(c).unwrap()),
            })
            .collect(),
        library_dependencies: Vec::new(),
        configuration: serde_json::json!({}),
    })
}

fn with_library(
    base: Arc<HaloManifest>,
    name: &str,
    constraint: Option<&str>,
) -> Arc<HaloManifest> {
    let mut manifest = (*base).clone();
    manifest.library_dependencies.push(HaloLibraryDependency {
        name: name.to_string(),
        constraint: constraint.map(|c| HaloVersionReq::parse(c).unwrap()),
        probe: name.to_string(),
    });
    Arc::new(manifest)
}

#[test]
fn test_activation_order_chain() {
    let set = vec![
        manifest("c", "1.0.0", &[("b", None)]),
        manifest("a", "1.0.0", &[]),
        manifest("b", "1.0.0", &[("a", None)]),
    ];
    let resolver = HaloDependencyResolver::build(
        &set,
        &HaloHostLibraries::new(),
        HaloLibraryVersionPolicy::Strict,
    );

    assert_eq!(resolver.activation_order(), vec!["a", "b", "c"]);
    assert_eq!(resolver.deactivation_order(), vec!["c", "b", "a"]);
}

#[test]
fn test_diamond_dependencies_ordered() {
    let set = vec![
        manifest("top", "1.0.0", &[("left", None), ("right", None)]),
        manifest("left", "1.0.0", &[("base", None)]),
        manifest("right", "1.0.0", &[("base", None)]),
        manifest("base", "1.0.0", &[]),
    ];
    let resolver = HaloDependencyResolver::build(
        &set,
        &HaloHostLibraries::new(),
        HaloLibraryVersionPolicy::Strict,
    );

    let order = resolver.activation_order();
    let pos = |id: &str| order.iter().position(|x| x == id).unwrap();
    assert!(pos("base") < pos("left"));
    assert!(pos("base") < pos("right"));
    assert!(pos("left") < pos("top"));
    assert!(pos("right") < pos("top"));
}

#[test]
fn test_cycle_still_yields_total_order() {
    let set = vec![
        manifest("a", "1.0.0", &[("b", None)]),
        manifest("b", "1.0.0", &[("c", None)]),
        manifest("c", "1.0.0", &[("a", None)]),
        manifest("d", "1.0.0", &[]),
    ];
    let resolver = HaloDependencyResolver::build(
        &set,
        &HaloHostLibraries::new(),
        HaloLibraryVersionPolicy::Strict,
    );

    let order = resolver.activation_order();
    assert_eq!(order.len(), 4);
    for id in ["a", "b", "c", "d"] {
        assert!(order.contains(&id.to_string()), "missing {}", id);
    }
}

#[test]
fn test_version_constraint_violation() {
    let set = vec![
        manifest("base", "0.9.0", &[]),
        manifest("app", "1.0.0", &[("base", Some(">=1.0.0"))]),
    ];
    let resolver = HaloDependencyResolver::build(
        &set,
        &HaloHostLibraries::new(),
        HaloLibraryVersionPolicy::Strict,
    );

    assert!(resolver.check("base").unwrap().satisfied);
    let verdict = resolver.check("app").unwrap();
    assert!(!verdict.satisfied);
    assert!(verdict.problems[0].contains("base"));
}

#[test]
fn test_missing_plugin_dependency() {
    let set = vec![manifest("app", "1.0.0", &[("ghost", None)])];
    let resolver = HaloDependencyResolver::build(
        &set,
        &HaloHostLibraries::new(),
        HaloLibraryVersionPolicy::Strict,
    );

    let verdict = resolver.check("app").unwrap();
    assert!(!verdict.satisfied);
    assert!(verdict.problems[0].contains("ghost"));
}

#[test]
fn test_library_probe_satisfied() {
    let mut libraries = HaloHostLibraries::new();
    libraries.insert("sqlite", HaloVersion::parse("3.40.0").unwrap());

    let set = vec![with_library(
        manifest("app", "1.0.0", &[]),
        "sqlite",
        Some(">=3.30.0"),
    )];
    let resolver =
        HaloDependencyResolver::build(&set, &libraries, HaloLibraryVersionPolicy::Strict);

    assert!(resolver.check("app").unwrap().satisfied);
}

#[test]
fn test_library_missing_or_outdated() {
    let mut libraries = HaloHostLibraries::new();
    libraries.insert("sqlite", HaloVersion::parse("3.10.0").unwrap());

    let set = vec![
        with_library(manifest("old", "1.0.0", &[]), "sqlite", Some(">=3.30.0")),
        with_library(manifest("none", "1.0.0", &[]), "libzmq", None),
    ];
    let resolver =
        HaloDependencyResolver::build(&set, &libraries, HaloLibraryVersionPolicy::Strict);

    assert!(!resolver.check("old").unwrap().satisfied);
    assert!(!resolver.check("none").unwrap().satisfied);
}

#[test]
fn test_unversioned_library_policy() {
    let mut libraries = HaloHostLibraries::new();
    libraries.insert_unversioned("openssl");

    let set = vec![with_library(
        manifest("app", "1.0.0", &[]),
        "openssl",
        Some(">=3.0.0"),
    )];

    let strict =
        HaloDependencyResolver::build(&set, &libraries, HaloLibraryVersionPolicy::Strict);
    assert!(!strict.check("app").unwrap().satisfied);

    let lenient =
        HaloDependencyResolver::build(&set, &libraries, HaloLibraryVersionPolicy::Lenient);
    assert!(lenient.check("app").unwrap().satisfied);
}
