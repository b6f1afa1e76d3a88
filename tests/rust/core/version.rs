//! Copyright © 2025-2026 Wenze Wei. All Rights Reserved.
//!
//! This file is part of Halo.
//! The Halo project belongs to the Dunimd Team.

use halox::{HaloVersion, HaloVersionReq};

#[test]
fn test_version_parse_three_components() {
    let v = HaloVersion::parse("1.2.3").unwrap();
    assert_eq!((v.major, v.minor, v.patch), (1, 2, 3));
    assert_eq!(v.pre_release, None);
    assert_eq!(v.to_string(), "1.2.3");
}

#[test]
fn test_version_parse_two_components() {
    let v = HaloVersion::parse("2.1").unwrap();
    assert_eq!(v, HaloVersion::new(2, 1, 0));
}

#[test]
fn test_version_parse_pre_release() {
    let v = HaloVersion::parse("1.0.0-beta.2").unwrap();
    assert_eq!(v.pre_release.as_deref(), Some("beta.2"));
    assert_eq!(v.to_string(), "1.0.0-beta.2");
}

#[test]
fn test_version_parse_rejects_garbage() {
    assert!(HaloVersion::parse("").is_err());
    assert!(HaloVersion::parse("1").is_err());
    assert!(HaloVersion::parse("1.2.3.4").is_err());
    assert!(HaloVersion::parse("a.b.c").is_err());
    assert!(HaloVersion::parse("1.2.-3").is_err());
}

#[test]
fn test_version_ordering() {
    let mut versions = vec![
        HaloVersion::parse("1.0.0").unwrap(),
        HaloVersion::parse("0.9.9").unwrap(),
        HaloVersion::parse("1.0.0-alpha").unwrap(),
        HaloVersion::parse("1.2.0").unwrap(),
    ];
    versions.sort();

    let rendered: Vec<String> = versions.iter().map(|v| v.to_string()).collect();
    // A pre-release sorts below the release it precedes.
    assert_eq!(rendered, vec!["0.9.9", "1.0.0-alpha", "1.0.0", "1.2.0"]);
}

#[test]
fn test_constraint_range() {
    let req = HaloVersionReq::parse(">=1.0.0 <2.0.0").unwrap();
    assert!(req.matches(&HaloVersion::parse("1.0.0").unwrap()));
    assert!(req.matches(&HaloVersion::parse("1.9.9").unwrap()));
    assert!(!req.matches(&HaloVersion::parse("0.9.9").unwrap()));
    assert!(!req.matches(&HaloVersion::parse("2.0.0").unwrap()));
}

#[test]
fn test_constraint_exact_forms() {
    for expr in ["==1.2.3", "=1.2.3", "1.2.3"] {
        let req = HaloVersionReq::parse(expr).unwrap();
        assert!(req.matches(&HaloVersion::parse("1.2.3").unwrap()), "{}", expr);
        assert!(!req.matches(&HaloVersion::parse("1.2.4").unwrap()), "{}", expr);
    }
}

#[test]
fn test_constraint_empty_matches_everything() {
    let req = HaloVersionReq::parse("").unwrap();
    assert!(req.matches(&HaloVersion::parse("0.0.1").unwrap()));
    assert!(req.matches(&HaloVersion::parse("99.0.0").unwrap()));
    assert_eq!(req.to_string(), "*");
}

#[test]
fn test_constraint_rejects_dangling_operator() {
    assert!(HaloVersionReq::parse(">=").is_err());
    assert!(HaloVersionReq::parse("<= 1.0.0 >").is_err());
}

#[test]
fn test_constraint_source_preserved() {
    let req = HaloVersionReq::parse(">=1.0.0 <2.0.0").unwrap();
    assert_eq!(req.source(), ">=1.0.0 <2.0.0");
}
