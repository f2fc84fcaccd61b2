// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

use rstest::rstest;
use tempfile::TempDir;

use super::*;

#[rstest]
fn test_parse_minimal_manifest() {
    let manifest = PackageManifest::from_json(r#"{"name": "pkg-a", "version": "1.2.3"}"#)
        .expect("Should parse manifest");
    assert_eq!(manifest.name, "pkg-a");
    assert_eq!(manifest.version, "1.2.3");
    assert!(manifest.workspaces.is_none());
    assert!(manifest.extends.is_none());
    assert!(manifest.workspace_patterns().is_none());
}

#[rstest]
fn test_parse_ignores_unknown_keys() {
    let manifest = PackageManifest::from_json(
        r#"{"name": "pkg", "version": "0.0.1", "scripts": {"build": "bundlewiz webpack"}}"#,
    )
    .expect("Should parse manifest");
    assert_eq!(manifest.name, "pkg");
}

#[rstest]
#[case(r#"{"workspaces": ["packages/*", "apps/web"]}"#)]
#[case(r#"{"workspaces": {"packages": ["packages/*", "apps/web"]}}"#)]
fn test_parse_workspaces_forms(#[case] json: &str) {
    let manifest = PackageManifest::from_json(json).expect("Should parse manifest");
    assert_eq!(
        manifest.workspace_patterns(),
        Some(&["packages/*".to_string(), "apps/web".to_string()][..])
    );
}

#[rstest]
#[case("@scope/base", "base")]
#[case("@my_org/ui-kit", "ui-kit")]
#[case("base", "base")]
#[case("@/weird", "@/weird")]
#[case("@my-org/base", "base")]
#[case("@a.b/base", "base")]
#[case("@scope", "@scope")]
fn test_unscoped_name(#[case] name: &str, #[case] expected: &str) {
    assert_eq!(unscoped_name(name), expected);
}

#[rstest]
fn test_load_from_dir_missing() {
    let tmp = TempDir::new().unwrap();
    let manifest = PackageManifest::load_from_dir(tmp.path()).expect("Missing is not an error");
    assert!(manifest.is_none());
}

#[rstest]
fn test_load_invalid_manifest() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(tmp.path().join(MANIFEST_FILENAME), "{ not json").unwrap();

    match PackageManifest::load_from_dir(tmp.path()) {
        Err(crate::Error::InvalidManifest { .. }) => {}
        other => panic!("Expected InvalidManifest, got: {:?}", other),
    }
}

#[rstest]
fn test_find_uses_first_directory_with_manifest() {
    let tmp = TempDir::new().unwrap();
    let first = tmp.path().join("first");
    let second = tmp.path().join("second");
    std::fs::create_dir(&first).unwrap();
    std::fs::create_dir(&second).unwrap();
    std::fs::write(
        second.join(MANIFEST_FILENAME),
        r#"{"name": "second", "version": "2.0.0"}"#,
    )
    .unwrap();

    let (path, manifest) = PackageManifest::find(&[&first, &second])
        .unwrap()
        .expect("Should find the second manifest");
    assert_eq!(path, second.join(MANIFEST_FILENAME));
    assert_eq!(manifest.name, "second");
}
