// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

use std::cell::RefCell;
use std::path::PathBuf;

use rstest::rstest;
use serde_json::json;
use tempfile::TempDir;

use super::*;
use crate::config::FileConfigLoader;
use crate::paths::compute_paths;
use crate::{Error, MANIFEST_FILENAME};

struct NoVcs;

impl VersionControl for NoVcs {
    fn branch(&self) -> Option<String> {
        None
    }

    fn commit_hash(&self) -> Option<String> {
        None
    }
}

/// Records every configuration it is run with.
#[derive(Default)]
struct RecordingBundler {
    configs: RefCell<Vec<ConfigTree>>,
    warnings: Vec<String>,
    errors: Vec<String>,
}

impl Bundler for RecordingBundler {
    fn run_with_config(&self, config: &ConfigTree) -> Result<BuildReport, BuildDiagnostics> {
        self.configs.borrow_mut().push(config.clone());
        if !self.errors.is_empty() {
            return Err(BuildDiagnostics::new(self.errors.clone()));
        }
        Ok(BuildReport {
            warnings: self.warnings.clone(),
        })
    }
}

struct NamedBuilder(&'static str);

impl ModeBuilder for NamedBuilder {
    fn build(&self, _ctx: &BuildContext<'_>, _config: &ConfigTree) -> crate::Result<BuildReport> {
        Ok(BuildReport {
            warnings: vec![self.0.to_string()],
        })
    }
}

fn create_package(tmp: &TempDir) -> PathBuf {
    let pkg = dunce::canonicalize(tmp.path()).unwrap().join("app");
    std::fs::create_dir_all(pkg.join("public/img")).unwrap();
    std::fs::write(
        pkg.join(MANIFEST_FILENAME),
        r#"{"name": "app", "version": "1.2.3"}"#,
    )
    .unwrap();
    std::fs::write(pkg.join("public/index.html"), "<html></html>").unwrap();
    std::fs::write(pkg.join("public/img/logo.svg"), "<svg/>").unwrap();
    pkg
}

fn session<'a>(
    pkg: &std::path::Path,
    bundler: &'a RecordingBundler,
    loader: &'a FileConfigLoader,
) -> BuildSession<'a> {
    let paths = Arc::new(compute_paths(pkg).expect("Should resolve paths"));
    BuildSession::new(paths, "webpack", bundler, loader, &NoVcs)
}

#[rstest]
fn test_production_build_refreshes_output_dir() {
    let tmp = TempDir::new().unwrap();
    let pkg = create_package(&tmp);
    std::fs::create_dir_all(pkg.join("dist/old")).unwrap();
    std::fs::write(pkg.join("dist/stale.js"), "").unwrap();
    std::fs::write(pkg.join("dist/old/chunk.js"), "").unwrap();

    let bundler = RecordingBundler::default();
    let loader = FileConfigLoader;
    let report = session(&pkg, &bundler, &loader)
        .build_for_mode("production")
        .expect("Build should succeed");

    assert!(!report.has_warnings());
    assert!(!pkg.join("dist/stale.js").exists());
    assert!(!pkg.join("dist/old").exists());
    assert!(pkg.join("dist/index.html").is_file());
    assert!(pkg.join("dist/img/logo.svg").is_file());

    let configs = bundler.configs.borrow();
    assert_eq!(configs.len(), 1);
    assert_eq!(configs[0]["mode"], json!("production"));
    assert_eq!(configs[0]["entry"], json!(["index"]));
}

#[rstest]
fn test_leading_dashes_are_ignored() {
    let tmp = TempDir::new().unwrap();
    let pkg = create_package(&tmp);
    let bundler = RecordingBundler::default();
    let loader = FileConfigLoader;

    session(&pkg, &bundler, &loader)
        .build_for_mode("--production")
        .expect("Build should succeed");

    assert_eq!(bundler.configs.borrow()[0]["mode"], json!("production"));
}

#[rstest]
#[case("development")]
#[case("test")]
fn test_unregistered_mode_is_rejected(#[case] mode: &str) {
    let tmp = TempDir::new().unwrap();
    let pkg = create_package(&tmp);
    let bundler = RecordingBundler::default();
    let loader = FileConfigLoader;

    let result = session(&pkg, &bundler, &loader).build_for_mode(mode);

    assert!(matches!(result, Err(Error::UnsupportedMode(m)) if m == mode));
    assert!(bundler.configs.borrow().is_empty());
}

#[rstest]
fn test_config_without_mode_builds_production() {
    let tmp = TempDir::new().unwrap();
    let pkg = create_package(&tmp);
    let bundler = RecordingBundler {
        warnings: vec!["large bundle".to_string()],
        ..Default::default()
    };
    let loader = FileConfigLoader;
    let config = json!({"entry": ["main"]});

    let report = session(&pkg, &bundler, &loader)
        .build_for_config(&config)
        .expect("Build should succeed");

    assert_eq!(report.warnings, vec!["large bundle".to_string()]);
    assert_eq!(bundler.configs.borrow()[0], config);
}

#[rstest]
fn test_bundler_errors_report_first_and_count_the_rest() {
    let tmp = TempDir::new().unwrap();
    let pkg = create_package(&tmp);
    let bundler = RecordingBundler {
        errors: vec![
            "Module not found: ./missing".to_string(),
            "second".to_string(),
            "third".to_string(),
        ],
        ..Default::default()
    };
    let loader = FileConfigLoader;

    let result = session(&pkg, &bundler, &loader).build_for_mode("production");

    match result {
        Err(Error::BuildFailed {
            message,
            suppressed,
        }) => {
            assert_eq!(message, "Module not found: ./missing");
            assert_eq!(suppressed, 2);
        }
        other => panic!("Expected a build failure, got {other:?}"),
    }
}

#[rstest]
fn test_custom_builder_is_dispatched() {
    let tmp = TempDir::new().unwrap();
    let pkg = create_package(&tmp);
    let bundler = RecordingBundler::default();
    let loader = FileConfigLoader;
    let mut registry = BuilderRegistry::default();
    registry.register("development", NamedBuilder("dev"));

    let session = session(&pkg, &bundler, &loader).with_registry(registry);
    let report = session.build_for_mode("development").unwrap();

    assert_eq!(report.warnings, vec!["dev".to_string()]);
    assert!(bundler.configs.borrow().is_empty());
}

#[rstest]
fn test_registry_modes() {
    let mut registry = BuilderRegistry::default();
    registry.register("staging", NamedBuilder("staging"));
    assert_eq!(
        registry.modes().collect::<Vec<_>>(),
        vec!["production", "staging"]
    );
    assert!(BuilderRegistry::empty().get("production").is_none());
}

#[rstest]
fn test_prepare_output_dir_without_public() {
    let tmp = TempDir::new().unwrap();
    let pkg = dunce::canonicalize(tmp.path()).unwrap().join("bare");
    std::fs::create_dir_all(&pkg).unwrap();
    std::fs::write(pkg.join(MANIFEST_FILENAME), r#"{"name": "bare"}"#).unwrap();
    let paths = compute_paths(&pkg).unwrap();

    prepare_output_dir(&paths).expect("Should create the output dir");

    assert!(paths.output_path.is_dir());
    assert_eq!(std::fs::read_dir(&paths.output_path).unwrap().count(), 0);
}

#[rstest]
fn test_diagnostics_without_messages() {
    let err = BuildDiagnostics::default().into_error();
    assert!(matches!(err, Error::BuildFailed { suppressed: 0, .. }));
}
