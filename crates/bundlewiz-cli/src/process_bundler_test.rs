// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

use rstest::rstest;

use super::*;

#[rstest]
#[case("", &[], &[])]
#[case("compiled\nWARNING: large chunk\n", &["large chunk"], &[])]
#[case("ERROR Module not found\nERROR: second\n", &[], &["Module not found", "second"])]
#[case("  WARNING: indented is output\nERRORS are words", &[], &[])]
fn test_parse_diagnostics(
    #[case] output: &str,
    #[case] warnings: &[&str],
    #[case] errors: &[&str],
) {
    let (actual_warnings, actual_errors) = parse_diagnostics(output);
    assert_eq!(actual_warnings, warnings);
    assert_eq!(actual_errors, errors);
}

#[rstest]
fn test_missing_program_is_a_diagnostic() {
    let bundler = ProcessBundler::new("/nonexistent/bundlewiz-bundler");
    let err = bundler
        .run_with_config(&serde_json::json!({"mode": "production"}))
        .expect_err("Should fail to spawn");
    assert_eq!(err.errors.len(), 1);
    assert!(err.errors[0].starts_with("Failed to run bundler"));
}

#[cfg(unix)]
mod unix {
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;

    use rstest::rstest;
    use tempfile::TempDir;

    use super::*;

    fn write_script(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("bundler.sh");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[rstest]
    fn test_config_file_is_passed_to_program() {
        let tmp = TempDir::new().unwrap();
        let script = write_script(
            tmp.path(),
            r#"[ "$1" = "--config" ] || exit 3
cp "$2" "$(dirname "$0")/seen.json"
echo "WARNING: big bundle""#,
        );
        let config = serde_json::json!({"mode": "production", "entry": ["index"]});

        let report = ProcessBundler::new(&script)
            .run_with_config(&config)
            .expect("Bundler should succeed");

        assert_eq!(report.warnings, vec!["big bundle".to_string()]);
        let seen: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(tmp.path().join("seen.json")).unwrap())
                .unwrap();
        assert_eq!(seen, config);
    }

    #[rstest]
    fn test_failing_exit_without_diagnostics() {
        let tmp = TempDir::new().unwrap();
        let script = write_script(tmp.path(), "exit 2");

        let err = ProcessBundler::new(&script)
            .run_with_config(&serde_json::json!({}))
            .expect_err("Bundler should fail");

        assert_eq!(err.errors.len(), 1);
        assert!(err.errors[0].contains("exited with"));
    }

    #[rstest]
    fn test_reported_errors_fail_the_build() {
        let tmp = TempDir::new().unwrap();
        let script = write_script(tmp.path(), "echo 'ERROR: one' >&2\necho 'ERROR: two' >&2");

        let err = ProcessBundler::new(&script)
            .run_with_config(&serde_json::json!({}))
            .expect_err("Bundler should fail");

        assert_eq!(err.errors, vec!["one".to_string(), "two".to_string()]);
    }

    #[rstest]
    fn test_working_dir() {
        let tmp = TempDir::new().unwrap();
        let script = write_script(tmp.path(), "pwd > \"$(dirname \"$0\")/cwd.txt\"");
        let work = dunce::canonicalize(tmp.path()).unwrap();

        ProcessBundler::new(&script)
            .with_working_dir(&work)
            .run_with_config(&serde_json::json!({}))
            .unwrap();

        let cwd = std::fs::read_to_string(tmp.path().join("cwd.txt")).unwrap();
        assert_eq!(Path::new(cwd.trim()), work);
    }
}
