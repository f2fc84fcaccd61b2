// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! A [`Bundler`] backed by an external executable.

use std::io::Write;
use std::path::PathBuf;
use std::process::Command;

use bundlewiz::{BuildDiagnostics, BuildReport, Bundler, ConfigTree};

#[cfg(test)]
#[path = "./process_bundler_test.rs"]
mod process_bundler_test;

const WARNING_PREFIX: &str = "WARNING";
const ERROR_PREFIX: &str = "ERROR";

/// Runs `<program> --config <file>` with the configuration serialized to
/// a temporary JSON file.
#[derive(Debug, Clone)]
pub struct ProcessBundler {
    program: PathBuf,
    working_dir: Option<PathBuf>,
}

impl ProcessBundler {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            working_dir: None,
        }
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    fn write_config(&self, config: &ConfigTree) -> std::io::Result<tempfile::NamedTempFile> {
        let mut file = tempfile::Builder::new()
            .prefix("bundlewiz-")
            .suffix(".json")
            .tempfile()?;
        serde_json::to_writer_pretty(&mut file, config)?;
        file.flush()?;
        Ok(file)
    }
}

impl Bundler for ProcessBundler {
    fn run_with_config(&self, config: &ConfigTree) -> Result<BuildReport, BuildDiagnostics> {
        let file = self.write_config(config).map_err(|err| {
            BuildDiagnostics::new([format!("Failed to write bundler config: {err}")])
        })?;

        let mut cmd = Command::new(&self.program);
        cmd.arg("--config").arg(file.path());
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }
        tracing::debug!(?cmd, "spawning bundler");

        let output = cmd.output().map_err(|err| {
            BuildDiagnostics::new([format!(
                "Failed to run bundler {}: {err}",
                self.program.display()
            )])
        })?;

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));
        let (warnings, mut errors) = parse_diagnostics(&text);

        if !output.status.success() && errors.is_empty() {
            errors.push(format!(
                "{} exited with {}",
                self.program.display(),
                output.status
            ));
        }
        if !errors.is_empty() {
            return Err(BuildDiagnostics { errors });
        }
        Ok(BuildReport { warnings })
    }
}

/// Split bundler output into `(warnings, errors)`.
///
/// Only lines starting with a `WARNING` or `ERROR` word are diagnostics; an
/// optional `:` after the word is dropped.
pub fn parse_diagnostics(output: &str) -> (Vec<String>, Vec<String>) {
    let mut warnings = Vec::new();
    let mut errors = Vec::new();
    for line in output.lines() {
        if let Some(text) = diagnostic_text(line, WARNING_PREFIX) {
            warnings.push(text);
        } else if let Some(text) = diagnostic_text(line, ERROR_PREFIX) {
            errors.push(text);
        }
    }
    (warnings, errors)
}

fn diagnostic_text(line: &str, prefix: &str) -> Option<String> {
    let rest = line.strip_prefix(prefix)?;
    if !(rest.is_empty() || rest.starts_with(':') || rest.starts_with(char::is_whitespace)) {
        return None;
    }
    let rest = rest.strip_prefix(':').unwrap_or(rest);
    Some(rest.trim().to_string())
}
