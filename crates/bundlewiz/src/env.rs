// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Layered environment resolution from `.env` files and package metadata.

use std::path::{Path, PathBuf};
use std::process::Command;

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::paths::ResolvedPaths;

#[cfg(test)]
#[path = "./env_test.rs"]
mod env_test;

/// Variable name to value, in insertion order.
pub type EnvironmentMap = IndexMap<String, String>;

pub const NODE_ENV: &str = "NODE_ENV";
pub const APP_NAME: &str = "APP_NAME";
pub const APP_VERSION: &str = "APP_VERSION";
pub const BRANCH: &str = "BRANCH";
pub const COMMITHASH: &str = "COMMITHASH";

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"%([^%]+)%").expect("placeholder pattern is valid"));

/// Source of version-control metadata for the package being built.
pub trait VersionControl {
    fn branch(&self) -> Option<String>;
    fn commit_hash(&self) -> Option<String>;
}

/// Reads branch and commit from the `git` repository enclosing `dir`.
#[derive(Debug, Clone)]
pub struct GitRevision {
    dir: PathBuf,
}

impl GitRevision {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    fn rev_parse(&self, args: &[&str]) -> Option<String> {
        let output = Command::new("git")
            .arg("rev-parse")
            .args(args)
            .current_dir(&self.dir)
            .output();
        match output {
            Ok(output) if output.status.success() => {
                let value = String::from_utf8_lossy(&output.stdout).trim().to_string();
                (!value.is_empty()).then_some(value)
            }
            Ok(output) => {
                tracing::debug!(
                    dir = ?self.dir,
                    stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                    "git rev-parse failed"
                );
                None
            }
            Err(err) => {
                tracing::warn!(%err, "unable to run git for revision metadata");
                None
            }
        }
    }
}

impl VersionControl for GitRevision {
    fn branch(&self) -> Option<String> {
        self.rev_parse(&["--abbrev-ref", "HEAD"])
    }

    fn commit_hash(&self) -> Option<String> {
        self.rev_parse(&["HEAD"])
    }
}

/// Dotenv file names for `mode`, most specific first.
///
/// `.env.local` is left out in `test` mode so tests behave the same for
/// everyone.
pub fn dotenv_candidates(mode: &str) -> Vec<String> {
    let mut names = vec![format!(".env.{mode}.local"), format!(".env.{mode}")];
    if mode != "test" {
        names.push(".env.local".to_string());
    }
    names.push(".env".to_string());
    names
}

/// Find the dotenv file to use for `mode`.
///
/// Directory order dominates: every candidate name is tried in the first
/// directory before the second directory is looked at.
pub fn resolve_dotenv_file<P: AsRef<Path>>(base_dirs: &[P], mode: &str) -> Option<PathBuf> {
    let candidates = dotenv_candidates(mode);
    base_dirs.iter().find_map(|dir| {
        candidates
            .iter()
            .map(|name| dir.as_ref().join(name))
            .find(|path| path.exists())
    })
}

/// Parse a dotenv file.
pub fn parse_env_file(path: &Path) -> crate::Result<EnvironmentMap> {
    let read_failed = |message: String| crate::Error::ReadFailed {
        path: path.to_path_buf(),
        error: std::io::Error::new(std::io::ErrorKind::InvalidData, message),
    };

    let entries = dotenvy::from_path_iter(path).map_err(|e| read_failed(e.to_string()))?;
    let mut vars = EnvironmentMap::new();
    for entry in entries {
        let (key, value) = entry.map_err(|e| read_failed(e.to_string()))?;
        vars.insert(key, value);
    }
    Ok(vars)
}

/// Variables from the most specific dotenv file for `mode`, if any.
///
/// An unreadable file is logged and treated as empty.
pub fn load_dotenv<P: AsRef<Path>>(base_dirs: &[P], mode: &str) -> EnvironmentMap {
    let Some(path) = resolve_dotenv_file(base_dirs, mode) else {
        tracing::debug!(mode, "no dotenv file found");
        return EnvironmentMap::new();
    };
    tracing::debug!(?path, mode, "loading dotenv file");
    parse_env_file(&path).unwrap_or_else(|err| {
        tracing::warn!(%err, "ignoring unreadable dotenv file");
        EnvironmentMap::new()
    })
}

/// Resolve the full environment for `mode`.
///
/// Layers, later winning: dotenv values, `NODE_ENV`, package name and
/// version, then branch and commit hash when `vcs` can provide them.
pub fn resolve_env(paths: &ResolvedPaths, mode: &str, vcs: &dyn VersionControl) -> EnvironmentMap {
    let mut env = load_dotenv(&paths.asset_resolution_order, mode);
    env.insert(NODE_ENV.to_string(), mode.to_string());
    env.insert(APP_NAME.to_string(), paths.manifest.name.clone());
    env.insert(APP_VERSION.to_string(), paths.manifest.version.clone());
    if let Some(branch) = vcs.branch() {
        env.insert(BRANCH.to_string(), branch);
    }
    if let Some(hash) = vcs.commit_hash() {
        env.insert(COMMITHASH.to_string(), hash);
    }
    env
}

/// Replace `%KEY%` placeholders in `input` with values from `vars`.
///
/// The result is written to `output`, or back to `input` when `output` is
/// `None`. Placeholders without a matching variable are left intact.
pub fn replace_vars(input: &Path, output: Option<&Path>, vars: &EnvironmentMap) -> crate::Result<()> {
    let contents = std::fs::read_to_string(input).map_err(|e| crate::Error::ReadFailed {
        path: input.to_path_buf(),
        error: e,
    })?;
    let replaced = PLACEHOLDER.replace_all(&contents, |caps: &Captures| {
        vars.get(&caps[1])
            .cloned()
            .unwrap_or_else(|| caps[0].to_string())
    });
    std::fs::write(output.unwrap_or(input), replaced.as_bytes())?;
    Ok(())
}
