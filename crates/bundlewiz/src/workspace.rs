// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Monorepo discovery: workspace member listing and the upward root search.

use std::path::{Path, PathBuf};

use glob::{MatchOptions, Pattern};

use crate::manifest::PackageManifest;
use crate::resolve::{normalize_path, resolve_path};

#[cfg(test)]
#[path = "./workspace_test.rs"]
mod workspace_test;

const GLOB_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: true,
};

/// List the member directories declared by the manifest in `dir`.
///
/// Returns `None` when `dir` has no manifest or the manifest declares no
/// `workspaces`, meaning `dir` is not a monorepo root. Literal patterns
/// resolve relative to `dir` whether or not they exist; glob patterns expand
/// to existing paths. A glob match reached through a symlinked directory is
/// dropped; a match that is itself a link is kept. Results keep declaration
/// order and are not deduplicated.
pub fn list_workspace_members(dir: &Path) -> Option<Vec<PathBuf>> {
    let manifest = match PackageManifest::load_from_dir(dir) {
        Ok(Some(manifest)) => manifest,
        Ok(None) => return None,
        Err(err) => {
            tracing::warn!(?dir, %err, "treating directory with unreadable manifest as non-root");
            return None;
        }
    };
    let patterns = manifest.workspace_patterns()?;

    let mut members = Vec::new();
    for pattern in patterns {
        if has_magic(pattern) {
            match expand_pattern(dir, pattern) {
                Ok(matches) => members.extend(matches),
                Err(err) => tracing::warn!(?dir, %err, "skipping workspace pattern"),
            }
        } else {
            members.push(resolve_path(dir, pattern));
        }
    }
    Some(members)
}

/// Find the nearest ancestor monorepo root that lists `package_dir`.
///
/// The walk stops at the first ancestor that declares workspaces: if that
/// root does not list the package, `None` is returned even when a more
/// distant ancestor would.
pub fn find_monorepo_root(package_dir: &Path) -> Option<PathBuf> {
    let package_dir = normalize_path(package_dir);
    let mut current = package_dir.clone();

    loop {
        let check_dir = current.parent()?.to_path_buf();
        if !check_dir.exists() || check_dir.parent().is_none() {
            tracing::debug!(?package_dir, "reached filesystem root without a monorepo");
            return None;
        }

        match list_workspace_members(&check_dir) {
            None => current = check_dir,
            Some(members) if members.contains(&package_dir) => {
                tracing::debug!(?package_dir, root = ?check_dir, "found monorepo root");
                return Some(check_dir);
            }
            Some(_) => {
                tracing::debug!(
                    ?package_dir,
                    root = ?check_dir,
                    "nearest monorepo root does not list this package"
                );
                return None;
            }
        }
    }
}

fn has_magic(pattern: &str) -> bool {
    pattern.contains(['*', '?', '[', '{'])
}

/// Expand a glob pattern against `dir` into absolute paths.
fn expand_pattern(dir: &Path, pattern: &str) -> crate::Result<Vec<PathBuf>> {
    let alternatives = if pattern.contains('{') {
        bracoxide::explode(pattern).unwrap_or_else(|_| vec![pattern.to_string()])
    } else {
        vec![pattern.to_string()]
    };
    let prefix = Pattern::escape(&dir.to_string_lossy());

    let mut matches = Vec::new();
    for alternative in alternatives {
        let absolute = if Path::new(&alternative).is_absolute() {
            alternative
        } else {
            format!("{prefix}/{alternative}")
        };
        let paths =
            glob::glob_with(&absolute, GLOB_OPTIONS).map_err(|e| crate::Error::InvalidPattern {
                pattern: pattern.to_string(),
                error: e,
            })?;
        for entry in paths {
            match entry {
                Ok(path) if passes_through_symlink(dir, &path) => {
                    tracing::debug!(?path, "skipping glob match below a symlink");
                }
                Ok(path) => matches.push(normalize_path(&path)),
                Err(err) => tracing::debug!(%err, "skipping unreadable glob entry"),
            }
        }
    }
    Ok(matches)
}

/// Whether a directory between `dir` and `path` is a symbolic link.
fn passes_through_symlink(dir: &Path, path: &Path) -> bool {
    path.ancestors()
        .skip(1)
        .take_while(|ancestor| *ancestor != dir && ancestor.starts_with(dir))
        .any(Path::is_symlink)
}
