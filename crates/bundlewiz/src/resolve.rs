// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Lookup of existing files and modules across ordered base directories.

use std::path::{Component, Path, PathBuf};

use regex::Regex;
use serde::Deserialize;

use crate::MANIFEST_FILENAME;

#[cfg(test)]
#[path = "./resolve_test.rs"]
mod resolve_test;

/// Extensions every module lookup treats as script files.
pub const DEFAULT_EXTENSIONS: [&str; 3] = [".js", ".json", ".node"];

const NODE_MODULES: &str = "node_modules";

/// Join `relative` onto `base` and normalize the result.
///
/// An absolute `relative` replaces `base` entirely.
pub fn resolve_path(base: &Path, relative: impl AsRef<Path>) -> PathBuf {
    normalize_path(&base.join(relative))
}

/// Remove `.` and `..` components lexically.
///
/// Symlinks are not resolved, so the result names the path as the caller
/// spelled it.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// Return the first `base/relative` that exists, trying `base_paths` in order.
///
/// With `return_containing_base` set, the matching base directory is
/// returned instead of the joined path. An empty `relative` never matches.
pub fn resolve_existing<P: AsRef<Path>>(
    base_paths: &[P],
    relative: impl AsRef<Path>,
    return_containing_base: bool,
) -> Option<PathBuf> {
    let relative = relative.as_ref();
    if relative.as_os_str().is_empty() {
        return None;
    }

    for base in base_paths {
        let base = base.as_ref();
        let candidate = resolve_path(base, relative);
        if candidate.exists() {
            return Some(if return_containing_base {
                base.to_path_buf()
            } else {
                candidate
            });
        }
    }
    None
}

/// A resolved path that must be discarded.
#[derive(Debug, Clone)]
pub enum Exclude {
    /// Exact path equality.
    Path(PathBuf),
    /// Regular expression tested against the path's display form.
    Pattern(Regex),
}

impl Exclude {
    pub fn matches(&self, path: &Path) -> bool {
        match self {
            Self::Path(excluded) => excluded == path,
            Self::Pattern(pattern) => pattern.is_match(&path.to_string_lossy()),
        }
    }
}

impl From<&str> for Exclude {
    fn from(path: &str) -> Self {
        Self::Path(PathBuf::from(path))
    }
}

impl From<PathBuf> for Exclude {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl From<Regex> for Exclude {
    fn from(pattern: Regex) -> Self {
        Self::Pattern(pattern)
    }
}

#[derive(Deserialize)]
struct MainField {
    #[serde(default)]
    main: Option<String>,
}

/// Module lookup in the style of node's `require.resolve`.
///
/// The set of extensions treated as script files is part of the resolver
/// value, so extra extensions only apply to lookups made through it.
#[derive(Debug, Clone)]
pub struct ModuleResolver {
    extensions: Vec<String>,
}

impl Default for ModuleResolver {
    fn default() -> Self {
        Self {
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
        }
    }
}

impl ModuleResolver {
    /// A resolver that also treats each of `assumed` as a script extension.
    pub fn with_assumed_extensions<S: AsRef<str>>(assumed: &[S]) -> Self {
        let mut resolver = Self::default();
        for ext in assumed {
            let ext = ext.as_ref();
            let ext = if ext.starts_with('.') {
                ext.to_string()
            } else {
                format!(".{ext}")
            };
            if !resolver.extensions.contains(&ext) {
                resolver.extensions.push(ext);
            }
        }
        resolver
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    /// Resolve `specifier` starting from each of `search_paths` in turn.
    pub fn resolve<P: AsRef<Path>>(&self, search_paths: &[P], specifier: &str) -> Option<PathBuf> {
        if specifier.is_empty() {
            return None;
        }

        let relative = is_relative_specifier(specifier);
        for search_path in search_paths {
            let search_path = search_path.as_ref();
            let found = if relative {
                self.load_file_or_directory(&resolve_path(search_path, specifier))
            } else {
                node_module_dirs(search_path)
                    .into_iter()
                    .find_map(|dir| self.load_file_or_directory(&dir.join(specifier)))
            };
            if let Some(found) = found {
                return Some(dunce::canonicalize(&found).unwrap_or(found));
            }
        }

        tracing::debug!(specifier, "module not found in any search path");
        None
    }

    fn load_file_or_directory(&self, candidate: &Path) -> Option<PathBuf> {
        self.load_as_file(candidate)
            .or_else(|| self.load_as_directory(candidate))
    }

    fn load_as_file(&self, candidate: &Path) -> Option<PathBuf> {
        if candidate.is_file() {
            return Some(candidate.to_path_buf());
        }
        let file_name = candidate.file_name()?;
        for ext in &self.extensions {
            let mut name = file_name.to_os_string();
            name.push(ext);
            let with_ext = candidate.with_file_name(name);
            if with_ext.is_file() {
                return Some(with_ext);
            }
        }
        None
    }

    fn load_index(&self, dir: &Path) -> Option<PathBuf> {
        self.extensions
            .iter()
            .map(|ext| dir.join(format!("index{ext}")))
            .find(|path| path.is_file())
    }

    fn load_as_directory(&self, dir: &Path) -> Option<PathBuf> {
        if !dir.is_dir() {
            return None;
        }
        if let Some(main) = read_main_field(&dir.join(MANIFEST_FILENAME)) {
            let main = resolve_path(dir, main);
            if let Some(found) = self.load_as_file(&main).or_else(|| self.load_index(&main)) {
                return Some(found);
            }
        }
        self.load_index(dir)
    }
}

/// Resolve a module, discarding results that match any of `excludes`.
///
/// Lookup failures never propagate; `None` means "try the next candidate".
pub fn resolve_module<P, S>(
    search_paths: &[P],
    assumed_extensions: &[S],
    specifier: &str,
    excludes: &[Exclude],
) -> Option<PathBuf>
where
    P: AsRef<Path>,
    S: AsRef<str>,
{
    let resolver = ModuleResolver::with_assumed_extensions(assumed_extensions);
    let resolved = resolver.resolve(search_paths, specifier)?;
    if excludes.iter().any(|exclude| exclude.matches(&resolved)) {
        tracing::debug!(path = ?resolved, "resolved module is excluded");
        return None;
    }
    Some(resolved)
}

fn is_relative_specifier(specifier: &str) -> bool {
    specifier == "."
        || specifier == ".."
        || specifier.starts_with("./")
        || specifier.starts_with("../")
        || Path::new(specifier).is_absolute()
}

/// `node_modules` directories searched for bare specifiers, nearest first.
fn node_module_dirs(from: &Path) -> Vec<PathBuf> {
    from.ancestors()
        .filter(|dir| dir.file_name().is_none_or(|name| name != NODE_MODULES))
        .map(|dir| dir.join(NODE_MODULES))
        .collect()
}

fn read_main_field(manifest: &Path) -> Option<String> {
    let json = std::fs::read_to_string(manifest).ok()?;
    match serde_json::from_str::<MainField>(&json) {
        Ok(field) => field.main.filter(|main| !main.is_empty()),
        Err(err) => {
            tracing::debug!(?manifest, %err, "ignoring unreadable package.json main field");
            None
        }
    }
}
