// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Package manifest (package.json) parsing.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::MANIFEST_FILENAME;
use crate::resolve::resolve_existing;

#[cfg(test)]
#[path = "./manifest_test.rs"]
mod manifest_test;

/// Workspace declaration of a monorepo root.
///
/// Both the plain list form and the `{ "packages": [...] }` form are accepted.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum Workspaces {
    Patterns(Vec<String>),
    Config {
        #[serde(default)]
        packages: Vec<String>,
    },
}

impl Workspaces {
    /// Member patterns in declaration order.
    pub fn patterns(&self) -> &[String] {
        match self {
            Self::Patterns(patterns) => patterns,
            Self::Config { packages } => packages,
        }
    }
}

/// The subset of a package.json that resolution cares about.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct PackageManifest {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub version: String,

    /// Member globs; only meaningful at a monorepo root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspaces: Option<Workspaces>,

    /// Name of the base package this package inherits assets from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extends: Option<String>,
}

impl PackageManifest {
    /// Parse a manifest from JSON text.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Load the manifest at `path`.
    pub fn load<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| crate::Error::ReadFailed {
            path: path.to_path_buf(),
            error: e,
        })?;
        Self::from_json(&json).map_err(|e| crate::Error::InvalidManifest {
            path: path.to_path_buf(),
            error: e,
        })
    }

    /// Load the manifest of the first directory in `dirs` that has one.
    ///
    /// Returns `Ok(None)` when none of the directories holds a manifest.
    pub fn find<P: AsRef<Path>>(dirs: &[P]) -> crate::Result<Option<(PathBuf, Self)>> {
        match resolve_existing(dirs, MANIFEST_FILENAME, false) {
            Some(path) => {
                let manifest = Self::load(&path)?;
                Ok(Some((path, manifest)))
            }
            None => Ok(None),
        }
    }

    /// Load the manifest directly inside `dir`, if there is one.
    pub fn load_from_dir<P: AsRef<Path>>(dir: P) -> crate::Result<Option<Self>> {
        Ok(Self::find(&[dir.as_ref()])?.map(|(_, manifest)| manifest))
    }

    /// Member patterns, or `None` when this is not a monorepo root.
    pub fn workspace_patterns(&self) -> Option<&[String]> {
        self.workspaces.as_ref().map(Workspaces::patterns)
    }

    /// The `extends` name with any leading `@scope/` segment removed.
    pub fn unscoped_extends(&self) -> Option<&str> {
        self.extends.as_deref().map(unscoped_name)
    }
}

/// Strip a leading `@scope/` segment from a package name.
pub fn unscoped_name(name: &str) -> &str {
    match name.strip_prefix('@').and_then(|rest| rest.split_once('/')) {
        Some((scope, rest)) if !scope.is_empty() => rest,
        _ => name,
    }
}
