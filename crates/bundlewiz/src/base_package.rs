// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Resolution of the base package named by a manifest's `extends` field.

use std::path::{Path, PathBuf};

use crate::manifest::{PackageManifest, unscoped_name};
use crate::resolve::resolve_existing;
use crate::workspace::list_workspace_members;

#[cfg(test)]
#[path = "./base_package_test.rs"]
mod base_package_test;

/// Locate the directory of the package this one `extends`.
///
/// Workspace members of the monorepo are searched first, matching a member
/// whose path ends with the full or unscoped package name. Otherwise the
/// package is looked up as an installed dependency under `package_root`.
/// `None` means "no inheritance".
pub fn resolve_base_package(
    manifest: &PackageManifest,
    monorepo_root: Option<&Path>,
    package_root: &Path,
) -> Option<PathBuf> {
    let extends = manifest.extends.as_deref().filter(|name| !name.is_empty())?;
    let unscoped = unscoped_name(extends);

    let member = monorepo_root
        .and_then(list_workspace_members)
        .and_then(|members| {
            members
                .into_iter()
                .find(|dir| dir.ends_with(extends) || dir.ends_with(unscoped))
        });
    if let Some(member) = member {
        tracing::debug!(extends, path = ?member, "base package is a workspace member");
        return Some(member);
    }

    let installed = resolve_existing(&[package_root], Path::new("node_modules").join(extends), false);
    match &installed {
        Some(path) => tracing::debug!(extends, ?path, "base package is an installed dependency"),
        None => tracing::debug!(extends, "base package could not be resolved"),
    }
    installed
}
