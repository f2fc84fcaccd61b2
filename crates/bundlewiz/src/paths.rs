// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Computation and caching of the directories a build resolves against.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;

use crate::base_package::resolve_base_package;
use crate::manifest::PackageManifest;
use crate::resolve::{normalize_path, resolve_existing};
use crate::workspace::find_monorepo_root;
use crate::{OUTPUT_DIRNAME, PUBLIC_DIRNAME};

#[cfg(test)]
#[path = "./paths_test.rs"]
mod paths_test;

/// Directories resolved for one package root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPaths {
    pub package_root: PathBuf,

    /// Nearest ancestor monorepo root that lists this package.
    pub monorepo_root: Option<PathBuf>,

    /// Directory of the package named by `extends`.
    pub base_package_root: Option<PathBuf>,

    /// First `public` directory along the asset resolution order.
    pub public_path: Option<PathBuf>,

    /// Always `<package_root>/dist`; output is never inherited.
    pub output_path: PathBuf,

    /// Package root, base package root, monorepo root; most specific first,
    /// without duplicates.
    pub asset_resolution_order: Vec<PathBuf>,

    /// Manifest read from the package root.
    pub manifest: PackageManifest,
}

impl ResolvedPaths {
    /// The first manifest found along the asset resolution order.
    ///
    /// Falls back to an empty manifest when none can be read.
    pub fn package_manifest(&self) -> PackageManifest {
        match PackageManifest::find(&self.asset_resolution_order) {
            Ok(Some((_, manifest))) => manifest,
            Ok(None) => PackageManifest::default(),
            Err(err) => {
                tracing::warn!(%err, "using an empty manifest");
                PackageManifest::default()
            }
        }
    }

    /// See [`path_offset`].
    pub fn path_offset(&self, context: &Path) -> Option<PathBuf> {
        path_offset(context, &self.asset_resolution_order)
    }

    /// See [`lookup_dir_chain`].
    pub fn lookup_dir_chain<S: AsRef<Path>>(&self, relative_roots: &[S]) -> Vec<PathBuf> {
        lookup_dir_chain(relative_roots, &self.asset_resolution_order)
    }
}

/// Resolve all paths for the package at `package_root`.
///
/// The package root must hold a manifest; every other directory is optional.
/// A relative root is taken from the current directory.
pub fn compute_paths(package_root: &Path) -> crate::Result<ResolvedPaths> {
    let package_root = absolute_root(package_root)?;
    let manifest = PackageManifest::load_from_dir(&package_root)?
        .ok_or_else(|| crate::Error::ManifestNotFound(package_root.clone()))?;

    let monorepo_root = find_monorepo_root(&package_root);
    let base_package_root =
        resolve_base_package(&manifest, monorepo_root.as_deref(), &package_root);

    let mut asset_resolution_order: Vec<PathBuf> = Vec::with_capacity(3);
    for dir in [Some(&package_root), base_package_root.as_ref(), monorepo_root.as_ref()]
        .into_iter()
        .flatten()
    {
        if !asset_resolution_order.contains(dir) {
            asset_resolution_order.push(dir.clone());
        }
    }

    let public_path = resolve_existing(&asset_resolution_order, PUBLIC_DIRNAME, false);
    let output_path = package_root.join(OUTPUT_DIRNAME);

    tracing::debug!(
        ?package_root,
        ?monorepo_root,
        ?base_package_root,
        ?public_path,
        "resolved package paths"
    );

    Ok(ResolvedPaths {
        package_root,
        monorepo_root,
        base_package_root,
        public_path,
        output_path,
        asset_resolution_order,
        manifest,
    })
}

fn absolute_root(package_root: &Path) -> crate::Result<PathBuf> {
    Ok(normalize_path(&std::path::absolute(package_root)?))
}

/// Caller-owned cache of [`ResolvedPaths`] keyed by package root.
///
/// Each key is written at most once; later calls for the same root return
/// the stored value even if the filesystem has changed since.
#[derive(Debug, Default)]
pub struct PathsResolver {
    cache: DashMap<PathBuf, Arc<ResolvedPaths>>,
}

impl PathsResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolved paths for `package_root`, computing them on first use.
    pub fn paths(&self, package_root: &Path) -> crate::Result<Arc<ResolvedPaths>> {
        let key = absolute_root(package_root)?;
        if let Some(cached) = self.cache.get(&key) {
            tracing::trace!(package_root = ?key, "using cached paths");
            return Ok(Arc::clone(cached.value()));
        }

        let computed = Arc::new(compute_paths(&key)?);
        let entry = self.cache.entry(key).or_insert(computed);
        Ok(Arc::clone(entry.value()))
    }

    pub fn is_cached(&self, package_root: &Path) -> bool {
        absolute_root(package_root).is_ok_and(|key| self.cache.contains_key(&key))
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

/// The part of `context` below the first of `roots` that contains it.
///
/// Returns an empty path when `context` is itself one of the roots, and
/// `None` when it lies outside all of them.
pub fn path_offset<P: AsRef<Path>>(context: &Path, roots: &[P]) -> Option<PathBuf> {
    roots
        .iter()
        .find_map(|root| context.strip_prefix(root.as_ref()).ok())
        .map(Path::to_path_buf)
}

/// Expand `relative_roots` against every root, in root order.
///
/// Absolute entries are kept as they are.
pub fn lookup_dir_chain<S, P>(relative_roots: &[S], roots: &[P]) -> Vec<PathBuf>
where
    S: AsRef<Path>,
    P: AsRef<Path>,
{
    let mut chain = Vec::new();
    for relative in relative_roots {
        let relative = relative.as_ref();
        if relative.is_absolute() {
            chain.push(relative.to_path_buf());
        } else {
            chain.extend(roots.iter().map(|root| root.as_ref().join(relative)));
        }
    }
    chain
}
