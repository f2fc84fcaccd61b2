// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Build orchestration: mode builders and the bundler boundary.

use std::path::Path;
use std::sync::Arc;

use indexmap::IndexMap;
use walkdir::WalkDir;

use crate::DEFAULT_MODE;
use crate::config::{ConfigLoader, ConfigTree, MODE_OPTION, base_config};
use crate::env::{VersionControl, resolve_env};
use crate::paths::ResolvedPaths;

#[cfg(test)]
#[path = "./build_test.rs"]
mod build_test;

/// Outcome of a bundler run that produced output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    pub warnings: Vec<String>,
}

impl BuildReport {
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Blocking diagnostics reported by a failed bundler run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildDiagnostics {
    pub errors: Vec<String>,
}

impl BuildDiagnostics {
    pub fn new<S: Into<String>>(errors: impl IntoIterator<Item = S>) -> Self {
        Self {
            errors: errors.into_iter().map(Into::into).collect(),
        }
    }

    /// Convert into a build error carrying only the first diagnostic.
    ///
    /// Every diagnostic is still logged.
    pub fn into_error(self) -> crate::Error {
        for (index, error) in self.errors.iter().enumerate() {
            tracing::debug!(index, %error, "bundler diagnostic");
        }
        let suppressed = self.errors.len().saturating_sub(1);
        let message = self
            .errors
            .into_iter()
            .next()
            .unwrap_or_else(|| "the bundler reported a failure without diagnostics".to_string());
        crate::Error::BuildFailed {
            message,
            suppressed,
        }
    }
}

/// The external bundler.
pub trait Bundler {
    fn run_with_config(&self, config: &ConfigTree) -> Result<BuildReport, BuildDiagnostics>;
}

/// What a [`ModeBuilder`] has to work with.
pub struct BuildContext<'a> {
    pub paths: &'a ResolvedPaths,
    pub bundler: &'a dyn Bundler,
}

/// Runs a build for one mode.
pub trait ModeBuilder {
    fn build(&self, ctx: &BuildContext<'_>, config: &ConfigTree) -> crate::Result<BuildReport>;
}

/// Builder for `production`: fresh output directory, then one bundler run.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProductionBuilder;

impl ModeBuilder for ProductionBuilder {
    fn build(&self, ctx: &BuildContext<'_>, config: &ConfigTree) -> crate::Result<BuildReport> {
        prepare_output_dir(ctx.paths)?;
        tracing::info!(output = ?ctx.paths.output_path, "running bundler");
        let report = ctx
            .bundler
            .run_with_config(config)
            .map_err(BuildDiagnostics::into_error)?;
        tracing::info!(warnings = report.warnings.len(), "bundler finished");
        Ok(report)
    }
}

/// Mode name to builder.
pub struct BuilderRegistry {
    builders: IndexMap<String, Box<dyn ModeBuilder>>,
}

impl Default for BuilderRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register("production", ProductionBuilder);
        registry
    }
}

impl BuilderRegistry {
    pub fn empty() -> Self {
        Self {
            builders: IndexMap::new(),
        }
    }

    pub fn register<B: ModeBuilder + 'static>(&mut self, mode: impl Into<String>, builder: B) {
        self.builders.insert(mode.into(), Box::new(builder));
    }

    pub fn get(&self, mode: &str) -> Option<&dyn ModeBuilder> {
        self.builders.get(mode).map(Box::as_ref)
    }

    pub fn modes(&self) -> impl Iterator<Item = &str> {
        self.builders.keys().map(String::as_str)
    }
}

/// Everything needed to build one package.
pub struct BuildSession<'a> {
    paths: Arc<ResolvedPaths>,
    bundler_name: String,
    bundler: &'a dyn Bundler,
    loader: &'a dyn ConfigLoader,
    vcs: &'a dyn VersionControl,
    registry: BuilderRegistry,
}

impl<'a> BuildSession<'a> {
    pub fn new(
        paths: Arc<ResolvedPaths>,
        bundler_name: impl Into<String>,
        bundler: &'a dyn Bundler,
        loader: &'a dyn ConfigLoader,
        vcs: &'a dyn VersionControl,
    ) -> Self {
        Self {
            paths,
            bundler_name: bundler_name.into(),
            bundler,
            loader,
            vcs,
            registry: BuilderRegistry::default(),
        }
    }

    pub fn with_registry(mut self, registry: BuilderRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn paths(&self) -> &ResolvedPaths {
        &self.paths
    }

    /// The derived configuration for `mode`.
    pub fn base_config(&self, mode: &str) -> crate::Result<ConfigTree> {
        let env = resolve_env(&self.paths, mode, self.vcs);
        base_config(self.loader, &self.bundler_name, mode, &self.paths, &env)
    }

    /// Build with the derived configuration for `mode`.
    ///
    /// Leading dashes are ignored, so `--production` names `production`.
    pub fn build_for_mode(&self, mode: &str) -> crate::Result<BuildReport> {
        let mode = mode.trim_start_matches('-');
        let config = self.base_config(mode)?;
        self.build_for_config(&config)
    }

    /// Build with a complete configuration, dispatching on its `mode`.
    pub fn build_for_config(&self, config: &ConfigTree) -> crate::Result<BuildReport> {
        let mode = config
            .get(MODE_OPTION)
            .and_then(|mode| mode.as_str())
            .unwrap_or(DEFAULT_MODE);
        let builder = self
            .registry
            .get(mode)
            .ok_or_else(|| crate::Error::UnsupportedMode(mode.to_string()))?;

        tracing::info!(mode, bundler = %self.bundler_name, "building");
        let ctx = BuildContext {
            paths: &self.paths,
            bundler: self.bundler,
        };
        builder.build(&ctx, config)
    }
}

/// Empty the output directory, then copy the public directory into it.
///
/// The output directory itself is kept so a shell sitting in it is not left
/// in a deleted directory. Links inside the public directory are followed.
pub fn prepare_output_dir(paths: &ResolvedPaths) -> crate::Result<()> {
    let output = &paths.output_path;
    std::fs::create_dir_all(output)?;
    for entry in std::fs::read_dir(output)? {
        let path = entry?.path();
        if path.is_dir() && !path.is_symlink() {
            std::fs::remove_dir_all(&path)?;
        } else {
            std::fs::remove_file(&path)?;
        }
    }

    match &paths.public_path {
        Some(public) if public.is_dir() => copy_dir(public, output),
        _ => Ok(()),
    }
}

fn copy_dir(from: &Path, to: &Path) -> crate::Result<()> {
    for entry in WalkDir::new(from).follow_links(true) {
        let entry = entry.map_err(std::io::Error::from)?;
        let Ok(relative) = entry.path().strip_prefix(from) else {
            continue;
        };
        let dest = to.join(relative);
        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&dest)?;
        } else {
            std::fs::copy(entry.path(), &dest)?;
        }
    }
    tracing::debug!(?from, ?to, "copied public assets");
    Ok(())
}
