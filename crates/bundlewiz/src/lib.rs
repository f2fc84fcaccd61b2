// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! bundlewiz - Monorepo-aware bundler configuration
//!
//! This crate computes everything a bundler invocation needs to know about
//! the package it is building, without doing any bundling itself.
//!
//! # Overview
//!
//! Starting from a package directory, bundlewiz finds the monorepo root that
//! claims the package (if any) and the base package named by the manifest's
//! `extends` field. Those directories form the *asset resolution order*,
//! most specific first, which every later lookup walks:
//!
//! ```text
//! /repo/pkg-a            <- package root
//! /repo/packages/base    <- base package ("extends": "@scope/base")
//! /repo                  <- monorepo root ("workspaces": ["packages/*", "pkg-a"])
//! ```
//!
//! Environment variables are read from the most specific `.env` family file
//! along that order, and the bundler configuration derived for a mode is
//! deep-merged with package-level and user-supplied overrides before being
//! handed to a [`Bundler`].

pub mod base_package;
pub mod build;
pub mod config;
pub mod env;
pub mod error;
pub mod manifest;
pub mod merge;
pub mod paths;
pub mod resolve;
pub mod workspace;

pub use base_package::resolve_base_package;
pub use build::{
    BuildContext, BuildDiagnostics, BuildReport, BuildSession, Bundler, BuilderRegistry,
    ModeBuilder, ProductionBuilder, prepare_output_dir,
};
pub use config::{
    BuildOptions, ConfigLoader, ConfigProvider, ConfigTree, FileConfigLoader, base_config,
    common_config, mode_config, package_bundler_config, parse_options,
};
pub use env::{
    EnvironmentMap, GitRevision, VersionControl, load_dotenv, replace_vars, resolve_dotenv_file,
    resolve_env,
};
pub use error::{Error, Result};
pub use manifest::{PackageManifest, Workspaces};
pub use merge::merge;
pub use paths::{PathsResolver, ResolvedPaths, compute_paths, lookup_dir_chain, path_offset};
pub use resolve::{Exclude, ModuleResolver, resolve_existing, resolve_module};
pub use workspace::{find_monorepo_root, list_workspace_members};

/// Well-known filename for package manifests.
pub const MANIFEST_FILENAME: &str = "package.json";

/// Directory holding static assets copied verbatim into the output.
pub const PUBLIC_DIRNAME: &str = "public";

/// Directory, relative to the package root, that receives build output.
pub const OUTPUT_DIRNAME: &str = "dist";

/// Mode used when none is requested.
pub const DEFAULT_MODE: &str = "production";
