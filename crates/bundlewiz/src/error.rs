// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Error types for bundlewiz operations.
//!
//! Lookups that simply find nothing are not errors; they return `None` or an
//! empty value. The variants here are the conditions that stop a build.

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Convenience Result type with bundlewiz Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during bundlewiz operations.
#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    /// No manifest at the requested package root
    #[error("package.json not found in {0:?}")]
    #[diagnostic(
        code(bundlewiz::manifest_not_found),
        help("Run bundlewiz from a package directory or point --root at one")
    )]
    ManifestNotFound(PathBuf),

    /// Manifest exists but could not be decoded
    #[error("Invalid package.json at {path:?}: {error}")]
    #[diagnostic(code(bundlewiz::invalid_manifest))]
    InvalidManifest {
        path: PathBuf,
        #[source]
        error: serde_json::Error,
    },

    /// Failed to read file
    #[error("Failed to read file: {path:?}")]
    #[diagnostic(code(bundlewiz::read_failed))]
    ReadFailed {
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },

    /// User named a configuration file that does not exist
    #[error("Config to use not found at: {0:?}")]
    #[diagnostic(
        code(bundlewiz::config_not_found),
        help("Check the config=<path> option; relative paths start from the working directory")
    )]
    ConfigNotFound(PathBuf),

    /// Configuration file exists but could not be decoded
    #[error("Invalid configuration in {path:?}: {message}")]
    #[diagnostic(
        code(bundlewiz::invalid_config),
        help("Configuration files must be JSON (.json) or YAML (.yaml, .yml) mappings")
    )]
    InvalidConfig { path: PathBuf, message: String },

    /// No builder registered for the requested mode
    #[error("There's no builder for the \"{0}\" mode")]
    #[diagnostic(code(bundlewiz::unsupported_mode))]
    UnsupportedMode(String),

    /// The bundler reported blocking diagnostics
    #[error("Failed to compile.\n\n{message}")]
    #[diagnostic(
        code(bundlewiz::build_failed),
        help("{}", suppressed_message(suppressed))
    )]
    BuildFailed { message: String, suppressed: usize },

    /// Malformed workspace glob
    #[error("Invalid workspace pattern '{pattern}'")]
    #[diagnostic(code(bundlewiz::invalid_pattern))]
    InvalidPattern {
        pattern: String,
        #[source]
        error: glob::PatternError,
    },

    /// IO error passthrough
    #[error(transparent)]
    #[diagnostic(code(bundlewiz::io_error))]
    Io(#[from] std::io::Error),
}

fn suppressed_message(suppressed: &usize) -> String {
    match suppressed {
        0 => "Fix the error above and run the build again".to_string(),
        1 => "1 more error was reported; it is often caused by the one above".to_string(),
        n => format!("{n} more errors were reported; they are often caused by the one above"),
    }
}
