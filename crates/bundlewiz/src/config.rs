// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Bundler configuration: base trees per mode and user-supplied providers.

use std::path::Path;

use indexmap::IndexMap;
use serde_json::{Map, Value, json};

use crate::env::EnvironmentMap;
use crate::merge::merge;
use crate::paths::ResolvedPaths;
use crate::resolve::{resolve_existing, resolve_module};

#[cfg(test)]
#[path = "./config_test.rs"]
mod config_test;

/// A build configuration: nested scalars, sequences and ordered mappings.
pub type ConfigTree = Value;

/// `key=value` options given on the command line.
pub type BuildOptions = IndexMap<String, String>;

/// Option naming a user configuration file.
pub const CONFIG_OPTION: &str = "config";

/// Option selecting the build mode.
pub const MODE_OPTION: &str = "mode";

/// File extensions accepted for configuration files, in lookup order.
pub const CONFIG_EXTENSIONS: [&str; 3] = ["json", "yaml", "yml"];

/// Parse `key=value` tokens into options.
///
/// Leading dashes are stripped and keys are lowercased; a token without `=`
/// is a flag with the value `"true"`.
pub fn parse_options<I, S>(args: I) -> BuildOptions
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    args.into_iter()
        .map(|arg| {
            let (key, value) = arg.as_ref().split_once('=').unwrap_or((arg.as_ref(), "true"));
            (
                key.trim_start_matches('-').to_lowercase(),
                value.to_string(),
            )
        })
        .collect()
}

/// A configuration supplied from outside the derived base configuration.
pub enum ConfigProvider {
    /// A fixed tree.
    Static(ConfigTree),
    /// A tree computed from the build options.
    Function(Box<dyn Fn(&BuildOptions) -> ConfigTree>),
}

impl ConfigProvider {
    pub fn resolve(&self, options: &BuildOptions) -> ConfigTree {
        match self {
            Self::Static(tree) => tree.clone(),
            Self::Function(f) => f(options),
        }
    }
}

impl std::fmt::Debug for ConfigProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Static(tree) => f.debug_tuple("Static").field(tree).finish(),
            Self::Function(_) => f.write_str("Function(..)"),
        }
    }
}

/// Loads a configuration module from a path.
pub trait ConfigLoader {
    fn load(&self, path: &Path) -> crate::Result<ConfigProvider>;
}

/// Loads JSON or YAML configuration files as static trees.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileConfigLoader;

impl ConfigLoader for FileConfigLoader {
    fn load(&self, path: &Path) -> crate::Result<ConfigProvider> {
        if !path.is_file() {
            return Err(crate::Error::ConfigNotFound(path.to_path_buf()));
        }
        let text = std::fs::read_to_string(path).map_err(|e| crate::Error::ReadFailed {
            path: path.to_path_buf(),
            error: e,
        })?;
        decode_config(path, &text).map(ConfigProvider::Static)
    }
}

fn decode_config(path: &Path, text: &str) -> crate::Result<ConfigTree> {
    let invalid = |message: String| crate::Error::InvalidConfig {
        path: path.to_path_buf(),
        message,
    };

    let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or_default();
    let tree: ConfigTree = match extension {
        "json" => serde_json::from_str(text).map_err(|e| invalid(e.to_string()))?,
        "yaml" | "yml" => serde_yaml::from_str(text).map_err(|e| invalid(e.to_string()))?,
        other => return Err(invalid(format!("unsupported file extension '{other}'"))),
    };
    match tree {
        Value::Object(_) => Ok(tree),
        // an empty YAML document
        Value::Null => Ok(json!({})),
        _ => Err(invalid("expected a mapping at the top level".to_string())),
    }
}

/// The package-level `{bundler}.config.*` file along the resolution order.
///
/// Directories are tried in order and, within one, each supported
/// extension. No file yields an empty tree.
pub fn package_bundler_config(
    loader: &dyn ConfigLoader,
    bundler: &str,
    mode: &str,
    paths: &ResolvedPaths,
) -> crate::Result<ConfigTree> {
    let found = paths.asset_resolution_order.iter().find_map(|dir| {
        CONFIG_EXTENSIONS
            .iter()
            .find_map(|ext| resolve_existing(&[dir], format!("{bundler}.config.{ext}"), false))
    });
    let Some(path) = found else {
        tracing::debug!(bundler, "no package-level bundler config");
        return Ok(json!({}));
    };

    tracing::debug!(?path, "loading package-level bundler config");
    let mut options = BuildOptions::new();
    options.insert(MODE_OPTION.to_string(), mode.to_string());
    Ok(loader.load(&path)?.resolve(&options))
}

/// Configuration shared by every mode.
pub fn common_config(mode: &str, paths: &ResolvedPaths, env: &EnvironmentMap) -> ConfigTree {
    let is_production = mode == "production";
    let dotenv: Map<String, Value> = env
        .iter()
        .map(|(key, value)| (key.clone(), Value::String(value.clone())))
        .collect();
    let modules: Vec<String> = paths
        .lookup_dir_chain(&["src", "node_modules"])
        .iter()
        .map(|dir| dir.display().to_string())
        .collect();
    let babel_loader = module_or_specifier(paths, "babel-loader");
    let style_loader = if is_production {
        "mini-css-extract-plugin/loader"
    } else {
        "style-loader"
    };
    let sass_include_paths: Vec<String> = paths
        .lookup_dir_chain(&["src"])
        .iter()
        .map(|dir| dir.display().to_string())
        .collect();

    json!({
        "mode": mode,
        "entry": ["index"],
        "output": {
            "path": paths.output_path.display().to_string(),
            "publicPath": "/",
            "filename": "static/js/[name].[hash:8].js",
            "chunkFilename": "static/js/[name].[hash:8].chunk.js"
        },
        "resolve": {
            "extensions": [".js", ".json", ".jsx"],
            "modules": modules
        },
        "plugins": [
            {"kind": "ProgressPlugin"},
            {"kind": "DefinePlugin", "options": {"dotenv": dotenv}},
            {"kind": "LodashModuleReplacementPlugin"},
            {
                "kind": "IgnorePlugin",
                "options": {"resourceRegExp": "^\\./locale$", "contextRegExp": "moment$"}
            },
            {
                "kind": "PackageExtendResolverPlugin",
                "options": {"lookIn": ["src"], "assumeExtensions": [".jsx"]}
            }
        ],
        "module": {
            "rules": [{
                "oneOf": [
                    {
                        "test": "\\.(bmp|gif|jpe?g|png|ttf|svg|woff)$",
                        "loader": "url-loader",
                        "options": {"limit": 10000, "name": "static/media/[name].[hash:8].[ext]"}
                    },
                    {
                        "test": "\\.(js|jsx)$",
                        "loader": babel_loader,
                        "options": {
                            "presets": ["react-app"],
                            "cacheDirectory": true,
                            "cacheCompression": is_production,
                            "compact": is_production
                        }
                    },
                    {
                        "test": "\\.scss$",
                        "use": [
                            style_loader,
                            {"loader": "css-loader", "options": {"importLoaders": 1}},
                            {"loader": "postcss-loader", "options": {"ident": "postcss"}},
                            {"loader": "sass-loader", "options": {"includePaths": sass_include_paths}}
                        ]
                    }
                ]
            }]
        },
        "node": {
            "dgram": "empty",
            "fs": "empty",
            "net": "empty",
            "tls": "empty",
            "child_process": "empty"
        }
    })
}

/// Additions for a specific mode, if that mode has any.
pub fn mode_config(mode: &str, paths: &ResolvedPaths) -> Option<ConfigTree> {
    match mode {
        "development" => Some(development_config(paths)),
        _ => None,
    }
}

fn development_config(paths: &ResolvedPaths) -> ConfigTree {
    let template = match &paths.public_path {
        Some(public) if public.is_dir() => public.join("index.html").display().to_string(),
        _ => module_or_specifier(paths, "html-webpack-plugin/default_index.ejs"),
    };

    json!({
        "devtool": "source-map",
        "entry": [
            format!("{}?/", module_or_specifier(paths, "webpack-dev-server/client")),
            module_or_specifier(paths, "webpack/hot/dev-server")
        ],
        "output": {
            "pathinfo": true,
            "filename": "static/js/bundle.js"
        },
        "plugins": [
            {"kind": "HtmlWebpackPlugin", "options": {"inject": true, "template": template}},
            {"kind": "NamedModulesPlugin"},
            {"kind": "HotModuleReplacementPlugin"}
        ],
        "performance": {"hints": false}
    })
}

/// The resolved module path, or the specifier itself if it is not installed.
fn module_or_specifier(paths: &ResolvedPaths, specifier: &str) -> String {
    resolve_module::<_, &str>(&paths.asset_resolution_order, &[], specifier, &[])
        .map_or_else(|| specifier.to_string(), |path| path.display().to_string())
}

/// The derived configuration for `mode` before any user override.
///
/// The common tree, the mode additions and the package-level bundler config
/// are merged in that order.
pub fn base_config(
    loader: &dyn ConfigLoader,
    bundler: &str,
    mode: &str,
    paths: &ResolvedPaths,
    env: &EnvironmentMap,
) -> crate::Result<ConfigTree> {
    let mut config = common_config(mode, paths, env);
    if let Some(additions) = mode_config(mode, paths) {
        config = merge(&config, &additions);
    }
    let package = package_bundler_config(loader, bundler, mode, paths)?;
    Ok(merge(&config, &package))
}
