// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! bundlewiz - build front end for monorepo packages

use std::path::{Path, PathBuf};

use bundlewiz::config::{CONFIG_OPTION, MODE_OPTION};
use bundlewiz::{
    BuildOptions, BuildReport, BuildSession, ConfigLoader, ConfigTree, DEFAULT_MODE,
    FileConfigLoader, GitRevision, PathsResolver, parse_options,
};
use clap::Parser;
use colored::Colorize;
use miette::{IntoDiagnostic, Result};

mod process_bundler;

use process_bundler::ProcessBundler;


#[derive(Parser)]
#[clap(
    name = "bundlewiz",
    about = "Build a package with layered monorepo configuration",
    version,
    after_help = "Example:\n  bundlewiz webpack --mode=production"
)]
struct Opt {
    #[clap(flatten)]
    logging: Logging,

    /// Package root to build
    #[clap(long, env = "BUNDLEWIZ_ROOT", default_value = ".")]
    root: PathBuf,

    /// Executable to run as the bundler (default: the bundler name)
    #[clap(long, env = "BUNDLEWIZ_BUNDLER_BIN")]
    bundler_bin: Option<PathBuf>,

    /// Name of the bundler, used to find `<bundler>.config.*` files
    #[clap(default_value = "webpack")]
    bundler: String,

    /// Build options as `key=value` (eg: --mode=production, --config=./my.json)
    #[clap(trailing_var_arg = true, allow_hyphen_values = true)]
    options: Vec<String>,
}

#[derive(Parser)]
struct Logging {
    /// Increase verbosity (-v, -vv, -vvv)
    #[clap(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[clap(short, long)]
    quiet: bool,
}

impl Opt {
    fn run(self) -> Result<i32> {
        let log_level = match (self.logging.quiet, self.logging.verbose) {
            (true, _) => tracing::Level::ERROR,
            (false, 0) => tracing::Level::WARN,
            (false, 1) => tracing::Level::INFO,
            (false, 2) => tracing::Level::DEBUG,
            (false, _) => tracing::Level::TRACE,
        };

        tracing_subscriber::fmt()
            .with_max_level(log_level)
            .with_writer(std::io::stderr)
            .init();

        let options = parse_options(&self.options);
        let root = dunce::canonicalize(&self.root).into_diagnostic()?;
        let resolver = PathsResolver::new();
        let paths = resolver.paths(&root)?;

        let program = self
            .bundler_bin
            .clone()
            .unwrap_or_else(|| PathBuf::from(&self.bundler));
        let bundler = ProcessBundler::new(program).with_working_dir(&paths.package_root);
        let loader = FileConfigLoader;
        let vcs = GitRevision::new(&paths.package_root);
        let session = BuildSession::new(paths.clone(), &self.bundler, &bundler, &loader, &vcs);

        let report = match options.get(CONFIG_OPTION) {
            Some(config_path) => {
                let cwd = std::env::current_dir().into_diagnostic()?;
                let config = load_user_config(&loader, &cwd, config_path, &options)?;
                session.build_for_config(&config)?
            }
            None => {
                let mode = options
                    .get(MODE_OPTION)
                    .map(String::as_str)
                    .unwrap_or(DEFAULT_MODE);
                session.build_for_mode(mode)?
            }
        };

        if !self.logging.quiet {
            print_report(&report);
        }
        Ok(0)
    }
}

/// Load the `config=<path>` file, relative to `cwd`, with `options`.
fn load_user_config(
    loader: &dyn ConfigLoader,
    cwd: &Path,
    config_path: &str,
    options: &BuildOptions,
) -> bundlewiz::Result<ConfigTree> {
    let config_path = bundlewiz::resolve::resolve_path(cwd, config_path);
    Ok(loader.load(&config_path)?.resolve(options))
}

fn print_report(report: &BuildReport) {
    if report.has_warnings() {
        println!("{}", "Compiled with warnings.".yellow());
        println!();
        for warning in &report.warnings {
            println!("{warning}");
            println!();
        }
    } else {
        println!("{}", "Compiled successfully.".green());
    }
}

fn main() -> Result<()> {
    let opt = Opt::parse();
    let code = opt.run()?;
    std::process::exit(code);
}
