//! # barn
//!
//! Command-line build orchestrator for React Native and Expo apps.
//!
//! ## Overview
//!
//! `barn` reads a declarative configuration (`barn.config.json`, `.toml` or
//! `.yaml`) listing build schemes, each holding iOS, Android, JS bundle and
//! Expo targets. It runs the native toolchains for every target, collects the
//! artifacts and cleans up caches afterwards.
//!
//! ## Quick Start
//!
//! ```bash
//! # Build every scheme of ./barn.config.json into ./build
//! barn build
//!
//! # Build another project with explicit directories
//! barn build --project-dir ../app --output-dir /tmp/out --cache-dir ~/.cache/barn
//!
//! # Show the commands without running them
//! barn --dry-run build
//! ```
//!
//! ## Output Directory
//!
//! ```text
//! build/
//! ├── staging/
//! │   └── android/apk/app-staging.apk
//! └── production/
//!     ├── ios/App.ipa
//!     └── android/aab/app-release.aab
//! ```
//!
//! Single-scheme configurations (`{"targets": [...]}`) write their targets
//! directly under the output directory.
//!
//! ## CLI Flags
//!
//! Global flags available on all commands:
//!
//! - **`--dry-run`** - Print the toolchain commands without running them
//! - **`--verbose` / `-v`** - Print every command and raise the log level to `debug`
//!
//! Diagnostics go to stderr and honour `RUST_LOG`; progress goes to stdout.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use barn_sdk::timing::{Stopwatch, human_readable_duration};
use barn_sdk::{BarnConfig, BuildPaths, Pipeline};

/// Build orchestrator for React Native and Expo apps.
#[derive(Parser, Debug)]
#[command(name = "barn", author, version, about = "Build orchestrator for React Native and Expo apps", long_about = None)]
struct Cli {
    /// Print what would be done without actually doing it
    #[arg(long, global = true)]
    dry_run: bool,

    /// Print verbose output including all commands
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build every scheme of the configuration.
    Build(BuildArgs),
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
struct BuildArgs {
    /// Root of the React Native project
    #[arg(long, default_value = ".")]
    project_dir: PathBuf,

    /// Where artifacts are written [default: <project-dir>/build]
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Toolchain cache root [default: <project-dir>/caches]
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Configuration file [default: barn.config.{json,toml,yaml,yml} in the project directory]
    #[arg(long)]
    config: Option<PathBuf>,
}

impl BuildArgs {
    fn build_paths(&self) -> BuildPaths {
        let mut paths = BuildPaths::for_project(&self.project_dir);
        if let Some(dir) = &self.output_dir {
            paths = paths.with_output_dir(dir);
        }
        if let Some(dir) = &self.cache_dir {
            paths = paths.with_cache_dir(dir);
        }
        paths
    }

    fn config_path(&self) -> PathBuf {
        BarnConfig::resolve_path(&self.project_dir, self.config.as_deref())
    }
}

/// Parses the command line and runs the requested command.
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    match cli.command {
        Command::Build(args) => runtime.block_on(cmd_build(&args, cli.dry_run, cli.verbose)),
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

async fn cmd_build(args: &BuildArgs, dry_run: bool, verbose: bool) -> Result<()> {
    let stopwatch = Stopwatch::start();
    let config_path = args.config_path();
    println!("[barn] using config {}", config_path.display());

    let config = BarnConfig::load(&config_path)
        .with_context(|| format!("Failed to load configuration from {}", config_path.display()))?;
    println!(
        "[barn] {} scheme(s): {}",
        config.schemes().len(),
        describe_schemes(&config)
    );
    if dry_run {
        println!("[barn] dry-run: no commands will be executed");
    }

    let paths = args.build_paths();
    tracing::debug!(?paths, "resolved build paths");
    let pipeline = Pipeline::new(paths, config)
        .context("Failed to prepare build directories")?
        .verbose(verbose)
        .dry_run(dry_run);
    let summary = pipeline.run().await.context("Build failed")?;

    for scheme in &summary.schemes {
        println!(
            "[barn] ✓ {} -> {}",
            display_scheme(&scheme.name),
            scheme.output_dir.display()
        );
        if verbose {
            for result in &scheme.results {
                for artifact in &result.artifacts {
                    println!("[barn]     {}", Path::new(&result.name).join(artifact).display());
                }
            }
        }
    }

    let finished = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .context("Failed to format completion time")?;
    println!(
        "[barn] finished in {} at {}",
        human_readable_duration(stopwatch.total()),
        finished
    );
    Ok(())
}

fn describe_schemes(config: &BarnConfig) -> String {
    config
        .schemes()
        .iter()
        .map(|s| format!("{} ({} target(s))", display_scheme(&s.name), s.targets.len()))
        .collect::<Vec<_>>()
        .join(", ")
}

fn display_scheme(name: &str) -> &str {
    if name.is_empty() { "default" } else { name }
}
