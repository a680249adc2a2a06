//! Multi-scheme build pipeline.
//!
//! ```text
//! pre-build ──► scheme 1 ──► scheme 2 ──► ... ──► post-build
//!                 │
//!                 ├─ target A ─┐
//!                 ├─ target B ─┼─► <scratch>/artifacts ──copy──► <output>/<scheme>
//!                 └─ target C ─┘
//! ```
//!
//! Schemes run one after another, targets within a scheme run concurrently.
//! Each scheme builds into its own scratch directory, which is removed when
//! the scheme finishes whether it succeeded or not. The products tree is only
//! copied to the output directory when every target of the scheme succeeded.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;

use crate::builders::{self, RunOptions, ToolCommand, ios, run_best_effort, run_tool};
use crate::config::{BarnConfig, Scheme};
use crate::context::TaskContext;
use crate::fs;
use crate::timing::{Stopwatch, human_readable_duration};
use crate::types::{BarnError, BuildResult, TargetKind};

/// Prefix of per-scheme scratch directories in the system temp directory.
pub const SCRATCH_PREFIX: &str = "barn-build-";

/// Gradle user-home entries pruned after a build, relative to `<cache>/gradle`.
const GRADLE_PRUNE_PATTERNS: &[&str] = &[
    "daemon",
    "native",
    "notifications",
    "caches/*/*.lock",
    "caches/journal-*/*.lock",
];

/// Directories a build works with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildPaths {
    pub project_dir: PathBuf,
    pub output_dir: PathBuf,
    pub cache_dir: PathBuf,
}

impl BuildPaths {
    /// Paths with the default layout: `<project>/build` and `<project>/caches`.
    pub fn for_project(project_dir: impl Into<PathBuf>) -> Self {
        let project_dir = project_dir.into();
        Self {
            output_dir: project_dir.join("build"),
            cache_dir: project_dir.join("caches"),
            project_dir,
        }
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = dir.into();
        self
    }

    /// Checks the project directory, creates output and cache directories and
    /// makes all three absolute.
    fn prepare(self) -> Result<Self, BarnError> {
        let project_dir = fs::absolute(&self.project_dir)?;
        if !project_dir.is_dir() {
            return Err(BarnError::fs(
                &project_dir,
                std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "project directory does not exist",
                ),
            ));
        }
        let output_dir = fs::absolute(&self.output_dir)?;
        let cache_dir = fs::absolute(&self.cache_dir)?;
        for dir in [&output_dir, &cache_dir] {
            std::fs::create_dir_all(dir).map_err(|e| BarnError::fs(dir, e))?;
        }
        Ok(Self {
            project_dir,
            output_dir,
            cache_dir,
        })
    }
}

/// Outcome of one scheme.
#[derive(Debug, Clone)]
pub struct SchemeSummary {
    /// Scheme name, `""` for single-scheme configurations.
    pub name: String,
    /// Where the scheme's products were copied.
    pub output_dir: PathBuf,
    /// One result per target, in configuration order.
    pub results: Vec<BuildResult>,
    pub elapsed: Duration,
}

/// Outcome of a successful pipeline run.
#[derive(Debug, Clone)]
pub struct BuildSummary {
    pub schemes: Vec<SchemeSummary>,
    pub elapsed: Duration,
}

/// Drives pre-build, every scheme, and post-build for one configuration.
#[derive(Debug, Clone)]
pub struct Pipeline {
    paths: BuildPaths,
    config: Arc<BarnConfig>,
    options: RunOptions,
}

impl Pipeline {
    /// Creates a pipeline.
    ///
    /// # Errors
    ///
    /// [`BarnError::Filesystem`] when the project directory does not exist or
    /// the output or cache directory cannot be created.
    pub fn new(paths: BuildPaths, config: BarnConfig) -> Result<Self, BarnError> {
        Ok(Self {
            paths: paths.prepare()?,
            config: Arc::new(config),
            options: RunOptions::default(),
        })
    }

    /// Enables verbose output
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.options.verbose = verbose;
        self
    }

    /// Prints commands instead of running them
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.options.dry_run = dry_run;
        self
    }

    /// Absolute paths used by this pipeline.
    pub fn paths(&self) -> &BuildPaths {
        &self.paths
    }

    /// Runs the whole build.
    ///
    /// The first failing scheme stops the build; later schemes are not
    /// attempted. Post-build cleanup runs either way.
    pub async fn run(&self) -> Result<BuildSummary, BarnError> {
        let mut stopwatch = Stopwatch::start();

        self.pre_build().await?;
        if self.config.has_target_kind(TargetKind::Ios) {
            println!(
                "[barn] pre-build finished in {}",
                human_readable_duration(stopwatch.split())
            );
        }

        let mut schemes = Vec::with_capacity(self.config.schemes().len());
        let mut failure = None;
        for scheme in self.config.schemes() {
            match self.build_scheme(scheme).await {
                Ok(summary) => {
                    println!(
                        "[barn] {} built {} target(s) in {}",
                        scheme_label(&scheme.name),
                        summary.results.len(),
                        human_readable_duration(summary.elapsed)
                    );
                    schemes.push(summary);
                }
                Err(e) => {
                    tracing::error!(scheme = %scheme.name, "scheme failed: {e}");
                    failure = Some(e);
                    break;
                }
            }
        }
        stopwatch.split();

        if self.config.has_target_kind(TargetKind::Android) {
            self.post_build().await;
            println!(
                "[barn] post-build finished in {}",
                human_readable_duration(stopwatch.split())
            );
        }

        match failure {
            Some(e) => Err(e),
            None => Ok(BuildSummary {
                schemes,
                elapsed: stopwatch.total(),
            }),
        }
    }

    /// Installs pods and injects the archive cache.
    ///
    /// Only runs when the configuration has an iOS target. A failing
    /// `pod install` is fatal; a failing cache injection is logged and ignored.
    pub async fn pre_build(&self) -> Result<(), BarnError> {
        if !self.config.has_target_kind(TargetKind::Ios) {
            tracing::debug!("no ios targets, skipping pre-build");
            return Ok(());
        }
        let tools = self.config.tools();
        let ios_dir = self.paths.project_dir.join("ios");
        let storage = self
            .paths
            .cache_dir
            .join(TargetKind::Ios.cache_namespace());

        println!("[barn] pre-build: installing pods");
        run_tool(&ios::pod_install_command(tools, &ios_dir), self.options).await?;
        if !run_best_effort(
            &ios::cache_inject_command(tools, &ios_dir, &storage),
            self.options,
        )
        .await
        {
            println!("[barn] pre-build: archive cache injection failed, building without it");
        }
        Ok(())
    }

    /// Builds every target of `scheme` concurrently and copies the products to
    /// the scheme's output directory.
    ///
    /// All targets run to completion even when one fails; the first failure
    /// (in completion order) is returned and nothing is copied.
    pub async fn build_scheme(&self, scheme: &Scheme) -> Result<SchemeSummary, BarnError> {
        let mut stopwatch = Stopwatch::start();
        let scratch = tempfile::Builder::new()
            .prefix(SCRATCH_PREFIX)
            .tempdir()
            .map_err(|e| BarnError::fs(std::env::temp_dir(), e))?;
        tracing::debug!(scheme = %scheme.name, scratch = %scratch.path().display(), "scratch root");

        let products = scratch.path().join("artifacts");
        fs::clean_directory(&products).await?;

        let mut contexts = Vec::with_capacity(scheme.targets.len());
        for target in &scheme.targets {
            let ctx = TaskContext::for_target(
                &self.paths.project_dir,
                &self.paths.cache_dir,
                scratch.path(),
                target.kind(),
                target.output_name(),
            );
            fs::clean_directory(&ctx.output_dir).await?;
            contexts.push(ctx);
        }

        println!(
            "[barn] {}: building {} target(s)",
            scheme_label(&scheme.name),
            scheme.targets.len()
        );

        let tools = Arc::new(self.config.tools().clone());
        let mut tasks = JoinSet::new();
        for (index, (target, ctx)) in scheme.targets.iter().zip(contexts).enumerate() {
            let target = target.clone();
            let tools = Arc::clone(&tools);
            let options = self.options;
            tasks.spawn(async move {
                let result = builders::build_target(&target, &tools, &ctx, options).await;
                (index, target.output_name().to_string(), result)
            });
        }

        let mut results = Vec::with_capacity(scheme.targets.len());
        let mut first_failure = None;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, _, Ok(result))) => {
                    println!("[barn]   {} done", result.name);
                    results.push((index, result));
                }
                Ok((_, name, Err(e))) => {
                    tracing::error!(scheme = %scheme.name, target_name = %name, "target failed: {e}");
                    first_failure.get_or_insert(e);
                }
                Err(e) => {
                    tracing::error!(scheme = %scheme.name, "target task aborted: {e}");
                    first_failure.get_or_insert(BarnError::Task(e.to_string()));
                }
            }
        }
        if let Some(e) = first_failure {
            return Err(e);
        }
        results.sort_by_key(|(index, _)| *index);

        let output_dir = if scheme.name.is_empty() {
            self.paths.output_dir.clone()
        } else {
            self.paths.output_dir.join(&scheme.name)
        };
        if self.options.dry_run {
            println!(
                "[dry-run] copy {} -> {}",
                products.display(),
                output_dir.display()
            );
        } else {
            fs::copy_tree(&products, &output_dir).await?;
        }

        let scratch_path = scratch.path().to_path_buf();
        scratch
            .close()
            .map_err(|e| BarnError::fs(scratch_path, e))?;

        Ok(SchemeSummary {
            name: scheme.name.clone(),
            output_dir,
            results: results.into_iter().map(|(_, result)| result).collect(),
            elapsed: stopwatch.split(),
        })
    }

    /// Stops Gradle daemons and prunes volatile Gradle cache entries.
    ///
    /// Only runs when the configuration has an Android target. Never fails.
    pub async fn post_build(&self) {
        if !self.config.has_target_kind(TargetKind::Android) {
            tracing::debug!("no android targets, skipping post-build");
            return;
        }
        let stop = ToolCommand::new("gradle --stop", &self.config.tools().gradle)
            .arg("--stop")
            .current_dir(self.paths.project_dir.join("android"));
        run_best_effort(&stop, self.options).await;

        let gradle_home = self
            .paths
            .cache_dir
            .join(TargetKind::Android.cache_namespace());
        for path in prune_candidates(&gradle_home) {
            if self.options.dry_run {
                println!("[dry-run] remove {}", path.display());
                continue;
            }
            if let Err(e) = fs::remove_if_present(&path).await {
                tracing::warn!("could not prune {}: {e}", path.display());
            }
        }
    }
}

/// Existing paths under `gradle_home` matching the prune patterns.
fn prune_candidates(gradle_home: &Path) -> Vec<PathBuf> {
    let Some(root) = gradle_home.to_str() else {
        tracing::warn!("gradle cache path is not valid UTF-8, skipping prune");
        return Vec::new();
    };
    let root = glob::Pattern::escape(root);
    let mut found = Vec::new();
    for pattern in GRADLE_PRUNE_PATTERNS {
        let full = format!("{root}/{pattern}");
        match glob::glob(&full) {
            Ok(paths) => found.extend(paths.filter_map(Result::ok)),
            Err(e) => tracing::warn!("invalid prune pattern {full}: {e}"),
        }
    }
    found
}

fn scheme_label(name: &str) -> String {
    if name.is_empty() {
        "build".to_string()
    } else {
        format!("scheme '{name}'")
    }
}
