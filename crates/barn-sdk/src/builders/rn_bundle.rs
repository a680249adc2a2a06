//! React Native JS bundle builder.
//!
//! Produces the JavaScript bundle, its assets and optionally a source map
//! with `react-native bundle`, without any native build.

use super::common::{RunOptions, ToolCommand, run_tool};
use crate::config::RnBundleTarget;
use crate::context::TaskContext;
use crate::types::{BarnError, BuildResult, TargetKind};
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct BundleBuilder {
    target: RnBundleTarget,
    package_manager: String,
    name: String,
    options: RunOptions,
}

impl BundleBuilder {
    pub fn new(target: RnBundleTarget, package_manager: impl Into<String>) -> Self {
        let name = target
            .name
            .clone()
            .unwrap_or_else(|| TargetKind::RnBundle.as_str().to_string());
        Self {
            target,
            package_manager: package_manager.into(),
            name,
            options: RunOptions::default(),
        }
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.options.verbose = verbose;
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.options.dry_run = dry_run;
        self
    }

    fn bundle_file(&self) -> &'static str {
        self.target.platform.bundle_file_name()
    }

    fn sourcemap_file(&self) -> String {
        let bundle = self.bundle_file();
        let stem = bundle.rsplit_once('.').map_or(bundle, |(stem, _)| stem);
        format!("{stem}.map")
    }

    /// Builds the `react-native bundle` invocation.
    pub fn bundle_command(&self, ctx: &TaskContext) -> ToolCommand {
        let out = &ctx.output_dir;
        let mut cmd = ToolCommand::new(
            format!("react-native bundle ({})", self.target.platform.as_str()),
            &self.package_manager,
        )
        .args(["react-native", "bundle"])
        .arg("--entry-file")
        .arg(self.target.entry_file())
        .arg("--platform")
        .arg(self.target.platform.as_str())
        .args(["--dev", "false"])
        .arg("--bundle-output")
        .arg(out.join(self.bundle_file()))
        .arg("--assets-dest")
        .arg(out);
        if self.target.includes_sourcemaps() {
            cmd = cmd
                .arg("--sourcemap-output")
                .arg(out.join(self.sourcemap_file()));
        }
        cmd.current_dir(&ctx.project_dir)
    }

    pub async fn build(&self, ctx: &TaskContext) -> Result<BuildResult, BarnError> {
        tracing::info!(target_name = %self.name, platform = self.target.platform.as_str(), "bundling javascript");
        run_tool(&self.bundle_command(ctx), self.options).await?;

        let mut artifacts = vec![PathBuf::from(self.bundle_file())];
        if self.target.includes_sourcemaps() {
            artifacts.push(PathBuf::from(self.sourcemap_file()));
        }
        Ok(BuildResult {
            kind: TargetKind::RnBundle,
            name: self.name.clone(),
            artifacts,
        })
    }
}
