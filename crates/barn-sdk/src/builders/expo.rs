//! Expo update export builder.

use super::common::{RunOptions, ToolCommand, run_tool};
use crate::config::ExpoTarget;
use crate::context::TaskContext;
use crate::fs;
use crate::types::{BarnError, BuildResult, TargetKind};

/// Runs `expo export` for one `expo` target.
#[derive(Debug, Clone)]
pub struct ExpoBuilder {
    target: ExpoTarget,
    package_manager: String,
    name: String,
    options: RunOptions,
}

impl ExpoBuilder {
    pub fn new(target: ExpoTarget, package_manager: impl Into<String>) -> Self {
        let name = target
            .name
            .clone()
            .unwrap_or_else(|| TargetKind::Expo.as_str().to_string());
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

    /// Builds the `expo export` invocation.
    pub fn export_command(&self, ctx: &TaskContext) -> ToolCommand {
        let mut cmd = ToolCommand::new("expo export", &self.package_manager)
            .args(["expo", "export"])
            .arg("-p")
            .arg(&self.target.public_url);
        if let Some(asset_url) = &self.target.asset_url {
            cmd = cmd.arg("-a").arg(asset_url);
        }
        if self.target.dump_assetmap {
            cmd = cmd.arg("-d");
        }
        if self.target.includes_sourcemaps() {
            cmd = cmd.arg("-s");
        }
        cmd.arg("--target")
            .arg(self.target.expo_target.as_str())
            .arg("--output-dir")
            .arg(&ctx.output_dir)
            .arg("--force")
            .current_dir(&ctx.project_dir)
    }

    /// Exports the update package into the target's output directory.
    ///
    /// The export layout is owned by the Expo CLI; every file it wrote is
    /// reported as an artifact.
    pub async fn build(&self, ctx: &TaskContext) -> Result<BuildResult, BarnError> {
        tracing::info!(target_name = %self.name, mode = self.target.expo_target.as_str(), "exporting expo update");
        run_tool(&self.export_command(ctx), self.options).await?;
        let artifacts = if self.options.dry_run {
            Vec::new()
        } else {
            fs::list_files(&ctx.output_dir).await?
        };
        Ok(BuildResult {
            kind: TargetKind::Expo,
            name: self.name.clone(),
            artifacts,
        })
    }
}
