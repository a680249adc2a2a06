//! Android build automation
//!
//! Runs a Gradle task in `<project>/android` and collects the produced
//! `.apk`/`.aab` files into the target's output directory.

use super::common::{RunOptions, ToolCommand, relative_to, run_tool};
use crate::config::AndroidTarget;
use crate::context::TaskContext;
use crate::fs;
use crate::types::{BarnError, BuildResult, TargetKind};

/// Android builder for one `android` target.
#[derive(Debug, Clone)]
pub struct AndroidBuilder {
    target: AndroidTarget,
    gradle: String,
    name: String,
    options: RunOptions,
}

impl AndroidBuilder {
    /// Creates a builder.
    ///
    /// # Arguments
    ///
    /// * `target` - The target as declared in the configuration
    /// * `gradle` - Gradle executable, usually `./gradlew`
    pub fn new(target: AndroidTarget, gradle: impl Into<String>) -> Self {
        let name = target
            .name
            .clone()
            .unwrap_or_else(|| TargetKind::Android.as_str().to_string());
        Self {
            target,
            gradle: gradle.into(),
            name,
            options: RunOptions::default(),
        }
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

    /// Builds the Gradle invocation for this target.
    pub fn gradle_command(&self, ctx: &TaskContext) -> ToolCommand {
        ToolCommand::new(format!("gradle {}", self.target.gradle_target), &self.gradle)
            .arg(&self.target.gradle_target)
            .arg("--build-cache")
            .arg("--gradle-user-home")
            .arg(&ctx.cache_dir)
            .arg("--parallel")
            .args(&self.target.extra_args)
            .current_dir(ctx.android_dir())
    }

    /// Runs Gradle, then copies every requested artifact kind found under
    /// `<project>/android` into `<output>/<kind>/`.
    ///
    /// Files already copied stay in place if a later copy fails. Files sharing
    /// a name are copied in path order, so the last one found wins.
    pub async fn build(&self, ctx: &TaskContext) -> Result<BuildResult, BarnError> {
        tracing::info!(target_name = %self.name, task = %self.target.gradle_target, "assembling android");
        run_tool(&self.gradle_command(ctx), self.options).await?;

        let mut artifacts = Vec::new();
        if !self.options.dry_run {
            let android_dir = ctx.android_dir();
            for kind in self.target.requested_artifacts() {
                let dest_dir = ctx.output_dir.join(kind.extension());
                let found = fs::find_files_with_extension(&android_dir, kind.extension()).await?;
                if found.is_empty() {
                    tracing::warn!(
                        target_name = %self.name,
                        "no .{} files found under {}",
                        kind.extension(),
                        android_dir.display()
                    );
                }
                for file in found {
                    let overwrites = file
                        .file_name()
                        .is_some_and(|name| dest_dir.join(name).exists());
                    if overwrites {
                        tracing::warn!(
                            target_name = %self.name,
                            "{} replaces an earlier artifact with the same name",
                            file.display()
                        );
                    }
                    let copied = fs::copy_file_into(&file, &dest_dir).await?;
                    let relative = relative_to(&copied, &ctx.output_dir);
                    if !artifacts.contains(&relative) {
                        artifacts.push(relative);
                    }
                }
            }
        }

        Ok(BuildResult {
            kind: TargetKind::Android,
            name: self.name.clone(),
            artifacts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AndroidArtifact;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    fn target(artifacts: Option<Vec<AndroidArtifact>>) -> AndroidTarget {
        AndroidTarget {
            gradle_target: "assembleRelease".into(),
            extra_args: vec!["--offline".into()],
            artifacts,
            name: None,
        }
    }

    fn context(root: &Path) -> TaskContext {
        TaskContext::for_target(
            &root.join("project"),
            &root.join("caches"),
            &root.join("scratch"),
            TargetKind::Android,
            "android",
        )
    }

    fn touch(path: &Path) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, path.file_name().unwrap().to_str().unwrap()).unwrap();
    }

    #[test]
    fn gradle_command_arguments() {
        let ctx = context(Path::new("/w"));
        let cmd = AndroidBuilder::new(target(None), "./gradlew").gradle_command(&ctx);
        assert_eq!(cmd.program(), "./gradlew");
        assert_eq!(
            cmd.arg_strings(),
            vec![
                "assembleRelease",
                "--build-cache",
                "--gradle-user-home",
                "/w/caches/gradle",
                "--parallel",
                "--offline"
            ]
        );
        assert_eq!(cmd.working_dir(), Some(Path::new("/w/project/android")));
        assert_eq!(cmd.description(), "gradle assembleRelease");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn partitions_apks_and_aabs_by_kind() {
        let temp = TempDir::new().unwrap();
        let ctx = context(temp.path());
        let android = ctx.android_dir();
        touch(&android.join("app/build/outputs/apk/release/app-release.apk"));
        touch(&android.join("app/build/outputs/apk/staging/app-staging.apk"));
        touch(&android.join("app/build/outputs/bundle/release/app-release.aab"));
        fs::ensure_dir(&ctx.output_dir).await.unwrap();

        let result = AndroidBuilder::new(
            target(Some(vec![AndroidArtifact::Apk, AndroidArtifact::Aab])),
            "true",
        )
        .build(&ctx)
        .await
        .unwrap();

        assert_eq!(result.kind, TargetKind::Android);
        assert_eq!(
            result.artifacts,
            vec![
                PathBuf::from("apk/app-release.apk"),
                PathBuf::from("apk/app-staging.apk"),
                PathBuf::from("aab/app-release.aab"),
            ]
        );
        assert_eq!(std::fs::read_dir(ctx.output_dir.join("apk")).unwrap().count(), 2);
        assert_eq!(std::fs::read_dir(ctx.output_dir.join("aab")).unwrap().count(), 1);
        assert_eq!(
            std::fs::read_to_string(ctx.output_dir.join("aab/app-release.aab")).unwrap(),
            "app-release.aab"
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn same_named_artifacts_are_reported_once() {
        let temp = TempDir::new().unwrap();
        let ctx = context(temp.path());
        let android = ctx.android_dir();
        touch(&android.join("app/build/intermediates/apk/release/app-release.apk"));
        std::fs::write(
            android.join("app/build/intermediates/apk/release/app-release.apk"),
            "intermediate",
        )
        .unwrap();
        touch(&android.join("app/build/outputs/apk/release/app-release.apk"));

        let result = AndroidBuilder::new(target(None), "true")
            .build(&ctx)
            .await
            .unwrap();

        assert_eq!(result.artifacts, vec![PathBuf::from("apk/app-release.apk")]);
        assert_eq!(std::fs::read_dir(ctx.output_dir.join("apk")).unwrap().count(), 1);
        assert_eq!(
            std::fs::read_to_string(ctx.output_dir.join("apk/app-release.apk")).unwrap(),
            "app-release.apk"
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn default_collects_only_apks() {
        let temp = TempDir::new().unwrap();
        let ctx = context(temp.path());
        let android = ctx.android_dir();
        touch(&android.join("app/build/outputs/apk/release/app-release.apk"));
        touch(&android.join("app/build/outputs/bundle/release/app-release.aab"));

        AndroidBuilder::new(target(None), "true")
            .build(&ctx)
            .await
            .unwrap();

        assert!(ctx.output_dir.join("apk/app-release.apk").is_file());
        assert!(!ctx.output_dir.join("aab").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn gradle_failure_is_toolchain_failure() {
        let temp = TempDir::new().unwrap();
        let ctx = context(temp.path());
        std::fs::create_dir_all(ctx.android_dir()).unwrap();

        let err = AndroidBuilder::new(target(None), "false")
            .build(&ctx)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            BarnError::ToolchainFailure { code: Some(1), .. }
        ));
    }
}
