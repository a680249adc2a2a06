//! iOS build automation
//!
//! Archives an Xcode workspace and exports an IPA from the archive:
//!
//! 1. `pod install` in `<project>/ios`
//! 2. `xcode-archive-cache inject` against the xcode cache (failure is only a warning)
//! 3. `xcodebuild archive`, with manual signing overrides when `codesigning` is set
//! 4. Provisioning profile lookup inside the archive, building a
//!    bundle id to profile UUID table
//! 5. Export options plist in the task's temp directory
//! 6. `xcodebuild -exportArchive`
//!
//! Steps 4 to 6 only run when an IPA is requested.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::common::{RunOptions, ToolCommand, relative_to, run_best_effort, run_tool};
use crate::config::{IosArtifact, IosTarget, ToolsConfig};
use crate::context::TaskContext;
use crate::fs;
use crate::types::{BarnError, BuildResult, TargetKind};

/// `pod install` in the given iOS directory.
pub fn pod_install_command(tools: &ToolsConfig, ios_dir: &Path) -> ToolCommand {
    ToolCommand::new("pod install", &tools.pod)
        .arg("install")
        .current_dir(ios_dir)
}

/// `bundle exec xcode-archive-cache inject` storing cached targets in `storage`.
pub fn cache_inject_command(tools: &ToolsConfig, ios_dir: &Path, storage: &Path) -> ToolCommand {
    let mut storage_arg = std::ffi::OsString::from("--storage=");
    storage_arg.push(storage);
    ToolCommand::new("xcode-archive-cache inject", &tools.bundler)
        .args(["exec", "xcode-archive-cache", "inject", "--configuration=Release"])
        .arg(storage_arg)
        .current_dir(ios_dir)
}

/// Renders the `-exportOptionsPlist` document.
///
/// `profiles` maps bundle identifiers to provisioning profile UUIDs.
pub fn render_export_options(method: &str, profiles: &BTreeMap<String, String>) -> String {
    let mut entries = String::new();
    for (bundle_id, uuid) in profiles {
        entries.push_str(&format!(
            "\t\t<key>{}</key>\n\t\t<string>{}</string>\n",
            xml_escape(bundle_id),
            xml_escape(uuid)
        ));
    }
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
	<key>method</key>
	<string>{method}</string>
	<key>signingStyle</key>
	<string>manual</string>
	<key>provisioningProfiles</key>
	<dict>
{entries}	</dict>
</dict>
</plist>
"#,
        method = xml_escape(method),
        entries = entries,
    )
}

fn xml_escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// iOS builder for one `ios` target.
#[derive(Debug, Clone)]
pub struct IosBuilder {
    target: IosTarget,
    tools: ToolsConfig,
    name: String,
    options: RunOptions,
}

impl IosBuilder {
    /// Creates a builder using the executables from `tools`.
    pub fn new(target: IosTarget, tools: &ToolsConfig) -> Self {
        let name = target
            .name
            .clone()
            .unwrap_or_else(|| TargetKind::Ios.as_str().to_string());
        Self {
            target,
            tools: tools.clone(),
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

    /// `<out>/<scheme>-<config>.xcarchive`
    pub fn archive_path(&self, ctx: &TaskContext) -> PathBuf {
        ctx.output_dir.join(format!(
            "{}-{}.xcarchive",
            self.target.xcode_scheme_name, self.target.xcode_config_name
        ))
    }

    /// `<temp>/<scheme>-<config>.export.plist`, kept out of the artifacts.
    pub fn export_options_path(&self, ctx: &TaskContext) -> PathBuf {
        ctx.temp_dir.join(format!(
            "{}-{}.export.plist",
            self.target.xcode_scheme_name, self.target.xcode_config_name
        ))
    }

    pub fn archive_command(&self, ctx: &TaskContext) -> ToolCommand {
        let t = &self.target;
        let mut cmd = ToolCommand::new("xcodebuild archive", &self.tools.xcodebuild)
            .arg("archive")
            .arg("-workspace")
            .arg(&t.xcode_workspace_name)
            .arg("-scheme")
            .arg(&t.xcode_scheme_name)
            .arg("-configuration")
            .arg(&t.xcode_config_name)
            .arg("-archivePath")
            .arg(self.archive_path(ctx))
            .args(&t.extra_args);
        if let Some(signing) = &t.codesigning {
            cmd = cmd
                .arg("CODE_SIGN_STYLE=Manual")
                .arg(format!("CODE_SIGN_IDENTITY={}", signing.signing_identity))
                .arg("PROVISIONING_PROFILE=")
                .arg(format!(
                    "PROVISIONING_PROFILE_SPECIFIER={}",
                    signing.provisioning_profile_name
                ));
        }
        cmd.current_dir(ctx.ios_dir())
    }

    pub fn export_command(&self, ctx: &TaskContext) -> ToolCommand {
        ToolCommand::new("xcodebuild -exportArchive", &self.tools.xcodebuild)
            .arg("-exportArchive")
            .arg("-archivePath")
            .arg(self.archive_path(ctx))
            .arg("-exportPath")
            .arg(&ctx.output_dir)
            .arg("-exportOptionsPlist")
            .arg(self.export_options_path(ctx))
            .current_dir(ctx.ios_dir())
    }

    /// Runs the full archive and export sequence.
    pub async fn build(&self, ctx: &TaskContext) -> Result<BuildResult, BarnError> {
        let ios_dir = ctx.ios_dir();
        let archive = self.archive_path(ctx);

        tracing::info!(target_name = %self.name, "installing pods");
        run_tool(&pod_install_command(&self.tools, &ios_dir), self.options).await?;

        run_best_effort(
            &cache_inject_command(&self.tools, &ios_dir, &ctx.cache_dir),
            self.options,
        )
        .await;

        tracing::info!(
            target_name = %self.name,
            scheme = %self.target.xcode_scheme_name,
            configuration = %self.target.xcode_config_name,
            "archiving"
        );
        run_tool(&self.archive_command(ctx), self.options).await?;

        if self.target.wants(IosArtifact::Ipa) {
            let profiles = if self.options.dry_run {
                BTreeMap::new()
            } else {
                self.provisioning_profiles(ctx, &archive).await?
            };
            let plist_path = self.export_options_path(ctx);
            let plist = render_export_options(self.target.export_method(), &profiles);
            if self.options.dry_run {
                println!("[dry-run] write {}", plist_path.display());
            } else {
                fs::ensure_dir(&ctx.temp_dir).await?;
                tokio::fs::write(&plist_path, plist)
                    .await
                    .map_err(|e| BarnError::fs(&plist_path, e))?;
            }

            tracing::info!(target_name = %self.name, method = self.target.export_method(), "exporting ipa");
            run_tool(&self.export_command(ctx), self.options).await?;
        }

        if self.options.dry_run {
            return Ok(BuildResult {
                kind: TargetKind::Ios,
                name: self.name.clone(),
                artifacts: Vec::new(),
            });
        }

        if self.target.wants(IosArtifact::Dsym) {
            let dsyms = archive.join("dSYMs");
            if dsyms.is_dir() {
                fs::copy_tree(&dsyms, &ctx.output_dir.join("dSYM")).await?;
            } else {
                tracing::warn!(target_name = %self.name, "archive has no dSYMs directory");
            }
        }

        if !self.target.wants(IosArtifact::Xcarchive) {
            fs::remove_if_present(&archive).await?;
        }

        let mut artifacts = Vec::new();
        for ipa in fs::find_files_with_extension(&ctx.output_dir, "ipa").await? {
            artifacts.push(relative_to(&ipa, &ctx.output_dir));
        }
        if archive.exists() {
            artifacts.push(relative_to(&archive, &ctx.output_dir));
        }
        if ctx.output_dir.join("dSYM").is_dir() {
            artifacts.push(PathBuf::from("dSYM"));
        }

        Ok(BuildResult {
            kind: TargetKind::Ios,
            name: self.name.clone(),
            artifacts,
        })
    }

    /// Maps the bundle identifier of every signed product in the archive to
    /// the UUID of its embedded provisioning profile.
    async fn provisioning_profiles(
        &self,
        ctx: &TaskContext,
        archive: &Path,
    ) -> Result<BTreeMap<String, String>, BarnError> {
        let products = archive.join("Products");
        let mut table = BTreeMap::new();
        if !products.is_dir() {
            tracing::warn!(target_name = %self.name, "archive has no Products directory");
            return Ok(table);
        }

        fs::ensure_dir(&ctx.temp_dir).await?;
        let profiles = fs::find_files_with_extension(&products, "mobileprovision").await?;
        for (index, profile) in profiles.iter().enumerate() {
            let Some(bundle_dir) = profile.parent() else {
                continue;
            };
            let bundle_id =
                self.read_plist_string(&bundle_dir.join("Info.plist"), "CFBundleIdentifier")
                    .await?;

            let decoded = ctx.temp_dir.join(format!("profile-{index}.plist"));
            let decode = ToolCommand::new("security cms", &self.tools.security)
                .args(["cms", "-D", "-i"])
                .arg(profile)
                .arg("-o")
                .arg(&decoded);
            run_tool(&decode, self.options).await?;

            let uuid = self.read_plist_string(&decoded, "UUID").await?;
            tracing::debug!(%bundle_id, %uuid, "provisioning profile");
            table.insert(bundle_id, uuid);
        }
        Ok(table)
    }

    /// Reads a top-level string value from a binary or XML property list.
    async fn read_plist_string(&self, plist: &Path, key: &str) -> Result<String, BarnError> {
        let description = format!("plutil {}", plist.display());
        let cmd = ToolCommand::new(&description, &self.tools.plutil)
            .args(["-convert", "json", "-o", "-"])
            .arg(plist);
        let output = run_tool(&cmd, self.options).await?;

        let value: serde_json::Value =
            serde_json::from_slice(&output.stdout).map_err(|e| BarnError::ToolchainFailure {
                description: description.clone(),
                code: None,
                stderr: format!("unreadable plutil output: {e}"),
            })?;
        value
            .get(key)
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| BarnError::ToolchainFailure {
                description,
                code: None,
                stderr: format!("{key} not found in {}", plist.display()),
            })
    }
}
