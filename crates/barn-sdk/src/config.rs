//! Configuration model and loader for `barn.config.json`.
//!
//! A configuration is either a single unnamed scheme:
//!
//! ```json
//! {
//!   "targets": [
//!     { "target": "android", "gradleTarget": "assembleRelease", "artifacts": ["apk", "aab"] },
//!     { "target": "rn-bundle", "platform": "ios" }
//!   ]
//! }
//! ```
//!
//! or several named schemes, built in file order:
//!
//! ```json
//! {
//!   "schemes": {
//!     "staging": [{ "target": "android", "gradleTarget": "assembleStaging" }],
//!     "production": [
//!       {
//!         "target": "ios",
//!         "xcodeSchemeName": "App",
//!         "xcodeWorkspaceName": "App.xcworkspace",
//!         "xcodeConfigName": "Release",
//!         "codesigning": {
//!           "signingIdentity": "Apple Distribution: Example Ltd",
//!           "provisioningProfileName": "App Store Profile"
//!         }
//!       }
//!     ]
//!   }
//! }
//! ```
//!
//! The same document may be written as TOML or YAML (`barn.config.toml`,
//! `barn.config.yaml`). An optional `"layout": "single" | "multi"` field
//! states the shape explicitly; without it the shape is detected from the
//! presence of `targets` or `schemes`. Tool executables can be overridden in
//! a `tools` object, see [`ToolsConfig`].
//!
//! Every target is validated when the file is loaded, so a malformed target
//! fails the build before any toolchain runs.

use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

use crate::types::{BarnError, TargetKind};

/// The default configuration file name.
pub const CONFIG_FILE_NAME: &str = "barn.config.json";

/// File names searched in the project directory, in order.
pub const CONFIG_CANDIDATES: &[&str] = &[
    "barn.config.json",
    "barn.config.toml",
    "barn.config.yaml",
    "barn.config.yml",
];

/// A validated build configuration: an ordered list of schemes plus tool overrides.
#[derive(Debug, Clone, PartialEq)]
pub struct BarnConfig {
    schemes: Vec<Scheme>,
    tools: ToolsConfig,
}

/// A named group of targets built together into one output subtree.
///
/// The single-scheme configuration shape produces one scheme named `""`,
/// whose artifacts land directly in the output directory.
#[derive(Debug, Clone, PartialEq)]
pub struct Scheme {
    pub name: String,
    pub targets: Vec<Target>,
}

/// Explicit configuration shape discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    Single,
    Multi,
}

/// Supported configuration file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Toml,
    Yaml,
}

impl ConfigFormat {
    /// Picks the format from a file extension.
    pub fn from_path(path: &Path) -> Result<Self, BarnError> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Ok(ConfigFormat::Json),
            Some("toml") => Ok(ConfigFormat::Toml),
            Some("yaml" | "yml") => Ok(ConfigFormat::Yaml),
            Some("js" | "cjs" | "mjs" | "ts") => Err(BarnError::ConfigInvalid(format!(
                "{} is a script; barn reads data files only. Export it to {}",
                path.display(),
                CONFIG_FILE_NAME
            ))),
            _ => Err(BarnError::ConfigInvalid(format!(
                "unsupported configuration format for {} (expected .json, .toml, .yaml or .yml)",
                path.display()
            ))),
        }
    }
}

/// Executables used for each external toolchain.
///
/// Every field is optional in the config file:
///
/// ```json
/// { "tools": { "packageManager": "npx", "gradle": "./gradlew" } }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct ToolsConfig {
    /// JavaScript package manager used to run `react-native` and `expo` (default `yarn`).
    pub package_manager: String,
    /// Gradle wrapper, resolved relative to `<project>/android` (default `./gradlew`).
    pub gradle: String,
    /// Xcode build tool (default `xcodebuild`).
    pub xcodebuild: String,
    /// CocoaPods (default `pod`).
    pub pod: String,
    /// Ruby bundler used to run `xcode-archive-cache` (default `bundle`).
    pub bundler: String,
    /// Keychain tool used to decode provisioning profiles (default `security`).
    pub security: String,
    /// Property list converter (default `plutil`).
    pub plutil: String,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            package_manager: "yarn".to_string(),
            gradle: "./gradlew".to_string(),
            xcodebuild: "xcodebuild".to_string(),
            pod: "pod".to_string(),
            bundler: "bundle".to_string(),
            security: "security".to_string(),
            plutil: "plutil".to_string(),
        }
    }
}

/// One declared unit of build work.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "target", rename_all = "kebab-case")]
pub enum Target {
    Ios(IosTarget),
    Android(AndroidTarget),
    RnBundle(RnBundleTarget),
    Expo(ExpoTarget),
}

const TARGET_TAGS: &[&str] = &["ios", "android", "rn-bundle", "expo"];

impl Target {
    pub fn kind(&self) -> TargetKind {
        match self {
            Target::Ios(_) => TargetKind::Ios,
            Target::Android(_) => TargetKind::Android,
            Target::RnBundle(_) => TargetKind::RnBundle,
            Target::Expo(_) => TargetKind::Expo,
        }
    }

    /// Name of the target's subdirectory in the scheme output tree.
    ///
    /// Defaults to the target tag; set `name` to build two targets of the
    /// same kind in one scheme.
    pub fn output_name(&self) -> &str {
        let name = match self {
            Target::Ios(t) => t.name.as_deref(),
            Target::Android(t) => t.name.as_deref(),
            Target::RnBundle(t) => t.name.as_deref(),
            Target::Expo(t) => t.name.as_deref(),
        };
        name.unwrap_or_else(|| self.kind().as_str())
    }

    fn validate(&self) -> Result<(), String> {
        if let Some(name) = match self {
            Target::Ios(t) => t.name.as_deref(),
            Target::Android(t) => t.name.as_deref(),
            Target::RnBundle(t) => t.name.as_deref(),
            Target::Expo(t) => t.name.as_deref(),
        } {
            validate_path_segment("name", name)?;
        }

        match self {
            Target::Ios(t) => {
                require_non_empty("xcodeSchemeName", &t.xcode_scheme_name)?;
                require_non_empty("xcodeWorkspaceName", &t.xcode_workspace_name)?;
                require_non_empty("xcodeConfigName", &t.xcode_config_name)?;
                if let Some(signing) = &t.codesigning {
                    require_non_empty("codesigning.signingIdentity", &signing.signing_identity)?;
                    require_non_empty(
                        "codesigning.provisioningProfileName",
                        &signing.provisioning_profile_name,
                    )?;
                }
                require_non_empty_list(&t.artifacts)
            }
            Target::Android(t) => {
                require_non_empty("gradleTarget", &t.gradle_target)?;
                require_non_empty_list(&t.artifacts)
            }
            Target::RnBundle(t) => {
                if let Some(entry) = &t.entry_file {
                    require_non_empty("entryFile", entry)?;
                }
                require_non_empty_list(&t.artifacts)
            }
            Target::Expo(t) => {
                require_non_empty("publicUrl", &t.public_url)?;
                require_non_empty_list(&t.artifacts)
            }
        }
    }

    /// Folds legacy fields into their current form.
    fn normalize(&mut self) {
        if let Target::RnBundle(t) = self
            && let Some(include) = t.include_sourcemaps.take()
        {
            let artifacts = t
                .artifacts
                .get_or_insert_with(|| vec![BundleArtifact::Jsbundle]);
            if include && !artifacts.contains(&BundleArtifact::Sourcemaps) {
                artifacts.push(BundleArtifact::Sourcemaps);
            }
        }
    }
}

fn require_non_empty(field: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("`{field}` must not be empty"));
    }
    Ok(())
}

fn require_non_empty_list<T>(artifacts: &Option<Vec<T>>) -> Result<(), String> {
    match artifacts {
        Some(list) if list.is_empty() => {
            Err("`artifacts` must list at least one artifact kind when present".to_string())
        }
        _ => Ok(()),
    }
}

fn validate_path_segment(field: &str, value: &str) -> Result<(), String> {
    require_non_empty(field, value)?;
    if value == "." || value == ".." || value.contains('/') || value.contains('\\') {
        return Err(format!(
            "`{field}` must be a plain directory name, got '{value}'"
        ));
    }
    Ok(())
}

/// Xcode archive + IPA export.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IosTarget {
    pub xcode_scheme_name: String,
    pub xcode_workspace_name: String,
    pub xcode_config_name: String,
    #[serde(default)]
    pub codesigning: Option<IosCodesigning>,
    /// Extra arguments appended to `xcodebuild archive`.
    #[serde(default)]
    pub extra_args: Vec<String>,
    #[serde(default)]
    pub artifacts: Option<Vec<IosArtifact>>,
    #[serde(default)]
    pub name: Option<String>,
}

impl IosTarget {
    /// Whether the given artifact kind should end up in the output.
    ///
    /// Without an explicit list the archive is exported and kept, dSYMs are not collected.
    pub fn wants(&self, artifact: IosArtifact) -> bool {
        match &self.artifacts {
            Some(list) => list.contains(&artifact),
            None => matches!(artifact, IosArtifact::Ipa | IosArtifact::Xcarchive),
        }
    }

    /// Export method written to the export options plist.
    pub fn export_method(&self) -> &str {
        self.codesigning
            .as_ref()
            .and_then(|c| c.export_method.as_deref())
            .unwrap_or("app-store")
    }
}

/// Manual code signing overrides passed to `xcodebuild`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IosCodesigning {
    pub signing_identity: String,
    pub provisioning_profile_name: String,
    #[serde(default)]
    pub export_method: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum IosArtifact {
    #[serde(rename = "ipa")]
    Ipa,
    #[serde(rename = "xcarchive")]
    Xcarchive,
    #[serde(rename = "dSYM")]
    Dsym,
}

/// Gradle assembly.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AndroidTarget {
    pub gradle_target: String,
    /// Extra arguments appended to the Gradle invocation.
    #[serde(default)]
    pub extra_args: Vec<String>,
    #[serde(default)]
    pub artifacts: Option<Vec<AndroidArtifact>>,
    #[serde(default)]
    pub name: Option<String>,
}

impl AndroidTarget {
    /// Requested artifact kinds, `[apk]` when none are listed.
    pub fn requested_artifacts(&self) -> Vec<AndroidArtifact> {
        self.artifacts
            .clone()
            .unwrap_or_else(|| vec![AndroidArtifact::Apk])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AndroidArtifact {
    Apk,
    Aab,
}

impl AndroidArtifact {
    /// File extension of the artifact, which is also its output subdirectory.
    pub fn extension(&self) -> &'static str {
        match self {
            AndroidArtifact::Apk => "apk",
            AndroidArtifact::Aab => "aab",
        }
    }
}

/// React Native JS bundle without a native build.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RnBundleTarget {
    pub platform: Platform,
    #[serde(default)]
    pub entry_file: Option<String>,
    #[serde(default)]
    pub artifacts: Option<Vec<BundleArtifact>>,
    /// Older spelling of `artifacts: ["jsbundle", "sourcemaps"]`.
    #[serde(default)]
    pub include_sourcemaps: Option<bool>,
    #[serde(default)]
    pub name: Option<String>,
}

impl RnBundleTarget {
    pub fn entry_file(&self) -> &str {
        self.entry_file.as_deref().unwrap_or("index.js")
    }

    pub fn includes_sourcemaps(&self) -> bool {
        self.include_sourcemaps.unwrap_or(false)
            || self
                .artifacts
                .as_ref()
                .is_some_and(|list| list.contains(&BundleArtifact::Sourcemaps))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Ios,
    Android,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Ios => "ios",
            Platform::Android => "android",
        }
    }

    /// File name of the bundle the native project expects for this platform.
    pub fn bundle_file_name(&self) -> &'static str {
        match self {
            Platform::Ios => "main.jsbundle",
            Platform::Android => "index.android.bundle",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BundleArtifact {
    Jsbundle,
    Sourcemaps,
}

/// Expo update export.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpoTarget {
    pub public_url: String,
    #[serde(default)]
    pub asset_url: Option<String>,
    #[serde(default)]
    pub dump_assetmap: bool,
    pub expo_target: ExpoMode,
    #[serde(default)]
    pub artifacts: Option<Vec<ExpoArtifact>>,
    #[serde(default)]
    pub name: Option<String>,
}

impl ExpoTarget {
    pub fn includes_sourcemaps(&self) -> bool {
        self.artifacts
            .as_ref()
            .is_some_and(|list| list.contains(&ExpoArtifact::Sourcemaps))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpoMode {
    Managed,
    Bare,
}

impl ExpoMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExpoMode::Managed => "managed",
            ExpoMode::Bare => "bare",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExpoArtifact {
    UpdatePackage,
    Sourcemaps,
}

impl BarnConfig {
    /// Builds a single-scheme configuration from a target list.
    pub fn single(targets: Vec<Target>) -> Result<Self, BarnError> {
        Self::from_schemes(vec![Scheme {
            name: String::new(),
            targets,
        }])
    }

    /// Builds a configuration from explicit schemes, validating every target.
    pub fn from_schemes(schemes: Vec<Scheme>) -> Result<Self, BarnError> {
        let mut config = Self {
            schemes: Vec::with_capacity(schemes.len()),
            tools: ToolsConfig::default(),
        };
        if schemes.is_empty() {
            return Err(invalid("at least one scheme is required"));
        }
        for mut scheme in schemes {
            if config.schemes.iter().any(|s| s.name == scheme.name) {
                return Err(invalid(format!("duplicate scheme '{}'", scheme.name)));
            }
            for target in &mut scheme.targets {
                target.normalize();
            }
            validate_scheme(&scheme)?;
            config.schemes.push(scheme);
        }
        Ok(config)
    }

    /// Replaces the tool overrides.
    pub fn with_tools(mut self, tools: ToolsConfig) -> Self {
        self.tools = tools;
        self
    }

    /// Loads and validates a configuration file.
    ///
    /// # Errors
    ///
    /// * [`BarnError::ConfigNotFound`] if `path` does not exist
    /// * [`BarnError::ConfigInvalid`] if it cannot be parsed or fails validation
    /// * [`BarnError::Filesystem`] if it exists but cannot be read
    pub fn load(path: &Path) -> Result<Self, BarnError> {
        if !path.exists() {
            return Err(BarnError::ConfigNotFound(path.to_path_buf()));
        }
        let format = ConfigFormat::from_path(path)?;
        let contents = std::fs::read_to_string(path).map_err(|e| BarnError::fs(path, e))?;
        Self::parse(&contents, format)
            .map_err(|e| match e {
                BarnError::ConfigInvalid(msg) => {
                    BarnError::ConfigInvalid(format!("{}: {msg}", path.display()))
                }
                other => other,
            })
    }

    /// Parses configuration text in the given format.
    pub fn parse(contents: &str, format: ConfigFormat) -> Result<Self, BarnError> {
        let value: Value = match format {
            ConfigFormat::Json => serde_json::from_str(contents).map_err(|e| invalid(e.to_string()))?,
            ConfigFormat::Toml => toml::from_str(contents).map_err(|e| invalid(e.to_string()))?,
            ConfigFormat::Yaml => {
                serde_yaml::from_str(contents).map_err(|e| invalid(e.to_string()))?
            }
        };
        Self::from_value(value)
    }

    /// Normalizes a parsed document into schemes.
    pub fn from_value(value: Value) -> Result<Self, BarnError> {
        let Value::Object(mut root) = value else {
            return Err(invalid("top level must be an object"));
        };

        let layout = match root.remove("layout") {
            Some(value) => Some(
                serde_json::from_value::<Layout>(value)
                    .map_err(|_| invalid("`layout` must be \"single\" or \"multi\""))?,
            ),
            None => None,
        };
        let tools = match root.remove("tools") {
            Some(value) => serde_json::from_value::<ToolsConfig>(value)
                .map_err(|e| invalid(format!("tools: {e}")))?,
            None => ToolsConfig::default(),
        };
        let targets = root.remove("targets");
        let schemes = root.remove("schemes");

        if let Some(unknown) = root.keys().next() {
            return Err(invalid(format!("unknown top-level field `{unknown}`")));
        }

        let schemes = match (targets, schemes) {
            (Some(_), Some(_)) => {
                return Err(invalid(
                    "both `targets` and `schemes` are present; use one or the other",
                ));
            }
            (Some(targets), None) => {
                if layout == Some(Layout::Multi) {
                    return Err(invalid("`layout` is \"multi\" but `targets` was given"));
                }
                vec![parse_scheme(String::new(), targets)?]
            }
            (None, Some(schemes)) => {
                if layout == Some(Layout::Single) {
                    return Err(invalid("`layout` is \"single\" but `schemes` was given"));
                }
                parse_schemes(schemes)?
            }
            (None, None) => {
                return Err(invalid(
                    "expected `targets` (single scheme) or `schemes` (named schemes)",
                ));
            }
        };

        Ok(Self::from_schemes(schemes)?.with_tools(tools))
    }

    /// Resolves the configuration path for a project.
    ///
    /// An explicit path wins. Otherwise the first existing file from
    /// [`CONFIG_CANDIDATES`] in `project_dir` is used, falling back to
    /// `project_dir/barn.config.json` (which then fails to load with
    /// [`BarnError::ConfigNotFound`]).
    pub fn resolve_path(project_dir: &Path, explicit: Option<&Path>) -> PathBuf {
        if let Some(path) = explicit {
            return path.to_path_buf();
        }
        CONFIG_CANDIDATES
            .iter()
            .map(|name| project_dir.join(name))
            .find(|path| path.exists())
            .unwrap_or_else(|| project_dir.join(CONFIG_FILE_NAME))
    }

    pub fn schemes(&self) -> &[Scheme] {
        &self.schemes
    }

    pub fn tools(&self) -> &ToolsConfig {
        &self.tools
    }

    /// Whether any scheme contains a target of the given kind.
    pub fn has_target_kind(&self, kind: TargetKind) -> bool {
        self.schemes
            .iter()
            .flat_map(|s| s.targets.iter())
            .any(|t| t.kind() == kind)
    }
}

fn invalid(msg: impl Into<String>) -> BarnError {
    BarnError::ConfigInvalid(msg.into())
}

fn parse_schemes(value: Value) -> Result<Vec<Scheme>, BarnError> {
    let Value::Object(map) = value else {
        return Err(invalid("`schemes` must map scheme names to target lists"));
    };
    map.into_iter()
        .map(|(name, targets)| parse_scheme(name, targets))
        .collect()
}

fn parse_scheme(name: String, value: Value) -> Result<Scheme, BarnError> {
    let label = scheme_label(&name);
    if !name.is_empty() {
        validate_path_segment("scheme name", &name).map_err(|e| invalid(format!("{label}: {e}")))?;
    }
    let Value::Array(entries) = value else {
        return Err(invalid(format!("{label}: expected a list of targets")));
    };
    let targets = entries
        .into_iter()
        .enumerate()
        .map(|(index, entry)| parse_target(entry).map_err(|e| invalid(format!("{label} target #{}: {e}", index + 1))))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Scheme { name, targets })
}

fn parse_target(entry: Value) -> Result<Target, String> {
    let Value::Object(fields) = &entry else {
        return Err("expected an object".to_string());
    };
    check_tag(fields)?;
    serde_json::from_value(entry).map_err(|e| e.to_string())
}

fn check_tag(fields: &Map<String, Value>) -> Result<(), String> {
    match fields.get("target") {
        None => Err(format!(
            "missing `target` tag (one of: {})",
            TARGET_TAGS.join(", ")
        )),
        Some(Value::String(tag)) if TARGET_TAGS.contains(&tag.as_str()) => Ok(()),
        Some(Value::String(tag)) => Err(format!(
            "unknown target kind '{tag}' (one of: {})",
            TARGET_TAGS.join(", ")
        )),
        Some(other) => Err(format!("`target` must be a string, got {other}")),
    }
}

fn validate_scheme(scheme: &Scheme) -> Result<(), BarnError> {
    let label = scheme_label(&scheme.name);
    if scheme.targets.is_empty() {
        return Err(invalid(format!("{label}: at least one target is required")));
    }
    let mut seen: Vec<&str> = Vec::with_capacity(scheme.targets.len());
    for (index, target) in scheme.targets.iter().enumerate() {
        target
            .validate()
            .map_err(|e| invalid(format!("{label} target #{}: {e}", index + 1)))?;
        let name = target.output_name();
        if seen.contains(&name) {
            return Err(invalid(format!(
                "{label} target #{}: output directory '{name}' is already used by another target; set a distinct `name`",
                index + 1
            )));
        }
        seen.push(name);
    }
    Ok(())
}

fn scheme_label(name: &str) -> String {
    if name.is_empty() {
        "targets".to_string()
    } else {
        format!("scheme '{name}'")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn parse_json(json: &str) -> Result<BarnConfig, BarnError> {
        BarnConfig::parse(json, ConfigFormat::Json)
    }

    fn invalid_message(result: Result<BarnConfig, BarnError>) -> String {
        match result {
            Err(BarnError::ConfigInvalid(msg)) => msg,
            other => panic!("expected ConfigInvalid, got {other:?}"),
        }
    }

    #[test]
    fn single_scheme_is_named_empty() {
        let config = parse_json(
            r#"{"targets": [{"target": "android", "gradleTarget": "assembleRelease"}]}"#,
        )
        .unwrap();
        assert_eq!(config.schemes().len(), 1);
        assert_eq!(config.schemes()[0].name, "");
        assert_eq!(config.schemes()[0].targets[0].kind(), TargetKind::Android);
        assert_eq!(config.tools(), &ToolsConfig::default());
    }

    #[test]
    fn single_constructor_matches_parsed_targets_shape() {
        let bundle = |platform, name: &str| {
            Target::RnBundle(RnBundleTarget {
                platform,
                entry_file: None,
                artifacts: None,
                include_sourcemaps: Some(true),
                name: Some(name.to_string()),
            })
        };
        let built = BarnConfig::single(vec![
            bundle(Platform::Ios, "bundle-ios"),
            bundle(Platform::Android, "bundle-android"),
        ])
        .unwrap();
        let parsed = parse_json(
            r#"{"targets": [
                {"target": "rn-bundle", "platform": "ios", "includeSourcemaps": true, "name": "bundle-ios"},
                {"target": "rn-bundle", "platform": "android", "includeSourcemaps": true, "name": "bundle-android"}
            ]}"#,
        )
        .unwrap();
        assert_eq!(built, parsed);

        let msg = invalid_message(BarnConfig::single(vec![
            bundle(Platform::Ios, "same"),
            bundle(Platform::Android, "same"),
        ]));
        assert!(msg.contains("same"), "{msg}");
    }

    #[test]
    fn multi_scheme_preserves_file_order() {
        let config = parse_json(
            r#"{
                "schemes": {
                    "zeta": [{"target": "rn-bundle", "platform": "ios"}],
                    "alpha": [{"target": "rn-bundle", "platform": "android"}],
                    "mid": [{"target": "android", "gradleTarget": "bundleRelease"}]
                }
            }"#,
        )
        .unwrap();
        let names: Vec<_> = config.schemes().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn parses_every_target_kind() {
        let config = parse_json(
            r#"{"targets": [
                {
                    "target": "ios",
                    "xcodeSchemeName": "App",
                    "xcodeWorkspaceName": "App.xcworkspace",
                    "xcodeConfigName": "Release",
                    "codesigning": {
                        "signingIdentity": "Apple Distribution",
                        "provisioningProfileName": "App Store",
                        "exportMethod": "ad-hoc"
                    },
                    "extraArgs": ["-quiet"],
                    "artifacts": ["ipa", "dSYM"]
                },
                {"target": "android", "gradleTarget": "bundleRelease", "artifacts": ["aab"], "extraArgs": ["--offline"]},
                {"target": "rn-bundle", "platform": "android", "entryFile": "index.ts", "artifacts": ["jsbundle", "sourcemaps"]},
                {"target": "expo", "publicUrl": "https://cdn.example.com", "assetUrl": "assets", "dumpAssetmap": true, "expoTarget": "bare", "artifacts": ["update-package", "sourcemaps"]}
            ]}"#,
        )
        .unwrap();
        let targets = &config.schemes()[0].targets;

        let Target::Ios(ios) = &targets[0] else { panic!("expected ios") };
        assert_eq!(ios.export_method(), "ad-hoc");
        assert!(ios.wants(IosArtifact::Ipa));
        assert!(ios.wants(IosArtifact::Dsym));
        assert!(!ios.wants(IosArtifact::Xcarchive));
        assert_eq!(ios.extra_args, vec!["-quiet"]);

        let Target::Android(android) = &targets[1] else { panic!("expected android") };
        assert_eq!(android.requested_artifacts(), vec![AndroidArtifact::Aab]);

        let Target::RnBundle(bundle) = &targets[2] else { panic!("expected rn-bundle") };
        assert_eq!(bundle.entry_file(), "index.ts");
        assert!(bundle.includes_sourcemaps());

        let Target::Expo(expo) = &targets[3] else { panic!("expected expo") };
        assert_eq!(expo.expo_target, ExpoMode::Bare);
        assert!(expo.dump_assetmap);
        assert!(expo.includes_sourcemaps());
    }

    #[test]
    fn defaults_when_optional_fields_are_absent() {
        let config = parse_json(
            r#"{"targets": [
                {"target": "ios", "xcodeSchemeName": "App", "xcodeWorkspaceName": "App.xcworkspace", "xcodeConfigName": "Release"},
                {"target": "android", "gradleTarget": "assembleRelease"},
                {"target": "rn-bundle", "platform": "ios"},
                {"target": "expo", "publicUrl": "https://cdn.example.com", "expoTarget": "managed"}
            ]}"#,
        )
        .unwrap();
        let targets = &config.schemes()[0].targets;
        let Target::Ios(ios) = &targets[0] else { panic!() };
        assert_eq!(ios.export_method(), "app-store");
        assert!(ios.wants(IosArtifact::Ipa));
        assert!(ios.wants(IosArtifact::Xcarchive));
        assert!(!ios.wants(IosArtifact::Dsym));
        let Target::Android(android) = &targets[1] else { panic!() };
        assert_eq!(android.requested_artifacts(), vec![AndroidArtifact::Apk]);
        let Target::RnBundle(bundle) = &targets[2] else { panic!() };
        assert_eq!(bundle.entry_file(), "index.js");
        assert!(!bundle.includes_sourcemaps());
        let Target::Expo(expo) = &targets[3] else { panic!() };
        assert!(!expo.includes_sourcemaps());
    }

    #[test]
    fn legacy_include_sourcemaps_folds_into_artifacts() {
        let config = parse_json(
            r#"{"targets": [{"target": "rn-bundle", "platform": "ios", "includeSourcemaps": true}]}"#,
        )
        .unwrap();
        let Target::RnBundle(bundle) = &config.schemes()[0].targets[0] else { panic!() };
        assert_eq!(
            bundle.artifacts,
            Some(vec![BundleArtifact::Jsbundle, BundleArtifact::Sourcemaps])
        );
        assert_eq!(bundle.include_sourcemaps, None);
        assert!(bundle.includes_sourcemaps());
    }

    #[test]
    fn unknown_target_kind_is_invalid() {
        let msg = invalid_message(parse_json(
            r#"{"schemes": {"prod": [
                {"target": "android", "gradleTarget": "assembleRelease"},
                {"target": "unknown-kind"}
            ]}}"#,
        ));
        assert!(msg.contains("scheme 'prod' target #2"), "{msg}");
        assert!(msg.contains("unknown target kind 'unknown-kind'"), "{msg}");
    }

    #[test]
    fn missing_tag_and_required_fields_are_named() {
        let msg = invalid_message(parse_json(r#"{"targets": [{"gradleTarget": "x"}]}"#));
        assert!(msg.contains("missing `target` tag"), "{msg}");

        let msg = invalid_message(parse_json(
            r#"{"targets": [{"target": "ios", "xcodeSchemeName": "App", "xcodeConfigName": "Release"}]}"#,
        ));
        assert!(msg.contains("xcodeWorkspaceName"), "{msg}");

        let msg = invalid_message(parse_json(
            r#"{"targets": [{"target": "android", "gradleTarget": "  "}]}"#,
        ));
        assert!(msg.contains("`gradleTarget` must not be empty"), "{msg}");
    }

    #[test]
    fn artifact_lists_must_be_legal_and_non_empty() {
        let msg = invalid_message(parse_json(
            r#"{"targets": [{"target": "android", "gradleTarget": "assembleRelease", "artifacts": []}]}"#,
        ));
        assert!(msg.contains("at least one artifact kind"), "{msg}");

        let msg = invalid_message(parse_json(
            r#"{"targets": [{"target": "android", "gradleTarget": "assembleRelease", "artifacts": ["ipa"]}]}"#,
        ));
        assert!(msg.contains("ipa"), "{msg}");
    }

    #[test]
    fn shape_errors() {
        let msg = invalid_message(parse_json(r#"{"targets": [], "schemes": {}}"#));
        assert!(msg.contains("both `targets` and `schemes`"), "{msg}");

        let msg = invalid_message(parse_json(r#"{}"#));
        assert!(msg.contains("expected `targets`"), "{msg}");

        let msg = invalid_message(parse_json(r#"{"targets": []}"#));
        assert!(msg.contains("at least one target"), "{msg}");

        let msg = invalid_message(parse_json(r#"{"ios": {}, "targets": []}"#));
        assert!(msg.contains("unknown top-level field `ios`"), "{msg}");

        let msg = invalid_message(parse_json(r#"[1, 2]"#));
        assert!(msg.contains("top level must be an object"), "{msg}");
    }

    #[test]
    fn explicit_layout_must_match_shape() {
        let ok = parse_json(
            r#"{"layout": "multi", "schemes": {"a": [{"target": "rn-bundle", "platform": "ios"}]}}"#,
        );
        assert!(ok.is_ok());

        let msg = invalid_message(parse_json(
            r#"{"layout": "multi", "targets": [{"target": "rn-bundle", "platform": "ios"}]}"#,
        ));
        assert!(msg.contains("`layout` is \"multi\""), "{msg}");

        let msg = invalid_message(parse_json(
            r#"{"layout": "both", "targets": [{"target": "rn-bundle", "platform": "ios"}]}"#,
        ));
        assert!(msg.contains("`layout` must be"), "{msg}");
    }

    #[test]
    fn duplicate_output_names_need_explicit_name() {
        let msg = invalid_message(parse_json(
            r#"{"targets": [
                {"target": "rn-bundle", "platform": "ios"},
                {"target": "rn-bundle", "platform": "android"}
            ]}"#,
        ));
        assert!(msg.contains("output directory 'rn-bundle'"), "{msg}");

        let config = parse_json(
            r#"{"targets": [
                {"target": "rn-bundle", "platform": "ios", "name": "jsbundle-ios"},
                {"target": "rn-bundle", "platform": "android", "name": "jsbundle-android"}
            ]}"#,
        )
        .unwrap();
        let names: Vec<_> = config.schemes()[0]
            .targets
            .iter()
            .map(|t| t.output_name())
            .collect();
        assert_eq!(names, vec!["jsbundle-ios", "jsbundle-android"]);
    }

    #[test]
    fn names_must_be_plain_segments() {
        let msg = invalid_message(parse_json(
            r#"{"targets": [{"target": "rn-bundle", "platform": "ios", "name": "../escape"}]}"#,
        ));
        assert!(msg.contains("plain directory name"), "{msg}");

        let msg = invalid_message(parse_json(
            r#"{"schemes": {"a/b": [{"target": "rn-bundle", "platform": "ios"}]}}"#,
        ));
        assert!(msg.contains("plain directory name"), "{msg}");
    }

    #[test]
    fn tool_overrides() {
        let config = parse_json(
            r#"{"tools": {"packageManager": "npx", "gradle": "gradle"},
                "targets": [{"target": "rn-bundle", "platform": "ios"}]}"#,
        )
        .unwrap();
        assert_eq!(config.tools().package_manager, "npx");
        assert_eq!(config.tools().gradle, "gradle");
        assert_eq!(config.tools().xcodebuild, "xcodebuild");

        let msg = invalid_message(parse_json(
            r#"{"tools": {"cargo": "x"}, "targets": [{"target": "rn-bundle", "platform": "ios"}]}"#,
        ));
        assert!(msg.contains("tools"), "{msg}");
    }

    #[test]
    fn loads_toml_and_yaml() {
        let toml = r#"
[[schemes.release]]
target = "android"
gradleTarget = "assembleRelease"
artifacts = ["apk", "aab"]

[[schemes.beta]]
target = "rn-bundle"
platform = "ios"
"#;
        let config = BarnConfig::parse(toml, ConfigFormat::Toml).unwrap();
        let names: Vec<_> = config.schemes().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["release", "beta"]);

        let yaml = r#"
targets:
  - target: expo
    publicUrl: https://cdn.example.com
    expoTarget: managed
"#;
        let config = BarnConfig::parse(yaml, ConfigFormat::Yaml).unwrap();
        assert_eq!(config.schemes()[0].targets[0].kind(), TargetKind::Expo);
    }

    #[test]
    fn load_reports_missing_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(CONFIG_FILE_NAME);
        match BarnConfig::load(&path) {
            Err(BarnError::ConfigNotFound(p)) => assert_eq!(p, path),
            other => panic!("expected ConfigNotFound, got {other:?}"),
        }
    }

    #[test]
    fn load_rejects_script_configs() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("barn.config.js");
        std::fs::write(&path, "module.exports = {}").unwrap();
        let msg = invalid_message(BarnConfig::load(&path));
        assert!(msg.contains("data files only"), "{msg}");
    }

    #[test]
    fn load_prefixes_errors_with_path() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "{ not json").unwrap();
        let msg = invalid_message(BarnConfig::load(&path));
        assert!(msg.starts_with(&path.display().to_string()), "{msg}");
    }

    #[test]
    fn resolve_path_prefers_explicit_then_candidates() {
        let temp = TempDir::new().unwrap();
        let project = temp.path();
        assert_eq!(
            BarnConfig::resolve_path(project, None),
            project.join("barn.config.json")
        );

        std::fs::write(project.join("barn.config.yaml"), "targets: []").unwrap();
        assert_eq!(
            BarnConfig::resolve_path(project, None),
            project.join("barn.config.yaml")
        );

        let explicit = project.join("ci/barn.json");
        assert_eq!(
            BarnConfig::resolve_path(project, Some(&explicit)),
            explicit
        );
    }

    #[test]
    fn has_target_kind_scans_all_schemes() {
        let config = parse_json(
            r#"{"schemes": {
                "a": [{"target": "rn-bundle", "platform": "ios"}],
                "b": [{"target": "android", "gradleTarget": "assembleRelease"}]
            }}"#,
        )
        .unwrap();
        assert!(config.has_target_kind(TargetKind::Android));
        assert!(config.has_target_kind(TargetKind::RnBundle));
        assert!(!config.has_target_kind(TargetKind::Ios));
    }
}
