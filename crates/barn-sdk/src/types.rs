//! Core types for barn-sdk.
//!
//! - [`BarnError`] - Error taxonomy for configuration, toolchain and filesystem failures
//! - [`TargetKind`] - The closed set of target kinds a scheme may contain
//! - [`BuildResult`] - Output of a single target executor

use std::path::{Path, PathBuf};

/// Error types for barn-sdk operations.
///
/// Each variant maps to one failure class of a build:
///
/// ```ignore
/// use barn_sdk::{BarnConfig, BarnError};
///
/// match BarnConfig::load(path) {
///     Ok(config) => println!("{} scheme(s)", config.schemes().len()),
///     Err(BarnError::ConfigNotFound(path)) => eprintln!("no config at {}", path.display()),
///     Err(e) => eprintln!("{e}"),
/// }
/// ```
#[derive(Debug, thiserror::Error)]
pub enum BarnError {
    /// The configuration file does not exist.
    ///
    /// Raised before any build work starts.
    #[error("configuration file not found: {}. Pass --config or create barn.config.json in the project directory", .0.display())]
    ConfigNotFound(PathBuf),

    /// The configuration could be read but is not a valid barn configuration.
    ///
    /// Covers parse errors, unknown target kinds, missing required fields
    /// and illegal artifact kinds. The message names the offending scheme,
    /// target and field.
    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),

    /// An external toolchain exited with a non-zero status or could not be started.
    ///
    /// `stderr` carries the tool's diagnostic output verbatim.
    #[error("{description} failed (exit {}):\n{stderr}", exit_label(.code))]
    ToolchainFailure {
        /// Human-readable name of the step, e.g. `xcodebuild archive`.
        description: String,
        /// Exit code, `None` when the process could not be spawned or was killed by a signal.
        code: Option<i32>,
        /// Captured standard error of the process.
        stderr: String,
    },

    /// A directory creation, removal or copy failed.
    #[error("filesystem error at {}: {source}", .path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A target task panicked or was aborted before returning.
    #[error("target task failed: {0}")]
    Task(String),
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => code.to_string(),
        None => "none".to_string(),
    }
}

impl BarnError {
    /// Wraps an I/O error with the path it happened on.
    pub fn fs(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        BarnError::Filesystem {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

/// Kind of a build target.
///
/// Mirrors the `target` tag of the configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetKind {
    /// Xcode archive and IPA export.
    Ios,
    /// Gradle assembly.
    Android,
    /// React Native JS bundle only.
    RnBundle,
    /// Expo update export.
    Expo,
}

impl TargetKind {
    /// Returns the configuration tag for the kind.
    ///
    /// This is also the default output subdirectory name of a target.
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetKind::Ios => "ios",
            TargetKind::Android => "android",
            TargetKind::RnBundle => "rn-bundle",
            TargetKind::Expo => "expo",
        }
    }

    /// Returns the subdirectory of the global cache directory used by this kind.
    pub fn cache_namespace(&self) -> &'static str {
        match self {
            TargetKind::Ios => "xcode",
            TargetKind::Android => "gradle",
            TargetKind::RnBundle => "metro",
            TargetKind::Expo => "expo",
        }
    }
}

impl std::fmt::Display for TargetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a successful target build.
#[derive(Debug, Clone)]
pub struct BuildResult {
    /// Kind of the target that was built.
    pub kind: TargetKind,
    /// Output subdirectory name of the target inside the scheme tree.
    pub name: String,
    /// Artifact files collected for this target, relative to the target's output directory.
    pub artifacts: Vec<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toolchain_failure_surfaces_stderr_verbatim() {
        let err = BarnError::ToolchainFailure {
            description: "gradle assembleRelease".into(),
            code: Some(1),
            stderr: "FAILURE: Build failed with an exception.".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("gradle assembleRelease failed (exit 1)"));
        assert!(msg.contains("FAILURE: Build failed with an exception."));
    }

    #[test]
    fn toolchain_failure_without_exit_code() {
        let err = BarnError::ToolchainFailure {
            description: "pod install".into(),
            code: None,
            stderr: "No such file or directory".into(),
        };
        assert!(err.to_string().contains("(exit none)"));
    }

    #[test]
    fn cache_namespaces_are_distinct() {
        let kinds = [
            TargetKind::Ios,
            TargetKind::Android,
            TargetKind::RnBundle,
            TargetKind::Expo,
        ];
        let namespaces: std::collections::HashSet<_> =
            kinds.iter().map(|k| k.cache_namespace()).collect();
        assert_eq!(namespaces.len(), kinds.len());
        assert_eq!(TargetKind::Ios.cache_namespace(), "xcode");
        assert_eq!(TargetKind::Android.cache_namespace(), "gradle");
    }
}
