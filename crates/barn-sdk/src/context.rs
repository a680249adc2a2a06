//! Per-target execution context.

use std::path::{Path, PathBuf};

use crate::types::TargetKind;

/// Directories handed to a target builder.
///
/// Built fresh by the pipeline for every target invocation. All paths are absolute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskContext {
    /// Root of the React Native project.
    pub project_dir: PathBuf,
    /// Where the builder places its artifacts: `<scratch>/artifacts/<target-name>`.
    pub output_dir: PathBuf,
    /// Cache namespace of the target kind: `<cache>/<namespace>`.
    pub cache_dir: PathBuf,
    /// Private scratch space: `<scratch>/tmp/<target-name>`.
    pub temp_dir: PathBuf,
}

impl TaskContext {
    /// Lays out the context for one target of a scheme.
    pub fn for_target(
        project_dir: &Path,
        cache_root: &Path,
        scratch_root: &Path,
        kind: TargetKind,
        target_name: &str,
    ) -> Self {
        Self {
            project_dir: project_dir.to_path_buf(),
            output_dir: scratch_root.join("artifacts").join(target_name),
            cache_dir: cache_root.join(kind.cache_namespace()),
            temp_dir: scratch_root.join("tmp").join(target_name),
        }
    }

    /// `<project>/ios`
    pub fn ios_dir(&self) -> PathBuf {
        self.project_dir.join("ios")
    }

    /// `<project>/android`
    pub fn android_dir(&self) -> PathBuf {
        self.project_dir.join("android")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lays_out_target_directories() {
        let ctx = TaskContext::for_target(
            Path::new("/work/app"),
            Path::new("/work/app/caches"),
            Path::new("/tmp/barn-build-x"),
            TargetKind::Android,
            "android",
        );
        assert_eq!(ctx.output_dir, Path::new("/tmp/barn-build-x/artifacts/android"));
        assert_eq!(ctx.cache_dir, Path::new("/work/app/caches/gradle"));
        assert_eq!(ctx.temp_dir, Path::new("/tmp/barn-build-x/tmp/android"));
        assert_eq!(ctx.android_dir(), Path::new("/work/app/android"));
    }

    #[test]
    fn named_targets_share_the_kind_cache() {
        let scratch = Path::new("/tmp/s");
        let a = TaskContext::for_target(Path::new("/p"), Path::new("/c"), scratch, TargetKind::RnBundle, "ios-bundle");
        let b = TaskContext::for_target(Path::new("/p"), Path::new("/c"), scratch, TargetKind::RnBundle, "android-bundle");
        assert_ne!(a.output_dir, b.output_dir);
        assert_ne!(a.temp_dir, b.temp_dir);
        assert_eq!(a.cache_dir, Path::new("/c/metro"));
        assert_eq!(a.cache_dir, b.cache_dir);
    }
}
