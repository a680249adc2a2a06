//! Target builders.
//!
//! One builder per target kind, each running its external toolchain and
//! collecting artifacts into the [`TaskContext`] output directory:
//!
//! | Builder | Target | Toolchain | Output |
//! |---------|--------|-----------|--------|
//! | [`IosBuilder`] | `ios` | CocoaPods, `xcodebuild` | `.xcarchive`, `.ipa`, `dSYM/` |
//! | [`AndroidBuilder`] | `android` | Gradle | `apk/`, `aab/` |
//! | [`BundleBuilder`] | `rn-bundle` | `react-native bundle` | JS bundle, assets, source map |
//! | [`ExpoBuilder`] | `expo` | `expo export` | update package |
//!
//! All builders support `verbose(bool)` and `dry_run(bool)`.
//!
//! ## Example
//!
//! ```ignore
//! use barn_sdk::builders::AndroidBuilder;
//!
//! let result = AndroidBuilder::new(target, "./gradlew")
//!     .verbose(true)
//!     .build(&ctx)
//!     .await?;
//! println!("{} artifact(s)", result.artifacts.len());
//! ```

pub mod android;
pub mod common;
pub mod expo;
pub mod ios;
pub mod rn_bundle;

pub use android::AndroidBuilder;
pub use common::{RunOptions, ToolCommand, ToolOutput, run_best_effort, run_tool};
pub use expo::ExpoBuilder;
pub use ios::IosBuilder;
pub use rn_bundle::BundleBuilder;

use crate::config::{Target, ToolsConfig};
use crate::context::TaskContext;
use crate::types::{BarnError, BuildResult};

/// Runs the builder matching `target`.
pub async fn build_target(
    target: &Target,
    tools: &ToolsConfig,
    ctx: &TaskContext,
    options: RunOptions,
) -> Result<BuildResult, BarnError> {
    match target {
        Target::Ios(t) => {
            IosBuilder::new(t.clone(), tools)
                .verbose(options.verbose)
                .dry_run(options.dry_run)
                .build(ctx)
                .await
        }
        Target::Android(t) => {
            AndroidBuilder::new(t.clone(), &tools.gradle)
                .verbose(options.verbose)
                .dry_run(options.dry_run)
                .build(ctx)
                .await
        }
        Target::RnBundle(t) => {
            BundleBuilder::new(t.clone(), &tools.package_manager)
                .verbose(options.verbose)
                .dry_run(options.dry_run)
                .build(ctx)
                .await
        }
        Target::Expo(t) => {
            ExpoBuilder::new(t.clone(), &tools.package_manager)
                .verbose(options.verbose)
                .dry_run(options.dry_run)
                .build(ctx)
                .await
        }
    }
}
