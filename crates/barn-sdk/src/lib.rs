//! Build orchestration for React Native and Expo projects.
//!
//! `barn-sdk` drives the native and JavaScript toolchains of a mobile project
//! (CocoaPods, `xcodebuild`, Gradle, `react-native bundle`, `expo export`)
//! from a declarative configuration, and collects their artifacts into a
//! predictable directory layout:
//!
//! ```text
//! <output>/<scheme>/<target-name>/<artifacts>
//! ```
//!
//! # Quick Start
//!
//! ```ignore
//! use barn_sdk::{BarnConfig, BuildPaths, Pipeline};
//!
//! # async fn example() -> Result<(), barn_sdk::BarnError> {
//! let project = std::path::Path::new(".");
//! let config = BarnConfig::load(&BarnConfig::resolve_path(project, None))?;
//! let summary = Pipeline::new(BuildPaths::for_project(project), config)?
//!     .verbose(true)
//!     .run()
//!     .await?;
//! for scheme in &summary.schemes {
//!     println!("{} -> {}", scheme.name, scheme.output_dir.display());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - **Config** ([`config`]): schemes and targets, loaded from JSON, TOML or YAML
//! - **Pipeline** ([`pipeline`]): pre-build, concurrent targets per scheme, post-build
//! - **Builders** ([`builders`]): one per target kind, wrapping the external toolchain
//! - **Filesystem** ([`fs`]) and **timing** ([`timing`]) helpers

pub mod builders;
pub mod config;
pub mod context;
pub mod fs;
pub mod pipeline;
pub mod timing;
pub mod types;

pub use config::{BarnConfig, ConfigFormat, Scheme, Target, ToolsConfig};
pub use context::TaskContext;
pub use pipeline::{BuildPaths, BuildSummary, Pipeline, SchemeSummary};
pub use types::{BarnError, BuildResult, TargetKind};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
