//! # build-metrics-domain
//!
//! Domain entities and pure rules for build metrics publication.
//!
//! - **Points** - `Point`, `PointBuilder`, `FieldValue`
//! - **Build** - `BuildRun`, `BuildResult`
//! - **Naming** - `ProjectNameRenderer`, `sanitize_tag_key`
//! - **Write options** - `Precision`, `ConsistencyLevel`
//! - **Env parameters** - `EnvParameterSpec`
//!
//! ## Dependency Rules
//!
//! - Depends only on `shared` crate
//! - No infrastructure or adapter dependencies
//! - Pure domain logic with no I/O

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub use build_metrics_shared::shared_crate_version;

pub mod build;
pub mod env_params;
pub mod naming;
pub mod point;
pub mod write;

pub use build::{BuildResult, BuildRun, ParseBuildResultError};
pub use env_params::{EnvParameter, EnvParameterError, EnvParameterSpec};
pub use naming::{ProjectNameRenderer, UNKNOWN_PROJECT, sanitize_tag_key};
pub use point::{FieldValue, Point, PointBuilder, PointError};
pub use write::{ConsistencyLevel, ParsePrecisionError, Precision};

/// Returns the domain crate version.
#[must_use]
pub const fn domain_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
