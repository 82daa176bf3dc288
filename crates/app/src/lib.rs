//! # build-metrics-app
//!
//! Application use cases: core generators, collection, publication.
//! This crate depends on `ports`, `domain`, and `shared`.

pub mod collect;
pub mod diagnostics;
pub mod generators;
pub mod publish;
pub mod publish_build_metrics;

pub use collect::collect_points;
pub use diagnostics::{CONSOLE_PREFIX, Diagnostics};
pub use generators::{BuildBaseGenerator, CustomDataGenerator, CustomDataMapGenerator};
pub use publish::{
    PublishPointsDeps, PublishReport, PublishTarget, TargetOutcome, TargetReport, publish_points,
};
pub use publish_build_metrics::{
    PublishDeps, PublishInput, PublishOutput, core_generators, publish_build_metrics,
};

/// Returns the app crate version.
#[must_use]
pub const fn app_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
