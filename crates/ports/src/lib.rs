//! # build-metrics-ports
//!
//! Port traits for the build-metrics hexagonal architecture.
//!
//! This crate defines the interfaces between the pipeline and its
//! collaborators (generators, environment, console, logger, time-series
//! store). It depends only on `domain` and `shared`.

use std::future::Future;
use std::pin::Pin;

/// Boxed future used by async port traits.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Returns the ports crate version.
#[must_use]
pub const fn ports_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

pub mod environment;
pub mod generator;
pub mod logger;
pub mod timeseries;

pub use environment::*;
pub use generator::*;
pub use logger::*;
pub use timeseries::*;

// Re-export domain types used in port signatures, so adapter crates can
// implement ports without directly depending on `build-metrics-domain`.
pub use build_metrics_domain::{
    BuildRun, ConsistencyLevel, FieldValue, Point, PointBuilder, Precision, ProjectNameRenderer,
};
