//! # build-metrics-adapters
//!
//! Adapter implementations for ports (InfluxDB store, loggers, console,
//! process environment, report generators).
//! This crate depends on `ports`, `shared`, and `domain`.

pub mod environment;
/// InfluxDB v1 HTTP store and line protocol encoding.
pub mod influx;
pub mod log_sink;
pub mod logger;
/// JSON report and git changelog generators.
pub mod reports;
pub mod tracing_logger;

pub use environment::ProcessEnvironment;
pub use influx::{InfluxStore, InfluxStoreConfig};
pub use log_sink::{LogSink, StderrLogSink, StdoutConsole, WriterLogSink};
pub use logger::JsonLogger;
pub use reports::{GitChangeLogGenerator, JsonReportGenerator};
pub use tracing_logger::TracingLogger;

/// Returns the adapters crate version.
#[must_use]
pub const fn adapters_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
