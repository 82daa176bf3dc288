//! Logger selection for the CLI.

use crate::format::LogFormat;
use build_metrics_adapters::{JsonLogger, StderrLogSink, TracingLogger};
use build_metrics_ports::{LogLevel, LoggerPort};
use std::io;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Env var holding a `tracing` filter directive for text logs.
pub const LOG_FILTER_ENV: &str = "BMP_LOG";

/// Build the structured logger; text mode installs a global fmt subscriber.
pub fn init_logger(format: LogFormat, verbose: bool) -> Arc<dyn LoggerPort> {
    match format {
        LogFormat::Text => {
            let default_directive = if verbose { "debug" } else { "warn" };
            let filter = EnvFilter::try_from_env(LOG_FILTER_ENV)
                .unwrap_or_else(|_| EnvFilter::new(default_directive));
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(io::stderr)
                .with_target(false)
                .try_init();
            Arc::new(TracingLogger::new())
        },
        LogFormat::Json => {
            let min_level = if verbose {
                LogLevel::Debug
            } else {
                LogLevel::Info
            };
            Arc::new(JsonLogger::new(Arc::new(StderrLogSink)).with_min_level(min_level))
        },
    }
}
