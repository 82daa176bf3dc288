//! Logger plus console mirror used by collection and publication.

use build_metrics_ports::{ConsolePort, LogFields, LogLevel, LoggerPort};
use build_metrics_shared::ErrorEnvelope;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Prefix of every console mirror line.
pub const CONSOLE_PREFIX: &str = "[build-metrics]";

/// Structured logging with an optional human-facing console mirror.
///
/// The console only receives lines when the invocation is verbose.
#[derive(Clone, Default)]
pub struct Diagnostics {
    logger: Option<Arc<dyn LoggerPort>>,
    console: Option<Arc<dyn ConsolePort>>,
    verbose: bool,
}

impl Diagnostics {
    /// Create diagnostics from optional sinks.
    #[must_use]
    pub fn new(
        logger: Option<Arc<dyn LoggerPort>>,
        console: Option<Arc<dyn ConsolePort>>,
        verbose: bool,
    ) -> Self {
        Self {
            logger,
            console,
            verbose,
        }
    }

    /// Diagnostics that drop everything.
    #[must_use]
    pub fn silent() -> Self {
        Self::default()
    }

    /// Whether console mirroring is on.
    #[must_use]
    pub const fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Write a `[build-metrics] ...` line when verbose.
    pub fn mirror(&self, message: &str) {
        if !self.verbose {
            return;
        }
        if let Some(console) = self.console.as_ref() {
            console.write_line(&format!("{CONSOLE_PREFIX} {message}"));
        }
    }

    /// Debug event, mirrored.
    pub fn debug(&self, event: &str, message: &str, fields: LogFields) {
        if let Some(logger) = self.logger.as_ref() {
            logger.debug(event, message, Some(fields));
        }
        self.mirror(message);
    }

    /// Info event, mirrored.
    pub fn info(&self, event: &str, message: &str, fields: LogFields) {
        if let Some(logger) = self.logger.as_ref() {
            logger.info(event, message, Some(fields));
        }
        self.mirror(message);
    }

    /// Event carrying an error, mirrored with the error summary.
    pub fn failure(
        &self,
        level: LogLevel,
        event: &str,
        message: &str,
        error: &ErrorEnvelope,
        fields: LogFields,
    ) {
        if let Some(logger) = self.logger.as_ref() {
            logger.log_error(level, event, message, error, Some(fields));
        }
        self.mirror(&format!("{message}: {}", error.message));
    }
}

/// Build log fields from key/value pairs.
pub(crate) fn log_fields<const N: usize>(pairs: [(&str, Value); N]) -> LogFields {
    pairs
        .into_iter()
        .map(|(key, value)| (Box::from(key), value))
        .collect()
}

impl fmt::Debug for Diagnostics {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Diagnostics")
            .field("logger", &self.logger.is_some())
            .field("console", &self.console.is_some())
            .field("verbose", &self.verbose)
            .finish()
    }
}
