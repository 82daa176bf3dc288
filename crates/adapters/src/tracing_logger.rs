//! `LoggerPort` implementation forwarding to `tracing`.
//!
//! Field maps are rendered as a single JSON string so the subscriber decides
//! the final layout; secret-looking keys are redacted first.

use build_metrics_ports::{LogEvent, LogFields, LogLevel, LoggerPort};
use build_metrics_shared::{REDACTED, is_secret_key};
use serde_json::Value;

/// Logger that emits `tracing` events under the `build_metrics` target.
#[derive(Debug, Clone, Default)]
pub struct TracingLogger {
    base_fields: LogFields,
}

impl TracingLogger {
    /// Create a logger without base fields.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl LoggerPort for TracingLogger {
    fn log(&self, event: LogEvent) {
        let mut fields = self.base_fields.clone();
        fields.extend(event.fields.unwrap_or_default());
        let fields = render_fields(&fields);
        let error = event
            .error
            .as_ref()
            .and_then(|error| error.get("code"))
            .map(|code| {
                let namespace = code.get("namespace").and_then(Value::as_str).unwrap_or("");
                let code = code.get("code").and_then(Value::as_str).unwrap_or("");
                format!("{namespace}:{code}")
            })
            .unwrap_or_default();
        let name = &*event.event;
        let message = &*event.message;

        match event.level {
            LogLevel::Debug => {
                tracing::debug!(
                    target: "build_metrics",
                    event = name,
                    fields = %fields,
                    error = %error,
                    "{message}"
                );
            },
            LogLevel::Info => {
                tracing::info!(
                    target: "build_metrics",
                    event = name,
                    fields = %fields,
                    error = %error,
                    "{message}"
                );
            },
            LogLevel::Warn => {
                tracing::warn!(
                    target: "build_metrics",
                    event = name,
                    fields = %fields,
                    error = %error,
                    "{message}"
                );
            },
            LogLevel::Error => {
                tracing::error!(
                    target: "build_metrics",
                    event = name,
                    fields = %fields,
                    error = %error,
                    "{message}"
                );
            },
        }
    }

    fn child(&self, fields: LogFields) -> Box<dyn LoggerPort> {
        let mut merged = self.base_fields.clone();
        merged.extend(fields);
        Box::new(Self {
            base_fields: merged,
        })
    }
}

fn render_fields(fields: &LogFields) -> String {
    if fields.is_empty() {
        return String::new();
    }
    let object: serde_json::Map<String, Value> = fields
        .iter()
        .map(|(key, value)| {
            let value = if is_secret_key(key) {
                Value::from(REDACTED)
            } else {
                value.clone()
            };
            (key.to_string(), value)
        })
        .collect();
    Value::Object(object).to_string()
}
