//! Generator for JSON metrics artifacts.
//!
//! Two layouts are accepted:
//!
//! ```json
//! { "fields": { "coverage": 87.5 }, "tags": { "tool": "llvm-cov" } }
//! { "coverage": 87.5, "tests": 412 }
//! ```
//!
//! Nested values and nulls in the flat layout are ignored.

use build_metrics_ports::{Availability, FieldValue, GeneratorContext, Point, PointGenerator};
use build_metrics_shared::{ErrorClass, ErrorCode, ErrorEnvelope, Result};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// Measurement used when none is configured.
pub const DEFAULT_JSON_REPORT_MEASUREMENT: &str = "json_report_data";

/// Reads one JSON artifact and emits one point.
#[derive(Debug, Clone)]
pub struct JsonReportGenerator {
    path: PathBuf,
    measurement: String,
}

impl JsonReportGenerator {
    /// Create a generator for `path`; blank measurements fall back to the default.
    pub fn new(path: impl Into<PathBuf>, measurement: Option<&str>) -> Self {
        let measurement = measurement
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_JSON_REPORT_MEASUREMENT);
        Self {
            path: path.into(),
            measurement: measurement.to_owned(),
        }
    }

    /// Artifact path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn report_dir(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }

    fn read(&self) -> Result<Map<String, Value>> {
        let text = std::fs::read_to_string(&self.path).map_err(|error| {
            ErrorEnvelope::unexpected(
                ErrorCode::new("report", "read_failed"),
                format!("failed to read JSON report: {error}"),
                ErrorClass::NonRetriable,
            )
            .with_metadata("path", self.path.display().to_string())
        })?;
        let invalid = |message: String| {
            ErrorEnvelope::expected(ErrorCode::new("report", "invalid_json"), message)
                .with_metadata("path", self.path.display().to_string())
        };
        match serde_json::from_str::<Value>(&text) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(invalid("JSON report must be an object".to_owned())),
            Err(error) => Err(invalid(format!("invalid JSON report: {error}"))),
        }
    }
}

impl PointGenerator for JsonReportGenerator {
    fn name(&self) -> &str {
        "json_report"
    }

    fn availability(&self) -> Availability {
        let dir = self.report_dir();
        if dir.is_dir() {
            Availability::Available
        } else {
            Availability::unavailable(format!("report directory {} does not exist", dir.display()))
        }
    }

    fn has_data(&self, _ctx: &GeneratorContext) -> bool {
        self.path.is_file()
    }

    fn generate(&self, ctx: &GeneratorContext) -> Result<Vec<Point>> {
        let report = self.read()?;
        let (fields, tags) = split_report(report);

        let mut builder = ctx.identity_point(self.measurement.as_str());
        for (key, value) in tags {
            builder = builder.tag(ctx.tag_key(&key), value);
        }
        let builder = builder.fields(fields);
        if !builder.has_fields() {
            return Ok(Vec::new());
        }
        Ok(vec![builder.build()?])
    }
}

fn split_report(mut report: Map<String, Value>) -> (Vec<(String, FieldValue)>, Vec<(String, String)>) {
    let structured = matches!(report.get("fields"), Some(Value::Object(_)));
    if !structured {
        return (scalar_fields(report), Vec::new());
    }

    let fields = match report.remove("fields") {
        Some(Value::Object(fields)) => scalar_fields(fields),
        _ => Vec::new(),
    };
    let tags = match report.remove("tags") {
        Some(Value::Object(tags)) => tags
            .into_iter()
            .filter_map(|(key, value)| match value {
                Value::String(text) => Some((key, text)),
                Value::Number(number) => Some((key, number.to_string())),
                Value::Bool(flag) => Some((key, flag.to_string())),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    };
    (fields, tags)
}

fn scalar_fields(map: Map<String, Value>) -> Vec<(String, FieldValue)> {
    map.into_iter()
        .filter_map(|(key, value)| to_field_value(value).map(|value| (key, value)))
        .collect()
}

fn to_field_value(value: Value) -> Option<FieldValue> {
    match value {
        Value::Bool(flag) => Some(FieldValue::Boolean(flag)),
        Value::String(text) => Some(FieldValue::String(text)),
        Value::Number(number) => number
            .as_i64()
            .map(FieldValue::Integer)
            .or_else(|| number.as_f64().map(FieldValue::Float)),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}
