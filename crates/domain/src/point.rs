//! Time-series points and their field values.

use build_metrics_shared::{ErrorCode, ErrorEnvelope};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Construction failures for points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PointError {
    /// Measurement name is empty after trimming.
    EmptyMeasurement,
    /// A point needs at least one field to be writable.
    NoFields {
        /// Measurement of the rejected point.
        measurement: String,
    },
    /// Tag or field keys must be non-empty.
    EmptyKey {
        /// Measurement of the rejected point.
        measurement: String,
    },
}

impl PointError {
    fn error_code(&self) -> ErrorCode {
        match self {
            Self::EmptyMeasurement => ErrorCode::new("domain", "empty_measurement"),
            Self::NoFields { .. } => ErrorCode::new("domain", "point_without_fields"),
            Self::EmptyKey { .. } => ErrorCode::new("domain", "empty_point_key"),
        }
    }
}

impl fmt::Display for PointError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyMeasurement => formatter.write_str("measurement must be non-empty"),
            Self::NoFields { measurement } => {
                write!(formatter, "point `{measurement}` must carry at least one field")
            },
            Self::EmptyKey { measurement } => {
                write!(formatter, "point `{measurement}` has an empty tag or field key")
            },
        }
    }
}

impl std::error::Error for PointError {}

impl From<PointError> for ErrorEnvelope {
    fn from(error: PointError) -> Self {
        let envelope = Self::expected(error.error_code(), error.to_string());
        match error {
            PointError::EmptyMeasurement => envelope,
            PointError::NoFields { measurement } | PointError::EmptyKey { measurement } => {
                envelope.with_metadata("measurement", measurement)
            },
        }
    }
}

/// A single field value.
///
/// Variant order matters for untagged deserialization: integers are tried
/// before floats so `11` stays an integer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Signed 64-bit integer.
    Integer(i64),
    /// 64-bit float.
    Float(f64),
    /// Boolean.
    Boolean(bool),
    /// UTF-8 string.
    String(String),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(value) => write!(formatter, "{value}"),
            Self::Float(value) => write!(formatter, "{value}"),
            Self::Boolean(value) => write!(formatter, "{value}"),
            Self::String(value) => formatter.write_str(value),
        }
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<u32> for FieldValue {
    fn from(value: u32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

/// An immutable time-series point.
///
/// Only `PointBuilder::build` creates points, so every point has a
/// non-empty measurement and at least one field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Point {
    measurement: String,
    tags: BTreeMap<String, String>,
    fields: BTreeMap<String, FieldValue>,
    timestamp: i64,
}

impl Point {
    /// Start building a point for a measurement.
    pub fn builder(measurement: impl Into<String>) -> PointBuilder {
        PointBuilder {
            measurement: measurement.into(),
            tags: BTreeMap::new(),
            fields: BTreeMap::new(),
            timestamp: 0,
        }
    }

    /// Measurement name.
    #[must_use]
    pub fn measurement(&self) -> &str {
        &self.measurement
    }

    /// Tags keyed by name.
    #[must_use]
    pub const fn tags(&self) -> &BTreeMap<String, String> {
        &self.tags
    }

    /// Fields keyed by name.
    #[must_use]
    pub const fn fields(&self) -> &BTreeMap<String, FieldValue> {
        &self.fields
    }

    /// Timestamp in the batch precision.
    #[must_use]
    pub const fn timestamp(&self) -> i64 {
        self.timestamp
    }
}

/// Builder for `Point`.
#[derive(Debug, Clone)]
pub struct PointBuilder {
    measurement: String,
    tags: BTreeMap<String, String>,
    fields: BTreeMap<String, FieldValue>,
    timestamp: i64,
}

impl PointBuilder {
    /// Add or replace a tag.
    #[must_use]
    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Add or replace every tag from an iterator.
    #[must_use]
    pub fn tags<K, V>(mut self, tags: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.tags
            .extend(tags.into_iter().map(|(key, value)| (key.into(), value.into())));
        self
    }

    /// Add or replace a field.
    #[must_use]
    pub fn field(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Add or replace every field from an iterator.
    #[must_use]
    pub fn fields<K>(mut self, fields: impl IntoIterator<Item = (K, FieldValue)>) -> Self
    where
        K: Into<String>,
    {
        self.fields
            .extend(fields.into_iter().map(|(key, value)| (key.into(), value)));
        self
    }

    /// Set the timestamp.
    #[must_use]
    pub const fn timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Returns true when at least one field has been added.
    #[must_use]
    pub fn has_fields(&self) -> bool {
        !self.fields.is_empty()
    }

    /// Validate and build the point.
    pub fn build(self) -> Result<Point, PointError> {
        let measurement = self.measurement.trim();
        if measurement.is_empty() {
            return Err(PointError::EmptyMeasurement);
        }
        if self.fields.is_empty() {
            return Err(PointError::NoFields {
                measurement: measurement.to_owned(),
            });
        }
        if self.tags.keys().chain(self.fields.keys()).any(String::is_empty) {
            return Err(PointError::EmptyKey {
                measurement: measurement.to_owned(),
            });
        }

        Ok(Point {
            measurement: measurement.to_owned(),
            tags: self.tags,
            fields: self.fields,
            timestamp: self.timestamp,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn builder_rejects_points_without_fields() {
        let error = Point::builder("build_data").tag("project", "x").build().err();
        assert!(matches!(error, Some(PointError::NoFields { .. })));
    }

    #[test]
    fn builder_rejects_blank_measurement() {
        let error = Point::builder("  ").field("value", 1_i64).build().err();
        assert_eq!(error, Some(PointError::EmptyMeasurement));
    }

    #[test]
    fn builder_rejects_empty_keys() {
        let error = Point::builder("m").field("", 1_i64).build().err();
        assert!(matches!(error, Some(PointError::EmptyKey { .. })));
    }

    #[test]
    fn builder_keeps_tags_fields_and_timestamp() -> Result<(), Box<dyn Error>> {
        let point = Point::builder("build_data")
            .tag("project_name", "svc")
            .field("build_number", 42_i64)
            .field("build_result", "SUCCESS")
            .timestamp(1_700_000_000_000)
            .build()?;

        assert_eq!(point.measurement(), "build_data");
        assert_eq!(point.tags().get("project_name").map(String::as_str), Some("svc"));
        assert_eq!(point.fields().get("build_number"), Some(&FieldValue::Integer(42)));
        assert_eq!(point.timestamp(), 1_700_000_000_000);
        Ok(())
    }

    #[test]
    fn field_values_deserialize_to_narrowest_variant() -> Result<(), Box<dyn Error>> {
        let values: BTreeMap<String, FieldValue> =
            serde_json::from_str(r#"{"a": 11, "b": 1.5, "c": true, "d": "text"}"#)?;

        assert_eq!(values.get("a"), Some(&FieldValue::Integer(11)));
        assert_eq!(values.get("b"), Some(&FieldValue::Float(1.5)));
        assert_eq!(values.get("c"), Some(&FieldValue::Boolean(true)));
        assert_eq!(values.get("d"), Some(&FieldValue::String("text".into())));
        Ok(())
    }

    #[test]
    fn point_error_maps_to_envelope() {
        let envelope = ErrorEnvelope::from(PointError::NoFields {
            measurement: "custom".into(),
        });
        assert_eq!(envelope.code.to_string(), "domain:point_without_fields");
        assert_eq!(
            envelope.metadata.get("measurement").map(String::as_str),
            Some("custom")
        );
    }
}
