//! Write options shared by every batch.

use build_metrics_shared::{ErrorCode, ErrorEnvelope};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Timestamp precision of a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Precision {
    /// Nanoseconds.
    #[serde(rename = "ns")]
    Nanoseconds,
    /// Microseconds.
    #[serde(rename = "us")]
    Microseconds,
    /// Milliseconds.
    #[default]
    #[serde(rename = "ms")]
    Milliseconds,
    /// Seconds.
    #[serde(rename = "s")]
    Seconds,
}

impl Precision {
    /// Query-string value understood by the InfluxDB 1.x write endpoint.
    #[must_use]
    pub const fn as_query_value(self) -> &'static str {
        match self {
            Self::Nanoseconds => "ns",
            Self::Microseconds => "u",
            Self::Milliseconds => "ms",
            Self::Seconds => "s",
        }
    }

    /// Convert an epoch-milliseconds timestamp into this precision.
    ///
    /// Saturates instead of overflowing for far-future values.
    #[must_use]
    pub const fn from_epoch_millis(self, millis: i64) -> i64 {
        match self {
            Self::Nanoseconds => millis.saturating_mul(1_000_000),
            Self::Microseconds => millis.saturating_mul(1_000),
            Self::Milliseconds => millis,
            Self::Seconds => millis / 1_000,
        }
    }
}

impl fmt::Display for Precision {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Nanoseconds => "ns",
            Self::Microseconds => "us",
            Self::Milliseconds => "ms",
            Self::Seconds => "s",
        };
        formatter.write_str(label)
    }
}

/// Invalid precision label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsePrecisionError {
    input: String,
}

impl fmt::Display for ParsePrecisionError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            formatter,
            "unknown precision `{}` (expected ns, us, ms, s)",
            self.input
        )
    }
}

impl std::error::Error for ParsePrecisionError {}

impl From<ParsePrecisionError> for ErrorEnvelope {
    fn from(error: ParsePrecisionError) -> Self {
        Self::expected(
            ErrorCode::new("domain", "invalid_precision"),
            error.to_string(),
        )
        .with_metadata("input", error.input)
    }
}

impl FromStr for Precision {
    type Err = ParsePrecisionError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.trim().to_ascii_lowercase().as_str() {
            "ns" | "n" => Ok(Self::Nanoseconds),
            "us" | "u" => Ok(Self::Microseconds),
            "ms" => Ok(Self::Milliseconds),
            "s" => Ok(Self::Seconds),
            _ => Err(ParsePrecisionError {
                input: input.to_owned(),
            }),
        }
    }
}

/// Write consistency requested from the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsistencyLevel {
    /// Any node may acknowledge, including hinted handoff.
    #[default]
    Any,
    /// One replica must acknowledge.
    One,
    /// A quorum of replicas must acknowledge.
    Quorum,
    /// Every replica must acknowledge.
    All,
}

impl ConsistencyLevel {
    /// Query-string value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Any => "any",
            Self::One => "one",
            Self::Quorum => "quorum",
            Self::All => "all",
        }
    }
}

impl fmt::Display for ConsistencyLevel {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}
