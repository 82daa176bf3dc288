//! InfluxDB error mapping helpers.

use build_metrics_shared::{ErrorClass, ErrorCode, ErrorEnvelope};
use std::fmt;

/// Failures raised by the InfluxDB store adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InfluxWriteError {
    /// The target URL does not parse or cannot carry a path.
    InvalidUrl {
        /// Sanitized URL.
        url: String,
        /// Parser message.
        reason: String,
    },
    /// The HTTP client could not be constructed.
    ClientInit {
        /// Builder message.
        message: String,
    },
    /// A point cannot be encoded as line protocol.
    InvalidPoint {
        /// Measurement of the offending point.
        measurement: String,
        /// Field that could not be encoded.
        field: String,
    },
    /// The server answered with a non-2xx status.
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Server-provided error text.
        message: String,
    },
    /// The request never produced a response.
    Transport {
        /// Client message.
        message: String,
        /// Timed out rather than failed.
        timeout: bool,
    },
}

impl InfluxWriteError {
    /// Stable error code for the failure.
    #[must_use]
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::InvalidUrl { .. } => ErrorCode::new("store", "invalid_url"),
            Self::ClientInit { .. } => ErrorCode::new("store", "client_init_failed"),
            Self::InvalidPoint { .. } => ErrorCode::new("store", "invalid_point"),
            Self::Rejected { .. } => ErrorCode::new("store", "write_rejected"),
            Self::Transport { .. } => ErrorCode::new("store", "transport"),
        }
    }

    const fn class(&self) -> ErrorClass {
        match self {
            Self::Rejected { status, .. } if *status >= 500 => ErrorClass::Retriable,
            Self::Transport { .. } => ErrorClass::Retriable,
            _ => ErrorClass::NonRetriable,
        }
    }

    /// Map a reqwest failure that happened before a response arrived.
    #[must_use]
    pub fn from_transport(error: &reqwest::Error) -> Self {
        Self::Transport {
            message: message_without_url(error),
            timeout: error.is_timeout(),
        }
    }
}

impl fmt::Display for InfluxWriteError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidUrl { url, reason } => {
                write!(formatter, "invalid InfluxDB url {url}: {reason}")
            },
            Self::ClientInit { message } => {
                write!(formatter, "failed to build InfluxDB client: {message}")
            },
            Self::InvalidPoint { measurement, field } => write!(
                formatter,
                "point {measurement} has a non-finite float in field {field}"
            ),
            Self::Rejected { status, message } => {
                write!(formatter, "InfluxDB rejected the write (HTTP {status}): {message}")
            },
            Self::Transport { message, timeout } => {
                if *timeout {
                    write!(formatter, "InfluxDB write timed out: {message}")
                } else {
                    write!(formatter, "InfluxDB write failed: {message}")
                }
            },
        }
    }
}

impl std::error::Error for InfluxWriteError {}

impl From<InfluxWriteError> for ErrorEnvelope {
    fn from(error: InfluxWriteError) -> Self {
        let envelope = Self::unexpected(error.error_code(), error.to_string(), error.class());
        match error {
            InfluxWriteError::InvalidUrl { url, .. } => envelope.with_metadata("url", url),
            InfluxWriteError::InvalidPoint { measurement, field } => envelope
                .with_metadata("measurement", measurement)
                .with_metadata("field", field),
            InfluxWriteError::Rejected { status, .. } => {
                envelope.with_metadata("http_status", status.to_string())
            },
            InfluxWriteError::Transport { timeout, .. } => {
                envelope.with_metadata("timeout", timeout.to_string())
            },
            InfluxWriteError::ClientInit { .. } => envelope,
        }
    }
}

// Request URLs carry the database name in the query.
fn message_without_url(error: &reqwest::Error) -> String {
    let message = error.to_string();
    match error.url() {
        Some(url) => message.replace(url.as_str(), "<url>"),
        None => message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_errors_are_retriable() {
        let envelope = ErrorEnvelope::from(InfluxWriteError::Rejected {
            status: 503,
            message: "overloaded".into(),
        });
        assert_eq!(envelope.code, ErrorCode::new("store", "write_rejected"));
        assert_eq!(envelope.class, ErrorClass::Retriable);
        assert_eq!(
            envelope.metadata.get("http_status").map(String::as_str),
            Some("503")
        );
    }

    #[test]
    fn client_errors_are_not_retriable() {
        let envelope = ErrorEnvelope::from(InfluxWriteError::Rejected {
            status: 404,
            message: "database not found: \"builds\"".into(),
        });
        assert_eq!(envelope.class, ErrorClass::NonRetriable);
        assert!(envelope.message.contains("database not found"));
    }
}
