//! Test fixtures for shared error codes and envelopes.

use build_metrics_shared::{ErrorClass, ErrorCode, ErrorEnvelope};

/// Return a list of error codes the pipeline produces.
pub fn common_error_codes() -> Vec<ErrorCode> {
    vec![
        ErrorCode::invalid_input(),
        ErrorCode::new("store", "transport"),
        ErrorCode::new("store", "write_rejected"),
        ErrorCode::new("report", "read_failed"),
        ErrorCode::new("report", "invalid_json"),
        ErrorCode::new("report", "git_failed"),
        ErrorCode::new("publish", "target_write_failed"),
    ]
}

/// A retriable transport failure (connection refused).
pub fn transport_error() -> ErrorEnvelope {
    ErrorEnvelope::unexpected(
        ErrorCode::new("store", "transport"),
        "connection refused",
        ErrorClass::Retriable,
    )
}

/// A write rejected by the store with the given HTTP status.
pub fn write_rejected_error(status: u16) -> ErrorEnvelope {
    let class = if status >= 500 {
        ErrorClass::Retriable
    } else {
        ErrorClass::NonRetriable
    };
    ErrorEnvelope::unexpected(
        ErrorCode::new("store", "write_rejected"),
        format!("write rejected with status {status}"),
        class,
    )
    .with_metadata("status", status.to_string())
}

/// A generator failure while reading a report.
pub fn report_error() -> ErrorEnvelope {
    ErrorEnvelope::expected(ErrorCode::new("report", "invalid_json"), "broken report")
}
