//! Integration tests for shared error propagation.

use build_metrics_shared::{ErrorClass, ErrorCode, ErrorKind};
use build_metrics_testkit::errors::{
    common_error_codes, report_error, transport_error, write_rejected_error,
};

#[test]
fn error_envelope_crosses_crates() {
    let transport = transport_error();
    assert_eq!(transport.code, ErrorCode::new("store", "transport"));
    assert!(transport.class.is_retriable());

    let boxed: Box<dyn std::error::Error> = Box::new(transport);
    assert!(boxed.to_string().contains("connection refused"));
}

#[test]
fn rejected_writes_are_retriable_only_on_server_errors() {
    assert_eq!(write_rejected_error(503).class, ErrorClass::Retriable);
    assert_eq!(write_rejected_error(404).class, ErrorClass::NonRetriable);
    assert_eq!(
        write_rejected_error(404).metadata.get("status").map(String::as_str),
        Some("404")
    );
}

#[test]
fn wrapped_errors_keep_the_cause() {
    let wrapped = report_error().wrap(
        ErrorCode::new("publish", "target_write_failed"),
        "failed to publish",
    );
    assert_eq!(wrapped.kind, ErrorKind::Expected);
    assert_eq!(
        wrapped.metadata.get("cause.code").map(String::as_str),
        Some("report:invalid_json")
    );
}

#[test]
fn common_error_codes_are_unique_and_namespaced() {
    let codes = common_error_codes();
    let rendered: std::collections::BTreeSet<String> =
        codes.iter().map(ToString::to_string).collect();

    assert_eq!(rendered.len(), codes.len());
    assert!(codes.iter().all(|code| !code.namespace().is_empty()));
    assert!(rendered.contains("publish:target_write_failed"));
}
