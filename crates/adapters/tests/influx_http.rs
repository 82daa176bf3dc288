// InfluxDB HTTP store integration tests against a mock server.
#![allow(missing_docs)]

use build_metrics_adapters::influx::{InfluxStore, InfluxStoreConfig};
use build_metrics_ports::{
    ConsistencyLevel, Credentials, Point, Precision, TargetEndpoint, TimeSeriesStorePort,
    WriteBatch,
};
use build_metrics_shared::{ErrorClass, ErrorCode, RequestContext, Result};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_string, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn batch(points: Vec<Point>) -> WriteBatch {
    WriteBatch {
        database: "builds".into(),
        retention_policy: "autogen".into(),
        consistency: ConsistencyLevel::Any,
        precision: Precision::Seconds,
        points: Arc::from(points),
    }
}

fn build_point() -> Result<Point> {
    Ok(Point::builder("build_data")
        .tag("project_name", "team_app")
        .tag("prefix", "")
        .field("build_number", 7_i64)
        .field("build_result", "SUCCESS")
        .timestamp(1_700_000_000)
        .build()?)
}

fn endpoint(server: &MockServer, credentials: Option<Credentials>) -> TargetEndpoint {
    TargetEndpoint {
        url: server.uri().into(),
        credentials,
    }
}

#[tokio::test]
async fn write_posts_line_protocol_with_parameters_and_auth() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/write"))
        .and(query_param("db", "builds"))
        .and(query_param("rp", "autogen"))
        .and(query_param("precision", "s"))
        .and(query_param("consistency", "any"))
        .and(header("authorization", "Basic Y2k6czNjcmV0"))
        .and(body_string(
            "build_data,project_name=team_app build_number=7i,build_result=\"SUCCESS\" 1700000000\n",
        ))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let store = InfluxStore::new(InfluxStoreConfig::default());
    let credentials = Credentials {
        username: "ci".into(),
        password: "s3cret".into(), // pragma: allowlist secret
    };
    let connection = store.connect(&endpoint(&server, Some(credentials)))?;
    connection
        .write(&RequestContext::new_run(), &batch(vec![build_point()?]))
        .await?;
    Ok(())
}

#[tokio::test]
async fn anonymous_write_sends_no_authorization() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/write"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let connection = InfluxStore::default().connect(&endpoint(&server, None))?;
    connection
        .write(&RequestContext::new_run(), &batch(vec![build_point()?]))
        .await?;

    let requests = server.received_requests().await.unwrap_or_default();
    assert_eq!(requests.len(), 1);
    assert!(
        requests
            .iter()
            .all(|request| !request.headers.contains_key("authorization"))
    );
    Ok(())
}

#[tokio::test]
async fn missing_database_is_rejected_with_server_message() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/write"))
        .respond_with(
            ResponseTemplate::new(404).set_body_string(r#"{"error":"database not found: \"builds\""}"#),
        )
        .mount(&server)
        .await;

    let connection = InfluxStore::default().connect(&endpoint(&server, None))?;
    let outcome = connection
        .write(&RequestContext::new_run(), &batch(vec![build_point()?]))
        .await;

    let error = outcome.err();
    assert_eq!(
        error.as_ref().map(|error| &error.code),
        Some(&ErrorCode::new("store", "write_rejected"))
    );
    assert_eq!(
        error.as_ref().map(|error| error.class),
        Some(ErrorClass::NonRetriable)
    );
    assert!(
        error
            .as_ref()
            .is_some_and(|error| error.message.contains("database not found"))
    );
    assert_eq!(
        error
            .as_ref()
            .and_then(|error| error.metadata.get("database"))
            .map(String::as_str),
        Some("builds")
    );
    Ok(())
}

#[tokio::test]
async fn server_errors_are_retriable() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/write"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let connection = InfluxStore::default().connect(&endpoint(&server, None))?;
    let outcome = connection
        .write(&RequestContext::new_run(), &batch(vec![build_point()?]))
        .await;

    assert!(matches!(
        outcome,
        Err(ref error) if error.class == ErrorClass::Retriable
    ));
    Ok(())
}

#[tokio::test]
async fn empty_batch_makes_no_request() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&server)
        .await;

    let connection = InfluxStore::default().connect(&endpoint(&server, None))?;
    connection
        .write(&RequestContext::new_run(), &batch(Vec::new()))
        .await?;
    Ok(())
}

#[tokio::test]
async fn unreachable_server_is_a_transport_error() -> Result<()> {
    let store = InfluxStore::new(InfluxStoreConfig {
        timeout_ms: Some(2_000),
        ..InfluxStoreConfig::default()
    });
    let connection = store.connect(&TargetEndpoint {
        url: "http://127.0.0.1:9".into(),
        credentials: None,
    })?;
    let outcome = connection
        .write(&RequestContext::new_run(), &batch(vec![build_point()?]))
        .await;

    assert!(matches!(
        outcome,
        Err(ref error) if error.code == ErrorCode::new("store", "transport")
    ));
    Ok(())
}

#[tokio::test]
async fn slow_write_succeeds_without_a_configured_timeout() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/write"))
        .respond_with(ResponseTemplate::new(204).set_delay(Duration::from_millis(1_500)))
        .expect(1)
        .mount(&server)
        .await;

    assert_eq!(InfluxStoreConfig::default().timeout_ms, None);
    let connection = InfluxStore::default().connect(&endpoint(&server, None))?;
    connection
        .write(&RequestContext::new_run(), &batch(vec![build_point()?]))
        .await?;
    Ok(())
}

#[tokio::test]
async fn configured_timeout_cuts_off_slow_writes() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/write"))
        .respond_with(ResponseTemplate::new(204).set_delay(Duration::from_millis(1_500)))
        .mount(&server)
        .await;

    let store = InfluxStore::new(InfluxStoreConfig {
        timeout_ms: Some(200),
        ..InfluxStoreConfig::default()
    });
    let outcome = store
        .connect(&endpoint(&server, None))?
        .write(&RequestContext::new_run(), &batch(vec![build_point()?]))
        .await;

    assert!(matches!(
        outcome,
        Err(ref error) if error.code == ErrorCode::new("store", "transport")
    ));
    Ok(())
}

#[test]
fn connect_rejects_non_http_urls() {
    let outcome = InfluxStore::default().connect(&TargetEndpoint {
        url: "influx://admin:hunter2@db:8086".into(),
        credentials: None,
    });

    let error = outcome.err();
    assert_eq!(
        error.as_ref().map(|error| &error.code),
        Some(&ErrorCode::new("store", "invalid_url"))
    );
    assert!(
        error
            .as_ref()
            .is_some_and(|error| !error.to_string().contains("hunter2"))
    );
}
