//! End-to-end `bmp publish` runs against a mock InfluxDB.

use serde_json::{Value, json};
use std::io;
use std::path::PathBuf;
use std::process::{Command, Output};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct ConfigFile(PathBuf);

impl ConfigFile {
    fn write(name: &str, config: &Value) -> io::Result<Self> {
        let path = std::env::temp_dir().join(format!("bmp-e2e-{}-{name}.json", std::process::id()));
        std::fs::write(&path, config.to_string())?;
        Ok(Self(path))
    }

    fn arg(&self) -> String {
        self.0.to_string_lossy().into_owned()
    }
}

impl Drop for ConfigFile {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.0);
    }
}

fn run_publish(config: &ConfigFile, extra: &[&str]) -> io::Result<Output> {
    let config = config.arg();
    let mut command = Command::new(env!("CARGO_BIN_EXE_bmp"));
    command.args([
        "publish",
        "--config",
        &config,
        "--project-path",
        "folder/sub/job",
        "--build-number",
        "42",
        "--result",
        "unstable",
        "--duration-ms",
        "1500",
        "--timestamp-ms",
        "1700000000000",
        "--param",
        "GIT_COMMIT=abc123",
        "--timeout-ms",
        "2000",
        "--no-progress",
    ]);
    command.args(extra);
    for (key, _) in std::env::vars() {
        if key.starts_with("BMP_") {
            command.env_remove(key);
        }
    }
    command.output()
}

#[tokio::test(flavor = "multi_thread")]
async fn publish_writes_line_protocol_to_every_target() -> Result<(), Box<dyn std::error::Error>> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/write"))
        .and(query_param("db", "builds"))
        .and(query_param("rp", "autogen"))
        .and(query_param("precision", "ms"))
        .and(header("authorization", "Basic Y2k6czNjcmV0"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let config = ConfigFile::write(
        "lenient",
        &json!({
            "version": 1,
            "publisher": {
                "customPrefix": "ci",
                "envParameterField": "commit=$GIT_COMMIT",
                "customDataMap": { "deploy": { "seconds": 12 } }
            },
            "targets": [
                { "description": "offline", "url": "http://127.0.0.1:9", "database": "builds" },
                {
                    "description": "primary",
                    "url": server.uri(),
                    "username": "ci",
                    "password": "s3cret",
                    "database": "builds"
                }
            ]
        }),
    )?;

    let output = run_publish(&config, &["--output", "json"])?;
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(output.status.success(), "publish failed: {stderr}");

    let value: Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(
        value.pointer("/summary/projectName"),
        Some(&json!("ci_folder_sub_job"))
    );
    assert_eq!(value.pointer("/summary/points"), Some(&json!(2)));
    assert_eq!(value.pointer("/summary/targets/0/status"), Some(&json!("failed")));
    assert_eq!(
        value.pointer("/summary/targets/0/errorCode"),
        Some(&json!("store:transport"))
    );
    assert_eq!(value.pointer("/summary/targets/1/status"), Some(&json!("written")));

    let requests = server.received_requests().await.unwrap_or_default();
    let body: String = requests
        .iter()
        .map(|request| String::from_utf8_lossy(&request.body).into_owned())
        .collect();
    assert!(body.contains("build_data,prefix=ci,project_name=ci_folder_sub_job,project_path=folder/sub/job "));
    assert!(body.contains("build_number=42i"));
    assert!(body.contains("build_result=\"UNSTABLE\""));
    assert!(body.contains("commit=\"abc123\""));
    assert!(body.contains("ci_deploy seconds=12i 1700000000000"));
    assert!(!body.contains("s3cret"));
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn strict_target_failure_exits_with_one() -> Result<(), Box<dyn std::error::Error>> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&server)
        .await;

    let config = ConfigFile::write(
        "strict",
        &json!({
            "version": 1,
            "targets": [
                { "url": "http://127.0.0.1:9", "database": "builds", "exposeExceptions": true },
                { "url": server.uri(), "database": "builds" }
            ]
        }),
    )?;

    let output = run_publish(&config, &[])?;
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert_eq!(output.status.code(), Some(1));
    assert!(stdout.contains("status: error"));
    assert!(stdout.contains("code: publish:target_write_failed"));
    assert!(stdout.contains("target: http://127.0.0.1:9"));
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn rejected_write_is_reported_but_not_fatal() -> Result<(), Box<dyn std::error::Error>> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/write"))
        .respond_with(
            ResponseTemplate::new(404).set_body_string(r#"{"error":"database not found: \"builds\""}"#),
        )
        .mount(&server)
        .await;

    let config = ConfigFile::write(
        "rejected",
        &json!({
            "version": 1,
            "targets": [ { "description": "primary", "url": server.uri(), "database": "builds" } ]
        }),
    )?;

    let output = run_publish(&config, &[])?;
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    assert!(stdout.contains("target: primary failed store:write_rejected"));
    assert!(stdout.contains("database not found"));
    Ok(())
}
