//! End-to-end config flows: show the effective config, then check it again.

use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

fn fixture_path(relative: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../../crates/testkit/fixtures")
        .join(relative)
}

fn run_cli(args: &[&str], env: &[(&str, &str)]) -> io::Result<Output> {
    let mut command = Command::new(env!("CARGO_BIN_EXE_bmp"));
    command.args(args);
    for (key, _) in std::env::vars() {
        if key.starts_with("BMP_") {
            command.env_remove(key);
        }
    }
    command.envs(env.iter().copied());
    command.output()
}

#[test]
fn shown_toml_config_checks_clean() -> io::Result<()> {
    let source = fixture_path("config/publisher-config.valid.json");
    let source = source.to_string_lossy();
    let shown = run_cli(
        &["config", "show", "--path", &source, "--format", "toml"],
        &[("BMP_MEASUREMENT_NAME", "ci_builds")],
    )?;
    if !shown.status.success() {
        let stderr = String::from_utf8_lossy(&shown.stderr);
        return Err(io::Error::other(format!("config show failed: {stderr}")));
    }

    let copy = std::env::temp_dir().join(format!("bmp-e2e-{}-shown.toml", std::process::id()));
    std::fs::write(&copy, &shown.stdout)?;
    let copy_arg = copy.to_string_lossy().into_owned();
    let checked = run_cli(&["config", "check", "--path", &copy_arg], &[]);
    let _ = std::fs::remove_file(&copy);
    let checked = checked?;
    let stdout = String::from_utf8_lossy(&checked.stdout);

    assert!(checked.status.success(), "check failed: {stdout}");
    assert!(stdout.contains("targets: 2"));
    assert!(stdout.contains("reports: 2"));
    assert!(String::from_utf8_lossy(&shown.stdout).contains("measurementName = \"ci_builds\""));
    Ok(())
}

#[test]
fn config_show_is_deterministic() -> io::Result<()> {
    let source = fixture_path("config/publisher-config.example.toml");
    let source = source.to_string_lossy();
    let first = run_cli(&["config", "show", "--path", &source], &[])?;
    let second = run_cli(&["config", "show", "--path", &source], &[])?;

    assert!(first.status.success());
    assert_eq!(first.stdout, second.stdout);
    Ok(())
}
