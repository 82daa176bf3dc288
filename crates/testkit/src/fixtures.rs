//! Paths to the shared fixture files under `crates/testkit/fixtures`.

use std::path::{Path, PathBuf};

/// Fixture root directory.
pub fn fixtures_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures")
}

/// Absolute path of a fixture, e.g. `config/publisher-config.valid.json`.
pub fn fixture_path(relative: &str) -> PathBuf {
    fixtures_dir().join(relative)
}

/// Read a fixture as UTF-8.
pub fn read_fixture(relative: &str) -> std::io::Result<String> {
    std::fs::read_to_string(fixture_path(relative))
}
