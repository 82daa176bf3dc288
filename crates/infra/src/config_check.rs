//! Config loading helpers for CLI surfaces.

use crate::InfraResult;
use build_metrics_config::{
    PublisherEnv, ValidatedPublisherConfig, load_publisher_config_from_path, to_pretty_json,
    to_pretty_toml,
};
use build_metrics_shared::ErrorEnvelope;
use std::collections::BTreeMap;
use std::path::Path;

/// Output format for `config show`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConfigOutputFormat {
    /// Pretty JSON.
    #[default]
    Json,
    /// TOML.
    Toml,
}

/// Load and validate the effective config (file plus `BMP_*` overrides).
pub fn load_effective_config(
    env: &BTreeMap<String, String>,
    config_path: Option<&Path>,
) -> InfraResult<ValidatedPublisherConfig> {
    let env = PublisherEnv::from_map(env).map_err(ErrorEnvelope::from)?;
    load_publisher_config_from_path(config_path, &env)
}

/// Render the effective config; passwords are redacted.
pub fn render_effective_config(
    env: &BTreeMap<String, String>,
    config_path: Option<&Path>,
    format: ConfigOutputFormat,
) -> InfraResult<String> {
    let config = load_effective_config(env, config_path)?;
    match format {
        ConfigOutputFormat::Json => to_pretty_json(&config),
        ConfigOutputFormat::Toml => to_pretty_toml(&config),
    }
}
