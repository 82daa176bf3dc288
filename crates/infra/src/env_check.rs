//! Environment validation helpers for CLI surfaces.

use build_metrics_config::{PublisherConfig, PublisherEnv, apply_env_overrides};
use build_metrics_shared::ErrorEnvelope;
use std::collections::BTreeMap;

/// Infra-level error type (shared error envelope).
pub type InfraError = ErrorEnvelope;

/// Infra-level result type.
pub type InfraResult<T> = Result<T, InfraError>;

/// Validate that the provided env overrides can be parsed and merged into a config.
pub fn validate_env_parsing(env: &BTreeMap<String, String>) -> InfraResult<()> {
    let parsed = PublisherEnv::from_map(env).map_err(ErrorEnvelope::from)?;
    let _ = apply_env_overrides(PublisherConfig::default(), &parsed)?;
    Ok(())
}

/// Collect the `BMP_*` variables from the process environment.
#[must_use]
pub fn publisher_env_from_process() -> BTreeMap<String, String> {
    std::env::vars()
        .filter(|(name, _)| name.starts_with("BMP_"))
        .collect()
}
