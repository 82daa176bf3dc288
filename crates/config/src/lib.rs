//! # build-metrics-config
//!
//! Publisher configuration schema, validation, env overrides and loading.
//! This crate depends on `domain` and `shared` only.

/// Environment variable parsing and merging.
pub mod env;
/// Config loading helpers (file + env).
pub mod load;
/// Configuration schema types and helpers.
pub mod schema;

pub use env::{
    ENV_CUSTOM_PREFIX, ENV_CUSTOM_PROJECT_NAME, ENV_MEASUREMENT_NAME, ENV_PRECISION,
    ENV_REPLACE_DASH_WITH_UNDERSCORE, ENV_TARGET_PASSWORD, EnvParseError, PublisherEnv,
    apply_env_overrides,
};
pub use load::{
    ConfigFormat, detect_config_format, load_publisher_config_from_path,
    load_publisher_config_std_env, to_pretty_json, to_pretty_toml,
};
pub use schema::{
    CURRENT_CONFIG_VERSION, ChangelogReportConfig, ConfigSchemaError, DEFAULT_RETENTION_POLICY,
    JsonReportConfig, PublisherConfig, PublisherOptions, ReportConfig, TargetConfig,
    ValidatedPublisherConfig, parse_publisher_config_json, parse_publisher_config_toml,
};

/// Returns the config crate version.
#[must_use]
pub const fn config_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;
    use build_metrics_domain::domain_crate_version;
    use build_metrics_shared::shared_crate_version;

    #[test]
    fn config_crate_compiles() {
        assert!(!config_crate_version().is_empty());
    }

    #[test]
    fn config_can_use_domain_and_shared() {
        assert!(!domain_crate_version().is_empty());
        assert!(!shared_crate_version().is_empty());
    }
}
