//! # build-metrics-infra
//!
//! Infrastructure wiring and runtime composition.
//! This crate depends on `app`, `adapters`, `config`, and `shared`.

/// Config loading helpers used by CLI surfaces.
pub mod config_check;
/// Environment validation helpers used by CLI surfaces.
pub mod env_check;
/// Report generator registry.
pub mod generator_registry;
/// Publish composition.
pub mod publish_runner;
/// Store selection and target mapping.
mod store_factory;

pub use config_check::{
    ConfigOutputFormat, load_effective_config, render_effective_config,
};
pub use env_check::{InfraError, InfraResult, publisher_env_from_process, validate_env_parsing};
pub use generator_registry::{REPORT_KINDS, build_report_generators};
pub use publish_runner::{
    PublishRuntime, PublishSummary, RunOptions, TargetSummary, build_publish_input, run_publish,
    run_publish_local,
};
pub use store_factory::{build_store_port, to_publish_targets};

// Re-export redaction utilities for CLI boundary sanitization
pub use build_metrics_shared::{is_secret_key, redact_if_secret};

/// Crate version helpers.
pub mod placeholder {
    /// Crate version string.
    #[must_use]
    pub const fn infra_crate_version() -> &'static str {
        env!("CARGO_PKG_VERSION")
    }
}

pub use placeholder::infra_crate_version;
