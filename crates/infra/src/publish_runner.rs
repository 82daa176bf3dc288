//! Publish composition: config and build facts in, summary out.

use crate::generator_registry::build_report_generators;
use crate::store_factory::to_publish_targets;
use crate::{InfraError, InfraResult};
use build_metrics_adapters::ProcessEnvironment;
use build_metrics_app::{
    PublishDeps, PublishInput, PublishOutput, TargetOutcome, publish_build_metrics,
};
use build_metrics_config::ValidatedPublisherConfig;
use build_metrics_domain::BuildRun;
use build_metrics_ports::{ConsolePort, EnvironmentPort, LoggerPort, TimeSeriesStorePort};
use build_metrics_shared::{ErrorEnvelope, RequestContext};
use serde::Serialize;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

/// Per-invocation switches that do not come from config.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Fixed point timestamp in epoch milliseconds.
    pub timestamp_ms: Option<i64>,
    /// Mirror diagnostics to the console.
    pub verbose: bool,
    /// Collect without writing.
    pub dry_run: bool,
}

/// Adapters a publish run is wired with.
#[derive(Clone)]
pub struct PublishRuntime {
    /// Time-series store.
    pub store: Arc<dyn TimeSeriesStorePort>,
    /// Environment used for `$VAR` references.
    pub environment: Arc<dyn EnvironmentPort>,
    /// Structured logger.
    pub logger: Option<Arc<dyn LoggerPort>>,
    /// Console mirror for verbose runs.
    pub console: Option<Arc<dyn ConsolePort>>,
    /// Directory relative report paths resolve against.
    pub base_dir: PathBuf,
}

impl PublishRuntime {
    /// Runtime reading the process environment.
    pub fn new(store: Arc<dyn TimeSeriesStorePort>, base_dir: impl Into<PathBuf>) -> Self {
        Self {
            store,
            environment: Arc::new(ProcessEnvironment::new()),
            logger: None,
            console: None,
            base_dir: base_dir.into(),
        }
    }

    /// Replace the environment.
    #[must_use]
    pub fn with_environment(mut self, environment: Arc<dyn EnvironmentPort>) -> Self {
        self.environment = environment;
        self
    }

    /// Attach a logger.
    #[must_use]
    pub fn with_logger(mut self, logger: Arc<dyn LoggerPort>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Attach a console mirror.
    #[must_use]
    pub fn with_console(mut self, console: Arc<dyn ConsolePort>) -> Self {
        self.console = Some(console);
        self
    }
}

/// Map validated config plus build facts into the use-case input.
#[must_use]
pub fn build_publish_input(
    config: &ValidatedPublisherConfig,
    run: BuildRun,
    options: RunOptions,
) -> PublishInput {
    let publisher = &config.publisher;
    let mut input = PublishInput::new(run);
    input.custom_project_name.clone_from(&publisher.custom_project_name);
    input.custom_prefix.clone_from(&publisher.custom_prefix);
    input.measurement_name.clone_from(&publisher.measurement_name);
    input.replace_dash_with_underscore = publisher.replace_dash_with_underscore;
    input.precision = publisher.precision;
    input.env_fields = config.env_fields().clone();
    input.env_tags = config.env_tags().clone();
    input.custom_data.clone_from(&publisher.custom_data);
    input.custom_data_tags.clone_from(&publisher.custom_data_tags);
    input.custom_data_map.clone_from(&publisher.custom_data_map);
    input.custom_data_map_tags.clone_from(&publisher.custom_data_map_tags);
    input.targets = to_publish_targets(&config.targets);
    input.timestamp_ms = options.timestamp_ms;
    input.verbose = options.verbose;
    input.dry_run = options.dry_run;
    input
}

/// Collect and publish one build.
pub async fn run_publish(
    ctx: &RequestContext,
    runtime: &PublishRuntime,
    config: &ValidatedPublisherConfig,
    run: BuildRun,
    options: RunOptions,
) -> InfraResult<PublishOutput> {
    let deps = PublishDeps {
        store: Arc::clone(&runtime.store),
        environment: Arc::clone(&runtime.environment),
        generators: build_report_generators(&config.reports, &runtime.base_dir),
        logger: runtime.logger.clone(),
        console: runtime.console.clone(),
    };
    let input = build_publish_input(config, run, options);
    publish_build_metrics(ctx, &deps, input).await
}

/// Blocking [`run_publish`] on a fresh current-thread runtime.
pub fn run_publish_local(
    runtime: &PublishRuntime,
    config: &ValidatedPublisherConfig,
    run: BuildRun,
    options: RunOptions,
) -> InfraResult<PublishOutput> {
    run_async_with_ctx(RequestContext::new_run(), |ctx| async move {
        run_publish(&ctx, runtime, config, run, options).await
    })
}

fn run_async_with_ctx<F, T>(
    ctx: RequestContext,
    op: impl FnOnce(RequestContext) -> F,
) -> InfraResult<T>
where
    F: Future<Output = Result<T, ErrorEnvelope>>,
{
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(InfraError::from)?;
    runtime.block_on(async { op(ctx).await })
}

/// Serializable summary of a publish run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishSummary {
    /// Rendered project name.
    pub project_name: String,
    /// Points collected.
    pub points: usize,
    /// Whether writes were skipped.
    pub dry_run: bool,
    /// One entry per attempted target.
    pub targets: Vec<TargetSummary>,
}

/// Serializable outcome for one target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetSummary {
    /// Target label.
    pub target: String,
    /// `written` or `failed`.
    pub status: &'static str,
    /// Points accepted, when written.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub points: Option<usize>,
    /// Error code, when failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    /// Error message, when failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl From<&PublishOutput> for PublishSummary {
    fn from(output: &PublishOutput) -> Self {
        let targets = output
            .report
            .targets
            .iter()
            .map(|report| match &report.outcome {
                TargetOutcome::Written { points } => TargetSummary {
                    target: report.target.to_string(),
                    status: "written",
                    points: Some(*points),
                    error_code: None,
                    error_message: None,
                },
                TargetOutcome::Failed { error, .. } => TargetSummary {
                    target: report.target.to_string(),
                    status: "failed",
                    points: None,
                    error_code: Some(error.code.to_string()),
                    error_message: Some(error.message.clone()),
                },
            })
            .collect();
        Self {
            project_name: output.project_name.clone(),
            points: output.points.len(),
            dry_run: output.dry_run,
            targets,
        }
    }
}
