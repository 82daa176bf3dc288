//! Publish build metrics: collect points from every generator, then write
//! them to each configured target.

use crate::collect::collect_points;
use crate::diagnostics::{Diagnostics, log_fields};
use crate::generators::{BuildBaseGenerator, CustomDataGenerator, CustomDataMapGenerator};
use crate::publish::{PublishPointsDeps, PublishReport, PublishTarget, publish_points};
use build_metrics_domain::{
    BuildRun, EnvParameterSpec, FieldValue, Point, Precision, ProjectNameRenderer,
};
use build_metrics_ports::{
    ConsolePort, EnvironmentPort, GeneratorContext, LoggerPort, RegisteredGenerator,
    TimeSeriesStorePort,
};
use build_metrics_shared::{RequestContext, Result};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

/// Input payload for one publish invocation.
#[derive(Debug, Clone)]
pub struct PublishInput {
    /// The build being reported.
    pub run: BuildRun,
    /// Replaces the project name derived from the build.
    pub custom_project_name: Option<Box<str>>,
    /// Prefix for the project name and custom series.
    pub custom_prefix: Option<Box<str>>,
    /// Fixed point timestamp in epoch milliseconds; defaults to now.
    pub timestamp_ms: Option<i64>,
    /// Timestamp precision of the batch.
    pub precision: Precision,
    /// Replace `-` with `_` in tag keys.
    pub replace_dash_with_underscore: bool,
    /// Overrides the base measurement name.
    pub measurement_name: Option<Box<str>>,
    /// Env-derived base fields.
    pub env_fields: EnvParameterSpec,
    /// Env-derived base tags.
    pub env_tags: EnvParameterSpec,
    /// Single custom series fields.
    pub custom_data: BTreeMap<String, FieldValue>,
    /// Single custom series tags.
    pub custom_data_tags: BTreeMap<String, String>,
    /// Named custom series.
    pub custom_data_map: BTreeMap<String, BTreeMap<String, FieldValue>>,
    /// Tags of the named custom series.
    pub custom_data_map_tags: BTreeMap<String, BTreeMap<String, String>>,
    /// Destinations, written in order.
    pub targets: Vec<PublishTarget>,
    /// Mirror diagnostics to the console.
    pub verbose: bool,
    /// Collect only; skip every write.
    pub dry_run: bool,
}

impl PublishInput {
    /// Input for `run` with every option at its default.
    #[must_use]
    pub fn new(run: BuildRun) -> Self {
        Self {
            run,
            custom_project_name: None,
            custom_prefix: None,
            timestamp_ms: None,
            precision: Precision::default(),
            replace_dash_with_underscore: false,
            measurement_name: None,
            env_fields: EnvParameterSpec::default(),
            env_tags: EnvParameterSpec::default(),
            custom_data: BTreeMap::new(),
            custom_data_tags: BTreeMap::new(),
            custom_data_map: BTreeMap::new(),
            custom_data_map_tags: BTreeMap::new(),
            targets: Vec::new(),
            verbose: false,
            dry_run: false,
        }
    }
}

/// Dependencies required by publish.
#[derive(Clone)]
pub struct PublishDeps {
    /// Time-series store adapter.
    pub store: Arc<dyn TimeSeriesStorePort>,
    /// Build environment.
    pub environment: Arc<dyn EnvironmentPort>,
    /// Generators run after the core ones (external reports).
    pub generators: Vec<RegisteredGenerator>,
    /// Optional logger.
    pub logger: Option<Arc<dyn LoggerPort>>,
    /// Optional console mirror.
    pub console: Option<Arc<dyn ConsolePort>>,
}

impl fmt::Debug for PublishDeps {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("PublishDeps")
            .field("generators", &self.generators)
            .field("logger", &self.logger.is_some())
            .field("console", &self.console.is_some())
            .finish_non_exhaustive()
    }
}

/// What a publish invocation produced.
#[derive(Debug, Clone)]
pub struct PublishOutput {
    /// Rendered project name.
    pub project_name: String,
    /// Every collected point, in collection order.
    pub points: Arc<[Point]>,
    /// Per-target outcomes; empty on a dry run.
    pub report: PublishReport,
    /// Whether writes were skipped.
    pub dry_run: bool,
}

/// Collect points and publish them to every target.
///
/// Fails only when a target with `expose_exceptions` cannot be written.
pub async fn publish_build_metrics(
    ctx: &RequestContext,
    deps: &PublishDeps,
    input: PublishInput,
) -> Result<PublishOutput> {
    let started_at = Instant::now();
    let run_logger: Option<Arc<dyn LoggerPort>> = deps.logger.as_ref().map(|logger| {
        Arc::from(logger.child(log_fields([(
            "correlationId",
            Value::from(ctx.correlation_id().as_str()),
        )])))
    });
    let diagnostics = Diagnostics::new(run_logger, deps.console.clone(), input.verbose);

    let timestamp_ms = input.timestamp_ms.unwrap_or_else(now_epoch_ms);
    let renderer = ProjectNameRenderer::new(
        input.custom_prefix.as_deref(),
        input.custom_project_name.as_deref(),
    );
    let generator_ctx = GeneratorContext::new(
        input.run.clone(),
        renderer,
        input.precision.from_epoch_millis(timestamp_ms),
        Arc::clone(&deps.environment),
    )
    .with_tag_sanitization(input.replace_dash_with_underscore)
    .with_measurement_name(input.measurement_name.as_deref());

    let mut generators = core_generators(&input);
    generators.extend(deps.generators.iter().cloned());

    let points: Arc<[Point]> = collect_points(&generator_ctx, &diagnostics, &generators).into();

    let report = if input.dry_run {
        diagnostics.info(
            "publish.target.skipped",
            &format!("Dry run: {} points not published", points.len()),
            log_fields([("points", Value::from(points.len()))]),
        );
        PublishReport::default()
    } else {
        let publish_deps = PublishPointsDeps {
            store: Arc::clone(&deps.store),
            diagnostics: diagnostics.clone(),
        };
        publish_points(
            ctx,
            &publish_deps,
            Arc::clone(&points),
            input.precision,
            &input.targets,
        )
        .await?
    };

    diagnostics.info(
        "publish.completed",
        "Publish completed",
        log_fields([
            ("points", Value::from(points.len())),
            ("targetsWritten", Value::from(report.written_count())),
            ("targetsFailed", Value::from(report.failed_count())),
            ("durationMs", Value::from(duration_ms(started_at))),
        ]),
    );

    Ok(PublishOutput {
        project_name: generator_ctx.project_name().to_owned(),
        points,
        report,
        dry_run: input.dry_run,
    })
}

/// Base build, custom data and custom data map generators, in that order.
#[must_use]
pub fn core_generators(input: &PublishInput) -> Vec<RegisteredGenerator> {
    vec![
        RegisteredGenerator::core(Arc::new(BuildBaseGenerator::new(
            input.env_fields.clone(),
            input.env_tags.clone(),
        ))),
        RegisteredGenerator::core(Arc::new(CustomDataGenerator::new(
            input.custom_data.clone(),
            input.custom_data_tags.clone(),
        ))),
        RegisteredGenerator::core(Arc::new(CustomDataMapGenerator::new(
            input.custom_data_map.clone(),
            input.custom_data_map_tags.clone(),
        ))),
    ]
}

fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .ok()
        .and_then(|duration| i64::try_from(duration.as_millis()).ok())
        .unwrap_or_default()
}

fn duration_ms(started_at: Instant) -> u64 {
    u64::try_from(started_at.elapsed().as_millis()).unwrap_or(u64::MAX)
}
