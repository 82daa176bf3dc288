//! The build summary point.

use build_metrics_domain::EnvParameterSpec;
use build_metrics_ports::{GeneratorContext, Point, PointGenerator};
use build_metrics_shared::Result;

/// Measurement used when no override is configured.
pub const DEFAULT_BUILD_MEASUREMENT: &str = "build_data";

/// Emits one point describing the build: identity, duration and result,
/// plus fields and tags resolved from the env-parameter specs.
#[derive(Debug, Clone, Default)]
pub struct BuildBaseGenerator {
    env_fields: EnvParameterSpec,
    env_tags: EnvParameterSpec,
}

impl BuildBaseGenerator {
    /// Create the generator with env-derived field and tag specs.
    #[must_use]
    pub const fn new(env_fields: EnvParameterSpec, env_tags: EnvParameterSpec) -> Self {
        Self {
            env_fields,
            env_tags,
        }
    }
}

impl PointGenerator for BuildBaseGenerator {
    fn name(&self) -> &str {
        "build_base"
    }

    fn has_data(&self, _ctx: &GeneratorContext) -> bool {
        true
    }

    fn generate(&self, ctx: &GeneratorContext) -> Result<Vec<Point>> {
        let run = ctx.run();
        let measurement = ctx.measurement_name().unwrap_or(DEFAULT_BUILD_MEASUREMENT);
        let build_time = i64::try_from(run.duration_ms).unwrap_or(i64::MAX);

        let mut builder = ctx
            .identity_point(measurement)
            .field("project_name", ctx.project_name())
            .field("project_path", run.project_path.as_str())
            .field("build_number", run.build_number)
            .field("build_time", build_time)
            .field("build_result", run.result.label())
            .field("build_result_ordinal", run.result.ordinal())
            .field("build_successful", run.result.is_successful())
            .field("build_status_message", run.result.status_message());
        if let Some(scheduled_at_ms) = run.scheduled_at_ms {
            builder = builder.field("build_scheduled_time", scheduled_at_ms);
        }
        if let Some(agent_name) = run.agent_name.as_deref() {
            builder = builder.field("build_agent_name", agent_name);
        }

        let lookup = |name: &str| ctx.env_var(name);
        for (key, value) in self.env_fields.resolve(lookup) {
            builder = builder.field(key, value);
        }
        for (key, value) in self.env_tags.resolve(lookup) {
            builder = builder.tag(ctx.tag_key(&key), value);
        }

        Ok(vec![builder.build()?])
    }
}
