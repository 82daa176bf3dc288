//! Point generator boundary contract.

use crate::EnvironmentPort;
use build_metrics_domain::{BuildRun, Point, PointBuilder, ProjectNameRenderer, sanitize_tag_key};
use build_metrics_shared::Result;
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

/// Result of a generator's capability probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Availability {
    /// The generator can run.
    Available,
    /// A dependency the generator needs is missing.
    Unavailable {
        /// Why the generator cannot run.
        reason: Box<str>,
    },
}

impl Availability {
    /// Build an `Unavailable` probe result.
    pub fn unavailable(reason: impl Into<Box<str>>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    /// Returns true when the generator can run.
    #[must_use]
    pub const fn is_available(&self) -> bool {
        matches!(self, Self::Available)
    }
}

/// Whether a generator is always present or depends on optional tooling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratorKind {
    /// Always registered; never probed.
    Core,
    /// Probed with `availability()` before use.
    Optional,
}

/// Read-only facts shared by every generator in one publish run.
#[derive(Clone)]
pub struct GeneratorContext {
    run: BuildRun,
    renderer: ProjectNameRenderer,
    project_name: String,
    timestamp: i64,
    replace_dash_with_underscore: bool,
    measurement_name: Option<String>,
    environment: Arc<dyn EnvironmentPort>,
}

impl GeneratorContext {
    /// Create a context; the project name is rendered once here.
    pub fn new(
        run: BuildRun,
        renderer: ProjectNameRenderer,
        timestamp: i64,
        environment: Arc<dyn EnvironmentPort>,
    ) -> Self {
        let project_name = renderer.render(&run);
        Self {
            run,
            renderer,
            project_name,
            timestamp,
            replace_dash_with_underscore: false,
            measurement_name: None,
            environment,
        }
    }

    /// Enable dash-to-underscore replacement on tag keys.
    #[must_use]
    pub const fn with_tag_sanitization(mut self, enabled: bool) -> Self {
        self.replace_dash_with_underscore = enabled;
        self
    }

    /// Override the default measurement name. Blank values are ignored.
    #[must_use]
    pub fn with_measurement_name(mut self, measurement_name: Option<&str>) -> Self {
        self.measurement_name = measurement_name
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_owned);
        self
    }

    /// The build run being reported.
    #[must_use]
    pub const fn run(&self) -> &BuildRun {
        &self.run
    }

    /// Rendered project name.
    #[must_use]
    pub fn project_name(&self) -> &str {
        &self.project_name
    }

    /// Configured prefix, if any.
    #[must_use]
    pub fn prefix(&self) -> Option<&str> {
        self.renderer.prefix()
    }

    /// Prefix a series name (`{prefix}_{name}`) when a prefix is configured.
    #[must_use]
    pub fn prefixed(&self, name: &str) -> String {
        self.renderer.with_prefix(name)
    }

    /// Timestamp applied to every point, in the batch precision.
    #[must_use]
    pub const fn timestamp(&self) -> i64 {
        self.timestamp
    }

    /// Measurement override, if configured.
    #[must_use]
    pub fn measurement_name(&self) -> Option<&str> {
        self.measurement_name.as_deref()
    }

    /// Apply the run's tag-key rule.
    ///
    /// Distinct keys can collapse to one key (`a-b` and `a_b`). Generators
    /// feed tags in key order, so the value of the last source key wins.
    #[must_use]
    pub fn tag_key<'a>(&self, key: &'a str) -> Cow<'a, str> {
        sanitize_tag_key(key, self.replace_dash_with_underscore)
    }

    /// Look up a build variable: run parameters first, then the environment.
    #[must_use]
    pub fn env_var(&self, name: &str) -> Option<String> {
        self.run
            .parameters
            .get(name)
            .cloned()
            .or_else(|| self.environment.var(name))
    }

    /// Start a point with the run timestamp applied.
    #[must_use]
    pub fn point(&self, measurement: impl Into<String>) -> PointBuilder {
        Point::builder(measurement).timestamp(self.timestamp)
    }

    /// Start a point carrying the run identity tags:
    /// `project_name`, `project_path` and `prefix` (when configured).
    #[must_use]
    pub fn identity_point(&self, measurement: impl Into<String>) -> PointBuilder {
        let builder = self
            .point(measurement)
            .tag("project_name", self.project_name.as_str())
            .tag("project_path", self.run.project_path.as_str());
        match self.prefix() {
            Some(prefix) => builder.tag("prefix", prefix),
            None => builder,
        }
    }
}

impl fmt::Debug for GeneratorContext {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("GeneratorContext")
            .field("run", &self.run)
            .field("project_name", &self.project_name)
            .field("prefix", &self.renderer.prefix())
            .field("timestamp", &self.timestamp)
            .field(
                "replace_dash_with_underscore",
                &self.replace_dash_with_underscore,
            )
            .field("measurement_name", &self.measurement_name)
            .finish_non_exhaustive()
    }
}

/// A producer of points for one data source.
pub trait PointGenerator: Send + Sync {
    /// Stable name used in logs.
    fn name(&self) -> &str;

    /// Capability probe. Only consulted for `GeneratorKind::Optional`.
    fn availability(&self) -> Availability {
        Availability::Available
    }

    /// Cheap presence check; must not fail.
    fn has_data(&self, ctx: &GeneratorContext) -> bool;

    /// Produce points. Failures are recoverable and isolated by the caller.
    fn generate(&self, ctx: &GeneratorContext) -> Result<Vec<Point>>;
}

/// A generator together with its registration kind.
#[derive(Clone)]
pub struct RegisteredGenerator {
    /// Registration kind.
    pub kind: GeneratorKind,
    /// The generator.
    pub generator: Arc<dyn PointGenerator>,
}

impl RegisteredGenerator {
    /// Register an always-present generator.
    pub fn core(generator: Arc<dyn PointGenerator>) -> Self {
        Self {
            kind: GeneratorKind::Core,
            generator,
        }
    }

    /// Register a generator that depends on optional tooling.
    pub fn optional(generator: Arc<dyn PointGenerator>) -> Self {
        Self {
            kind: GeneratorKind::Optional,
            generator,
        }
    }
}

impl fmt::Debug for RegisteredGenerator {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("RegisteredGenerator")
            .field("kind", &self.kind)
            .field("name", &self.generator.name())
            .finish()
    }
}
