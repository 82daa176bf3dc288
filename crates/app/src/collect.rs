//! Collection orchestrator: run every generator, isolate failures.

use crate::diagnostics::{Diagnostics, log_fields};
use build_metrics_ports::{
    Availability, GeneratorContext, GeneratorKind, LogLevel, Point, RegisteredGenerator,
};
use serde_json::Value;

/// Run the generators in registration order and concatenate their points.
///
/// Optional generators are probed first; unavailable or empty sources and
/// failing generators contribute nothing. Collection itself never fails.
pub fn collect_points(
    ctx: &GeneratorContext,
    diagnostics: &Diagnostics,
    generators: &[RegisteredGenerator],
) -> Vec<Point> {
    diagnostics.info(
        "publish.collect.start",
        &format!("Collecting points from {} generators", generators.len()),
        log_fields([
            ("generators", Value::from(generators.len())),
            ("projectName", Value::from(ctx.project_name())),
        ]),
    );

    let mut points = Vec::new();
    for registered in generators {
        let generator = registered.generator.as_ref();
        let name = generator.name();

        if registered.kind == GeneratorKind::Optional
            && let Availability::Unavailable { reason } = generator.availability()
        {
            diagnostics.debug(
                "publish.generator.skipped",
                &format!("Data source unavailable: {name} ({reason})"),
                log_fields([
                    ("generator", Value::from(name)),
                    ("reason", Value::from(&*reason)),
                ]),
            );
            continue;
        }

        if !generator.has_data(ctx) {
            diagnostics.debug(
                "publish.generator.empty",
                &format!("Data source empty: {name}"),
                log_fields([("generator", Value::from(name))]),
            );
            continue;
        }

        match generator.generate(ctx) {
            Ok(generated) => {
                diagnostics.debug(
                    "publish.generator.collected",
                    &format!("Collected {} points from {name}", generated.len()),
                    log_fields([
                        ("generator", Value::from(name)),
                        ("points", Value::from(generated.len())),
                    ]),
                );
                points.extend(generated);
            },
            Err(error) => {
                diagnostics.failure(
                    LogLevel::Debug,
                    "publish.generator.failed",
                    &format!("Failed to collect data from {name}"),
                    &error,
                    log_fields([("generator", Value::from(name))]),
                );
            },
        }
    }
    points
}

#[cfg(test)]
mod tests {
    use super::*;
    use build_metrics_domain::{BuildRun, ProjectNameRenderer};
    use build_metrics_shared::Result;
    use build_metrics_testkit::errors::report_error;
    use build_metrics_testkit::in_memory::{
        FailingGenerator, MemoryEnvironment, StaticGenerator, UnavailableGenerator,
    };
    use std::sync::Arc;

    fn context() -> GeneratorContext {
        GeneratorContext::new(
            BuildRun::new("app", 1),
            ProjectNameRenderer::default(),
            0,
            Arc::new(MemoryEnvironment::default()),
        )
    }

    fn fixed(name: &str, measurements: &[&str]) -> Result<RegisteredGenerator> {
        let points = measurements
            .iter()
            .map(|measurement| Point::builder(*measurement).field("v", 1_i64).build())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(RegisteredGenerator::core(Arc::new(StaticGenerator::new(name, points))))
    }

    fn measurements(points: &[Point]) -> Vec<&str> {
        points.iter().map(Point::measurement).collect()
    }

    #[test]
    fn failure_is_isolated_and_order_preserved() -> Result<()> {
        let generators = [
            fixed("first", &["a1", "a2"])?,
            RegisteredGenerator::core(Arc::new(FailingGenerator::new("failing", report_error()))),
            fixed("empty", &[])?,
            fixed("last", &["b1"])?,
        ];

        let points = collect_points(&context(), &Diagnostics::silent(), &generators);
        assert_eq!(measurements(&points), ["a1", "a2", "b1"]);
        Ok(())
    }

    #[test]
    fn unavailable_optional_generators_are_skipped() -> Result<()> {
        let unavailable = Arc::new(UnavailableGenerator::default());
        let generators = [
            RegisteredGenerator::optional(unavailable.clone()),
            fixed("base", &["build_data"])?,
        ];

        let points = collect_points(&context(), &Diagnostics::silent(), &generators);
        assert_eq!(measurements(&points), ["build_data"]);
        assert_eq!(unavailable.generate_calls(), 0);
        Ok(())
    }

    #[test]
    fn core_generators_skip_the_availability_probe() {
        let unavailable = Arc::new(UnavailableGenerator::default());
        let generators = [RegisteredGenerator::core(unavailable.clone())];

        let points = collect_points(&context(), &Diagnostics::silent(), &generators);
        assert!(points.is_empty());
        assert_eq!(unavailable.generate_calls(), 1);
    }

    #[test]
    fn no_generators_yield_no_points() {
        assert!(collect_points(&context(), &Diagnostics::silent(), &[]).is_empty());
    }
}
