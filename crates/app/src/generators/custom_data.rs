//! A single user-defined series.

use build_metrics_domain::FieldValue;
use build_metrics_ports::{GeneratorContext, Point, PointGenerator};
use build_metrics_shared::Result;
use std::collections::BTreeMap;

/// Measurement used when no override is configured.
pub const DEFAULT_CUSTOM_MEASUREMENT: &str = "build_custom_data";

/// Emits one point from `customData`, tagged with `customDataTags`.
///
/// When sanitized tag keys collide, the last key in byte order wins
/// (`a_b` over `a-b`).
#[derive(Debug, Clone, Default)]
pub struct CustomDataGenerator {
    fields: BTreeMap<String, FieldValue>,
    tags: BTreeMap<String, String>,
}

impl CustomDataGenerator {
    /// Create the generator.
    #[must_use]
    pub const fn new(fields: BTreeMap<String, FieldValue>, tags: BTreeMap<String, String>) -> Self {
        Self { fields, tags }
    }

    fn measurement(ctx: &GeneratorContext) -> String {
        ctx.measurement_name().map_or_else(
            || DEFAULT_CUSTOM_MEASUREMENT.to_owned(),
            |name| format!("custom_{name}"),
        )
    }
}

impl PointGenerator for CustomDataGenerator {
    fn name(&self) -> &str {
        "custom_data"
    }

    fn has_data(&self, _ctx: &GeneratorContext) -> bool {
        !self.fields.is_empty()
    }

    fn generate(&self, ctx: &GeneratorContext) -> Result<Vec<Point>> {
        let point = ctx
            .identity_point(Self::measurement(ctx))
            .tags(
                self.tags
                    .iter()
                    .map(|(key, value)| (ctx.tag_key(key), value.as_str())),
            )
            .fields(self.fields.iter().map(|(key, value)| (key.as_str(), value.clone())))
            .build()?;
        Ok(vec![point])
    }
}
