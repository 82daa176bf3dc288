//! Named user-defined series.

use build_metrics_domain::FieldValue;
use build_metrics_ports::{GeneratorContext, Point, PointGenerator};
use build_metrics_shared::Result;
use std::collections::BTreeMap;

/// Emits one point per entry of `customDataMap`.
///
/// Points carry only the matching `customDataMapTags` entry; the run identity
/// tags are not added. Sanitized tag keys that collide keep the value of the
/// last key in byte order.
#[derive(Debug, Clone, Default)]
pub struct CustomDataMapGenerator {
    series: BTreeMap<String, BTreeMap<String, FieldValue>>,
    tags: BTreeMap<String, BTreeMap<String, String>>,
}

impl CustomDataMapGenerator {
    /// Create the generator.
    #[must_use]
    pub const fn new(
        series: BTreeMap<String, BTreeMap<String, FieldValue>>,
        tags: BTreeMap<String, BTreeMap<String, String>>,
    ) -> Self {
        Self { series, tags }
    }
}

impl PointGenerator for CustomDataMapGenerator {
    fn name(&self) -> &str {
        "custom_data_map"
    }

    fn has_data(&self, _ctx: &GeneratorContext) -> bool {
        !self.series.is_empty()
    }

    fn generate(&self, ctx: &GeneratorContext) -> Result<Vec<Point>> {
        let mut points = Vec::with_capacity(self.series.len());
        for (name, fields) in &self.series {
            if fields.is_empty() {
                continue;
            }
            let mut builder = ctx
                .point(ctx.prefixed(name))
                .fields(fields.iter().map(|(key, value)| (key.as_str(), value.clone())));
            if let Some(tags) = self.tags.get(name) {
                builder = builder.tags(
                    tags.iter()
                        .map(|(key, value)| (ctx.tag_key(key), value.as_str())),
                );
            }
            points.push(builder.build()?);
        }
        Ok(points)
    }
}
