//! Report generator registry built from config.

use build_metrics_adapters::{GitChangeLogGenerator, JsonReportGenerator};
use build_metrics_config::ReportConfig;
use build_metrics_ports::RegisteredGenerator;
use std::path::Path;
use std::sync::Arc;

/// Report kinds this build can collect.
pub const REPORT_KINDS: &[&str] = &["json", "changelog"];

/// Build optional generators for each configured report, in config order.
///
/// Relative report paths resolve against `base_dir`.
#[must_use]
pub fn build_report_generators(
    reports: &[ReportConfig],
    base_dir: &Path,
) -> Vec<RegisteredGenerator> {
    reports
        .iter()
        .map(|report| match report {
            ReportConfig::Json(json) => {
                RegisteredGenerator::optional(Arc::new(JsonReportGenerator::new(
                    base_dir.join(json.path.as_ref()),
                    json.measurement.as_deref(),
                )))
            },
            ReportConfig::Changelog(changelog) => {
                RegisteredGenerator::optional(Arc::new(GitChangeLogGenerator::new(
                    base_dir.join(changelog.repository.as_ref()),
                    changelog.range.as_ref(),
                )))
            },
        })
        .collect()
}
