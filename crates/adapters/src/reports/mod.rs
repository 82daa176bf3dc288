//! Generators for external report formats.

pub mod changelog;
pub mod json_report;

pub use changelog::{CHANGELOG_MEASUREMENT, GitChangeLogGenerator};
pub use json_report::{DEFAULT_JSON_REPORT_MEASUREMENT, JsonReportGenerator};
