//! The build run being reported on.

use build_metrics_shared::{ErrorCode, ErrorEnvelope};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Outcome of a build, ordered from best to worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildResult {
    /// Build succeeded.
    Success,
    /// Build finished but with test failures or quality gate warnings.
    Unstable,
    /// Build failed.
    Failure,
    /// Build did not run.
    NotBuilt,
    /// Build was aborted.
    Aborted,
}

impl BuildResult {
    /// Stable numeric ordinal (0 = success).
    #[must_use]
    pub const fn ordinal(self) -> i64 {
        match self {
            Self::Success => 0,
            Self::Unstable => 1,
            Self::Failure => 2,
            Self::NotBuilt => 3,
            Self::Aborted => 4,
        }
    }

    /// Upper-case label written as the `build_result` field.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::Unstable => "UNSTABLE",
            Self::Failure => "FAILURE",
            Self::NotBuilt => "NOT_BUILT",
            Self::Aborted => "ABORTED",
        }
    }

    /// Human-readable status summary.
    #[must_use]
    pub const fn status_message(self) -> &'static str {
        match self {
            Self::Success => "stable",
            Self::Unstable => "unstable",
            Self::Failure => "broken",
            Self::NotBuilt => "not built",
            Self::Aborted => "aborted",
        }
    }

    /// Returns true only for `Success`.
    #[must_use]
    pub const fn is_successful(self) -> bool {
        matches!(self, Self::Success)
    }
}

impl fmt::Display for BuildResult {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.label())
    }
}

/// Invalid build result label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseBuildResultError {
    input: String,
}

impl fmt::Display for ParseBuildResultError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            formatter,
            "unknown build result `{}` (expected success, unstable, failure, not_built, aborted)",
            self.input
        )
    }
}

impl std::error::Error for ParseBuildResultError {}

impl From<ParseBuildResultError> for ErrorEnvelope {
    fn from(error: ParseBuildResultError) -> Self {
        Self::expected(
            ErrorCode::new("domain", "invalid_build_result"),
            error.to_string(),
        )
        .with_metadata("input", error.input)
    }
}

impl FromStr for BuildResult {
    type Err = ParseBuildResultError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "success" => Ok(Self::Success),
            "unstable" => Ok(Self::Unstable),
            "failure" | "failed" => Ok(Self::Failure),
            "not_built" => Ok(Self::NotBuilt),
            "aborted" => Ok(Self::Aborted),
            _ => Err(ParseBuildResultError {
                input: input.to_owned(),
            }),
        }
    }
}

/// Immutable facts about the build being reported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildRun {
    /// Full project path (e.g. `folder/sub/job`).
    pub project_path: String,
    /// Build number.
    pub build_number: u32,
    /// Build outcome.
    pub result: BuildResult,
    /// Build duration in milliseconds.
    pub duration_ms: u64,
    /// When the build was scheduled, epoch milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_at_ms: Option<i64>,
    /// Name of the agent/runner that executed the build.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_name: Option<String>,
    /// Build parameters.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, String>,
}

impl BuildRun {
    /// Create a run with the required identity; the result defaults to success.
    pub fn new(project_path: impl Into<String>, build_number: u32) -> Self {
        Self {
            project_path: project_path.into(),
            build_number,
            result: BuildResult::Success,
            duration_ms: 0,
            scheduled_at_ms: None,
            agent_name: None,
            parameters: BTreeMap::new(),
        }
    }

    /// Set the build result.
    #[must_use]
    pub const fn with_result(mut self, result: BuildResult) -> Self {
        self.result = result;
        self
    }

    /// Set the build duration.
    #[must_use]
    pub const fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    /// Set the agent name.
    #[must_use]
    pub fn with_agent_name(mut self, agent_name: impl Into<String>) -> Self {
        self.agent_name = Some(agent_name.into());
        self
    }

    /// Set the scheduled time.
    #[must_use]
    pub const fn with_scheduled_at_ms(mut self, scheduled_at_ms: i64) -> Self {
        self.scheduled_at_ms = Some(scheduled_at_ms);
        self
    }

    /// Add a build parameter.
    #[must_use]
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }
}
