//! Publisher configuration schema, defaults, validation, and normalization.
//!
//! - Deserialization uses `serde` (JSON or TOML).
//! - Validation is manual and returns typed errors mapped to `ErrorEnvelope`.
//! - Normalization trims strings and drops blank optional values.

use build_metrics_domain::{EnvParameterSpec, FieldValue, Precision};
use build_metrics_shared::{ErrorCode, ErrorEnvelope, SecretString};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use url::Url;

/// Sanitizes a URL for error messages by stripping credentials.
pub(crate) fn sanitize_url_for_error(url: &str) -> String {
    match Url::parse(url) {
        Ok(mut parsed) => {
            if parsed.password().is_some() || !parsed.username().is_empty() {
                if parsed.set_username("").is_err() {
                    return "[invalid url: invalid username]".to_string();
                }
                if parsed.set_password(None).is_err() {
                    return "[invalid url: invalid password]".to_string();
                }
            }
            parsed.to_string()
        },
        Err(error) => format!("[invalid url: {error}]"),
    }
}

/// Current supported configuration schema version.
pub const CURRENT_CONFIG_VERSION: u32 = 1;

/// Retention policy used when a target does not name one.
pub const DEFAULT_RETENTION_POLICY: &str = "autogen";

const MAX_TARGETS: usize = 64;
const MAX_REPORTS: usize = 64;

/// Top-level publisher configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct PublisherConfig {
    /// Schema version for forward-compatible migrations.
    pub version: u32,
    /// Invocation options shared by every target.
    pub publisher: PublisherOptions,
    /// Targets written to, in order.
    pub targets: Vec<TargetConfig>,
    /// External report sources, in collection order.
    pub reports: Vec<ReportConfig>,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            version: CURRENT_CONFIG_VERSION,
            publisher: PublisherOptions::default(),
            targets: Vec::new(),
            reports: Vec::new(),
        }
    }
}

impl PublisherConfig {
    /// Validate and normalize the config.
    pub fn validate_and_normalize(mut self) -> Result<ValidatedPublisherConfig, ConfigSchemaError> {
        self.validate_version()?;
        ensure_list_len("targets", self.targets.len(), MAX_TARGETS)?;
        ensure_list_len("reports", self.reports.len(), MAX_REPORTS)?;

        self.publisher.normalize();
        self.publisher.validate()?;
        for (index, target) in self.targets.iter_mut().enumerate() {
            target.normalize();
            target.validate(index)?;
        }
        for (index, report) in self.reports.iter_mut().enumerate() {
            report.normalize();
            report.validate(index)?;
        }

        let env_fields = parse_env_spec(
            "envParameterField",
            self.publisher.env_parameter_field.as_deref(),
        )?;
        let env_tags = parse_env_spec(
            "envParameterTag",
            self.publisher.env_parameter_tag.as_deref(),
        )?;

        Ok(ValidatedPublisherConfig {
            raw: self,
            env_fields,
            env_tags,
        })
    }

    const fn validate_version(&self) -> Result<(), ConfigSchemaError> {
        if self.version != CURRENT_CONFIG_VERSION {
            return Err(ConfigSchemaError::UnsupportedVersion {
                found: self.version,
                supported: CURRENT_CONFIG_VERSION,
            });
        }
        Ok(())
    }
}

/// Validated config wrapper carrying the parsed env-parameter specs.
#[derive(Debug, Clone)]
pub struct ValidatedPublisherConfig {
    raw: PublisherConfig,
    env_fields: EnvParameterSpec,
    env_tags: EnvParameterSpec,
}

impl ValidatedPublisherConfig {
    /// Parsed `envParameterField` spec.
    #[must_use]
    pub const fn env_fields(&self) -> &EnvParameterSpec {
        &self.env_fields
    }

    /// Parsed `envParameterTag` spec.
    #[must_use]
    pub const fn env_tags(&self) -> &EnvParameterSpec {
        &self.env_tags
    }

    /// Consume the wrapper and return the raw config.
    #[must_use]
    pub fn into_inner(self) -> PublisherConfig {
        self.raw
    }
}

impl AsRef<PublisherConfig> for ValidatedPublisherConfig {
    fn as_ref(&self) -> &PublisherConfig {
        &self.raw
    }
}

impl std::ops::Deref for ValidatedPublisherConfig {
    type Target = PublisherConfig;

    fn deref(&self) -> &Self::Target {
        &self.raw
    }
}

/// Parse a publisher config from a JSON string, applying validation and normalization.
pub fn parse_publisher_config_json(input: &str) -> Result<ValidatedPublisherConfig, ErrorEnvelope> {
    let config: PublisherConfig = serde_json::from_str(input).map_err(|error| {
        ErrorEnvelope::expected(
            ErrorCode::new("config", "invalid_json"),
            format!("invalid config JSON: {error}"),
        )
    })?;

    config.validate_and_normalize().map_err(Into::into)
}

/// Parse a publisher config from a TOML string, applying validation and normalization.
pub fn parse_publisher_config_toml(input: &str) -> Result<ValidatedPublisherConfig, ErrorEnvelope> {
    let config: PublisherConfig = toml::from_str(input).map_err(|error| {
        ErrorEnvelope::expected(
            ErrorCode::new("config", "invalid_toml"),
            format!("invalid config TOML: {error}"),
        )
    })?;

    config.validate_and_normalize().map_err(Into::into)
}

/// Invocation options: naming, custom data, env parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct PublisherOptions {
    /// Replaces the project name derived from the build.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_project_name: Option<Box<str>>,
    /// Prefix joined to project and series names with `_`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_prefix: Option<Box<str>>,
    /// Overrides the base measurement name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub measurement_name: Option<Box<str>>,
    /// Replace `-` with `_` in tag keys.
    pub replace_dash_with_underscore: bool,
    /// Timestamp precision of written points.
    pub precision: Precision,
    /// Properties-style env-derived fields.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub env_parameter_field: Option<Box<str>>,
    /// Properties-style env-derived tags.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub env_parameter_tag: Option<Box<str>>,
    /// Single custom series fields.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub custom_data: BTreeMap<String, FieldValue>,
    /// Tags for the single custom series.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub custom_data_tags: BTreeMap<String, String>,
    /// Named custom series: series name to fields.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub custom_data_map: BTreeMap<String, BTreeMap<String, FieldValue>>,
    /// Named custom series tags: series name to tags.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub custom_data_map_tags: BTreeMap<String, BTreeMap<String, String>>,
}

impl PublisherOptions {
    fn normalize(&mut self) {
        normalize_optional(&mut self.custom_project_name);
        normalize_optional(&mut self.custom_prefix);
        normalize_optional(&mut self.measurement_name);
        normalize_optional(&mut self.env_parameter_field);
        normalize_optional(&mut self.env_parameter_tag);
    }

    fn validate(&self) -> Result<(), ConfigSchemaError> {
        if let Some((series, _)) = self
            .custom_data_map
            .iter()
            .find(|(series, fields)| series.trim().is_empty() || fields.is_empty())
        {
            return Err(ConfigSchemaError::InvalidCustomSeries {
                series: series.clone(),
            });
        }
        if self.custom_data.keys().any(|key| key.is_empty()) {
            return Err(ConfigSchemaError::EmptyValue {
                section: "publisher",
                field: "customData",
            });
        }
        Ok(())
    }
}

/// One time-series target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct TargetConfig {
    /// Label used in logs; defaults to the URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<Box<str>>,
    /// Base URL (`http` or `https`).
    pub url: Box<str>,
    /// Username; when absent the target is written anonymously.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<Box<str>>,
    /// Password (serialized redacted).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<SecretString>,
    /// Database name.
    pub database: Box<str>,
    /// Retention policy name.
    pub retention_policy: Box<str>,
    /// Surface write failures as a failed publish instead of logging them.
    pub expose_exceptions: bool,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            description: None,
            url: Box::default(),
            username: None,
            password: None,
            database: Box::default(),
            retention_policy: DEFAULT_RETENTION_POLICY.into(),
            expose_exceptions: false,
        }
    }
}

impl TargetConfig {
    /// Label used in log lines.
    #[must_use]
    pub fn label(&self) -> &str {
        self.description.as_deref().unwrap_or(&self.url)
    }

    fn normalize(&mut self) {
        normalize_optional(&mut self.description);
        normalize_optional(&mut self.username);
        self.url = self.url.trim().trim_end_matches('/').into();
        self.database = self.database.trim().into();
        self.retention_policy = self.retention_policy.trim().into();
    }

    fn validate(&self, index: usize) -> Result<(), ConfigSchemaError> {
        let parsed = Url::parse(&self.url).map_err(|_| ConfigSchemaError::InvalidUrl {
            index,
            url: self.url.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigSchemaError::InvalidUrl {
                index,
                url: self.url.to_string(),
            });
        }
        if self.database.is_empty() {
            return Err(ConfigSchemaError::EmptyValue {
                section: "targets",
                field: "database",
            });
        }
        if self.retention_policy.is_empty() {
            return Err(ConfigSchemaError::EmptyValue {
                section: "targets",
                field: "retentionPolicy",
            });
        }
        if self.password.is_some() && self.username.is_none() {
            return Err(ConfigSchemaError::PasswordWithoutUsername { index });
        }
        Ok(())
    }
}

impl fmt::Display for TargetConfig {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            formatter,
            "{} [url={}, database={}, retentionPolicy={}, username={}, exposeExceptions={}]",
            self.label(),
            sanitize_url_for_error(&self.url),
            self.database,
            self.retention_policy,
            self.username.as_deref().unwrap_or("-"),
            self.expose_exceptions
        )
    }
}

/// External report source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ReportConfig {
    /// JSON metrics artifact.
    Json(JsonReportConfig),
    /// Git commit log over a revision range.
    Changelog(ChangelogReportConfig),
}

impl ReportConfig {
    /// Stable kind label.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Json(_) => "json",
            Self::Changelog(_) => "changelog",
        }
    }

    fn normalize(&mut self) {
        match self {
            Self::Json(report) => {
                report.path = report.path.trim().into();
                normalize_optional(&mut report.measurement);
            },
            Self::Changelog(report) => {
                report.repository = report.repository.trim().into();
                report.range = report.range.trim().into();
            },
        }
    }

    fn validate(&self, index: usize) -> Result<(), ConfigSchemaError> {
        let (field, value) = match self {
            Self::Json(report) => ("path", &report.path),
            Self::Changelog(report) if report.repository.is_empty() => {
                ("repository", &report.repository)
            },
            Self::Changelog(report) => ("range", &report.range),
        };
        if value.is_empty() {
            return Err(ConfigSchemaError::InvalidReport { index, field });
        }
        Ok(())
    }
}

/// JSON metrics artifact settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct JsonReportConfig {
    /// Artifact path.
    pub path: Box<str>,
    /// Measurement name; defaults to `json_report_data`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub measurement: Option<Box<str>>,
}

/// Git change log settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct ChangelogReportConfig {
    /// Repository work tree.
    pub repository: Box<str>,
    /// Revision range passed to `git log`.
    pub range: Box<str>,
}

impl Default for ChangelogReportConfig {
    fn default() -> Self {
        Self {
            repository: ".".into(),
            range: "HEAD~1..HEAD".into(),
        }
    }
}

/// Schema validation failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSchemaError {
    /// The config version is not supported by this binary.
    UnsupportedVersion {
        /// Version found in the config.
        found: u32,
        /// Version supported by this crate.
        supported: u32,
    },
    /// A list field exceeds the maximum allowed size.
    ListTooLarge {
        /// Field name in the config file.
        field: &'static str,
        /// Number of entries.
        len: usize,
        /// Maximum allowed number of entries.
        max: usize,
    },
    /// A target URL is invalid or not http(s).
    InvalidUrl {
        /// Target index.
        index: usize,
        /// Invalid URL value.
        url: String,
    },
    /// A required value is empty after trimming.
    EmptyValue {
        /// Schema section.
        section: &'static str,
        /// Field name in the config file.
        field: &'static str,
    },
    /// A password was configured without a username.
    PasswordWithoutUsername {
        /// Target index.
        index: usize,
    },
    /// A report entry is missing a required value.
    InvalidReport {
        /// Report index.
        index: usize,
        /// Field name in the config file.
        field: &'static str,
    },
    /// A custom data map series has a blank name or no fields.
    InvalidCustomSeries {
        /// Series name.
        series: String,
    },
    /// An env-parameter spec does not parse.
    InvalidEnvParameter {
        /// Field name in the config file.
        field: &'static str,
        /// Human readable reason.
        reason: String,
    },
}

impl ConfigSchemaError {
    fn error_code(&self) -> ErrorCode {
        match self {
            Self::UnsupportedVersion { .. } => ErrorCode::new("config", "unsupported_version"),
            Self::ListTooLarge { .. } => ErrorCode::new("config", "list_too_large"),
            Self::InvalidUrl { .. } => ErrorCode::new("config", "invalid_url"),
            Self::EmptyValue { .. } => ErrorCode::new("config", "empty_value"),
            Self::PasswordWithoutUsername { .. } => {
                ErrorCode::new("config", "password_without_username")
            },
            Self::InvalidReport { .. } => ErrorCode::new("config", "invalid_report"),
            Self::InvalidCustomSeries { .. } => ErrorCode::new("config", "invalid_custom_series"),
            Self::InvalidEnvParameter { .. } => ErrorCode::new("config", "invalid_env_parameter"),
        }
    }
}

impl fmt::Display for ConfigSchemaError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedVersion { found, supported } => write!(
                formatter,
                "unsupported config version {found} (supported: {supported})"
            ),
            Self::ListTooLarge { field, len, max } => {
                write!(formatter, "{field} has too many entries ({len}, max {max})")
            },
            Self::InvalidUrl { index, .. } => {
                write!(formatter, "targets[{index}].url must be an http(s) URL")
            },
            Self::EmptyValue { section, field } => {
                write!(formatter, "{section}.{field} must be non-empty")
            },
            Self::PasswordWithoutUsername { index } => write!(
                formatter,
                "targets[{index}] sets a password without a username"
            ),
            Self::InvalidReport { index, field } => {
                write!(formatter, "reports[{index}].{field} must be non-empty")
            },
            Self::InvalidCustomSeries { series } => write!(
                formatter,
                "customDataMap series `{series}` must have a name and at least one field"
            ),
            Self::InvalidEnvParameter { field, reason } => {
                write!(formatter, "publisher.{field} is invalid: {reason}")
            },
        }
    }
}

impl std::error::Error for ConfigSchemaError {}

impl From<ConfigSchemaError> for ErrorEnvelope {
    fn from(error: ConfigSchemaError) -> Self {
        let mut envelope = Self::expected(error.error_code(), error.to_string());

        match error {
            ConfigSchemaError::UnsupportedVersion { found, supported } => {
                envelope = envelope
                    .with_metadata("found", found.to_string())
                    .with_metadata("supported", supported.to_string());
            },
            ConfigSchemaError::ListTooLarge { field, len, max } => {
                envelope = envelope
                    .with_metadata("field", field)
                    .with_metadata("len", len.to_string())
                    .with_metadata("max", max.to_string());
            },
            ConfigSchemaError::InvalidUrl { index, url } => {
                envelope = envelope
                    .with_metadata("index", index.to_string())
                    .with_metadata("url", sanitize_url_for_error(&url));
            },
            ConfigSchemaError::EmptyValue { section, field } => {
                envelope = envelope
                    .with_metadata("section", section)
                    .with_metadata("field", field);
            },
            ConfigSchemaError::PasswordWithoutUsername { index } => {
                envelope = envelope.with_metadata("index", index.to_string());
            },
            ConfigSchemaError::InvalidReport { index, field } => {
                envelope = envelope
                    .with_metadata("index", index.to_string())
                    .with_metadata("field", field);
            },
            ConfigSchemaError::InvalidCustomSeries { series } => {
                envelope = envelope.with_metadata("series", series);
            },
            ConfigSchemaError::InvalidEnvParameter { field, .. } => {
                envelope = envelope.with_metadata("field", field);
            },
        }

        envelope
    }
}

const fn ensure_list_len(
    field: &'static str,
    len: usize,
    max: usize,
) -> Result<(), ConfigSchemaError> {
    if len > max {
        return Err(ConfigSchemaError::ListTooLarge { field, len, max });
    }
    Ok(())
}

fn parse_env_spec(
    field: &'static str,
    text: Option<&str>,
) -> Result<EnvParameterSpec, ConfigSchemaError> {
    text.map_or_else(
        || Ok(EnvParameterSpec::default()),
        |text| {
            EnvParameterSpec::parse(text).map_err(|error| ConfigSchemaError::InvalidEnvParameter {
                field,
                reason: error.to_string(),
            })
        },
    )
}

fn normalize_optional(value: &mut Option<Box<str>>) {
    *value = value
        .take()
        .map(|inner| inner.trim().to_owned())
        .filter(|inner| !inner.is_empty())
        .map(String::into_boxed_str);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    fn target(url: &str) -> TargetConfig {
        TargetConfig {
            url: url.into(),
            database: "builds".into(),
            ..TargetConfig::default()
        }
    }

    #[test]
    fn default_config_is_valid_and_empty() -> Result<(), Box<dyn Error>> {
        let config = PublisherConfig::default().validate_and_normalize()?;
        assert!(config.targets.is_empty());
        assert_eq!(config.publisher.precision, Precision::Milliseconds);
        assert!(config.env_fields().is_empty());
        Ok(())
    }

    #[test]
    fn target_defaults_and_normalization() -> Result<(), Box<dyn Error>> {
        let mut raw = target(" http://influx:8086/ ");
        raw.description = Some("  ".into());
        let config = PublisherConfig {
            targets: vec![raw],
            ..PublisherConfig::default()
        }
        .validate_and_normalize()?;

        let target = config.targets.first().ok_or("missing target")?;
        assert_eq!(&*target.url, "http://influx:8086");
        assert_eq!(&*target.retention_policy, DEFAULT_RETENTION_POLICY);
        assert_eq!(target.description, None);
        assert_eq!(target.label(), "http://influx:8086");
        assert!(!target.expose_exceptions);
        Ok(())
    }

    #[test]
    fn rejects_non_http_url_without_leaking_credentials() {
        let config = PublisherConfig {
            targets: vec![target("ftp://user:pw@influx:21")],
            ..PublisherConfig::default()
        };
        let error = config.validate_and_normalize().err();
        assert!(matches!(
            error,
            Some(ConfigSchemaError::InvalidUrl { index: 0, .. })
        ));

        let envelope = error.map(ErrorEnvelope::from);
        let url = envelope
            .as_ref()
            .and_then(|envelope| envelope.metadata.get("url"))
            .cloned()
            .unwrap_or_default();
        assert!(!url.contains("pw"));
    }

    #[test]
    fn rejects_password_without_username() {
        let mut raw = target("http://influx:8086");
        raw.password = Some(SecretString::new("pw"));
        let config = PublisherConfig {
            targets: vec![raw],
            ..PublisherConfig::default()
        };
        assert_eq!(
            config.validate_and_normalize().err(),
            Some(ConfigSchemaError::PasswordWithoutUsername { index: 0 })
        );
    }

    #[test]
    fn rejects_empty_database() {
        let mut raw = target("http://influx:8086");
        raw.database = "  ".into();
        let config = PublisherConfig {
            targets: vec![raw],
            ..PublisherConfig::default()
        };
        assert!(matches!(
            config.validate_and_normalize().err(),
            Some(ConfigSchemaError::EmptyValue {
                field: "database",
                ..
            })
        ));
    }

    #[test]
    fn rejects_custom_series_without_fields() {
        let mut config = PublisherConfig::default();
        config
            .publisher
            .custom_data_map
            .insert("series1".into(), BTreeMap::new());
        assert!(matches!(
            config.validate_and_normalize().err(),
            Some(ConfigSchemaError::InvalidCustomSeries { .. })
        ));
    }

    #[test]
    fn parses_env_parameter_specs() -> Result<(), Box<dyn Error>> {
        let mut config = PublisherConfig::default();
        config.publisher.env_parameter_field = Some("commit=$GIT_COMMIT".into());
        config.publisher.env_parameter_tag = Some("broken line".into());

        let error = config.clone().validate_and_normalize().err();
        assert!(matches!(
            error,
            Some(ConfigSchemaError::InvalidEnvParameter {
                field: "envParameterTag",
                ..
            })
        ));

        config.publisher.env_parameter_tag = None;
        let validated = config.validate_and_normalize()?;
        assert_eq!(validated.env_fields().entries().len(), 1);
        Ok(())
    }

    #[test]
    fn rejects_unknown_fields_and_versions() {
        assert!(parse_publisher_config_json(r#"{"version": 1, "surprise": true}"#).is_err());
        let error = parse_publisher_config_json(r#"{"version": 2}"#).err();
        assert_eq!(
            error.map(|error| error.code),
            Some(ErrorCode::new("config", "unsupported_version"))
        );
    }

    #[test]
    fn target_display_redacts_password() {
        let mut raw = target("http://influx:8086");
        raw.username = Some("ci".into());
        raw.password = Some(SecretString::new("hunter2"));
        let rendered = raw.to_string();
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("username=ci"));
    }

    #[test]
    fn report_kinds_deserialize_from_tag() -> Result<(), Box<dyn Error>> {
        let config = parse_publisher_config_json(
            r#"{
                "reports": [
                    {"kind": "json", "path": "metrics.json", "measurement": "bench"},
                    {"kind": "changelog", "range": "main..HEAD"}
                ]
            }"#,
        )?;
        let kinds: Vec<&str> = config.reports.iter().map(ReportConfig::kind).collect();
        assert_eq!(kinds, ["json", "changelog"]);
        let Some(ReportConfig::Changelog(changelog)) = config.reports.get(1) else {
            return Err("expected a changelog report".into());
        };
        assert_eq!(&*changelog.repository, ".");
        Ok(())
    }
}
