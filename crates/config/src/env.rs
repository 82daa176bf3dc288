//! Environment variable parsing and env-to-config merging.
//!
//! Env parsing is strict (invalid values fail fast) and safe (secret values
//! are redacted in error metadata).

use crate::schema::{PublisherConfig, ValidatedPublisherConfig};
use build_metrics_domain::Precision;
use build_metrics_shared::{ErrorCode, ErrorEnvelope, REDACTED_VALUE, SecretString, is_secret_key};
use std::collections::BTreeMap;
use std::fmt;

/// Env var: custom project name.
pub const ENV_CUSTOM_PROJECT_NAME: &str = "BMP_CUSTOM_PROJECT_NAME";
/// Env var: custom prefix.
pub const ENV_CUSTOM_PREFIX: &str = "BMP_CUSTOM_PREFIX";
/// Env var: base measurement name.
pub const ENV_MEASUREMENT_NAME: &str = "BMP_MEASUREMENT_NAME";
/// Env var: dash-to-underscore replacement in tag keys.
pub const ENV_REPLACE_DASH_WITH_UNDERSCORE: &str = "BMP_REPLACE_DASH_WITH_UNDERSCORE";
/// Env var: timestamp precision.
pub const ENV_PRECISION: &str = "BMP_PRECISION";
/// Env var: password for targets that have a username but no password (secret).
// gitleaks:allow
pub const ENV_TARGET_PASSWORD: &str = "BMP_TARGET_PASSWORD";

const ALL_VARS: [&str; 6] = [
    ENV_CUSTOM_PROJECT_NAME,
    ENV_CUSTOM_PREFIX,
    ENV_MEASUREMENT_NAME,
    ENV_REPLACE_DASH_WITH_UNDERSCORE,
    ENV_PRECISION,
    ENV_TARGET_PASSWORD,
];

/// Typed env-derived overrides for `PublisherConfig`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublisherEnv {
    /// Override for `publisher.customProjectName`.
    pub custom_project_name: Option<Box<str>>,
    /// Override for `publisher.customPrefix`.
    pub custom_prefix: Option<Box<str>>,
    /// Override for `publisher.measurementName`.
    pub measurement_name: Option<Box<str>>,
    /// Override for `publisher.replaceDashWithUnderscore`.
    pub replace_dash_with_underscore: Option<bool>,
    /// Override for `publisher.precision`.
    pub precision: Option<Precision>,
    /// Secret: fallback password for targets with a username and no password.
    pub target_password: Option<SecretString>,
}

impl PublisherEnv {
    /// Parse overrides from a key/value map.
    pub fn from_map(map: &BTreeMap<String, String>) -> Result<Self, EnvParseError> {
        Ok(Self {
            custom_project_name: parse_optional_trimmed_string(map, ENV_CUSTOM_PROJECT_NAME)?,
            custom_prefix: parse_optional_trimmed_string(map, ENV_CUSTOM_PREFIX)?,
            measurement_name: parse_optional_trimmed_string(map, ENV_MEASUREMENT_NAME)?,
            replace_dash_with_underscore: parse_optional_bool(
                map,
                ENV_REPLACE_DASH_WITH_UNDERSCORE,
            )?,
            precision: parse_optional_precision(map, ENV_PRECISION)?,
            target_password: parse_optional_secret(map, ENV_TARGET_PASSWORD)?,
        })
    }

    /// Parse overrides from the process environment.
    pub fn from_std_env() -> Result<Self, EnvParseError> {
        let mut map = BTreeMap::new();
        for name in ALL_VARS {
            if let Ok(value) = std::env::var(name) {
                map.insert(name.to_string(), value);
            }
        }
        Self::from_map(&map)
    }
}

/// Apply env overrides to a base config (env wins over file/default values).
pub fn apply_env_overrides(
    base: PublisherConfig,
    env: &PublisherEnv,
) -> Result<ValidatedPublisherConfig, ErrorEnvelope> {
    let mut config = base;
    let options = &mut config.publisher;

    if let Some(value) = &env.custom_project_name {
        options.custom_project_name = Some(value.clone());
    }
    if let Some(value) = &env.custom_prefix {
        options.custom_prefix = Some(value.clone());
    }
    if let Some(value) = &env.measurement_name {
        options.measurement_name = Some(value.clone());
    }
    if let Some(value) = env.replace_dash_with_underscore {
        options.replace_dash_with_underscore = value;
    }
    if let Some(value) = env.precision {
        options.precision = value;
    }
    if let Some(password) = &env.target_password {
        for target in &mut config.targets {
            if target.username.is_some() && target.password.is_none() {
                target.password = Some(password.clone());
            }
        }
    }

    config.validate_and_normalize().map_err(Into::into)
}

/// Env parsing failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvParseError {
    /// An env var was present but empty after trimming.
    EmptyValue {
        /// Env var name.
        var: &'static str,
    },
    /// Boolean env var had an invalid value.
    InvalidBool {
        /// Env var name.
        var: &'static str,
        /// Raw input value.
        value: String,
    },
    /// Enum env var had an invalid value.
    InvalidEnum {
        /// Env var name.
        var: &'static str,
        /// Raw input value.
        value: String,
    },
}

impl EnvParseError {
    fn error_code(&self) -> ErrorCode {
        ErrorCode::new("config", "invalid_env")
    }

    const fn reason(&self) -> &'static str {
        match self {
            Self::EmptyValue { .. } => "empty",
            Self::InvalidBool { .. } => "invalid_bool",
            Self::InvalidEnum { .. } => "invalid_enum",
        }
    }
}

impl fmt::Display for EnvParseError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyValue { var } => write!(formatter, "{var} must be non-empty"),
            Self::InvalidBool { var, .. } => write!(formatter, "{var} must be a boolean"),
            Self::InvalidEnum { var, .. } => write!(formatter, "{var} has an unsupported value"),
        }
    }
}

impl std::error::Error for EnvParseError {}

impl From<EnvParseError> for ErrorEnvelope {
    fn from(error: EnvParseError) -> Self {
        let envelope = Self::expected(error.error_code(), error.to_string())
            .with_metadata("reason", error.reason());
        match error {
            EnvParseError::EmptyValue { var } => envelope.with_metadata("env_var", var),
            EnvParseError::InvalidBool { var, value }
            | EnvParseError::InvalidEnum { var, value } => envelope
                .with_metadata("env_var", var)
                .with_metadata("value", redact_value(var, &value)),
        }
    }
}

fn parse_optional_trimmed_string(
    map: &BTreeMap<String, String>,
    var: &'static str,
) -> Result<Option<Box<str>>, EnvParseError> {
    let Some(raw) = map.get(var) else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(EnvParseError::EmptyValue { var });
    }
    Ok(Some(trimmed.into()))
}

fn parse_optional_secret(
    map: &BTreeMap<String, String>,
    var: &'static str,
) -> Result<Option<SecretString>, EnvParseError> {
    Ok(parse_optional_trimmed_string(map, var)?.map(SecretString::new))
}

fn parse_optional_bool(
    map: &BTreeMap<String, String>,
    var: &'static str,
) -> Result<Option<bool>, EnvParseError> {
    let Some(trimmed) = parse_optional_trimmed_string(map, var)? else {
        return Ok(None);
    };
    match trimmed.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(Some(true)),
        "false" | "0" | "no" | "off" => Ok(Some(false)),
        _ => Err(EnvParseError::InvalidBool {
            var,
            value: trimmed.into_string(),
        }),
    }
}

fn parse_optional_precision(
    map: &BTreeMap<String, String>,
    var: &'static str,
) -> Result<Option<Precision>, EnvParseError> {
    let Some(trimmed) = parse_optional_trimmed_string(map, var)? else {
        return Ok(None);
    };
    trimmed
        .parse::<Precision>()
        .map(Some)
        .map_err(|_| EnvParseError::InvalidEnum {
            var,
            value: trimmed.into_string(),
        })
}

fn redact_value(var: &str, value: &str) -> String {
    if is_secret_key(var) {
        REDACTED_VALUE.to_string()
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::TargetConfig;
    use std::error::Error;

    fn env_map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect()
    }

    #[test]
    fn parses_known_vars() -> Result<(), Box<dyn Error>> {
        let env = PublisherEnv::from_map(&env_map(&[
            (ENV_CUSTOM_PREFIX, " nightly "),
            (ENV_REPLACE_DASH_WITH_UNDERSCORE, "yes"),
            (ENV_PRECISION, "s"),
        ]))?;

        assert_eq!(env.custom_prefix.as_deref(), Some("nightly"));
        assert_eq!(env.replace_dash_with_underscore, Some(true));
        assert_eq!(env.precision, Some(Precision::Seconds));
        assert_eq!(env.target_password, None);
        Ok(())
    }

    #[test]
    fn rejects_invalid_values() {
        let error = PublisherEnv::from_map(&env_map(&[(ENV_REPLACE_DASH_WITH_UNDERSCORE, "maybe")]))
            .err();
        assert!(matches!(error, Some(EnvParseError::InvalidBool { .. })));

        let error = PublisherEnv::from_map(&env_map(&[(ENV_CUSTOM_PREFIX, "   ")])).err();
        assert_eq!(
            error,
            Some(EnvParseError::EmptyValue {
                var: ENV_CUSTOM_PREFIX
            })
        );
    }

    #[test]
    fn secret_values_are_redacted_in_envelopes() {
        let envelope = ErrorEnvelope::from(EnvParseError::InvalidEnum {
            var: ENV_TARGET_PASSWORD,
            value: "hunter2".into(),
        });
        assert_eq!(envelope.code, ErrorCode::new("config", "invalid_env"));
        assert_eq!(
            envelope.metadata.get("value").map(String::as_str),
            Some(REDACTED_VALUE)
        );
    }

    #[test]
    fn env_overrides_win_and_fill_missing_passwords() -> Result<(), Box<dyn Error>> {
        let mut base = PublisherConfig::default();
        base.publisher.custom_prefix = Some("file".into());
        base.targets = vec![
            TargetConfig {
                url: "http://a:8086".into(),
                database: "db".into(),
                username: Some("ci".into()),
                ..TargetConfig::default()
            },
            TargetConfig {
                url: "http://b:8086".into(),
                database: "db".into(),
                ..TargetConfig::default()
            },
        ];
        let env = PublisherEnv {
            custom_prefix: Some("env".into()),
            target_password: Some(SecretString::new("pw")),
            ..PublisherEnv::default()
        };

        let config = apply_env_overrides(base, &env)?;
        assert_eq!(config.publisher.custom_prefix.as_deref(), Some("env"));
        let passwords: Vec<Option<&str>> = config
            .targets
            .iter()
            .map(|target| target.password.as_ref().map(SecretString::expose))
            .collect();
        assert_eq!(passwords, [Some("pw"), None]);
        Ok(())
    }
}
