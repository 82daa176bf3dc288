//! Config loading helpers (file + env).
//!
//! The loader owns the merge order and surfaces user-facing failures as typed
//! `ErrorEnvelope`s.

use crate::{PublisherConfig, PublisherEnv, ValidatedPublisherConfig, apply_env_overrides};
use build_metrics_shared::{ErrorClass, ErrorCode, ErrorEnvelope};
use std::path::Path;

/// Serialization format of a config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// `.json` (also used when the path has no extension).
    Json,
    /// `.toml`.
    Toml,
}

/// Load the publisher config from an optional file path.
///
/// Precedence (highest wins):
/// - env overrides (`PublisherEnv`)
/// - config file
/// - defaults (`PublisherConfig::default()`)
pub fn load_publisher_config_from_path(
    config_path: Option<&Path>,
    env: &PublisherEnv,
) -> Result<ValidatedPublisherConfig, ErrorEnvelope> {
    let config = match config_path {
        None => PublisherConfig::default(),
        Some(path) => {
            let format = detect_config_format(path)?;
            let text = read_config_file(path)?;
            parse_config_unvalidated(&text, format)?
        },
    };

    // env is applied last and also validates the merged config.
    apply_env_overrides(config, env)
}

/// Load the publisher config from std env and an optional file path.
pub fn load_publisher_config_std_env(
    config_path: Option<&Path>,
) -> Result<ValidatedPublisherConfig, ErrorEnvelope> {
    let env = PublisherEnv::from_std_env().map_err(ErrorEnvelope::from)?;
    load_publisher_config_from_path(config_path, &env)
}

/// Serialize the config as deterministic pretty JSON (with trailing newline).
///
/// Passwords serialize as the redaction placeholder.
pub fn to_pretty_json(config: &PublisherConfig) -> Result<String, ErrorEnvelope> {
    let mut output = serde_json::to_string_pretty(config).map_err(|error| {
        ErrorEnvelope::unexpected(
            ErrorCode::new("config", "serialize_json"),
            format!("failed to serialize config: {error}"),
            ErrorClass::NonRetriable,
        )
    })?;
    output.push('\n');
    Ok(output)
}

/// Serialize the config as deterministic pretty TOML (with trailing newline).
pub fn to_pretty_toml(config: &PublisherConfig) -> Result<String, ErrorEnvelope> {
    let mut output = toml::to_string_pretty(config).map_err(|error| {
        ErrorEnvelope::unexpected(
            ErrorCode::new("config", "serialize_toml"),
            format!("failed to serialize config TOML: {error}"),
            ErrorClass::NonRetriable,
        )
    })?;
    output.push('\n');
    Ok(output)
}

/// Pick the format from the file extension.
pub fn detect_config_format(path: &Path) -> Result<ConfigFormat, ErrorEnvelope> {
    let ext = path
        .extension()
        .and_then(|value| value.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        None | Some("json") => Ok(ConfigFormat::Json),
        Some("toml") => Ok(ConfigFormat::Toml),
        Some(other) => Err(ErrorEnvelope::expected(
            ErrorCode::new("config", "unsupported_format"),
            "unsupported config format; use .json or .toml",
        )
        .with_metadata("extension", other.to_string())),
    }
}

fn parse_config_unvalidated(
    input: &str,
    format: ConfigFormat,
) -> Result<PublisherConfig, ErrorEnvelope> {
    match format {
        ConfigFormat::Json => serde_json::from_str(input).map_err(|error| {
            ErrorEnvelope::expected(
                ErrorCode::new("config", "invalid_json"),
                format!("invalid config JSON: {error}"),
            )
        }),
        ConfigFormat::Toml => toml::from_str(input).map_err(|error| {
            ErrorEnvelope::expected(
                ErrorCode::new("config", "invalid_toml"),
                format!("invalid config TOML: {error}"),
            )
        }),
    }
}

fn read_config_file(path: &Path) -> Result<String, ErrorEnvelope> {
    std::fs::read_to_string(path).map_err(|error| {
        let code = match error.kind() {
            std::io::ErrorKind::NotFound => ErrorCode::new("config", "config_file_not_found"),
            std::io::ErrorKind::PermissionDenied => {
                ErrorCode::new("config", "config_file_permission_denied")
            },
            _ => ErrorCode::new("config", "config_file_io"),
        };

        ErrorEnvelope::expected(code, format!("failed to read config file: {error}"))
            .with_metadata("path", path.to_string_lossy().to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use build_metrics_domain::Precision;
    use std::error::Error;
    use std::path::PathBuf;

    #[test]
    fn detects_format_by_extension() {
        assert_eq!(
            detect_config_format(Path::new("bmp.toml")).ok(),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(
            detect_config_format(Path::new("bmp.JSON")).ok(),
            Some(ConfigFormat::Json)
        );
        assert_eq!(
            detect_config_format(Path::new("bmp")).ok(),
            Some(ConfigFormat::Json)
        );
        let error = detect_config_format(Path::new("bmp.yaml")).err();
        assert_eq!(
            error.map(|error| error.code),
            Some(ErrorCode::new("config", "unsupported_format"))
        );
    }

    #[test]
    fn missing_file_maps_to_not_found() {
        let path = PathBuf::from("/definitely/not/here/bmp.json");
        let error = load_publisher_config_from_path(Some(&path), &PublisherEnv::default()).err();
        assert_eq!(
            error.map(|error| error.code),
            Some(ErrorCode::new("config", "config_file_not_found"))
        );
    }

    #[test]
    fn no_path_yields_defaults_with_env_applied() -> Result<(), Box<dyn Error>> {
        let env = PublisherEnv {
            precision: Some(Precision::Seconds),
            ..PublisherEnv::default()
        };
        let config = load_publisher_config_from_path(None, &env)?;
        assert_eq!(config.publisher.precision, Precision::Seconds);
        assert!(config.targets.is_empty());
        Ok(())
    }

    #[test]
    fn pretty_outputs_end_with_newline() -> Result<(), Box<dyn Error>> {
        let config = PublisherConfig::default();
        assert!(to_pretty_json(&config)?.ends_with('\n'));
        assert!(to_pretty_toml(&config)?.ends_with('\n'));
        Ok(())
    }
}
