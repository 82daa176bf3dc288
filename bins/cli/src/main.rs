//! `bmp` binary entrypoint.

mod commands;
mod error;
mod format;
mod logging;

use build_metrics_infra::{InfraError, redact_if_secret};
use clap::{Parser, Subcommand};
use commands::{
    PublishArgs, ShowFormat, run_config_check, run_config_show, run_info, run_publish_command,
};
use error::{CliError, ExitCode};
use format::{OutputArgs, OutputMode};
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "bmp",
    version,
    about = "Publish CI build metrics to InfluxDB",
    long_about = None
)]
struct Cli {
    #[command(flatten)]
    output: OutputArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Show build and version details.
    Info,
    /// Config-related commands.
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Collect build metrics and write them to every configured target.
    Publish(Box<PublishArgs>),
}

#[derive(Debug, Subcommand)]
enum ConfigCommands {
    /// Validate config loading, env overrides, and normalization.
    Check {
        /// Optional config file path (JSON/TOML).
        #[arg(long)]
        path: Option<PathBuf>,
    },
    /// Show the effective config after applying env overrides.
    Show {
        /// Optional config file path (JSON/TOML).
        #[arg(long)]
        path: Option<PathBuf>,
        /// Text rendering of the config.
        #[arg(long, value_enum, default_value_t = ShowFormat::Json)]
        format: ShowFormat,
    },
}

pub(crate) struct CliOutput {
    stdout: String,
    stderr: String,
    exit_code: ExitCode,
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    let mode = OutputMode::from_args(&cli.output);

    match run(&cli.command, mode) {
        Ok(output) => match write_output(&output) {
            Ok(()) => std::process::ExitCode::from(output.exit_code.as_u8()),
            Err(error) => exit_with_error(&error),
        },
        Err(error) => exit_with_error(&error),
    }
}

fn exit_with_error(error: &CliError) -> std::process::ExitCode {
    let _ = writeln!(io::stderr(), "error: {error}");
    std::process::ExitCode::from(error.exit_code().as_u8())
}

fn run(command: &Commands, mode: OutputMode) -> Result<CliOutput, CliError> {
    match command {
        Commands::Info => run_info(mode),
        Commands::Config { command } => match command {
            ConfigCommands::Check { path } => run_config_check(mode, path.as_deref()),
            ConfigCommands::Show { path, format } => {
                run_config_show(mode, path.as_deref(), *format)
            },
        },
        Commands::Publish(args) => run_publish_command(mode, args),
    }
}

/// Error payload printed at the CLI boundary.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CliErrorDto {
    code: String,
    kind: String,
    class: String,
    message: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    metadata: BTreeMap<String, String>,
}

impl From<&InfraError> for CliErrorDto {
    fn from(error: &InfraError) -> Self {
        Self {
            code: error.code.to_string(),
            kind: error.kind.to_string(),
            class: if error.class.is_retriable() {
                "retriable".to_owned()
            } else {
                "non_retriable".to_owned()
            },
            message: error.message.clone(),
            metadata: error
                .metadata
                .iter()
                .map(|(key, value)| (key.clone(), redact_if_secret(key, value)))
                .collect(),
        }
    }
}

pub(crate) fn format_error_output(
    mode: OutputMode,
    error: &InfraError,
    exit_code: ExitCode,
) -> CliOutput {
    let dto = CliErrorDto::from(error);

    let mut stderr = String::new();
    log_info(&mut stderr, "command failed", mode.no_progress);

    let stdout = if mode.is_json() {
        let payload = serde_json::json!({
            "status": "error",
            "error": dto,
        });

        // This is a CLI boundary, so JSON serialization errors are internal.
        let mut output = serde_json::to_string_pretty(&payload).unwrap_or_else(|_| {
            "{\"status\":\"error\",\"error\":{\"code\":\"core:internal\",\"message\":\"internal error\"}}".to_string()
        });
        output.push('\n');
        output
    } else {
        format_error_text(&dto)
    };

    CliOutput {
        stdout,
        stderr,
        exit_code,
    }
}

fn format_error_text(error: &CliErrorDto) -> String {
    let mut out = format!(
        "status: error\ncode: {}\nkind: {}\nmessage: {}\n",
        error.code, error.kind, error.message
    );
    for (key, value) in &error.metadata {
        out.push_str(&format!("{key}: {value}\n"));
    }
    out
}

pub(crate) fn log_info(stderr: &mut String, message: &str, no_progress: bool) {
    if no_progress {
        return;
    }
    stderr.push_str("info: ");
    stderr.push_str(message);
    stderr.push('\n');
}

fn write_output(output: &CliOutput) -> Result<(), CliError> {
    let mut stdout = io::stdout();
    stdout.write_all(output.stdout.as_bytes())?;

    if !output.stderr.is_empty() {
        let mut stderr = io::stderr();
        stderr.write_all(output.stderr.as_bytes())?;
        stderr.flush()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::config::config_check_with_env;
    use crate::error::infra_exit_code;
    use crate::format::{LogFormat, OutputFormat};
    use build_metrics_shared::{ErrorClass, ErrorCode, ErrorEnvelope};
    use build_metrics_testkit::fixtures::fixture_path;
    use clap::CommandFactory;

    fn json_mode() -> OutputMode {
        OutputMode {
            format: OutputFormat::Json,
            log_format: LogFormat::Text,
            no_progress: true,
        }
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn version_flag_is_supported() {
        let result = Cli::command().try_get_matches_from(["bmp", "--version"]);
        let is_version = matches!(
            result,
            Err(error) if error.kind() == clap::error::ErrorKind::DisplayVersion
        );

        assert!(is_version, "expected clap to render version");
    }

    #[test]
    fn publish_flags_parse() -> Result<(), clap::Error> {
        let cli = Cli::try_parse_from([
            "bmp",
            "publish",
            "--project-path",
            "team/app",
            "--build-number",
            "7",
            "--result",
            "not_built",
            "--param",
            "GIT_COMMIT=abc",
            "--dry-run",
            "--output",
            "json",
        ])?;

        assert!(matches!(cli.output.output, Some(OutputFormat::Json)));
        assert!(matches!(
            cli.command,
            Commands::Publish(ref args)
                if args.build_number == 7
                    && args.dry_run
                    && args.params == [("GIT_COMMIT".to_owned(), "abc".to_owned())]
        ));
        Ok(())
    }

    #[test]
    fn missing_build_number_is_rejected() {
        let result = Cli::try_parse_from(["bmp", "publish", "--project-path", "team/app"]);
        assert!(result.is_err());
    }

    #[test]
    fn exit_codes_for_errors() {
        let strict = ErrorEnvelope::unexpected(
            ErrorCode::new("store", "transport"),
            "refused",
            ErrorClass::Retriable,
        )
        .wrap(
            ErrorCode::new("publish", "target_write_failed"),
            "failed to publish",
        );
        let schema = ErrorEnvelope::expected(ErrorCode::new("config", "invalid_url"), "bad url");
        let missing = ErrorEnvelope::unexpected(
            ErrorCode::new("config", "config_file_not_found"),
            "missing",
            ErrorClass::NonRetriable,
        );

        assert_eq!(infra_exit_code(&strict), ExitCode::Failed);
        assert_eq!(infra_exit_code(&schema), ExitCode::InvalidInput);
        assert_eq!(infra_exit_code(&missing), ExitCode::Io);
        assert_eq!(
            CliError::InvalidInput("x".to_owned()).exit_code(),
            ExitCode::InvalidInput
        );
        assert_eq!(CliError::Io(io::Error::other("io")).exit_code(), ExitCode::Io);
    }

    #[test]
    fn error_output_redacts_secret_metadata() -> Result<(), serde_json::Error> {
        let error = ErrorEnvelope::expected(ErrorCode::new("config", "invalid_env"), "bad value")
            .with_metadata("BMP_TARGET_PASSWORD", "hunter2");

        let output = format_error_output(json_mode(), &error, ExitCode::InvalidInput);
        let value: serde_json::Value = serde_json::from_str(output.stdout.trim())?;

        assert_eq!(value.get("status"), Some(&serde_json::json!("error")));
        assert_eq!(
            value.pointer("/error/code"),
            Some(&serde_json::json!("config:invalid_env"))
        );
        assert!(!output.stdout.contains("hunter2"));
        assert_eq!(output.exit_code, ExitCode::InvalidInput);
        Ok(())
    }

    #[test]
    fn config_check_reports_counts() -> Result<(), Box<dyn std::error::Error>> {
        let path = fixture_path("config/publisher-config.valid.json");
        let output = config_check_with_env(json_mode(), &BTreeMap::new(), Some(&path))?;
        let value: serde_json::Value = serde_json::from_str(output.stdout.trim())?;

        assert_eq!(value.get("status"), Some(&serde_json::json!("ok")));
        assert_eq!(value.get("targets"), Some(&serde_json::json!(2)));
        assert_eq!(value.get("reports"), Some(&serde_json::json!(2)));
        Ok(())
    }

    #[test]
    fn config_check_rejects_bad_env() -> Result<(), Box<dyn std::error::Error>> {
        let env = BTreeMap::from([("BMP_PRECISION".to_owned(), "fortnight".to_owned())]);
        let output = config_check_with_env(json_mode(), &env, None)?;

        assert_eq!(output.exit_code, ExitCode::InvalidInput);
        assert!(output.stdout.contains("config:invalid_env"));
        Ok(())
    }
}
