//! Config command handlers.

use crate::error::{CliError, ExitCode, infra_exit_code};
use crate::format::OutputMode;
use crate::{CliOutput, format_error_output, log_info};
use build_metrics_infra::{
    ConfigOutputFormat, load_effective_config, publisher_env_from_process,
    render_effective_config, validate_env_parsing,
};
use clap::ValueEnum;
use std::collections::BTreeMap;
use std::path::Path;

/// Rendering of `config show` in text mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ShowFormat {
    /// Pretty JSON.
    #[default]
    Json,
    /// TOML.
    Toml,
}

impl From<ShowFormat> for ConfigOutputFormat {
    fn from(format: ShowFormat) -> Self {
        match format {
            ShowFormat::Json => Self::Json,
            ShowFormat::Toml => Self::Toml,
        }
    }
}

/// Validate config loading, env overrides and normalization.
pub fn run_config_check(mode: OutputMode, path: Option<&Path>) -> Result<CliOutput, CliError> {
    let env = publisher_env_from_process();
    config_check_with_env(mode, &env, path)
}

pub(crate) fn config_check_with_env(
    mode: OutputMode,
    env: &BTreeMap<String, String>,
    path: Option<&Path>,
) -> Result<CliOutput, CliError> {
    let loaded = validate_env_parsing(env).and_then(|()| load_effective_config(env, path));
    let config = match loaded {
        Ok(config) => config,
        Err(error) => {
            let exit_code = infra_exit_code(&error);
            return Ok(format_error_output(mode, &error, exit_code));
        },
    };

    let mut stderr = String::new();
    log_info(&mut stderr, "config check completed", mode.no_progress);

    let stdout = if mode.is_json() {
        let payload = serde_json::json!({
            "status": "ok",
            "configPath": path.map(|value| value.to_string_lossy().to_string()),
            "targets": config.targets.len(),
            "reports": config.reports.len(),
        });
        let mut output = serde_json::to_string_pretty(&payload)?;
        output.push('\n');
        output
    } else {
        let mut out = format!(
            "status: ok\nconfig: ok\ntargets: {}\nreports: {}\n",
            config.targets.len(),
            config.reports.len()
        );
        for target in &config.targets {
            out.push_str(&format!("target: {target}\n"));
        }
        if let Some(path) = path {
            out.push_str(&format!("path: {}\n", path.to_string_lossy()));
        }
        out
    };

    Ok(CliOutput {
        stdout,
        stderr,
        exit_code: ExitCode::Ok,
    })
}

/// Print the effective config; passwords are redacted.
pub fn run_config_show(
    mode: OutputMode,
    path: Option<&Path>,
    format: ShowFormat,
) -> Result<CliOutput, CliError> {
    let env = publisher_env_from_process();
    let format = if mode.is_json() {
        ConfigOutputFormat::Json
    } else {
        format.into()
    };
    let rendered = match render_effective_config(&env, path, format) {
        Ok(rendered) => rendered,
        Err(error) => {
            let exit_code = infra_exit_code(&error);
            return Ok(format_error_output(mode, &error, exit_code));
        },
    };

    let mut stderr = String::new();
    log_info(&mut stderr, "config show completed", mode.no_progress);

    let stdout = if mode.is_json() {
        let config_value: serde_json::Value = serde_json::from_str(rendered.trim())?;
        let payload = serde_json::json!({
            "status": "ok",
            "configPath": path.map(|value| value.to_string_lossy().to_string()),
            "effectiveConfig": config_value,
        });
        let mut output = serde_json::to_string_pretty(&payload)?;
        output.push('\n');
        output
    } else {
        rendered
    };

    Ok(CliOutput {
        stdout,
        stderr,
        exit_code: ExitCode::Ok,
    })
}
