//! Publish command handler.

use crate::error::{CliError, ExitCode, infra_exit_code};
use crate::format::OutputMode;
use crate::logging::init_logger;
use crate::{CliOutput, format_error_output, log_info};
use build_metrics_adapters::StdoutConsole;
use build_metrics_domain::{BuildResult, BuildRun};
use build_metrics_infra::{
    PublishRuntime, PublishSummary, RunOptions, build_store_port, load_effective_config,
    publisher_env_from_process, run_publish_local,
};
use clap::{Args, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;

/// Flags of `bmp publish`.
#[derive(Debug, Args)]
pub struct PublishArgs {
    /// Config file path (JSON/TOML).
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Full project path of the build (e.g. `folder/sub/job`).
    #[arg(long)]
    pub project_path: String,
    /// Build number.
    #[arg(long)]
    pub build_number: u32,
    /// Build outcome.
    #[arg(long, value_enum, default_value_t = BuildResultArg::Success)]
    pub result: BuildResultArg,
    /// Build duration in milliseconds.
    #[arg(long, default_value_t = 0)]
    pub duration_ms: u64,
    /// When the build was scheduled, epoch milliseconds.
    #[arg(long)]
    pub scheduled_at_ms: Option<i64>,
    /// Fixed point timestamp in epoch milliseconds (defaults to now).
    #[arg(long)]
    pub timestamp_ms: Option<i64>,
    /// Agent or runner name.
    #[arg(long)]
    pub agent: Option<String>,
    /// Build parameter as `KEY=VALUE`; repeatable.
    #[arg(long = "param", value_name = "KEY=VALUE", value_parser = parse_param)]
    pub params: Vec<(String, String)>,
    /// Directory relative report paths resolve against (defaults to cwd).
    #[arg(long)]
    pub base_dir: Option<PathBuf>,
    /// Write timeout per target in milliseconds; writes are not cut off when unset.
    #[arg(long)]
    pub timeout_ms: Option<u64>,
    /// Mirror diagnostics to stdout and log at debug level.
    #[arg(long)]
    pub verbose: bool,
    /// Collect points without writing them.
    #[arg(long)]
    pub dry_run: bool,
}

/// Build outcome flag values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BuildResultArg {
    /// Build succeeded.
    Success,
    /// Build finished with warnings.
    Unstable,
    /// Build failed.
    Failure,
    /// Build did not run.
    #[value(name = "not_built", alias = "not-built")]
    NotBuilt,
    /// Build was aborted.
    Aborted,
}

impl From<BuildResultArg> for BuildResult {
    fn from(result: BuildResultArg) -> Self {
        match result {
            BuildResultArg::Success => Self::Success,
            BuildResultArg::Unstable => Self::Unstable,
            BuildResultArg::Failure => Self::Failure,
            BuildResultArg::NotBuilt => Self::NotBuilt,
            BuildResultArg::Aborted => Self::Aborted,
        }
    }
}

/// Run the publish command.
pub fn run_publish_command(mode: OutputMode, args: &PublishArgs) -> Result<CliOutput, CliError> {
    let env = publisher_env_from_process();
    let config = match load_effective_config(&env, args.config.as_deref()) {
        Ok(config) => config,
        Err(error) => {
            let exit_code = infra_exit_code(&error);
            return Ok(format_error_output(mode, &error, exit_code));
        },
    };

    let base_dir = match &args.base_dir {
        Some(path) if !path.is_dir() => {
            return Err(CliError::InvalidInput(format!(
                "--base-dir {} is not a directory",
                path.display()
            )));
        },
        Some(path) => path.clone(),
        None => std::env::current_dir()?,
    };
    let mut runtime = PublishRuntime::new(build_store_port(args.timeout_ms), base_dir)
        .with_logger(init_logger(mode.log_format, args.verbose));
    if args.verbose && !mode.is_json() {
        runtime = runtime.with_console(Arc::new(StdoutConsole));
    }

    let options = RunOptions {
        timestamp_ms: args.timestamp_ms,
        verbose: args.verbose,
        dry_run: args.dry_run,
    };
    let output = match run_publish_local(&runtime, &config, build_run(args), options) {
        Ok(output) => output,
        Err(error) => {
            let exit_code = infra_exit_code(&error);
            return Ok(format_error_output(mode, &error, exit_code));
        },
    };
    let summary = PublishSummary::from(&output);

    let mut stderr = String::new();
    log_info(&mut stderr, "publish completed", mode.no_progress);

    let stdout = if mode.is_json() {
        let payload = serde_json::json!({
            "status": "ok",
            "summary": summary,
        });
        let mut output = serde_json::to_string_pretty(&payload)?;
        output.push('\n');
        output
    } else {
        format_summary_text(&summary)
    };

    Ok(CliOutput {
        stdout,
        stderr,
        exit_code: ExitCode::Ok,
    })
}

fn build_run(args: &PublishArgs) -> BuildRun {
    let mut run = BuildRun::new(args.project_path.as_str(), args.build_number)
        .with_result(args.result.into())
        .with_duration_ms(args.duration_ms);
    if let Some(scheduled_at_ms) = args.scheduled_at_ms {
        run = run.with_scheduled_at_ms(scheduled_at_ms);
    }
    if let Some(agent) = &args.agent {
        run = run.with_agent_name(agent.as_str());
    }
    for (key, value) in &args.params {
        run = run.with_parameter(key.as_str(), value.as_str());
    }
    run
}

fn format_summary_text(summary: &PublishSummary) -> String {
    let mut out = format!(
        "status: ok\nproject: {}\npoints: {}\ndry-run: {}\n",
        summary.project_name, summary.points, summary.dry_run
    );
    for target in &summary.targets {
        let detail = match (&target.points, &target.error_code, &target.error_message) {
            (Some(points), _, _) => format!("{points} points"),
            (None, Some(code), Some(message)) => format!("{code}: {message}"),
            _ => String::new(),
        };
        out.push_str(&format!("target: {} {} {detail}\n", target.target, target.status));
    }
    out
}

fn parse_param(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got `{raw}`"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("parameter name is empty in `{raw}`"));
    }
    Ok((key.to_owned(), value.to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use build_metrics_infra::TargetSummary;

    #[test]
    fn params_split_on_first_equals() {
        assert_eq!(
            parse_param("GIT_COMMIT=a=b"),
            Ok(("GIT_COMMIT".to_owned(), "a=b".to_owned()))
        );
        assert!(parse_param("novalue").is_err());
        assert!(parse_param(" =x").is_err());
    }

    #[test]
    fn summary_text_lists_targets() {
        let summary = PublishSummary {
            project_name: "team_app".to_owned(),
            points: 2,
            dry_run: false,
            targets: vec![
                TargetSummary {
                    target: "primary".to_owned(),
                    status: "written",
                    points: Some(2),
                    error_code: None,
                    error_message: None,
                },
                TargetSummary {
                    target: "offline".to_owned(),
                    status: "failed",
                    points: None,
                    error_code: Some("store:transport".to_owned()),
                    error_message: Some("connection refused".to_owned()),
                },
            ],
        };

        assert_eq!(
            format_summary_text(&summary),
            "status: ok\nproject: team_app\npoints: 2\ndry-run: false\n\
             target: primary written 2 points\n\
             target: offline failed store:transport: connection refused\n"
        );
    }
}
