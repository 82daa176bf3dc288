//! Info command handler.

use crate::CliOutput;
use crate::error::{CliError, ExitCode};
use crate::format::OutputMode;
use build_metrics_infra::{REPORT_KINDS, infra_crate_version};

/// Run the info command.
pub fn run_info(mode: OutputMode) -> Result<CliOutput, CliError> {
    let stdout = if mode.is_json() {
        format_info_json()?
    } else {
        format_info_text()
    };

    Ok(CliOutput {
        stdout,
        stderr: String::new(),
        exit_code: ExitCode::Ok,
    })
}

fn format_info_text() -> String {
    format!(
        "status: ok\nname: {}\nversion: {}\ninfra: {}\nreports: {}\n",
        env!("CARGO_BIN_NAME"),
        env!("CARGO_PKG_VERSION"),
        infra_crate_version(),
        REPORT_KINDS.join(", "),
    )
}

fn format_info_json() -> Result<String, CliError> {
    let payload = serde_json::json!({
        "status": "ok",
        "build": {
            "name": env!("CARGO_BIN_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
            "infraVersion": infra_crate_version(),
        },
        "reportKinds": REPORT_KINDS,
    });
    let mut output = serde_json::to_string_pretty(&payload)?;
    output.push('\n');
    Ok(output)
}
