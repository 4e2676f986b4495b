//! Exit reporting for executors that cannot observe the shell's status
//!
//! A trap-wrapped script always exits 0 and prints its real exit status as
//! the last line of its output:
//!
//! ```text
//! {"command_exit_code": 1, "script": "/builds/p.tmp/build_script/script.sh"}
//! ```
//!
//! Executors scan the job log with [`decode_stream`] to recover it.

use std::io::BufRead;

use girder_core::domain::report::TrapExitReport;
use girder_core::domain::shell::ShellKind;
use girder_core::{GeneratorError, Result};
use serde::Deserialize;
use tracing::debug;

use crate::quote::powershell;

/// Prelude installing the bash `EXIT` trap
///
/// `$0` is JSON-escaped (backslash, then double quote) before it lands in
/// the report, and the line is printed with `printf` since `echo` in some
/// `sh` builds interprets backslashes.
pub fn bash_trap_prelude() -> String {
    concat!(
        "runner_script_trap() { ",
        "exit_code=$?; ",
        r#"script_path=$(printf '%s' "$0" | sed -e 's/\\/\\\\/g' -e 's/"/\\"/g'); "#,
        r#"out_json="{\"command_exit_code\": $exit_code, \"script\": \"$script_path\"}"; "#,
        "echo \"\"; ",
        r#"printf '%s\n' "$out_json"; "#,
        "exit 0; ",
        "}; ",
        "trap runner_script_trap EXIT"
    )
    .to_string()
}

/// Launcher that runs `script_path` with PowerShell and reports its status
///
/// # Arguments
/// * `shell` - `powershell` or `pwsh`
/// * `script_path` - Path of the generated stage script
/// * `log_file` - Also append the report line to this file
pub fn powershell_launcher(
    shell: ShellKind,
    script_path: &str,
    log_file: Option<&str>,
) -> Result<String> {
    if !shell.is_powershell() {
        return Err(GeneratorError::InvalidJobContext(format!(
            "{} scripts are not wrapped by a PowerShell launcher",
            shell
        )));
    }
    for text in std::iter::once(script_path).chain(log_file) {
        if text.contains('\0') {
            return Err(GeneratorError::quoting(shell.as_str(), "NUL byte in path"));
        }
    }

    let eol = if shell == ShellKind::Powershell { "\r\n" } else { "\n" };
    let path = powershell::quote(script_path);
    let mut lines = vec![
        format!(
            "& {} -NoProfile -NonInteractive -ExecutionPolicy Bypass -File {}",
            shell.as_str(),
            path
        ),
        "$succeeded = $?".to_string(),
        "$exitCode = if ($LASTEXITCODE -ne $null) { $LASTEXITCODE } elseif ($succeeded) { 0 } else { 1 }"
            .to_string(),
        format!(
            "$outJson = '{{\"command_exit_code\": ' + $exitCode + ', \"script\": ' + (ConvertTo-Json -Compress -InputObject {}) + '}}'",
            path
        ),
        "echo \"\"".to_string(),
        "echo $outJson".to_string(),
    ];
    if let Some(log_file) = log_file {
        lines.push(format!(
            "Add-Content -Path {} -Value $outJson",
            powershell::quote(log_file)
        ));
    }
    lines.push("Exit 0".to_string());

    let mut script = String::new();
    if shell == ShellKind::Powershell {
        script.push('\u{feff}');
    }
    for line in lines {
        script.push_str(&line);
        script.push_str(eol);
    }
    Ok(script)
}

#[derive(Debug, Deserialize)]
struct RawReport {
    command_exit_code: Option<i32>,
    script: Option<String>,
}

/// Decodes one log line; anything but a complete, well-typed report is `None`
pub fn try_decode(line: &str) -> Option<TrapExitReport> {
    let line = line.trim_end();
    if !line.starts_with('{') {
        return None;
    }

    let raw: RawReport = serde_json::from_str(line).ok()?;
    match (raw.command_exit_code, raw.script) {
        (Some(command_exit_code), Some(script)) => {
            Some(TrapExitReport::new(command_exit_code, script))
        }
        _ => None,
    }
}

/// Scans a log stream and returns the last report found
pub fn decode_stream<R: BufRead>(reader: R) -> std::io::Result<Option<TrapExitReport>> {
    let mut last = None;
    for line in reader.split(b'\n') {
        let line = line?;
        let line = String::from_utf8_lossy(&line);
        if let Some(report) = try_decode(&line) {
            debug!("Found exit report with code {}", report.command_exit_code);
            last = Some(report);
        }
    }
    Ok(last)
}
