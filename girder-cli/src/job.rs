//! Loading job documents

use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use girder_core::JobContext;
use girder_core::domain::shell::ShellKind;
use serde_json::Value;

use crate::config::Config;

/// Reads a JobContext JSON document; `-` reads stdin
pub fn read_job(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read job from stdin")?;
        return Ok(text);
    }
    std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read job file {}", path.display()))
}

/// Parses a job document and applies process-level settings
///
/// # Arguments
/// * `text` - The JSON document
/// * `config` - CLI configuration (default shell, trap, flag overrides)
/// * `shell` - Shell requested on the command line, wins over everything
pub fn parse_job(text: &str, config: &Config, shell: Option<ShellKind>) -> Result<JobContext> {
    let document: Value = serde_json::from_str(text).context("Job document is not valid JSON")?;
    let names_shell = document.get("shell_kind").is_some_and(|value| !value.is_null());
    let mut job: JobContext =
        serde_json::from_value(document).context("Job document does not describe a job")?;

    match (shell, config.default_shell) {
        (Some(shell), _) => job.shell_kind = shell,
        (None, Some(shell)) if !names_shell => job.shell_kind = shell,
        _ => {}
    }
    if config.trap_exit {
        job.trap_exit = true;
    }
    job.feature_overrides
        .extend(config.flag_overrides.iter().map(|(name, value)| (name.clone(), *value)));

    job.validate().context("Invalid job")?;
    Ok(job)
}

/// Reads and parses a job document
pub fn load_job(path: &Path, config: &Config, shell: Option<ShellKind>) -> Result<JobContext> {
    let text = read_job(path)?;
    parse_job(&text, config, shell)
}
