//! Stage listing and quoting handlers

use anyhow::Result;
use colored::*;
use girder_core::domain::shell::ShellKind;
use girder_core::{BuildStage, FeatureSet};
use girder_shells::Quoter;

use crate::config::Config;

/// List build stages in execution order
pub fn stages() -> Result<()> {
    println!("{}", "Build stages:".bold());
    for (index, stage) in BuildStage::ALL.iter().enumerate() {
        println!("  {} {}", format!("{}.", index + 1).dimmed(), stage.to_string().cyan());
    }
    Ok(())
}

/// Print `value` quoted for `shell`
///
/// Escape-mode flags come from the process-level overrides.
pub fn quote(config: &Config, shell: ShellKind, value: &str) -> Result<()> {
    println!("{}", quoted(config, shell, value)?);
    Ok(())
}

fn quoted(config: &Config, shell: ShellKind, value: &str) -> Result<String> {
    let mut features = FeatureSet::default();
    for (name, enabled) in &config.flag_overrides {
        features.set(name, *enabled);
    }

    let quoter = Quoter::for_shell(shell, &features);
    quoter.check(value)?;
    Ok(quoter.quote(value))
}
