//! Girder CLI
//!
//! Generates the shell scripts of a CI job from its JSON description.
//!
//! Scripts go to stdout (or `--out`); logs go to stderr, filtered by
//! `RUST_LOG`.

mod commands;
mod config;
mod job;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use commands::{Commands, handle_command};
use config::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "girder")]
#[command(about = "CI job shell script generator", long_about = None)]
struct Cli {
    /// Cache backend document (JSON); overrides GIRDER_CACHE_CONFIG
    #[arg(long, global = true)]
    cache_config: Option<PathBuf>,

    /// Secret resolution deadline in seconds; overrides GIRDER_SECRET_TIMEOUT
    #[arg(long, global = true)]
    secret_timeout: Option<u64>,

    /// Wrap scripts with the exit trap reporter
    #[arg(long, global = true)]
    trap_exit: bool,

    /// Feature flag override, e.g. FF_HASH_CACHE_KEYS=true (repeatable)
    #[arg(long = "feature", global = true, value_parser = parse_flag)]
    features: Vec<(String, bool)>,

    #[command(subcommand)]
    command: Commands,
}

fn parse_flag(text: &str) -> std::result::Result<(String, bool), String> {
    let (name, value) = text
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=BOOL, got {:?}", text))?;
    Ok((
        name.trim().to_string(),
        girder_core::domain::variables::parse_bool(value.trim()),
    ))
}

/// Environment configuration refined by command-line flags
fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::from_env().context("Failed to read GIRDER_* environment")?;

    if let Some(path) = &cli.cache_config {
        config.cache_config = Some(path.clone());
    }
    if let Some(secs) = cli.secret_timeout {
        config.secret_timeout = Duration::from_secs(secs);
    }
    if cli.trap_exit {
        config.trap_exit = true;
    }
    for (name, value) in &cli.features {
        config = config.with_flag_override(name.clone(), *value);
    }

    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs on stderr keep generated scripts on stdout clean
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "girder=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;

    handle_command(cli.command, &config).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flag() {
        assert_eq!(
            parse_flag("FF_HASH_CACHE_KEYS=true").unwrap(),
            ("FF_HASH_CACHE_KEYS".to_string(), true)
        );
        assert_eq!(
            parse_flag("FF_USE_NEW_SHELL_ESCAPE = 0").unwrap(),
            ("FF_USE_NEW_SHELL_ESCAPE".to_string(), false)
        );
        assert!(parse_flag("FF_HASH_CACHE_KEYS").is_err());
    }

    #[test]
    fn test_cli_parses() {
        let cli = Cli::try_parse_from([
            "girder",
            "generate",
            "--job",
            "job.json",
            "--stage",
            "user_script",
            "--shell",
            "pwsh",
            "--feature",
            "FF_HASH_CACHE_KEYS=1",
        ])
        .unwrap();
        assert_eq!(cli.features, vec![("FF_HASH_CACHE_KEYS".to_string(), true)]);
        assert!(matches!(
            cli.command,
            Commands::Generate { shell: Some(girder_core::domain::shell::ShellKind::Pwsh), .. }
        ));

        assert!(Cli::try_parse_from(["girder", "quote", "--shell", "fish", "x"]).is_err());
    }
}
