//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod exit;
mod generate;
mod inspect;

use std::path::PathBuf;

use anyhow::Result;
use clap::Subcommand;
use girder_core::domain::shell::ShellKind;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Generate the script of one build stage
    Generate {
        /// Job document (JSON), `-` for stdin
        #[arg(long, env = "GIRDER_JOB")]
        job: PathBuf,

        /// Build stage, e.g. get_sources
        #[arg(long)]
        stage: String,

        /// Override the job's shell
        #[arg(long)]
        shell: Option<ShellKind>,

        /// Write the script to this file instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,

        /// Also write a PowerShell exit-report launcher for the script here
        #[arg(long, requires = "out")]
        launcher: Option<PathBuf>,
    },
    /// Print how the job's shell must be invoked
    Configuration {
        /// Job document (JSON), `-` for stdin
        #[arg(long, env = "GIRDER_JOB")]
        job: PathBuf,

        /// Override the job's shell
        #[arg(long)]
        shell: Option<ShellKind>,
    },
    /// List build stages in execution order
    Stages,
    /// Find the exit report of a trap-wrapped script in a job log
    DecodeExit {
        /// Log file; stdin when omitted
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Quote a value as a literal for a shell
    Quote {
        /// Target shell
        #[arg(long)]
        shell: ShellKind,

        /// Value to quote
        value: String,
    },
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module.
///
/// # Arguments
/// * `command` - The command to execute
/// * `config` - The CLI configuration
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Generate {
            job,
            stage,
            shell,
            out,
            launcher,
        } => {
            generate::generate(
                config,
                generate::GenerateArgs {
                    job,
                    stage,
                    shell,
                    out,
                    launcher,
                },
            )
            .await
        }
        Commands::Configuration { job, shell } => generate::configuration(config, &job, shell),
        Commands::Stages => inspect::stages(),
        Commands::DecodeExit { file } => exit::decode_exit(file.as_deref()),
        Commands::Quote { shell, value } => inspect::quote(config, shell, &value),
    }
}
