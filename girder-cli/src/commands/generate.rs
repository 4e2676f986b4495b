//! Script generation handlers

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use colored::*;
use girder_cache::credentials::{DEFAULT_METADATA_ENDPOINT, MetadataClient};
use girder_cache::{CacheConfig, CacheUrlSigner, ConfiguredSigner, NoCache};
use girder_core::domain::shell::ShellKind;
use girder_core::{BuildStage, GeneratorError, JobContext};
use girder_secrets::SecretsResolver;
use girder_shells::{ScriptGenerator, ShellFrontend, StageScript};
use tracing::{info, warn};

use crate::config::Config;
use crate::job::load_job;

const METADATA_TIMEOUT: Duration = Duration::from_secs(5);

pub struct GenerateArgs {
    pub job: PathBuf,
    pub stage: String,
    pub shell: Option<ShellKind>,
    pub out: Option<PathBuf>,
    pub launcher: Option<PathBuf>,
}

/// Resolves the job's secrets and appends them to its variables
///
/// Ctrl-C aborts resolution without producing a script.
async fn resolve_secrets(config: &Config, job: &mut JobContext) -> Result<()> {
    if job.secrets.is_empty() {
        return Ok(());
    }

    let resolver = SecretsResolver::default()
        .with_timeout(config.secret_timeout)
        .with_features(&job.features());
    let cancel = async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };
    let variables = resolver
        .resolve_until(&job.secrets, cancel)
        .await
        .map_err(GeneratorError::from)
        .context("Failed to resolve secrets")?;

    info!("Resolved {} secret variables", variables.len());
    job.variables.extend(variables);
    Ok(())
}

/// Builds the cache URL signer from the configured backend document
///
/// Instance credentials are fetched here, before generation. When they
/// cannot be fetched the scripts run without presigned URLs.
async fn build_signer(config: &Config) -> Result<Arc<dyn CacheUrlSigner>> {
    let Some(path) = &config.cache_config else {
        return Ok(Arc::new(NoCache));
    };

    let cache = CacheConfig::from_file(path)
        .with_context(|| format!("Failed to load cache config {}", path.display()))?;
    cache.validate().context("Invalid cache config")?;

    let signed_at = Utc::now();
    let metadata = MetadataClient::new(DEFAULT_METADATA_ENDPOINT, METADATA_TIMEOUT)?;
    match ConfiguredSigner::connect(cache.clone(), &metadata, signed_at).await {
        Ok(signer) => Ok(Arc::new(signer)),
        Err(e) => {
            warn!("Cache credentials unavailable, scripts will not carry cache URLs: {}", e);
            Ok(Arc::new(ConfiguredSigner::new(cache, signed_at)?))
        }
    }
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    std::fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
}

/// Generate the script of one stage
pub async fn generate(config: &Config, args: GenerateArgs) -> Result<()> {
    let stage: BuildStage = args.stage.parse()?;
    let mut job = load_job(&args.job, config, args.shell)?;

    resolve_secrets(config, &mut job).await?;
    let signer = build_signer(config).await?;

    let script = match ScriptGenerator::new(signer).generate(stage, &job)? {
        StageScript::Script(script) => script,
        StageScript::Skip => {
            eprintln!("skip");
            return Ok(());
        }
    };

    let Some(out) = args.out else {
        print!("{}", script);
        return Ok(());
    };
    write_file(&out, &script)?;
    eprintln!(
        "{} {} script written to {}",
        "✓".green().bold(),
        stage.to_string().cyan(),
        out.display()
    );

    if let Some(launcher_path) = args.launcher {
        let script_path = out.to_string_lossy();
        match ShellFrontend::new(&job).exit_report_launcher(&script_path, None)? {
            Some(launcher) => {
                write_file(&launcher_path, &launcher)?;
                eprintln!(
                    "{} Launcher written to {}",
                    "✓".green().bold(),
                    launcher_path.display()
                );
            }
            None => eprintln!(
                "{}",
                "No launcher needed: the job does not use a PowerShell exit trap".yellow()
            ),
        }
    }

    Ok(())
}

/// Print the shell configuration as JSON
pub fn configuration(config: &Config, job: &Path, shell: Option<ShellKind>) -> Result<()> {
    let job = load_job(job, config, shell)?;
    let configuration = ShellFrontend::new(&job).configuration()?;
    println!("{}", serde_json::to_string_pretty(&configuration)?);
    Ok(())
}
