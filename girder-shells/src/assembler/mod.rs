//! Stage assembler
//!
//! Drives a `ShellWriter` through the emission sequence of one build
//! stage. Every stage script is standalone: it re-exports the job
//! variables and reconstructs whatever it needs from the `JobContext`.

mod artifacts;
mod cache;
mod commands;
mod sources;

use std::sync::Arc;

use girder_cache::{CacheUrlSigner, NoCache};
use girder_core::{BuildStage, FeatureSet, GeneratorError, JobContext, Result, ValueSegment, Variable};
use tracing::{info, warn};

use crate::frontend::ShellFrontend;
use crate::writer::ShellWriter;

/// TLS material exported as file variables by every stage
pub(crate) const TLS_CA_FILE: &str = "CI_SERVER_TLS_CA_FILE";
pub(crate) const TLS_CERT_FILE: &str = "CI_SERVER_TLS_CERT_FILE";
pub(crate) const TLS_KEY_FILE: &str = "CI_SERVER_TLS_KEY_FILE";

/// Output of one generation call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageScript {
    /// Script text to hand to the shell
    Script(String),
    /// Nothing to do for this job; the executor skips the stage
    Skip,
}

impl StageScript {
    pub fn is_skip(&self) -> bool {
        matches!(self, StageScript::Skip)
    }

    pub fn script(&self) -> Option<&str> {
        match self {
            StageScript::Script(script) => Some(script),
            StageScript::Skip => None,
        }
    }
}

/// Whether a stage emitter produced work
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Emission {
    Written,
    Skip,
}

/// Generates stage scripts for jobs
///
/// Holds only read-only collaborators; one generator can serve
/// concurrent calls for different jobs.
#[derive(Clone)]
pub struct ScriptGenerator {
    signer: Arc<dyn CacheUrlSigner>,
}

impl std::fmt::Debug for ScriptGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptGenerator").finish_non_exhaustive()
    }
}

impl Default for ScriptGenerator {
    fn default() -> Self {
        Self::new(Arc::new(NoCache))
    }
}

impl ScriptGenerator {
    /// Creates a generator signing cache URLs with `signer`
    pub fn new(signer: Arc<dyn CacheUrlSigner>) -> Self {
        Self { signer }
    }

    /// Generates the script of `stage` for `job`
    ///
    /// # Arguments
    /// * `stage` - Stage to emit
    /// * `job` - Job the script runs for; secrets must already be resolved
    ///   into its variables
    ///
    /// # Returns
    /// The script, or `StageScript::Skip` when the stage has nothing to do
    pub fn generate(&self, stage: BuildStage, job: &JobContext) -> Result<StageScript> {
        job.validate()?;
        info!(
            "Generating {} script for job {} ({})",
            stage, job.job_id, job.shell_kind
        );

        let mut writer = ShellFrontend::new(job).writer();
        let mut ctx = StageContext {
            job,
            features: job.features(),
            signer: self.signer.as_ref(),
            w: writer.as_mut(),
        };

        let emission = match stage {
            BuildStage::Prepare => ctx.write_prepare(),
            BuildStage::GetSources => sources::write_get_sources(&mut ctx),
            BuildStage::RestoreCache => cache::write_restore_cache(&mut ctx),
            BuildStage::DownloadArtifacts => artifacts::write_download_artifacts(&mut ctx),
            BuildStage::UserScript => commands::write_user_script(&mut ctx),
            BuildStage::AfterScript => commands::write_after_script(&mut ctx),
            BuildStage::ArchiveCache => cache::write_archive_cache(&mut ctx),
            BuildStage::UploadArtifacts => artifacts::write_upload_artifacts(&mut ctx),
            BuildStage::CleanupFileVariables => ctx.write_cleanup_file_variables(),
        }?;

        if emission == Emission::Skip {
            info!("Skipping {} for job {}: nothing to do", stage, job.job_id);
            return Ok(StageScript::Skip);
        }

        let script = writer.finish(job.is_debug_trace()).inspect_err(|error| {
            warn!("Failed to generate {} script for job {}: {}", stage, job.job_id, error);
        })?;

        info!(
            "Generated {} script for job {} ({} bytes)",
            stage,
            job.job_id,
            script.len()
        );
        Ok(StageScript::Script(script))
    }

    /// Like [`generate`](Self::generate), taking the stage by name
    pub fn generate_named(&self, stage: &str, job: &JobContext) -> Result<StageScript> {
        let stage: BuildStage = stage.parse()?;
        self.generate(stage, job)
    }
}

/// Everything a stage emitter needs
pub(crate) struct StageContext<'a> {
    pub job: &'a JobContext,
    pub features: FeatureSet,
    pub signer: &'a dyn CacheUrlSigner,
    pub w: &'a mut dyn ShellWriter,
}

impl StageContext<'_> {
    /// Exports job variables in declaration order, then the TLS material
    ///
    /// Non-raw values have `$NAME` references expanded against the job.
    /// A reference to a file variable becomes the writer's path for that
    /// file.
    pub fn write_exports(&mut self) {
        let job = self.job;
        for variable in &job.variables {
            if variable.raw {
                self.w.variable(variable);
                continue;
            }

            let segments = job.expand_value(&variable.value);
            let has_paths = segments
                .iter()
                .any(|segment| matches!(segment, ValueSegment::FilePath(_)));
            if has_paths && !variable.file {
                self.w.variable_with_paths(&variable.key, &segments);
                continue;
            }

            // File contents are literal text, so paths are spelled out
            let value = segments
                .iter()
                .map(|segment| match segment {
                    ValueSegment::Text(text) => text.clone(),
                    ValueSegment::FilePath(key) => self.w.tmp_file(key),
                })
                .collect();
            self.w.variable(&Variable {
                value,
                ..variable.clone()
            });
        }
        self.write_tls_variables(&[TLS_CA_FILE, TLS_CERT_FILE, TLS_KEY_FILE]);
    }

    /// Writes each non-empty TLS document to a file variable named by `keys`
    /// (CA chain, certificate, key)
    pub fn write_tls_variables(&mut self, keys: &[&str; 3]) {
        let documents = [
            &self.job.tls_ca_chain,
            &self.job.tls_cert,
            &self.job.tls_key,
        ];
        for (key, document) in keys.iter().zip(documents) {
            if let Some(document) = document.as_deref().filter(|d| !d.is_empty()) {
                self.w.variable(&Variable::file(*key, document));
            }
        }
    }

    pub fn cd_project_dir(&mut self) {
        self.w.cd(&self.job.project_dir);
    }

    /// Runs `body` only when the helper binary answers `--version`
    pub fn guard_helper(&mut self, action: &str, body: impl FnOnce(&mut Self)) {
        let helper = self.job.runner_helper_cmd.clone();
        if helper.is_empty() {
            let error = GeneratorError::HelperMissing(action.to_string());
            warn!("{} disabled ({}): {}", action, error.kind(), error);
            self.w
                .warning(&format!("{} is not supported by this executor.", action));
            return;
        }

        self.w.if_cmd(&helper, &["--version"]);
        body(self);
        self.w.else_branch();
        self.w
            .warning(&format!("Missing {}. {} is disabled.", helper, action));
        self.w.end_if();
    }

    /// Emits script entries, each announced in the log before it runs
    ///
    /// Entries may span several lines; those are announced by their first
    /// line. With debug tracing on the shell echoes commands itself.
    pub fn write_commands(&mut self, commands: &[&str]) {
        let trace = self.job.is_debug_trace();
        for command in commands {
            let command = command.trim();
            if command.is_empty() {
                continue;
            }

            if !trace {
                match command.split_once('\n') {
                    Some((first, _)) => self
                        .w
                        .notice(&format!("$ {} # collapsed multi-line command", first.trim_end())),
                    None => self.w.notice(&format!("$ {}", command)),
                }
            }
            self.w.line(command);
            self.w.check_for_errors();
        }
    }

    /// Runs a hook script inside a log section
    pub fn write_hook(&mut self, name: &str, script: &str) {
        if script.trim().is_empty() {
            return;
        }
        self.w.section_start(name, &format!("Running {}", name));
        self.write_commands(&[script]);
        self.w.section_end(name);
    }

    fn write_prepare(&mut self) -> Result<Emission> {
        self.w.host_banner(self.job.hostname.as_deref());
        self.write_tls_variables(&[TLS_CA_FILE, TLS_CERT_FILE, TLS_KEY_FILE]);
        Ok(Emission::Written)
    }

    fn write_cleanup_file_variables(&mut self) -> Result<Emission> {
        for variable in self.job.variables.file_variables() {
            let file = self.w.tmp_file(&variable.key);
            self.w.rm_file(&file);
        }

        let tls_keys = [
            TLS_CA_FILE,
            TLS_CERT_FILE,
            TLS_KEY_FILE,
            sources::GIT_SSL_CA_INFO,
            sources::GIT_SSL_CERT,
            sources::GIT_SSL_KEY,
        ];
        for key in tls_keys {
            let file = self.w.tmp_file(key);
            self.w.rm_file(&file);
        }

        let template = self.w.tmp_file(sources::GIT_TEMPLATE_DIR);
        self.w.rm_dir(&template);
        Ok(Emission::Written)
    }
}
