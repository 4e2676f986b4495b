//! Job domain types
//!
//! `JobContext` is the immutable input to one script generation. It is
//! deserialized from the job payload the runner received, and every stage
//! script is reconstructed from it alone.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

use super::secret::SecretRef;
use super::shell::{ExecutorKind, HostOs, ShellKind, ShellType};
use super::variables::{Token, ValueSegment, Variables, expand_key_with, parse_bool, tokenize};
use crate::error::{GeneratorError, Result};
use crate::features::FeatureSet;

/// Input to script generation for one job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobContext {
    pub job_id: i64,

    #[serde(default)]
    pub job_name: String,

    /// Job token handed to the helper binary
    #[serde(default)]
    pub token: String,

    #[serde(default)]
    pub project_id: i64,

    /// Absolute checkout directory
    pub project_dir: String,

    /// Scratch directory owned by the running script
    pub tmp_dir: String,

    /// Local cache root; relative paths are taken from `project_dir`
    #[serde(default = "default_cache_dir")]
    pub cache_dir: String,

    /// Worker tag shown in the prepare banner
    #[serde(default)]
    pub hostname: Option<String>,

    /// Coordinator URL used by the artifact helpers
    #[serde(default)]
    pub runner_url: String,

    /// Short runner identifier used in unshared cache object names
    #[serde(default)]
    pub runner_short_description: String,

    pub repo: RepoInfo,

    #[serde(default)]
    pub strategy: GitStrategy,

    #[serde(default)]
    pub submodule_strategy: SubmoduleStrategy,

    #[serde(default = "default_true")]
    pub checkout_enabled: bool,

    #[serde(default)]
    pub variables: Variables,

    #[serde(default)]
    pub tls_ca_chain: Option<String>,

    #[serde(default)]
    pub tls_cert: Option<String>,

    #[serde(default)]
    pub tls_key: Option<String>,

    #[serde(default)]
    pub shell_kind: ShellKind,

    #[serde(default)]
    pub shell_type: ShellType,

    #[serde(default)]
    pub executor_kind: ExecutorKind,

    #[serde(default)]
    pub feature_flags: BTreeMap<String, bool>,

    #[serde(default)]
    pub options: JobOptions,

    #[serde(default)]
    pub pre_clone_script: String,

    #[serde(default)]
    pub post_clone_script: String,

    #[serde(default)]
    pub pre_build_script: String,

    #[serde(default)]
    pub post_build_script: String,

    /// User script, one command per line
    #[serde(default)]
    pub commands: String,

    /// Absolute path of the helper binary on the worker; empty when unavailable
    #[serde(default)]
    pub runner_helper_cmd: String,

    #[serde(default)]
    pub debug_trace: bool,

    /// Job timeout, also the lifetime of presigned cache URLs
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Outcome of the user script, read by `when` filters
    #[serde(default)]
    pub job_status: JobStatus,

    /// Run the shell as this user through `su`
    #[serde(default)]
    pub user: Option<String>,

    #[serde(default)]
    pub host_os: HostOs,

    /// The executor cannot observe the shell's exit status directly
    #[serde(default)]
    pub trap_exit: bool,

    /// Secrets to resolve before generation, keyed by variable name
    #[serde(default)]
    pub secrets: BTreeMap<String, SecretRef>,

    /// Process-level flag overrides, applied after `FF_*` job variables
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub feature_overrides: BTreeMap<String, bool>,
}

fn default_true() -> bool {
    true
}

fn default_timeout_secs() -> u64 {
    3600
}

fn default_cache_dir() -> String {
    "cache".to_string()
}

/// Source repository to check out
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RepoInfo {
    pub url: String,
    #[serde(default)]
    pub ref_name: String,
    #[serde(default)]
    pub sha: String,
    #[serde(default)]
    pub is_tag: bool,
    #[serde(default)]
    pub depth: u32,
}

/// How sources are obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum GitStrategy {
    Clone,
    #[default]
    Fetch,
    None,
    /// Start from an empty project directory without touching git
    Empty,
}

impl FromStr for GitStrategy {
    type Err = GeneratorError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "clone" => Ok(GitStrategy::Clone),
            "fetch" => Ok(GitStrategy::Fetch),
            "none" => Ok(GitStrategy::None),
            "empty" => Ok(GitStrategy::Empty),
            other => Err(GeneratorError::UnknownGitStrategy(other.to_string())),
        }
    }
}

impl TryFrom<String> for GitStrategy {
    type Error = GeneratorError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<GitStrategy> for String {
    fn from(value: GitStrategy) -> Self {
        value.to_string()
    }
}

impl std::fmt::Display for GitStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GitStrategy::Clone => write!(f, "clone"),
            GitStrategy::Fetch => write!(f, "fetch"),
            GitStrategy::None => write!(f, "none"),
            GitStrategy::Empty => write!(f, "empty"),
        }
    }
}

/// How submodules are handled after checkout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SubmoduleStrategy {
    #[default]
    None,
    Normal,
    Recursive,
}

impl FromStr for SubmoduleStrategy {
    type Err = GeneratorError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "none" | "" => Ok(SubmoduleStrategy::None),
            "normal" => Ok(SubmoduleStrategy::Normal),
            "recursive" => Ok(SubmoduleStrategy::Recursive),
            other => Err(GeneratorError::UnknownSubmoduleStrategy(other.to_string())),
        }
    }
}

impl TryFrom<String> for SubmoduleStrategy {
    type Error = GeneratorError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<SubmoduleStrategy> for String {
    fn from(value: SubmoduleStrategy) -> Self {
        value.to_string()
    }
}

impl std::fmt::Display for SubmoduleStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubmoduleStrategy::None => write!(f, "none"),
            SubmoduleStrategy::Normal => write!(f, "normal"),
            SubmoduleStrategy::Recursive => write!(f, "recursive"),
        }
    }
}

/// Outcome of the user script
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    #[default]
    Success,
    Failed,
}

/// When an upload step runs relative to the job outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum When {
    #[default]
    OnSuccess,
    OnFailure,
    Always,
}

impl When {
    pub fn applies(&self, status: JobStatus) -> bool {
        match self {
            When::OnSuccess => status == JobStatus::Success,
            When::OnFailure => status == JobStatus::Failed,
            When::Always => true,
        }
    }
}

/// Cache direction allowed for an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePolicy {
    Pull,
    Push,
    PullPush,
}

impl CachePolicy {
    pub fn allows_pull(&self) -> bool {
        matches!(self, CachePolicy::Pull | CachePolicy::PullPush)
    }

    pub fn allows_push(&self) -> bool {
        matches!(self, CachePolicy::Push | CachePolicy::PullPush)
    }
}

impl FromStr for CachePolicy {
    type Err = GeneratorError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "" | "pull-push" => Ok(CachePolicy::PullPush),
            "pull" => Ok(CachePolicy::Pull),
            "push" => Ok(CachePolicy::Push),
            other => Err(GeneratorError::InvalidJobContext(format!(
                "unknown cache policy {:?}",
                other
            ))),
        }
    }
}

/// Per-job options attached by the coordinator
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct JobOptions {
    #[serde(default)]
    pub cache: Vec<CacheOptions>,

    #[serde(default)]
    pub artifacts: Vec<ArtifactOptions>,

    #[serde(default)]
    pub dependencies: Vec<Dependency>,

    /// After-script commands; each entry may span several lines
    #[serde(default)]
    pub after_script: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CacheOptions {
    /// User key; empty means `<job_name>/<ref_name>`
    #[serde(default)]
    pub key: String,

    #[serde(default)]
    pub paths: Vec<String>,

    #[serde(default)]
    pub untracked: bool,

    /// `pull`, `push` or `pull-push`, may reference variables
    #[serde(default)]
    pub policy: String,

    #[serde(default)]
    pub when: When,

    #[serde(default)]
    pub fallback_keys: Vec<String>,
}

impl CacheOptions {
    /// Helper arguments selecting what goes into the archive
    pub fn archiver_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        for path in &self.paths {
            args.push("--path".to_string());
            args.push(path.clone());
        }
        if self.untracked {
            args.push("--untracked".to_string());
        }
        args
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ArtifactOptions {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub paths: Vec<String>,

    #[serde(default)]
    pub exclude: Vec<String>,

    #[serde(default)]
    pub untracked: bool,

    #[serde(default)]
    pub expire_in: String,

    #[serde(default)]
    pub when: When,

    /// e.g. `archive`, `junit`
    #[serde(default)]
    pub artifact_type: String,

    /// e.g. `zip`, `gzip`, `raw`
    #[serde(default)]
    pub artifact_format: String,
}

/// Upstream job whose artifacts this job consumes
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Dependency {
    pub id: i64,
    pub token: String,
    #[serde(default)]
    pub name: String,
    /// Empty when the upstream job produced no artifacts
    #[serde(default)]
    pub artifacts_file: String,
}

impl JobContext {
    /// Minimal context for a job; everything else takes its default
    pub fn new(job_id: i64, project_dir: impl Into<String>, tmp_dir: impl Into<String>) -> Self {
        Self {
            job_id,
            job_name: String::new(),
            token: String::new(),
            project_id: 0,
            project_dir: project_dir.into(),
            tmp_dir: tmp_dir.into(),
            cache_dir: default_cache_dir(),
            hostname: None,
            runner_url: String::new(),
            runner_short_description: String::new(),
            repo: RepoInfo::default(),
            strategy: GitStrategy::default(),
            submodule_strategy: SubmoduleStrategy::default(),
            checkout_enabled: true,
            variables: Variables::new(),
            tls_ca_chain: None,
            tls_cert: None,
            tls_key: None,
            shell_kind: ShellKind::default(),
            shell_type: ShellType::default(),
            executor_kind: ExecutorKind::default(),
            feature_flags: BTreeMap::new(),
            options: JobOptions::default(),
            pre_clone_script: String::new(),
            post_clone_script: String::new(),
            pre_build_script: String::new(),
            post_build_script: String::new(),
            commands: String::new(),
            runner_helper_cmd: String::new(),
            debug_trace: false,
            timeout_secs: default_timeout_secs(),
            job_status: JobStatus::default(),
            user: None,
            host_os: HostOs::default(),
            trap_exit: false,
            secrets: BTreeMap::new(),
            feature_overrides: BTreeMap::new(),
        }
    }

    /// Checks the fields every stage depends on
    pub fn validate(&self) -> Result<()> {
        if self.project_dir.is_empty() {
            return Err(GeneratorError::InvalidJobContext(
                "project_dir cannot be empty".to_string(),
            ));
        }

        if self.tmp_dir.is_empty() {
            return Err(GeneratorError::InvalidJobContext(
                "tmp_dir cannot be empty".to_string(),
            ));
        }

        if self.timeout_secs == 0 {
            return Err(GeneratorError::InvalidJobContext(
                "timeout_secs must be greater than 0".to_string(),
            ));
        }

        for variable in &self.variables {
            if variable.key.is_empty() {
                return Err(GeneratorError::InvalidJobContext(
                    "variable key cannot be empty".to_string(),
                ));
            }
        }

        Ok(())
    }

    /// Feature flags for this job
    pub fn features(&self) -> FeatureSet {
        let mut features = FeatureSet::from_map(&self.feature_flags);
        features.apply_variables(&self.variables);
        for (name, value) in &self.feature_overrides {
            features.set(name, *value);
        }
        features
    }

    /// Effective git strategy (`GIT_STRATEGY` overrides the field)
    pub fn git_strategy(&self) -> Result<GitStrategy> {
        match self.variables.value("GIT_STRATEGY") {
            Some(value) if !value.is_empty() => value.parse(),
            _ => Ok(self.strategy),
        }
    }

    /// Effective submodule strategy (`GIT_SUBMODULE_STRATEGY` overrides the field)
    pub fn git_submodule_strategy(&self) -> Result<SubmoduleStrategy> {
        match self.variables.value("GIT_SUBMODULE_STRATEGY") {
            Some(value) if !value.is_empty() => value.parse(),
            _ => Ok(self.submodule_strategy),
        }
    }

    /// Whether to check out the job's commit (`GIT_CHECKOUT=false` disables)
    pub fn git_checkout(&self) -> bool {
        match self.variables.value("GIT_CHECKOUT") {
            Some(value) if !value.is_empty() => parse_bool(value),
            _ => self.checkout_enabled,
        }
    }

    /// Clone/fetch depth; 0 means full history
    pub fn git_depth(&self) -> u32 {
        self.variables
            .value("GIT_DEPTH")
            .and_then(|value| value.trim().parse::<u32>().ok())
            .unwrap_or(self.repo.depth)
    }

    /// Flags for `git clean`; empty disables cleaning
    pub fn git_clean_flags(&self) -> Vec<String> {
        flag_list(self.variables.value("GIT_CLEAN_FLAGS"), &["-ffdx"])
    }

    /// Extra flags for `git fetch`
    pub fn git_fetch_flags(&self) -> Vec<String> {
        flag_list(self.variables.value("GIT_FETCH_EXTRA_FLAGS"), &["--prune"])
    }

    /// True when the user set `GIT_LFS_SKIP_SMUDGE`
    pub fn is_lfs_smudge_disabled(&self) -> bool {
        self.variables.bool("GIT_LFS_SKIP_SMUDGE").unwrap_or(false)
    }

    /// Shell tracing requested by the job or by `CI_DEBUG_TRACE`
    pub fn is_debug_trace(&self) -> bool {
        self.debug_trace || self.variables.bool("CI_DEBUG_TRACE").unwrap_or(false)
    }

    /// Expands `$NAME`, `${NAME}` and `%NAME%` for cache keys
    ///
    /// File variables expand to their backing path under `tmp_dir`.
    pub fn expand(&self, text: &str) -> String {
        expand_key_with(text, |name| {
            self.variables.get(name).map(|variable| {
                if variable.file {
                    format!("{}/{}", self.tmp_dir.trim_end_matches(['/', '\\']), variable.key)
                } else {
                    variable.value.clone()
                }
            })
        })
    }

    /// Expands `$NAME` and `${NAME}` in an exported value
    ///
    /// References to file variables are kept as [`ValueSegment::FilePath`]
    /// so the writer can render the same path it writes the file to.
    /// Adjacent text is merged and undefined names drop out.
    pub fn expand_value(&self, text: &str) -> Vec<ValueSegment> {
        let mut segments: Vec<ValueSegment> = Vec::new();
        for token in tokenize(text, false) {
            let segment = match token {
                Token::Text(text) => ValueSegment::Text(text),
                Token::Reference(name) => match self.variables.get(&name) {
                    Some(variable) if variable.file => ValueSegment::FilePath(variable.key.clone()),
                    Some(variable) if !variable.value.is_empty() => {
                        ValueSegment::Text(variable.value.clone())
                    }
                    _ => continue,
                },
            };

            if let ValueSegment::Text(text) = &segment {
                if let Some(ValueSegment::Text(last)) = segments.last_mut() {
                    last.push_str(text);
                    continue;
                }
            }
            segments.push(segment);
        }
        segments
    }

    /// Default cache key, `<job_name>/<ref_name>` without empty segments
    pub fn default_cache_key(&self) -> String {
        [self.job_name.as_str(), self.repo.ref_name.as_str()]
            .iter()
            .filter(|segment| !segment.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Upstream jobs that produced artifacts
    pub fn dependencies_with_artifacts(&self) -> Vec<&Dependency> {
        self.options
            .dependencies
            .iter()
            .filter(|dependency| !dependency.artifacts_file.is_empty())
            .collect()
    }
}

fn flag_list(value: Option<&str>, default: &[&str]) -> Vec<String> {
    match value.map(str::trim) {
        Some("none") => Vec::new(),
        Some(value) if !value.is_empty() => value.split_whitespace().map(str::to_string).collect(),
        _ => default.iter().map(|flag| flag.to_string()).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::variables::Variable;

    fn job() -> JobContext {
        let mut job = JobContext::new(42, "/builds/group/project", "/builds/group/project.tmp");
        job.job_name = "build".to_string();
        job.repo = RepoInfo {
            url: "https://example.com/group/project.git".to_string(),
            ref_name: "main".to_string(),
            sha: "0123456789abcdef".to_string(),
            is_tag: false,
            depth: 20,
        };
        job
    }

    #[test]
    fn test_minimal_payload() {
        let job: JobContext = serde_json::from_str(
            r#"{"job_id":1,"project_dir":"/b/p","tmp_dir":"/b/p.tmp","repo":{"url":"https://g/x.git"}}"#,
        )
        .unwrap();
        assert_eq!(job.strategy, GitStrategy::Fetch);
        assert_eq!(job.shell_kind, ShellKind::Bash);
        assert!(job.checkout_enabled);
        assert_eq!(job.timeout_secs, 3600);
        assert_eq!(job.cache_dir, "cache");
        assert!(job.validate().is_ok());
    }

    #[test]
    fn test_unknown_strategy_in_payload() {
        let result: std::result::Result<JobContext, _> = serde_json::from_str(
            r#"{"job_id":1,"project_dir":"/b","tmp_dir":"/t","repo":{"url":"u"},"strategy":"rsync"}"#,
        );
        let err = result.unwrap_err();
        assert!(err.to_string().contains("unknown GIT_STRATEGY: rsync"));
    }

    #[test]
    fn test_validate() {
        let mut job = job();
        assert!(job.validate().is_ok());

        job.tmp_dir = String::new();
        assert_eq!(job.validate().unwrap_err().kind(), "invalid_job_context");
    }

    #[test]
    fn test_variable_overrides() {
        let mut job = job();
        assert_eq!(job.git_strategy().unwrap(), GitStrategy::Fetch);
        assert_eq!(job.git_depth(), 20);
        assert!(job.git_checkout());

        job.variables.push(Variable::new("GIT_STRATEGY", "clone"));
        job.variables.push(Variable::new("GIT_DEPTH", "3"));
        job.variables.push(Variable::new("GIT_CHECKOUT", "false"));
        job.variables
            .push(Variable::new("GIT_SUBMODULE_STRATEGY", "recursive"));

        assert_eq!(job.git_strategy().unwrap(), GitStrategy::Clone);
        assert_eq!(job.git_depth(), 3);
        assert!(!job.git_checkout());
        assert_eq!(
            job.git_submodule_strategy().unwrap(),
            SubmoduleStrategy::Recursive
        );
    }

    #[test]
    fn test_invalid_strategy_variables() {
        let mut job = job();
        job.variables.push(Variable::new("GIT_STRATEGY", "rsync"));
        job.variables
            .push(Variable::new("GIT_SUBMODULE_STRATEGY", "deep"));

        assert_eq!(job.git_strategy().unwrap_err().kind(), "unknown_git_strategy");
        assert_eq!(
            job.git_submodule_strategy().unwrap_err().kind(),
            "unknown_submodule_strategy"
        );
    }

    #[test]
    fn test_clean_and_fetch_flags() {
        let mut job = job();
        assert_eq!(job.git_clean_flags(), vec!["-ffdx"]);
        assert_eq!(job.git_fetch_flags(), vec!["--prune"]);

        job.variables.push(Variable::new("GIT_CLEAN_FLAGS", "none"));
        job.variables
            .push(Variable::new("GIT_FETCH_EXTRA_FLAGS", "--prune --quiet"));
        assert!(job.git_clean_flags().is_empty());
        assert_eq!(job.git_fetch_flags(), vec!["--prune", "--quiet"]);
    }

    #[test]
    fn test_feature_precedence() {
        use crate::features::HASH_CACHE_KEYS;

        let mut job = job();
        job.feature_flags.insert(HASH_CACHE_KEYS.to_string(), true);
        assert!(job.features().hash_cache_keys);

        job.variables.push(Variable::new(HASH_CACHE_KEYS, "false"));
        assert!(!job.features().hash_cache_keys);

        job.feature_overrides.insert(HASH_CACHE_KEYS.to_string(), true);
        assert!(job.features().hash_cache_keys);
    }

    #[test]
    fn test_debug_trace_variable() {
        let mut job = job();
        assert!(!job.is_debug_trace());
        job.variables.push(Variable::new("CI_DEBUG_TRACE", "true"));
        assert!(job.is_debug_trace());
    }

    #[test]
    fn test_expand_file_variable_to_path() {
        let mut job = job();
        job.variables.push(Variable::file("CONFIG", "secret"));
        job.variables.push(Variable::new("ENV", "prod"));

        assert_eq!(
            job.expand("$ENV:$CONFIG"),
            "prod:/builds/group/project.tmp/CONFIG"
        );
    }

    #[test]
    fn test_expand_value_segments() {
        let mut job = job();
        job.variables.push(Variable::file("CERT", "pem"));
        job.variables.push(Variable::new("HOST", "example.com"));

        assert_eq!(
            job.expand_value("--cacert=$CERT --host ${HOST}:%PORT%"),
            vec![
                ValueSegment::Text("--cacert=".to_string()),
                ValueSegment::FilePath("CERT".to_string()),
                ValueSegment::Text(" --host example.com:%PORT%".to_string()),
            ]
        );
        assert_eq!(
            job.expand_value("%USERPROFILE%\\bin$UNDEFINED"),
            vec![ValueSegment::Text("%USERPROFILE%\\bin".to_string())]
        );
        assert!(job.expand_value("$UNDEFINED").is_empty());
    }

    #[test]
    fn test_default_cache_key() {
        let mut job = job();
        assert_eq!(job.default_cache_key(), "build/main");
        job.repo.ref_name = String::new();
        assert_eq!(job.default_cache_key(), "build");
    }

    #[test]
    fn test_when_applies() {
        assert!(When::OnSuccess.applies(JobStatus::Success));
        assert!(!When::OnSuccess.applies(JobStatus::Failed));
        assert!(When::OnFailure.applies(JobStatus::Failed));
        assert!(When::Always.applies(JobStatus::Failed));
    }

    #[test]
    fn test_cache_policy() {
        assert_eq!("".parse::<CachePolicy>().unwrap(), CachePolicy::PullPush);
        assert!("pull".parse::<CachePolicy>().unwrap().allows_pull());
        assert!(!"pull".parse::<CachePolicy>().unwrap().allows_push());
        assert!("sometimes".parse::<CachePolicy>().is_err());
    }

    #[test]
    fn test_archiver_args() {
        let cache = CacheOptions {
            paths: vec!["bin".to_string(), "obj".to_string()],
            untracked: true,
            ..Default::default()
        };
        assert_eq!(
            cache.archiver_args(),
            vec!["--path", "bin", "--path", "obj", "--untracked"]
        );
        assert!(CacheOptions::default().archiver_args().is_empty());
    }
}
