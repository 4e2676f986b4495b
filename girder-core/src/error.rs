//! Error types for script generation

use thiserror::Error;

/// Result type alias for generator operations
pub type Result<T> = std::result::Result<T, GeneratorError>;

/// Errors surfaced by the script generator
///
/// Fatal kinds mean the executor must not run the job. The two non-fatal
/// kinds (`CacheUrlUnavailable`, `HelperMissing`) are normally turned into
/// warnings inside the emitted script and only reach callers that ask for
/// them explicitly.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeneratorError {
    /// Stage name outside the closed build stage enumeration
    #[error("unknown build stage: {0}")]
    UnknownBuildStage(String),

    /// Unrecognized `GIT_STRATEGY`
    #[error("unknown GIT_STRATEGY: {0}")]
    UnknownGitStrategy(String),

    /// Unrecognized `GIT_SUBMODULE_STRATEGY`
    #[error("unknown GIT_SUBMODULE_STRATEGY: {0}")]
    UnknownSubmoduleStrategy(String),

    /// A string cannot be represented in the target dialect
    #[error("cannot quote value for {shell}: {reason}")]
    QuotingUnsupported {
        /// Dialect name
        shell: String,
        /// What made the value unrepresentable
        reason: String,
    },

    /// No registered resolver claims the secret
    #[error("no resolver that can handle secret {0}")]
    SecretUnsupported(String),

    /// The backend answered but the secret does not exist
    #[error("secret not found: {0}")]
    SecretUnavailable(String),

    /// The backend could not be reached or answered with an error
    #[error("secret transport failed: {0}")]
    SecretTransportFailed(String),

    /// The cache backend could not sign a URL
    #[error("cache URL unavailable: {0}")]
    CacheUrlUnavailable(String),

    /// The helper binary is not configured for this executor
    #[error("helper binary missing: {0}")]
    HelperMissing(String),

    /// Generation was cancelled by the caller
    #[error("generation cancelled")]
    Cancelled,

    /// Secret resolution ran past its deadline
    #[error("deadline exceeded after {0} ms")]
    DeadlineExceeded(u64),

    /// A writer was finished with unclosed or over-closed blocks
    #[error("unbalanced control flow (depth {0})")]
    UnbalancedControlFlow(i64),

    /// The job context is missing data or holds an invalid value
    #[error("invalid job context: {0}")]
    InvalidJobContext(String),
}

impl GeneratorError {
    /// Create a quoting error for a dialect
    pub fn quoting(shell: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::QuotingUnsupported {
            shell: shell.into(),
            reason: reason.into(),
        }
    }

    /// Stable snake_case name of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnknownBuildStage(_) => "unknown_build_stage",
            Self::UnknownGitStrategy(_) => "unknown_git_strategy",
            Self::UnknownSubmoduleStrategy(_) => "unknown_submodule_strategy",
            Self::QuotingUnsupported { .. } => "quoting_unsupported",
            Self::SecretUnsupported(_) => "secret_unsupported",
            Self::SecretUnavailable(_) => "secret_unavailable",
            Self::SecretTransportFailed(_) => "secret_transport_failed",
            Self::CacheUrlUnavailable(_) => "cache_url_unavailable",
            Self::HelperMissing(_) => "helper_missing",
            Self::Cancelled => "cancelled",
            Self::DeadlineExceeded(_) => "deadline_exceeded",
            Self::UnbalancedControlFlow(_) => "unbalanced_control_flow",
            Self::InvalidJobContext(_) => "invalid_job_context",
        }
    }

    /// Check if this error must stop the job
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Self::CacheUrlUnavailable(_) | Self::HelperMissing(_)
        )
    }

    /// Check if this error comes from secret resolution
    pub fn is_secret_error(&self) -> bool {
        matches!(
            self,
            Self::SecretUnsupported(_)
                | Self::SecretUnavailable(_)
                | Self::SecretTransportFailed(_)
        )
    }
}
