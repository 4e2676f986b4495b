//! Error types for secret resolution

use girder_core::GeneratorError;
use thiserror::Error;

/// Result type alias for secret operations
pub type Result<T> = std::result::Result<T, SecretError>;

/// Errors raised while resolving secrets
#[derive(Debug, Error)]
pub enum SecretError {
    /// No registered resolver claims the secret
    #[error("no resolver that can handle secret {0}")]
    Unsupported(String),

    /// More than one resolver claims the secret
    #[error("secret {key} is claimed by several resolvers: {resolvers}")]
    Ambiguous { key: String, resolvers: String },

    /// The reference cannot be resolved as written (unknown engine or auth method)
    #[error("invalid secret reference: {0}")]
    InvalidReference(String),

    /// The backend has no such secret or field
    #[error("secret not found: {0}")]
    NotFound(String),

    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// The backend answered with an error status
    #[error("API error (status {status}): {message}")]
    ApiError { status: u16, message: String },

    /// The backend answered with a body we cannot use
    #[error("unexpected response: {0}")]
    InvalidResponse(String),

    /// Resolution ran past its deadline
    #[error("secret resolution exceeded {0} ms")]
    DeadlineExceeded(u64),

    /// The caller cancelled resolution
    #[error("secret resolution cancelled")]
    Cancelled,
}

impl SecretError {
    pub fn api_error(status: u16, message: impl Into<String>) -> Self {
        Self::ApiError {
            status,
            message: message.into(),
        }
    }

    /// Check if this error means the secret does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_)) || matches!(self, Self::ApiError { status: 404, .. })
    }

    /// Check if the backend could not be talked to
    pub fn is_transport_error(&self) -> bool {
        matches!(
            self,
            Self::RequestFailed(_) | Self::ApiError { .. } | Self::InvalidResponse(_)
        ) && !self.is_not_found()
    }
}

impl From<SecretError> for GeneratorError {
    fn from(error: SecretError) -> Self {
        match error {
            SecretError::DeadlineExceeded(ms) => GeneratorError::DeadlineExceeded(ms),
            SecretError::Cancelled => GeneratorError::Cancelled,
            error if error.is_not_found() => GeneratorError::SecretUnavailable(error.to_string()),
            error if error.is_transport_error() => {
                GeneratorError::SecretTransportFailed(error.to_string())
            }
            error => GeneratorError::SecretUnsupported(error.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_predicate() {
        assert!(SecretError::NotFound("db".into()).is_not_found());
        assert!(SecretError::api_error(404, "").is_not_found());
        assert!(!SecretError::api_error(403, "denied").is_not_found());
        assert!(SecretError::api_error(403, "denied").is_transport_error());
        assert!(!SecretError::api_error(404, "").is_transport_error());
    }

    #[test]
    fn test_generator_error_kinds() {
        let kind = |error: SecretError| GeneratorError::from(error).kind();
        assert_eq!(kind(SecretError::Unsupported("A".into())), "secret_unsupported");
        assert_eq!(
            kind(SecretError::Ambiguous {
                key: "A".into(),
                resolvers: "vault, akeyless".into()
            }),
            "secret_unsupported"
        );
        assert_eq!(kind(SecretError::NotFound("A".into())), "secret_unavailable");
        assert_eq!(kind(SecretError::api_error(404, "")), "secret_unavailable");
        assert_eq!(kind(SecretError::api_error(500, "boom")), "secret_transport_failed");
        assert_eq!(kind(SecretError::DeadlineExceeded(30_000)), "deadline_exceeded");
        assert_eq!(kind(SecretError::Cancelled), "cancelled");
    }
}
