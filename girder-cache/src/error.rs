//! Error types for cache addressing

use girder_core::GeneratorError;
use thiserror::Error;

/// Result type alias for cache operations
pub type Result<T> = std::result::Result<T, CacheError>;

/// Errors raised while addressing or signing cache objects
#[derive(Debug, Error)]
pub enum CacheError {
    /// Cache configuration is incomplete or inconsistent
    #[error("Invalid cache configuration: {0}")]
    InvalidConfig(String),

    /// Configuration document could not be read
    #[error("Failed to read cache configuration: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration document is not valid JSON
    #[error("Failed to parse cache configuration: {0}")]
    Parse(#[from] serde_json::Error),

    /// No credentials were available for signing
    #[error("Missing credentials: {0}")]
    MissingCredentials(String),

    /// Instance metadata request failed
    #[error("Metadata request failed: {0}")]
    Metadata(#[from] reqwest::Error),

    /// Instance metadata answered with an error status
    #[error("Metadata service error (status {status}): {message}")]
    MetadataStatus { status: u16, message: String },

    /// The object URL could not be signed
    #[error("Failed to presign URL: {0}")]
    Presign(String),
}

impl CacheError {
    pub fn metadata_status(status: u16, message: impl Into<String>) -> Self {
        Self::MetadataStatus {
            status,
            message: message.into(),
        }
    }

    /// Errors the generator can survive by omitting `--url`
    pub fn is_url_error(&self) -> bool {
        matches!(
            self,
            Self::MissingCredentials(_) | Self::Presign(_) | Self::Metadata(_) | Self::MetadataStatus { .. }
        )
    }
}

impl From<CacheError> for GeneratorError {
    fn from(error: CacheError) -> Self {
        GeneratorError::CacheUrlUnavailable(error.to_string())
    }
}
