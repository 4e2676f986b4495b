//! Cache backend configuration
//!
//! Loaded from a JSON document such as:
//!
//! ```json
//! {
//!   "type": "s3",
//!   "path": "runners",
//!   "shared": false,
//!   "s3": {
//!     "server_address": "s3.amazonaws.com",
//!     "bucket_name": "ci-cache",
//!     "bucket_location": "eu-west-1"
//!   }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{CacheError, Result};

/// Default S3 endpoint when none is configured
pub const DEFAULT_S3_SERVER: &str = "s3.amazonaws.com";

/// Default region when the bucket location is not configured
pub const DEFAULT_S3_REGION: &str = "us-east-1";

/// Storage backend kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheType {
    S3,
    Gcs,
    Azure,
    Custom,
    #[default]
    None,
}

/// Cache backend for a runner
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(rename = "type", default)]
    pub cache_type: CacheType,

    /// Prefix for every object name
    #[serde(default)]
    pub path: String,

    /// Share cache objects between runners
    #[serde(default)]
    pub shared: bool,

    #[serde(default)]
    pub s3: Option<S3Config>,
}

/// S3 bucket settings
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct S3Config {
    #[serde(default)]
    pub server_address: String,

    /// Static credentials; both empty means instance credentials
    #[serde(default)]
    pub access_key: String,

    #[serde(default)]
    pub secret_key: String,

    #[serde(default)]
    pub session_token: String,

    pub bucket_name: String,

    /// Region the bucket lives in; never probed
    #[serde(default)]
    pub bucket_location: String,

    /// Use plain HTTP
    #[serde(default)]
    pub insecure: bool,

    /// Address the bucket in the path instead of the host name
    #[serde(default)]
    pub path_style: bool,
}

impl S3Config {
    pub fn new(bucket_name: impl Into<String>) -> Self {
        Self {
            bucket_name: bucket_name.into(),
            ..Default::default()
        }
    }

    pub fn server(&self) -> &str {
        if self.server_address.is_empty() {
            DEFAULT_S3_SERVER
        } else {
            &self.server_address
        }
    }

    pub fn region(&self) -> &str {
        if self.bucket_location.is_empty() {
            DEFAULT_S3_REGION
        } else {
            &self.bucket_location
        }
    }

    /// True when neither key is set and instance credentials are required
    pub fn uses_instance_credentials(&self) -> bool {
        self.access_key.is_empty() && self.secret_key.is_empty()
    }

    pub fn with_static_credentials(
        mut self,
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        self.access_key = access_key.into();
        self.secret_key = secret_key.into();
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.bucket_location = location.into();
        self
    }
}

impl CacheConfig {
    /// Configuration for an S3 bucket
    pub fn s3(s3: S3Config) -> Self {
        Self {
            cache_type: CacheType::S3,
            s3: Some(s3),
            ..Default::default()
        }
    }

    /// Parses a JSON document
    pub fn from_json(json: &str) -> Result<Self> {
        let config: CacheConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Validates the backend settings
    pub fn validate(&self) -> Result<()> {
        if self.cache_type == CacheType::S3 {
            let Some(s3) = &self.s3 else {
                return Err(CacheError::InvalidConfig(
                    "s3 cache requires an s3 section".to_string(),
                ));
            };

            if s3.bucket_name.is_empty() {
                return Err(CacheError::InvalidConfig(
                    "bucket_name cannot be empty".to_string(),
                ));
            }

            if s3.access_key.is_empty() != s3.secret_key.is_empty() {
                return Err(CacheError::InvalidConfig(
                    "access_key and secret_key must be set together".to_string(),
                ));
            }
        }

        Ok(())
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn with_shared(mut self, shared: bool) -> Self {
        self.shared = shared;
        self
    }
}
