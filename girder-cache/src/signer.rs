//! Cache URL signing
//!
//! The generator asks a `CacheUrlSigner` for download/upload URLs while
//! assembling cache stages. Signing is synchronous and performs no I/O;
//! anything that needs the network (instance credentials) happens when the
//! signer is built.

use chrono::{DateTime, Utc};
use girder_core::JobContext;
use tracing::debug;

use crate::config::{CacheConfig, CacheType};
use crate::credentials::{Credentials, MetadataClient};
use crate::error::{CacheError, Result};
use crate::s3::{PresignMethod, S3Presigner};

/// Produces signed cache object URLs for a job
pub trait CacheUrlSigner: Send + Sync {
    /// URL the helper downloads the archive from; `None` lets the helper
    /// fall back to its own behaviour
    fn download_url(&self, job: &JobContext, object_key: &str) -> Result<Option<String>>;

    /// URL the helper uploads the archive to
    fn upload_url(&self, job: &JobContext, object_key: &str) -> Result<Option<String>>;
}

/// Signer for runners without a remote cache
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCache;

impl CacheUrlSigner for NoCache {
    fn download_url(&self, _job: &JobContext, _object_key: &str) -> Result<Option<String>> {
        Ok(None)
    }

    fn upload_url(&self, _job: &JobContext, _object_key: &str) -> Result<Option<String>> {
        Ok(None)
    }
}

/// Object name of a cache entry
///
/// `[<path>/][runner/<short_description>/]project/<project_id>/<key>`; the
/// runner segment is left out for shared caches.
pub fn object_name(config: &CacheConfig, job: &JobContext, object_key: &str) -> String {
    let mut segments: Vec<String> = Vec::new();

    let prefix = config.path.trim_matches('/');
    if !prefix.is_empty() {
        segments.push(prefix.to_string());
    }
    if !config.shared {
        segments.push("runner".to_string());
        segments.push(job.runner_short_description.clone());
    }
    segments.push("project".to_string());
    segments.push(job.project_id.to_string());
    segments.push(object_key.to_string());

    segments
        .iter()
        .filter(|segment| !segment.is_empty())
        .cloned()
        .collect::<Vec<_>>()
        .join("/")
}

/// Signer backed by the configured cache
#[derive(Debug, Clone)]
pub struct ConfiguredSigner {
    config: CacheConfig,
    s3: Option<S3Presigner>,
}

impl ConfiguredSigner {
    /// Builds a signer from static configuration
    ///
    /// S3 without static keys yields a signer that reports
    /// `MissingCredentials`; use [`ConfiguredSigner::connect`] to fetch
    /// instance credentials first.
    pub fn new(config: CacheConfig, signed_at: DateTime<Utc>) -> Result<Self> {
        config.validate()?;
        let credentials = config.s3.as_ref().and_then(Credentials::from_config);
        Ok(Self::with_credentials(config, credentials, signed_at))
    }

    /// Builds a signer, fetching instance credentials when S3 has no static keys
    pub async fn connect(
        config: CacheConfig,
        metadata: &MetadataClient,
        signed_at: DateTime<Utc>,
    ) -> Result<Self> {
        config.validate()?;
        let credentials = match (&config.cache_type, &config.s3) {
            (CacheType::S3, Some(s3)) if s3.uses_instance_credentials() => {
                Some(metadata.fetch_credentials().await?)
            }
            (_, Some(s3)) => Credentials::from_config(s3),
            _ => None,
        };
        Ok(Self::with_credentials(config, credentials, signed_at))
    }

    fn with_credentials(
        config: CacheConfig,
        credentials: Option<Credentials>,
        signed_at: DateTime<Utc>,
    ) -> Self {
        let s3 = match (&config.cache_type, &config.s3, credentials) {
            (CacheType::S3, Some(s3), Some(credentials)) => {
                Some(S3Presigner::new(s3.clone(), credentials, signed_at))
            }
            _ => None,
        };
        Self { config, s3 }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    fn sign(&self, method: PresignMethod, job: &JobContext, object_key: &str) -> Result<Option<String>> {
        match self.config.cache_type {
            CacheType::S3 => {
                let presigner = self.s3.as_ref().ok_or_else(|| {
                    CacheError::MissingCredentials("no S3 credentials available".to_string())
                })?;
                let name = object_name(&self.config, job, object_key);
                debug!("Presigning {} for cache object {}", method.as_str(), name);
                presigner.presign(method, &name, job.timeout_secs).map(Some)
            }
            CacheType::Gcs | CacheType::Azure | CacheType::Custom | CacheType::None => Ok(None),
        }
    }
}

impl CacheUrlSigner for ConfiguredSigner {
    fn download_url(&self, job: &JobContext, object_key: &str) -> Result<Option<String>> {
        self.sign(PresignMethod::Get, job, object_key)
    }

    fn upload_url(&self, job: &JobContext, object_key: &str) -> Result<Option<String>> {
        self.sign(PresignMethod::Put, job, object_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::S3Config;
    use chrono::TimeZone;

    fn job() -> JobContext {
        let mut job = JobContext::new(7, "/builds/p", "/builds/p.tmp");
        job.project_id = 42;
        job.runner_short_description = "abc123".to_string();
        job.timeout_secs = 600;
        job
    }

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap()
    }

    #[test]
    fn test_object_name() {
        let config = CacheConfig::default();
        assert_eq!(object_name(&config, &job(), "k1"), "runner/abc123/project/42/k1");

        let config = CacheConfig::default().with_path("/ci/").with_shared(true);
        assert_eq!(object_name(&config, &job(), "deps/linux"), "ci/project/42/deps/linux");
    }

    #[test]
    fn test_no_cache_returns_no_url() {
        assert_eq!(NoCache.download_url(&job(), "k").unwrap(), None);
        assert_eq!(NoCache.upload_url(&job(), "k").unwrap(), None);
    }

    #[test]
    fn test_s3_signer_uses_job_timeout() {
        let config = CacheConfig::s3(
            S3Config::new("bucket")
                .with_static_credentials("AK", "SK")
                .with_location("eu-central-1"),
        );
        let signer = ConfiguredSigner::new(config, fixed_time()).unwrap();

        let url = signer.download_url(&job(), "k1").unwrap().unwrap();
        assert!(url.starts_with("https://bucket.s3.amazonaws.com/runner/abc123/project/42/k1?"));
        assert!(url.contains("X-Amz-Expires=600&"));
        assert!(url.contains("X-Amz-Date=20240102T030405Z"));

        let upload = signer.upload_url(&job(), "k1").unwrap().unwrap();
        assert_ne!(url, upload);
        assert_eq!(upload, signer.upload_url(&job(), "k1").unwrap().unwrap());
    }

    #[test]
    fn test_s3_without_credentials_is_url_error() {
        let signer = ConfiguredSigner::new(CacheConfig::s3(S3Config::new("bucket")), fixed_time()).unwrap();
        let error = signer.download_url(&job(), "k1").unwrap_err();
        assert!(error.is_url_error());
    }

    #[test]
    fn test_other_backends_have_no_url() {
        let config = CacheConfig {
            cache_type: CacheType::Gcs,
            ..Default::default()
        };
        let signer = ConfiguredSigner::new(config, fixed_time()).unwrap();
        assert_eq!(signer.download_url(&job(), "k1").unwrap(), None);
    }
}
