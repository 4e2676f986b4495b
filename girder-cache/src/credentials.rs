//! Signing credentials
//!
//! Static keys come from the cache configuration. When both keys are
//! empty the credentials of the instance role are fetched from the EC2
//! metadata service before any script is generated.

use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::S3Config;
use crate::error::{CacheError, Result};

/// Default instance metadata endpoint
pub const DEFAULT_METADATA_ENDPOINT: &str = "http://169.254.169.254";

const TOKEN_TTL_HEADER: &str = "X-aws-ec2-metadata-token-ttl-seconds";
const TOKEN_HEADER: &str = "X-aws-ec2-metadata-token";
const CREDENTIALS_PATH: &str = "/latest/meta-data/iam/security-credentials/";

/// Access key pair used for SigV4 signing
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access_key: String,
    pub secret_key: String,
    pub session_token: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .field("session_token", &self.session_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl Credentials {
    pub fn new(access_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            access_key: access_key.into(),
            secret_key: secret_key.into(),
            session_token: None,
        }
    }

    pub fn with_session_token(mut self, token: impl Into<String>) -> Self {
        let token = token.into();
        self.session_token = if token.is_empty() { None } else { Some(token) };
        self
    }

    /// Static credentials from the bucket settings, if any
    pub fn from_config(config: &S3Config) -> Option<Self> {
        if config.uses_instance_credentials() {
            return None;
        }
        Some(
            Self::new(config.access_key.clone(), config.secret_key.clone())
                .with_session_token(config.session_token.clone()),
        )
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InstanceCredentials {
    access_key_id: String,
    secret_access_key: String,
    #[serde(default)]
    token: String,
}

/// Client for the EC2 instance metadata service (IMDSv2)
#[derive(Debug, Clone)]
pub struct MetadataClient {
    endpoint: String,
    client: reqwest::Client,
}

impl MetadataClient {
    /// Creates a client for `endpoint`
    ///
    /// # Arguments
    /// * `endpoint` - Base URL, e.g. `http://169.254.169.254`
    /// * `timeout` - Per-request timeout
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    /// Fetches credentials of the instance role
    pub async fn fetch_credentials(&self) -> Result<Credentials> {
        let token = self.session_token().await?;

        let url = format!("{}{}", self.endpoint, CREDENTIALS_PATH);
        let role = self.get_text(&url, &token).await?;
        let role = role.lines().next().map(str::trim).unwrap_or_default();
        if role.is_empty() {
            return Err(CacheError::MissingCredentials(
                "no instance role attached".to_string(),
            ));
        }
        debug!("Using instance role {}", role);

        let url = format!("{}{}{}", self.endpoint, CREDENTIALS_PATH, role);
        let body = self.get_text(&url, &token).await?;
        let credentials: InstanceCredentials = serde_json::from_str(&body)?;

        info!("Fetched instance credentials for role {}", role);
        Ok(Credentials::new(credentials.access_key_id, credentials.secret_access_key)
            .with_session_token(credentials.token))
    }

    async fn session_token(&self) -> Result<String> {
        let response = self
            .client
            .put(format!("{}/latest/api/token", self.endpoint))
            .header(TOKEN_TTL_HEADER, "21600")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(CacheError::metadata_status(status.as_u16(), message));
        }
        Ok(response.text().await?)
    }

    async fn get_text(&self, url: &str, token: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .header(TOKEN_HEADER, token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(CacheError::metadata_status(status.as_u16(), message));
        }
        Ok(response.text().await?)
    }
}
