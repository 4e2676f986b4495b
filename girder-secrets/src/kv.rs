//! Minimal Vault HTTP API client shared by the Vault and OpenBao adapters

use reqwest::Client;
use serde_json::{Value, json};
use tracing::debug;

use crate::error::{Result, SecretError};

/// Key/value secret engine versions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KvVersion {
    V1,
    V2,
}

impl KvVersion {
    /// Maps an engine name from the job payload
    pub fn from_engine(name: &str) -> Result<Self> {
        match name {
            "kv-v1" | "generic" => Ok(KvVersion::V1),
            "kv-v2" => Ok(KvVersion::V2),
            other => Err(SecretError::InvalidReference(format!(
                "unsupported secret engine {:?}",
                other
            ))),
        }
    }
}

/// Authenticated session against one Vault-compatible server
#[derive(Debug, Clone)]
pub struct KvClient {
    client: Client,
    base_url: String,
    namespace: Option<String>,
    token: Option<String>,
}

impl KvClient {
    /// # Arguments
    /// * `client` - Shared HTTP client
    /// * `base_url` - Server URL, without the `/v1` prefix
    pub fn new(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            namespace: None,
            token: None,
        }
    }

    pub fn with_namespace(mut self, namespace: &str) -> Self {
        if !namespace.is_empty() {
            self.namespace = Some(namespace.to_string());
        }
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/{}", self.base_url, path.trim_matches('/'))
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let mut request = self.client.request(method, self.url(path));
        if let Some(namespace) = &self.namespace {
            request = request.header("X-Vault-Namespace", namespace);
        }
        if let Some(token) = &self.token {
            request = request.header("X-Vault-Token", token);
        }
        request
    }

    /// Performs a JWT login and keeps the returned client token
    ///
    /// # Arguments
    /// * `login_path` - Path under `/v1/`, e.g. `auth/jwt/login`
    /// * `role` - Role bound to the JWT
    /// * `jwt` - The job's ID token
    pub async fn login_jwt(&mut self, login_path: &str, role: &str, jwt: &str) -> Result<()> {
        debug!("Logging in at {}", login_path);
        let response = self
            .request(reqwest::Method::POST, login_path)
            .json(&json!({ "role": role, "jwt": jwt }))
            .send()
            .await?;
        let body = handle_response(response).await?;

        let token = body
            .pointer("/auth/client_token")
            .and_then(Value::as_str)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| {
                SecretError::InvalidResponse("login response carries no client token".to_string())
            })?;
        self.token = Some(token.to_string());
        Ok(())
    }

    /// Reads one field of a key/value secret
    ///
    /// # Arguments
    /// * `version` - Engine version, decides the URL layout and body shape
    /// * `mount` - Engine mount path
    /// * `path` - Secret path inside the mount
    /// * `field` - Field of the secret to return
    pub async fn read_field(
        &self,
        version: KvVersion,
        mount: &str,
        path: &str,
        field: &str,
    ) -> Result<String> {
        let mount = mount.trim_matches('/');
        let path = path.trim_matches('/');
        let (url_path, pointer) = match version {
            KvVersion::V1 => (format!("{}/{}", mount, path), "/data"),
            KvVersion::V2 => (format!("{}/data/{}", mount, path), "/data/data"),
        };

        debug!("Reading secret {}", url_path);
        let response = self.request(reqwest::Method::GET, &url_path).send().await?;
        let body = match handle_response(response).await {
            Err(error) if error.is_not_found() => {
                return Err(SecretError::NotFound(format!("{}/{}", mount, path)));
            }
            other => other?,
        };

        let data = body.pointer(pointer).ok_or_else(|| {
            SecretError::InvalidResponse(format!("{} has no data section", url_path))
        })?;
        match data.get(field) {
            None | Some(Value::Null) => Err(SecretError::NotFound(format!(
                "{}/{} field {}",
                mount, path, field
            ))),
            Some(Value::String(value)) => Ok(value.clone()),
            Some(value) => Ok(value.to_string()),
        }
    }
}

async fn handle_response(response: reqwest::Response) -> Result<Value> {
    let status = response.status();

    if !status.is_success() {
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(SecretError::api_error(status.as_u16(), error_text));
    }

    response
        .json()
        .await
        .map_err(|e| SecretError::InvalidResponse(format!("Failed to parse JSON response: {}", e)))
}
