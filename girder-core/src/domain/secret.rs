//! Secret references attached to a job
//!
//! A `SecretRef` names exactly one backend section. Resolution happens in
//! `girder-secrets` before any script is emitted.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Reference to an externally stored secret
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SecretRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vault: Option<VaultSecret>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gitlab_secrets_manager: Option<GitLabSecretsManagerSecret>,

    /// Backends without a built-in resolver keep their raw payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gcp_secret_manager: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aws_secrets_manager: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub akeyless: Option<serde_json::Value>,

    /// Materialize as a file variable (default true)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<bool>,
}

impl SecretRef {
    pub fn is_file(&self) -> bool {
        self.file.unwrap_or(true)
    }

    /// Names of the backend sections present in this reference
    pub fn backends(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.vault.is_some() {
            names.push("vault");
        }
        if self.gitlab_secrets_manager.is_some() {
            names.push("gitlab_secrets_manager");
        }
        if self.gcp_secret_manager.is_some() {
            names.push("gcp_secret_manager");
        }
        if self.aws_secrets_manager.is_some() {
            names.push("aws_secrets_manager");
        }
        if self.akeyless.is_some() {
            names.push("akeyless");
        }
        names
    }
}

/// HashiCorp Vault secret location
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VaultSecret {
    pub server: VaultServer,
    pub engine: SecretEngine,
    pub path: String,
    pub field: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VaultServer {
    pub url: String,
    pub auth: VaultAuth,
    #[serde(default)]
    pub namespace: String,
}

/// Vault auth method, e.g. `{name: "jwt", path: "jwt", data: {role, jwt}}`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VaultAuth {
    pub name: String,
    pub path: String,
    #[serde(default)]
    pub data: BTreeMap<String, serde_json::Value>,
}

/// Secret engine mount, e.g. `{name: "kv-v2", path: "secret"}`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SecretEngine {
    pub name: String,
    pub path: String,
}

/// GitLab secrets manager (OpenBao) secret location
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GitLabSecretsManagerSecret {
    pub server: GitLabSecretsManagerServer,
    pub engine: SecretEngine,
    pub path: String,
    pub field: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GitLabSecretsManagerServer {
    pub url: String,
    pub inline_auth: InlineAuth,
}

/// JWT login performed on every resolution
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct InlineAuth {
    /// Full login path; takes precedence over `auth_mount`
    #[serde(default)]
    pub path: String,
    pub jwt: String,
    pub role: String,
    /// Older payloads only send the mount, expanded to `auth/<mount>/login`
    #[serde(default)]
    pub auth_mount: String,
}

impl InlineAuth {
    /// Login path relative to `/v1/`
    pub fn login_path(&self) -> String {
        if !self.path.is_empty() {
            self.path.trim_matches('/').to_string()
        } else {
            format!("auth/{}/login", self.auth_mount.trim_matches('/'))
        }
    }
}
