//! GitLab secrets manager resolver (OpenBao with inline JWT auth)

use async_trait::async_trait;
use girder_core::domain::secret::SecretRef;
use reqwest::Client;

use crate::error::{Result, SecretError};
use crate::kv::{KvClient, KvVersion};
use crate::resolver::SecretResolver;

pub const RESOLVER_NAME: &str = "gitlab_secrets_manager";

#[derive(Debug, Clone)]
pub struct GitLabSecretsManagerResolver {
    client: Client,
}

impl GitLabSecretsManagerResolver {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SecretResolver for GitLabSecretsManagerResolver {
    fn name(&self) -> &'static str {
        RESOLVER_NAME
    }

    fn is_supported(&self, secret: &SecretRef) -> bool {
        secret.gitlab_secrets_manager.is_some()
    }

    async fn resolve(&self, secret: &SecretRef) -> Result<String> {
        let secret = secret.gitlab_secrets_manager.as_ref().ok_or_else(|| {
            SecretError::InvalidReference("missing gitlab_secrets_manager section".to_string())
        })?;
        let auth = &secret.server.inline_auth;
        if auth.jwt.is_empty() || auth.role.is_empty() {
            return Err(SecretError::InvalidReference(
                "inline auth requires jwt and role".to_string(),
            ));
        }

        let mut client = KvClient::new(self.client.clone(), &secret.server.url);
        client.login_jwt(&auth.login_path(), &auth.role, &auth.jwt).await?;
        client
            .read_field(KvVersion::V2, &secret.engine.path, &secret.path, &secret.field)
            .await
    }
}
