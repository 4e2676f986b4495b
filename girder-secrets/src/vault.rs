//! HashiCorp Vault resolver

use async_trait::async_trait;
use girder_core::domain::secret::{SecretRef, VaultAuth};
use reqwest::Client;
use serde_json::Value;

use crate::error::{Result, SecretError};
use crate::kv::{KvClient, KvVersion};
use crate::resolver::SecretResolver;

pub const RESOLVER_NAME: &str = "vault";

/// Resolves `vault` secrets with a JWT login followed by a KV read
#[derive(Debug, Clone)]
pub struct VaultResolver {
    client: Client,
}

impl VaultResolver {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

/// `role` and `jwt` from the auth data; only the JWT method is known
fn jwt_credentials(auth: &VaultAuth) -> Result<(String, String)> {
    if auth.name != "jwt" {
        return Err(SecretError::InvalidReference(format!(
            "unsupported vault auth method {:?}",
            auth.name
        )));
    }

    let field = |name: &str| match auth.data.get(name) {
        Some(Value::String(value)) if !value.is_empty() => Ok(value.clone()),
        _ => Err(SecretError::InvalidReference(format!(
            "vault jwt auth requires {:?}",
            name
        ))),
    };
    Ok((field("role")?, field("jwt")?))
}

#[async_trait]
impl SecretResolver for VaultResolver {
    fn name(&self) -> &'static str {
        RESOLVER_NAME
    }

    fn is_supported(&self, secret: &SecretRef) -> bool {
        secret.vault.is_some()
    }

    async fn resolve(&self, secret: &SecretRef) -> Result<String> {
        let vault = secret
            .vault
            .as_ref()
            .ok_or_else(|| SecretError::InvalidReference("missing vault section".to_string()))?;
        let version = KvVersion::from_engine(&vault.engine.name)?;
        let (role, jwt) = jwt_credentials(&vault.server.auth)?;

        let mut client = KvClient::new(self.client.clone(), &vault.server.url)
            .with_namespace(&vault.server.namespace);
        let login_path = format!("auth/{}/login", vault.server.auth.path.trim_matches('/'));
        client.login_jwt(&login_path, &role, &jwt).await?;

        client
            .read_field(version, &vault.engine.path, &vault.path, &vault.field)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::tests::{serve, vault_router};
    use girder_core::domain::secret::{SecretEngine, VaultSecret, VaultServer};
    use serde_json::json;

    fn vault_ref(url: &str, engine: &str, mount: &str) -> SecretRef {
        let mut data = std::collections::BTreeMap::new();
        data.insert("role".to_string(), json!("ci"));
        data.insert("jwt".to_string(), json!("id-token"));
        SecretRef {
            vault: Some(VaultSecret {
                server: VaultServer {
                    url: url.to_string(),
                    auth: VaultAuth {
                        name: "jwt".to_string(),
                        path: "jwt".to_string(),
                        data,
                    },
                    namespace: String::new(),
                },
                engine: SecretEngine {
                    name: engine.to_string(),
                    path: mount.to_string(),
                },
                path: "db".to_string(),
                field: "password".to_string(),
            }),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_resolve_kv_v2() {
        let url = serve(vault_router()).await;
        let resolver = VaultResolver::new(Client::new());
        let secret = vault_ref(&url, "kv-v2", "secret");
        assert!(resolver.is_supported(&secret));
        assert_eq!(resolver.resolve(&secret).await.unwrap(), "hunter2");
    }

    #[tokio::test]
    async fn test_resolve_kv_v1() {
        let url = serve(vault_router()).await;
        let resolver = VaultResolver::new(Client::new());
        let secret = vault_ref(&url, "kv-v1", "kv");
        assert_eq!(resolver.resolve(&secret).await.unwrap(), "v1-secret");
    }

    #[tokio::test]
    async fn test_bad_jwt_is_transport_failure() {
        let url = serve(vault_router()).await;
        let mut secret = vault_ref(&url, "kv-v2", "secret");
        if let Some(vault) = secret.vault.as_mut() {
            vault.server.auth.data.insert("jwt".to_string(), json!("forged"));
        }
        let error = VaultResolver::new(Client::new()).resolve(&secret).await.unwrap_err();
        assert!(error.is_transport_error());
    }

    #[test]
    fn test_jwt_credentials() {
        let secret = vault_ref("http://v", "kv-v2", "secret");
        let auth = &secret.vault.as_ref().unwrap().server.auth;
        assert_eq!(
            jwt_credentials(auth).unwrap(),
            ("ci".to_string(), "id-token".to_string())
        );

        let approle = VaultAuth {
            name: "approle".to_string(),
            ..auth.clone()
        };
        assert!(matches!(
            jwt_credentials(&approle),
            Err(SecretError::InvalidReference(_))
        ));

        let no_role = VaultAuth {
            data: Default::default(),
            ..auth.clone()
        };
        assert!(jwt_credentials(&no_role).is_err());
    }

    #[test]
    fn test_only_vault_sections() {
        let resolver = VaultResolver::new(Client::new());
        assert!(!resolver.is_supported(&SecretRef::default()));
    }
}
