//! Resolver trait and registry

use std::sync::Arc;

use async_trait::async_trait;
use girder_core::domain::secret::SecretRef;
use reqwest::Client;

use crate::error::{Result, SecretError};
use crate::gitlab::GitLabSecretsManagerResolver;
use crate::vault::VaultResolver;

/// One secret backend
#[async_trait]
pub trait SecretResolver: Send + Sync {
    /// Canonical resolver name, e.g. `vault`
    fn name(&self) -> &'static str;

    /// Whether this resolver handles the reference
    fn is_supported(&self, secret: &SecretRef) -> bool;

    /// Fetches the secret value
    async fn resolve(&self, secret: &SecretRef) -> Result<String>;
}

/// Ordered set of resolvers consulted for every secret
#[derive(Clone)]
pub struct ResolverRegistry {
    resolvers: Vec<Arc<dyn SecretResolver>>,
}

impl std::fmt::Debug for ResolverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolverRegistry")
            .field("resolvers", &self.names())
            .finish()
    }
}

impl Default for ResolverRegistry {
    /// The built-in resolvers sharing one HTTP client
    fn default() -> Self {
        Self::with_client(Client::new())
    }
}

impl ResolverRegistry {
    /// Start an empty registry
    pub fn builder() -> ResolverRegistryBuilder {
        ResolverRegistryBuilder::default()
    }

    /// The built-in resolvers using a configured HTTP client
    pub fn with_client(client: Client) -> Self {
        Self::builder()
            .with_resolver(VaultResolver::new(client.clone()))
            .with_resolver(GitLabSecretsManagerResolver::new(client))
            .build()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.resolvers.iter().map(|resolver| resolver.name()).collect()
    }

    /// The single resolver claiming `secret`
    ///
    /// # Arguments
    /// * `key` - Variable the secret is bound to, used in error messages
    /// * `secret` - The reference to resolve
    pub fn resolver_for(&self, key: &str, secret: &SecretRef) -> Result<&dyn SecretResolver> {
        let claimed: Vec<&Arc<dyn SecretResolver>> = self
            .resolvers
            .iter()
            .filter(|resolver| resolver.is_supported(secret))
            .collect();

        match claimed.as_slice() {
            &[resolver] => Ok(resolver.as_ref()),
            &[] => Err(SecretError::Unsupported(key.to_string())),
            many => Err(SecretError::Ambiguous {
                key: key.to_string(),
                resolvers: many
                    .iter()
                    .map(|resolver| resolver.name())
                    .collect::<Vec<_>>()
                    .join(", "),
            }),
        }
    }
}

/// Builder collecting resolvers in lookup order
#[derive(Default)]
pub struct ResolverRegistryBuilder {
    resolvers: Vec<Arc<dyn SecretResolver>>,
}

impl ResolverRegistryBuilder {
    pub fn with_resolver(mut self, resolver: impl SecretResolver + 'static) -> Self {
        self.resolvers.push(Arc::new(resolver));
        self
    }

    pub fn build(self) -> ResolverRegistry {
        ResolverRegistry {
            resolvers: self.resolvers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use girder_core::domain::secret::VaultSecret;

    struct AnySecret(&'static str);

    #[async_trait]
    impl SecretResolver for AnySecret {
        fn name(&self) -> &'static str {
            self.0
        }

        fn is_supported(&self, _secret: &SecretRef) -> bool {
            true
        }

        async fn resolve(&self, _secret: &SecretRef) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    fn vault_ref() -> SecretRef {
        SecretRef {
            vault: Some(VaultSecret::default()),
            ..Default::default()
        }
    }

    #[test]
    fn test_default_registry() {
        let registry = ResolverRegistry::default();
        assert_eq!(registry.names(), vec!["vault", "gitlab_secrets_manager"]);
        assert_eq!(registry.resolver_for("DB", &vault_ref()).unwrap().name(), "vault");
    }

    #[test]
    fn test_unclaimed_secret() {
        let registry = ResolverRegistry::default();
        let secret = SecretRef {
            akeyless: Some(serde_json::json!({ "name": "db" })),
            ..Default::default()
        };
        let error = registry.resolver_for("DB", &secret).err().unwrap();
        assert!(matches!(error, SecretError::Unsupported(key) if key == "DB"));
    }

    #[test]
    fn test_ambiguous_secret() {
        let registry = ResolverRegistry::builder()
            .with_resolver(AnySecret("first"))
            .with_resolver(AnySecret("second"))
            .build();
        let error = registry.resolver_for("DB", &vault_ref()).err().unwrap();
        assert_eq!(error.to_string(), "secret DB is claimed by several resolvers: first, second");
    }

    #[test]
    fn test_empty_registry() {
        let registry = ResolverRegistry::builder().build();
        assert!(registry.names().is_empty());
        assert!(registry.resolver_for("DB", &vault_ref()).is_err());
    }
}
