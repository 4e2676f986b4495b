//! Resolves every secret of a job under one deadline

use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;

use girder_core::domain::secret::SecretRef;
use girder_core::{FeatureSet, Variable, Variables};
use tracing::{info, warn};

use crate::error::{Result, SecretError};
use crate::resolver::ResolverRegistry;

/// Default time allowed for resolving all secrets of a job
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Turns a job's secret references into masked, raw variables
#[derive(Debug, Clone)]
pub struct SecretsResolver {
    registry: ResolverRegistry,
    timeout: Duration,
    fail_if_missing: bool,
}

impl Default for SecretsResolver {
    fn default() -> Self {
        Self::new(ResolverRegistry::default())
    }
}

impl SecretsResolver {
    pub fn new(registry: ResolverRegistry) -> Self {
        Self {
            registry,
            timeout: DEFAULT_TIMEOUT,
            fail_if_missing: true,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Takes the missing-secret policy from the job's feature flags
    pub fn with_features(mut self, features: &FeatureSet) -> Self {
        self.fail_if_missing = features.secret_resolving_fails_if_missing;
        self
    }

    pub fn with_fail_if_missing(mut self, fail_if_missing: bool) -> Self {
        self.fail_if_missing = fail_if_missing;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Resolves all secrets, in key order
    pub async fn resolve(&self, secrets: &BTreeMap<String, SecretRef>) -> Result<Variables> {
        self.resolve_until(secrets, std::future::pending::<()>()).await
    }

    /// Like [`resolve`](Self::resolve), aborting as soon as `cancel` completes
    ///
    /// No variable is returned from an aborted run.
    pub async fn resolve_until<C>(
        &self,
        secrets: &BTreeMap<String, SecretRef>,
        cancel: C,
    ) -> Result<Variables>
    where
        C: Future<Output = ()>,
    {
        if secrets.is_empty() {
            return Ok(Variables::new());
        }

        info!("Resolving {} secrets", secrets.len());
        let work = tokio::time::timeout(self.timeout, self.resolve_all(secrets));
        tokio::select! {
            result = work => match result {
                Ok(variables) => variables,
                Err(_) => {
                    let millis = self.timeout.as_millis() as u64;
                    warn!("Secret resolution exceeded {} ms", millis);
                    Err(SecretError::DeadlineExceeded(millis))
                }
            },
            _ = cancel => {
                warn!("Secret resolution cancelled");
                Err(SecretError::Cancelled)
            }
        }
    }

    async fn resolve_all(&self, secrets: &BTreeMap<String, SecretRef>) -> Result<Variables> {
        let mut variables = Variables::new();
        for (key, secret) in secrets {
            info!("Resolving secret {:?}...", key);
            let resolver = self.registry.resolver_for(key, secret)?;
            info!("Using {:?} secret resolver...", resolver.name());

            let value = match resolver.resolve(secret).await {
                Ok(value) => value,
                Err(error) if error.is_not_found() && !self.fail_if_missing => {
                    warn!("Secret {:?} not found, skipping", key);
                    continue;
                }
                Err(error) if error.is_not_found() => {
                    return Err(SecretError::NotFound(key.clone()));
                }
                Err(error) => return Err(error),
            };

            let variable = if secret.is_file() {
                Variable::file(key.clone(), value)
            } else {
                Variable::new(key.clone(), value)
            };
            variables.push(variable.with_masked().with_raw());
        }
        Ok(variables)
    }
}
