//! Girder Secrets
//!
//! Resolves the secret references attached to a job into variables before
//! any script is generated.
//!
//! This crate contains:
//! - `SecretResolver`: the interface every backend implements
//! - `ResolverRegistry`: an explicit, builder-made list of resolvers
//! - Adapters for HashiCorp Vault and the GitLab secrets manager
//! - `SecretsResolver`: resolution of a whole job under a deadline
//!
//! # Example
//!
//! ```no_run
//! use girder_secrets::SecretsResolver;
//! use std::time::Duration;
//!
//! # async fn example(job: girder_core::JobContext) -> anyhow::Result<()> {
//! let resolver = SecretsResolver::default()
//!     .with_timeout(Duration::from_secs(10))
//!     .with_features(&job.features());
//! let variables = resolver.resolve(&job.secrets).await?;
//! # Ok(())
//! # }
//! ```

pub mod driver;
pub mod error;
pub mod gitlab;
pub mod kv;
pub mod resolver;
pub mod vault;

pub use driver::{DEFAULT_TIMEOUT, SecretsResolver};
pub use error::{Result, SecretError};
pub use resolver::{ResolverRegistry, ResolverRegistryBuilder, SecretResolver};
