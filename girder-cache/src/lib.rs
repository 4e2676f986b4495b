//! Girder Cache
//!
//! Cache addressing for generated stage scripts.
//!
//! This crate contains:
//! - Key derivation: expansion, sanitization, optional hashing and the
//!   local archive path
//! - Object naming inside the bucket
//! - S3 SigV4 presigned URLs with static or instance credentials
//! - The `CacheUrlSigner` seam used by the stage assembler

pub mod config;
pub mod credentials;
pub mod error;
pub mod key;
pub mod s3;
pub mod signer;

pub use config::{CacheConfig, CacheType, S3Config};
pub use error::{CacheError, Result};
pub use key::{CacheKey, KeyResolution, resolve_key};
pub use signer::{CacheUrlSigner, ConfiguredSigner, NoCache, object_name};
