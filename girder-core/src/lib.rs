//! Girder Core
//!
//! Core types shared by every Girder crate.
//!
//! This crate contains:
//! - Domain types: the job context handed to the generator, variables,
//!   build stages, shell dialects and the invocation configuration
//! - Feature flags: the `FeatureSet` value read by the generator
//! - Errors: the `GeneratorError` kinds surfaced to executors

pub mod domain;
pub mod error;
pub mod features;

pub use domain::job::JobContext;
pub use domain::stage::BuildStage;
pub use domain::variables::{ValueSegment, Variable, Variables};
pub use error::{GeneratorError, Result};
pub use features::FeatureSet;
