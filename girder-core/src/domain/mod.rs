//! Core domain types
//!
//! This module contains the structures the generator consumes and produces.
//! The job context is built once per job by the runner and treated as
//! read-only; every stage script is derived from it alone.

pub mod job;
pub mod report;
pub mod secret;
pub mod shell;
pub mod stage;
pub mod variables;
