//! Girder Shells
//!
//! Turns a job description into the shell scripts an executor runs, one
//! per build stage.
//!
//! This crate contains:
//! - Quoting: literal words for sh/bash, cmd and PowerShell
//! - Writers: the dialect-neutral `ShellWriter` and its three dialects
//! - Assembler: the emission sequence of every build stage
//! - Frontend: how each dialect is invoked (binary, arguments, delivery)
//! - Trap: exit-status reporting for executors that cannot see it

pub mod assembler;
pub mod frontend;
pub mod quote;
pub mod trap;
pub mod writer;

pub use assembler::{ScriptGenerator, StageScript};
pub use frontend::ShellFrontend;
pub use quote::Quoter;
pub use writer::{ShellWriter, WriterOptions, new_writer};
