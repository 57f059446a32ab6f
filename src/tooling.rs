//! Tooling & Integration Layer
//!
//! Command-line surface over the registry service.

pub mod cli;

pub use cli::{Cli, CliContext, Commands, GlobalArgs, OutputFormat};
