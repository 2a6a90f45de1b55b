//! escm-cli: operator command surface.
//!
//! Parsing lives in [`cli`]; [`commands::execute`] runs a parsed command
//! against a [`TopologyController`](escm_topology::TopologyController)
//! and writes the outcome message to the given writer. Logging goes to
//! stderr, so the writer carries only command output.

pub mod cli;
pub mod commands;

pub use cli::{Cli, Commands, OutputFormat};

/// Default `tracing` filter when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "escm=info";
