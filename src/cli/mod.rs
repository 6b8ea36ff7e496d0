//! Command-line interface for foldpool
//!
//! Demonstration workloads for the engine. Each command loads an
//! [`crate::config::EngineConfig`], runs one or more invocations, and reports
//! the outcome.

pub mod commands;
pub mod output;

pub use commands::Cli;
pub use output::Output;
