//! CLI layer for deepsearch.
//!
//! Provides the command-line interface using clap, with commands for
//! loading collections and running retrieval against them.

pub mod commands;
pub mod output;
pub mod parser;

pub use commands::execute;
pub use output::OutputFormat;
pub use parser::{Cli, Commands};
