//! CLI module for the envforge deployment tool.
//!
//! This module provides the command-line interface for managing
//! environment infrastructure deployments.

mod commands;
mod output;

pub use commands::{Cli, Commands, OutputFormat};
pub use output::OutputFormatter;
