//! CLI module for junos-ops.
//!
//! This module provides the command-line interface for running lifecycle
//! and configuration operations across the inventory.

mod commands;
mod output;

pub use commands::{Cli, Commands, LogFormat, OutputFormat};
pub use output::OutputFormatter;
