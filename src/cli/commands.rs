//! CLI command definitions.
//!
//! This module defines all CLI commands and their arguments using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// junos-ops - Junos software lifecycle and configuration push across a fleet.
#[derive(Parser, Debug)]
#[command(name = "junos-ops")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the inventory file.
    #[arg(short, long, global = true, env = "JUNOS_OPS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log mutating steps instead of running them.
    #[arg(short = 'n', long, global = true)]
    pub dry_run: bool,

    /// Enable debug logging.
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Skip safety checks and repeat completed steps.
    #[arg(long, global = true)]
    pub force: bool,

    /// Number of hosts processed in parallel.
    #[arg(long, global = true)]
    pub workers: Option<usize>,

    /// Only hosts carrying every tag (comma separated).
    #[arg(long, global = true)]
    pub tags: Option<String>,

    /// Serve sessions from `<dir>/<host>.yaml` device profiles.
    #[arg(long, global = true, env = "JUNOS_OPS_SIMULATE")]
    pub simulate: Option<PathBuf>,

    /// Output format (text, json).
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    /// Log format (text, json).
    #[arg(long, global = true, default_value = "text")]
    pub log_format: LogFormat,

    /// Subcommand to execute; facts when omitted.
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show device facts.
    Facts {
        /// Target hosts (all when omitted).
        hosts: Vec<String>,
    },

    /// Copy and install the configured package.
    Upgrade {
        /// Target hosts (all when omitted).
        hosts: Vec<String>,
    },

    /// Copy the configured package to the remote path.
    Copy {
        /// Target hosts (all when omitted).
        hosts: Vec<String>,
    },

    /// Install an already copied package.
    Install {
        /// Target hosts (all when omitted).
        hosts: Vec<String>,
    },

    /// Roll back the pending version.
    Rollback {
        /// Target hosts (all when omitted).
        hosts: Vec<String>,
    },

    /// Show running, planning and pending versions.
    Version {
        /// Target hosts (all when omitted).
        hosts: Vec<String>,
    },

    /// Schedule a reboot.
    Reboot {
        /// Reboot time as yymmddhhmm, e.g. 2501020304.
        #[arg(long)]
        at: String,

        /// Target hosts (all when omitted).
        hosts: Vec<String>,
    },

    /// List files under the remote path.
    Ls {
        /// Long format.
        #[arg(short, long)]
        long: bool,

        /// Target hosts (all when omitted).
        hosts: Vec<String>,
    },

    /// Save the set-format configuration and support information.
    Rsi {
        /// Target hosts (all when omitted).
        hosts: Vec<String>,
    },

    /// Run a CLI command.
    Show {
        /// Command to run, e.g. "show system uptime".
        command: String,

        /// Target hosts (all when omitted).
        hosts: Vec<String>,
    },

    /// Push set commands with commit confirmed.
    Config {
        /// File of set commands.
        #[arg(short, long)]
        file: PathBuf,

        /// Commit-confirm timeout in minutes.
        #[arg(long)]
        confirm_timeout: Option<u32>,

        /// Confirm without running the health check.
        #[arg(long, conflicts_with = "health_check")]
        no_health_check: bool,

        /// Health-check command.
        #[arg(long)]
        health_check: Option<String>,

        /// Target hosts (all when omitted).
        hosts: Vec<String>,
    },
}

impl Commands {
    /// Hosts named on the command line.
    #[must_use]
    pub fn hosts(&self) -> &[String] {
        match self {
            Self::Facts { hosts }
            | Self::Upgrade { hosts }
            | Self::Copy { hosts }
            | Self::Install { hosts }
            | Self::Rollback { hosts }
            | Self::Version { hosts }
            | Self::Reboot { hosts, .. }
            | Self::Ls { hosts, .. }
            | Self::Rsi { hosts }
            | Self::Show { hosts, .. }
            | Self::Config { hosts, .. } => hosts,
        }
    }
}

/// Output format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

/// Log format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Human-readable log lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

impl Cli {
    /// Parses CLI arguments from the command line.
    #[must_use]
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
