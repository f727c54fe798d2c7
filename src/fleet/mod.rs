//! Fleet execution.
//!
//! This module runs one operation across many hosts:
//! - A bounded worker pool with per-host result codes
//! - The per-host workflows behind each subcommand
//! - Support information collection

mod executor;
mod rsi;
mod workflows;

pub use executor::{FleetExecutor, FleetReport, HostResult};
pub use rsi::{DEFAULT_RSI_WORKERS, RsiOutcome, collect_support_information, rsi_timeout};
pub use workflows::{ConfigRequest, Operation, WorkflowContext, render_listing};
