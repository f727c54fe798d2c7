//! Version reconciliation.
//!
//! This module answers three questions per device:
//! - Which version is running, staged (pending) and planned
//! - How those versions order against each other
//! - What the operator should do about it

mod compare;
mod probe;
mod report;

pub use compare::{VersionOrdering, compare_version};
pub use probe::{
    parse_branch_pending, parse_install_log_pending, parse_routing_pending, parse_switch_pending,
    pending_version, pending_version_or_none, planning_version, running_matches_planned,
};
pub use report::{
    REBOOT_HINT, ROLLBACK_HINT, VersionComparison, VersionReport, build_report, compare_all,
};
