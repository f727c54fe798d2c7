//! Software lifecycle.
//!
//! This module sequences the stateful device operations:
//! - Package copy, install and rollback
//! - Configuration drift detection with validated re-install
//! - Reboot scheduling

mod install;
mod drift;
mod reboot;

use serde::Serialize;

pub use install::{CLEAR_REBOOT_SUCCESS_PHRASES, Installer, ROLLBACK_SUCCESS_PHRASES};
pub use drift::{DriftOutcome, check_and_reinstall, config_drifted, latest_commit, rescue_config_epoch};
pub use reboot::{
    RebootOutcome, RebootSchedule, format_reboot_at, parse_reboot_at, parse_schedule,
    schedule_reboot, schedule_summary,
};

/// Flags shared by every lifecycle operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LifecycleOptions {
    /// Skip safety checks and repeat completed steps.
    pub force: bool,
    /// Log mutating steps instead of running them.
    pub dry_run: bool,
}

/// Which steps an install runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallMode {
    /// Install an already staged package.
    Install,
    /// Copy, then install.
    Upgrade,
}

/// Successful end states of a lifecycle operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum LifecycleOutcome {
    /// The running version already matches the package.
    AlreadyRunning,
    /// The package is already staged with the right checksum.
    AlreadyStaged,
    /// The pending version is the same as or newer than the package.
    NoInstallNeeded {
        /// Staged version.
        pending: String,
        /// Version in the package file name.
        planning: Option<String>,
    },
    /// The package was copied.
    Copied,
    /// The package was installed and waits for a reboot.
    Installed,
    /// The pending version was rolled back.
    RolledBack {
        /// Version that was pending.
        pending: String,
    },
    /// Nothing was pending, so there was nothing to roll back.
    NothingPending,
    /// Dry-run: mutating steps were only logged.
    DryRun,
}

impl std::fmt::Display for LifecycleOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AlreadyRunning => write!(f, "already running"),
            Self::AlreadyStaged => write!(f, "remote package is already copied successfully"),
            Self::NoInstallNeeded { pending, .. } => write!(f, "pending {pending}, no need install"),
            Self::Copied => write!(f, "copied"),
            Self::Installed => write!(f, "installed, reboot required"),
            Self::RolledBack { pending } => write!(f, "rolled back {pending}"),
            Self::NothingPending => write!(f, "no pending version, skip"),
            Self::DryRun => write!(f, "dry-run"),
        }
    }
}
