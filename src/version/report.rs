//! Per-host version report.

use serde::Serialize;
use std::fmt;
use tracing::{debug, warn};

use crate::config::HostDescriptor;
use crate::device::{CommitEntry, DeviceSession, Rpc, rpc_text};
use crate::lifecycle::{config_drifted, latest_commit, rescue_config_epoch, schedule_summary};
use crate::package::{PackageStager, PackageStatus, target_package};

use super::compare::{VersionOrdering, compare_version};
use super::probe::{pending_version_or_none, planning_version};

/// Hint shown when the running version is newer than the pending one.
pub const ROLLBACK_HINT: &str = "Do you want to rollback?";

/// Hint shown when a newer version is pending.
pub const REBOOT_HINT: &str = "Please plan to reboot.";

/// One pairwise version comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionComparison {
    /// Left operand label.
    pub left: &'static str,
    /// Right operand label.
    pub right: &'static str,
    /// Ordering of left against right.
    pub ordering: VersionOrdering,
    /// Operator hint, if any.
    pub hint: Option<&'static str>,
}

impl VersionComparison {
    fn new(left: &'static str, right: &'static str, ordering: VersionOrdering) -> Self {
        Self {
            left,
            right,
            ordering,
            hint: None,
        }
    }
}

/// Everything the `version` command shows for one host.
#[derive(Debug, Clone, Serialize)]
pub struct VersionReport {
    /// Device hostname.
    pub hostname: String,
    /// Device model.
    pub model: String,
    /// Active version.
    pub running: Option<String>,
    /// Version of the configured package.
    pub planning: Option<String>,
    /// Staged version.
    pub pending: Option<String>,
    /// running/planning, running/pending and pending/planning.
    pub comparisons: Vec<VersionComparison>,
    /// Latest commit.
    pub last_commit: Option<CommitEntry>,
    /// Configuration changed after the package was staged.
    pub config_drift: bool,
    /// Package on the orchestrating machine.
    pub local_package: Option<PackageStatus>,
    /// Package under the remote path.
    pub remote_package: Option<PackageStatus>,
    /// Reboot schedule line.
    pub reboot_schedule: Option<String>,
}

impl fmt::Display for VersionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let show = |v: &Option<String>| v.clone().unwrap_or_else(|| String::from("None"));
        writeln!(f, "  - hostname: {}", self.hostname)?;
        writeln!(f, "  - model: {}", self.model)?;
        writeln!(f, "  - running version: {}", show(&self.running))?;
        writeln!(f, "  - planning version: {}", show(&self.planning))?;
        writeln!(f, "  - pending version: {}", show(&self.pending))?;
        for comparison in &self.comparisons {
            write!(
                f,
                "    {} version {} {} version",
                comparison.left, comparison.ordering, comparison.right
            )?;
            match comparison.hint {
                Some(hint) => writeln!(f, " : {hint}")?,
                None => writeln!(f)?,
            }
        }
        if let Some(commit) = &self.last_commit {
            writeln!(
                f,
                "  - last commit: {} by {} via {}",
                commit.date_time, commit.user, commit.client
            )?;
        }
        if self.config_drift {
            writeln!(
                f,
                "  - WARNING: config modified after firmware install, re-install runs before reboot"
            )?;
        }
        let status = |s: Option<PackageStatus>| s.map_or_else(|| String::from("unknown"), |s| s.to_string());
        writeln!(f, "  - local package: {}", status(self.local_package))?;
        writeln!(f, "  - remote package: {}", status(self.remote_package))?;
        if let Some(schedule) = &self.reboot_schedule {
            writeln!(f, "  - {schedule}")?;
        }
        Ok(())
    }
}

/// Compares the three versions and attaches the operator hints.
#[must_use]
pub fn compare_all(
    running: Option<&str>,
    planning: Option<&str>,
    pending: Option<&str>,
) -> Vec<VersionComparison> {
    let mut running_pending =
        VersionComparison::new("running", "pending", compare_version(running, pending));
    running_pending.hint = match running_pending.ordering {
        VersionOrdering::Greater => Some(ROLLBACK_HINT),
        VersionOrdering::Less => Some(REBOOT_HINT),
        _ => None,
    };

    vec![
        VersionComparison::new("running", "planning", compare_version(running, planning)),
        running_pending,
        VersionComparison::new("pending", "planning", compare_version(pending, planning)),
    ]
}

/// Collects the version report for one host. Every probe is best-effort.
pub async fn build_report(
    host: &HostDescriptor,
    session: &dyn DeviceSession,
    stager: &PackageStager,
) -> VersionReport {
    let facts = session.facts();
    let running = facts.version.clone();
    let planning = match target_package(host, facts) {
        Ok(package) => planning_version(&package.file),
        Err(e) => {
            warn!("{e}");
            None
        }
    };
    let pending = pending_version_or_none(session).await;
    let comparisons = compare_all(running.as_deref(), planning.as_deref(), pending.as_deref());

    let last_commit = latest_commit(session).await;
    let config_drift = match (&pending, &last_commit) {
        (Some(_), Some(commit)) => {
            let rescue = rescue_config_epoch(session).await;
            config_drifted(commit.epoch, rescue)
        }
        _ => false,
    };
    if config_drift {
        warn!("config modified after firmware install, re-install is required before reboot");
    }

    let local_package = stager.check_local(host, session).await.ok();
    let remote_package = stager.check_remote(host, session).await.ok();

    let reboot_schedule = match rpc_text(session, Rpc::GetRebootInformation).await {
        Ok(text) => schedule_summary(&text),
        Err(e) => {
            warn!("get_reboot_information: {e}");
            None
        }
    };
    debug!("version report for {} collected", host.name);

    VersionReport {
        hostname: facts.hostname.clone(),
        model: facts.model.clone(),
        running,
        planning,
        pending,
        comparisons,
        last_commit,
        config_drift,
        local_package,
        remote_package,
        reboot_schedule,
    }
}
