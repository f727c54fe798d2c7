//! Configuration drift detection.
//!
//! A staged package was validated against the configuration that was
//! active when it was installed, and the rescue configuration saved at the
//! same time marks that point. A commit newer than the rescue file (or a
//! missing rescue file) means the package must be validated again before
//! the device reboots into it.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::device::{CommitEntry, DeviceSession, RESCUE_CONFIG_PATH, Rpc, list_directory};
use crate::error::LifecycleError;
use crate::version::pending_version_or_none;

use super::install::Installer;

/// What the drift check decided.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "drift", rename_all = "snake_case")]
pub enum DriftOutcome {
    /// Nothing is staged, so there is nothing to validate.
    NoPending,
    /// The commit history could not be read; proceed as if in sync.
    NoCommitInformation,
    /// The rescue configuration is at least as new as the last commit.
    InSync,
    /// The package was re-validated against the current configuration.
    Reinstalled {
        /// True when no rescue configuration existed.
        rescue_missing: bool,
    },
    /// Drift found, but dry-run skipped the re-install.
    DryRun,
}

/// Returns the latest commit (sequence 0), or `None` when unavailable.
pub async fn latest_commit(session: &dyn DeviceSession) -> Option<CommitEntry> {
    let request = Rpc::GetCommitInformation;
    let history = match session.rpc(&request, request.default_timeout()).await {
        Ok(reply) => reply.into_commit_history(request.name()),
        Err(e) => Err(e),
    };
    match history {
        Ok(entries) => entries.into_iter().find(|entry| entry.sequence == 0),
        Err(e) => {
            warn!("get_commit_information: {e}");
            None
        }
    }
}

/// Returns the rescue configuration modification time, or `None` when the
/// file does not exist or cannot be listed.
pub async fn rescue_config_epoch(session: &dyn DeviceSession) -> Option<i64> {
    match list_directory(session, RESCUE_CONFIG_PATH, true).await {
        Ok(listing) => listing
            .files
            .iter()
            .find(|file| !file.is_dir)
            .and_then(|file| file.modified_epoch),
        Err(e) => {
            warn!("get_rescue_config_time: {e}");
            None
        }
    }
}

/// Returns true when the configuration changed after the rescue save.
#[must_use]
pub fn config_drifted(commit_epoch: i64, rescue_epoch: Option<i64>) -> bool {
    rescue_epoch.is_none_or(|rescue| commit_epoch > rescue)
}

/// Re-validates a staged package when the configuration drifted.
///
/// # Errors
///
/// Returns an error when the rescue save or the re-install fails.
pub async fn check_and_reinstall(installer: &Installer<'_>) -> Result<DriftOutcome, LifecycleError> {
    let session = installer.session();

    if pending_version_or_none(session).await.is_none() {
        debug!("no pending version, skip drift check");
        return Ok(DriftOutcome::NoPending);
    }

    let Some(commit) = latest_commit(session).await else {
        debug!("cannot get commit information, skip drift check");
        return Ok(DriftOutcome::NoCommitInformation);
    };

    let rescue = rescue_config_epoch(session).await;
    if !config_drifted(commit.epoch, rescue) {
        debug!("config not modified after rescue save, skip");
        return Ok(DriftOutcome::InSync);
    }

    let rescue_missing = rescue.is_none();
    if rescue_missing {
        warn!("rescue config not found. Re-installing firmware with current config.");
    } else {
        warn!(
            "config modified after firmware install ({} by {} via {}). Re-installing firmware to validate current config.",
            commit.date_time, commit.user, commit.client
        );
    }

    if installer.options().dry_run {
        info!("dry-run: re-install and rescue config save skipped");
        return Ok(DriftOutcome::DryRun);
    }

    installer.rescue_save().await?;

    let package = installer
        .package()
        .map_err(|e| LifecycleError::InstallFailed {
            message: e.to_string(),
        })?;
    installer.install_staged(package, false).await?;
    info!("re-install: successful");

    Ok(DriftOutcome::Reinstalled { rescue_missing })
}
