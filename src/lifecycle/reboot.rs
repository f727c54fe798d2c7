//! Reboot scheduling.

use chrono::NaiveDateTime;
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;
use tracing::{debug, info, warn};

use crate::device::{NO_REBOOT_SCHEDULED, Rpc, rpc_text};
use crate::error::{ConfigError, LifecycleError};

use super::drift::{DriftOutcome, check_and_reinstall};
use super::install::Installer;

/// Operator-facing reboot time format, e.g. `2501020304`.
const REBOOT_AT_FORMAT: &str = "%y%m%d%H%M";

/// Timestamp format of `show system reboot`.
const SCHEDULE_TIME_FORMAT: &str = "%a %b %d %H:%M:%S %Y";

static SCHEDULE_LINE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?m)^(\w+) requested by (\w+) at (.*)$").ok());

static SCHEDULE_SUMMARY: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(?m)((halt|shutdown|reboot)\srequested\sby\s.*\sat\s(.*\d)|No\sshutdown/reboot\sscheduled\.)").ok()
});

/// An existing shutdown, halt or reboot schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RebootSchedule {
    /// `reboot`, `shutdown` or `halt`.
    pub action: String,
    /// User who scheduled it.
    pub requested_by: String,
    /// Scheduled time, when it could be parsed.
    pub at: Option<NaiveDateTime>,
}

/// What a reboot request did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RebootOutcome {
    /// Schedule found before the request.
    pub existing: Option<RebootSchedule>,
    /// Whether the existing schedule was cleared.
    pub cleared: bool,
    /// Drift check result.
    pub drift: DriftOutcome,
    /// Device reply to the reboot request.
    pub message: String,
}

/// Parses a `yymmddhhmm` reboot time.
///
/// # Errors
///
/// Returns `InvalidRebootTime` when the value is not a valid timestamp.
pub fn parse_reboot_at(value: &str) -> Result<NaiveDateTime, ConfigError> {
    NaiveDateTime::parse_from_str(value.trim(), REBOOT_AT_FORMAT).map_err(|e| {
        debug!("{value}: {e}");
        ConfigError::InvalidRebootTime {
            value: value.to_string(),
        }
    })
}

/// Formats a reboot time as `yymmddhhmm`.
#[must_use]
pub fn format_reboot_at(at: &NaiveDateTime) -> String {
    at.format(REBOOT_AT_FORMAT).to_string()
}

/// Parses the reply of `show system reboot`, `None` when nothing is scheduled.
#[must_use]
pub fn parse_schedule(text: &str) -> Option<RebootSchedule> {
    if text.contains(NO_REBOOT_SCHEDULED) {
        return None;
    }
    let captures = SCHEDULE_LINE.as_ref()?.captures(text)?;
    let when = captures.get(3).map_or("", |m| m.as_str());
    // Single-digit days are space padded.
    let normalized = when.split_whitespace().collect::<Vec<_>>().join(" ");

    Some(RebootSchedule {
        action: captures.get(1).map_or("", |m| m.as_str()).to_string(),
        requested_by: captures.get(2).map_or("", |m| m.as_str()).to_string(),
        at: NaiveDateTime::parse_from_str(&normalized, SCHEDULE_TIME_FORMAT).ok(),
    })
}

/// Extracts the schedule line for display, including the "nothing
/// scheduled" message.
#[must_use]
pub fn schedule_summary(text: &str) -> Option<String> {
    SCHEDULE_SUMMARY
        .as_ref()?
        .captures(text)?
        .get(1)
        .map(|m| m.as_str().to_string())
}

/// Schedules a reboot, clearing an existing schedule when forced and
/// re-validating a drifted staged package first.
///
/// # Errors
///
/// - `RebootInfoUnavailable` when the current schedule cannot be read
/// - `ClearRebootFailed` when a forced clear fails
/// - `ReinstallFailed` when the drift re-install fails
/// - `RebootFailed` when the reboot request fails
pub async fn schedule_reboot(
    installer: &Installer<'_>,
    at: &NaiveDateTime,
) -> Result<RebootOutcome, LifecycleError> {
    let session = installer.session();
    let options = installer.options();

    let info_text = rpc_text(session, Rpc::GetRebootInformation)
        .await
        .map_err(LifecycleError::RebootInfoUnavailable)?;
    debug!("{info_text}");

    let existing = parse_schedule(&info_text);
    let mut cleared = false;
    if let Some(schedule) = &existing {
        let when = schedule
            .at
            .map_or_else(|| String::from("unknown time"), |t| t.to_string());
        warn!("{} SCHEDULE EXISTS AT {when}", schedule.action.to_uppercase());
        if options.force {
            info!("force: clear reboot");
            installer.clear_reboot().await?;
            cleared = true;
        } else {
            debug!("skip clear reboot");
        }
    }

    let drift = check_and_reinstall(installer)
        .await
        .map_err(|e| LifecycleError::ReinstallFailed {
            reason: e.to_string(),
        })?;

    let at_str = format_reboot_at(at);
    let message = if options.dry_run {
        format!("dry-run: reboot at {at_str}")
    } else {
        session
            .reboot(&at_str)
            .await
            .map_err(LifecycleError::RebootFailed)?
    };
    info!("{message}");

    Ok(RebootOutcome {
        existing,
        cleared,
        drift,
        message,
    })
}
