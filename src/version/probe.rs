//! Running, planning and pending version discovery.
//!
//! The pending version (staged but not yet active) is found differently
//! for each device family. Probe failures are logged and reported as an
//! unknown version; only an unsupported personality is an error.

use regex::Regex;
use std::sync::LazyLock;
use tracing::{debug, warn};

use crate::device::{DeviceSession, Personality, Rpc, SnapshotItem, rpc_text};
use crate::error::{LifecycleError, RpcError};

static PLANNING_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r".*-(\d{2}\.\d.*\d).*\.tgz").ok());

static SWITCH_PENDING: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?m)^Pending:\s(.*)$").ok());

static ROUTING_PENDING: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?m)^JUNOS\sInstallation\sSoftware\s\[(.*)\]$").ok());

static STAGING_COMPLETED: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(?m)upgrade_platform: Staging of /var/tmp/.*-(\d{2}\.\d.*\d).*\.tgz completed").ok()
});

static PACKAGE_RESULT: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"<package-result>(\d)</package-result>").ok());

fn first_capture(pattern: &LazyLock<Option<Regex>>, text: &str) -> Option<String> {
    pattern
        .as_ref()?
        .captures(text)?
        .get(1)
        .map(|m| m.as_str().trim().to_string())
}

/// Extracts the version encoded in a package file name.
///
/// `junos-arm-32-22.4R3-S6.5.tgz` yields `22.4R3-S6.5`.
#[must_use]
pub fn planning_version(file: &str) -> Option<String> {
    let version = first_capture(&PLANNING_PATTERN, file);
    if version.is_none() {
        debug!("No planning version in {file}");
    }
    version
}

/// Returns true when the running version appears in the package file name.
#[must_use]
pub fn running_matches_planned(running: Option<&str>, file: &str) -> bool {
    running.is_some_and(|version| !version.is_empty() && file.contains(version))
}

/// Parses `Pending: <version>` from an EX/QFX software report.
#[must_use]
pub fn parse_switch_pending(text: &str) -> Option<String> {
    first_capture(&SWITCH_PENDING, text)
}

/// Parses `JUNOS Installation Software [<version>]` from an MX software report.
#[must_use]
pub fn parse_routing_pending(text: &str) -> Option<String> {
    first_capture(&ROUTING_PENDING, text)
}

/// Finds the first package version listed under the primary snapshot medium.
#[must_use]
pub fn parse_branch_pending(items: &[SnapshotItem]) -> Option<String> {
    let mut primary = false;
    for item in items {
        match item {
            SnapshotItem::Medium(medium) if medium.contains("primary") => primary = true,
            SnapshotItem::SoftwareVersion(packages) if primary => {
                if let Some(package) = packages.first() {
                    return Some(package.version.trim().to_string());
                }
            }
            _ => {}
        }
    }
    None
}

/// Parses the last install log block of a midrange or high-end SRX.
///
/// The staged version only counts when the block ends with a zero
/// package result.
#[must_use]
pub fn parse_install_log_pending(log: &str) -> Option<String> {
    let block = log.rfind("<output>").map_or(log, |start| &log[start..]);
    let staged = first_capture(&STAGING_COMPLETED, block);

    match first_capture(&PACKAGE_RESULT, block).as_deref() {
        Some("0") | None => staged,
        Some(code) => {
            debug!("Install log reports package result {code}, ignoring staged {staged:?}");
            None
        }
    }
}

/// Discovers the pending version on a device.
///
/// # Errors
///
/// Returns `UnsupportedDevice` when the personality has no probe. RPC
/// failures are logged and yield `Ok(None)`.
pub async fn pending_version(
    session: &dyn DeviceSession,
) -> Result<Option<String>, LifecycleError> {
    let facts = session.facts();
    let probed: Result<Option<String>, RpcError> = match &facts.personality {
        Personality::Switch => rpc_text(session, Rpc::GetSoftwareInformation)
            .await
            .map(|text| parse_switch_pending(&text)),
        Personality::Routing => rpc_text(session, Rpc::GetSoftwareInformation)
            .await
            .map(|text| parse_routing_pending(&text)),
        Personality::SecurityBranch => {
            let request = Rpc::GetSnapshotInformation {
                media: String::from("internal"),
            };
            match session.rpc(&request, request.default_timeout()).await {
                Ok(reply) => reply
                    .into_snapshots(request.name())
                    .map(|items| parse_branch_pending(&items)),
                Err(e) => Err(e),
            }
        }
        Personality::SecurityMidrange | Personality::SecurityHighend => rpc_text(
            session,
            Rpc::GetLog {
                filename: String::from("install"),
            },
        )
        .await
        .map(|log| parse_install_log_pending(&log)),
        Personality::Other(name) => {
            return Err(LifecycleError::UnsupportedDevice {
                personality: name.clone(),
            });
        }
    };

    match probed {
        Ok(pending) => {
            debug!("Pending version: {pending:?}");
            Ok(pending)
        }
        Err(e) => {
            warn!("Pending version probe failed: {e}");
            Ok(None)
        }
    }
}

/// Like [`pending_version`], but treats an unsupported personality as
/// nothing pending.
pub async fn pending_version_or_none(session: &dyn DeviceSession) -> Option<String> {
    match pending_version(session).await {
        Ok(pending) => pending,
        Err(e) => {
            warn!("{e}, assuming no pending version");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{
        DeviceFacts, DeviceProfile, FailureKind, SimulatedDevice, SnapshotPackage,
    };

    fn facts(personality: Personality) -> DeviceFacts {
        DeviceFacts {
            hostname: String::from("dev1"),
            model: String::from("SRX345"),
            personality,
            version: Some(String::from("21.4R3-S5.4")),
            srx_cluster: false,
            chassis_members: 1,
        }
    }

    fn package(version: &str) -> SnapshotPackage {
        SnapshotPackage {
            name: String::from("junos"),
            version: version.to_string(),
        }
    }

    #[test]
    fn test_planning_version_from_file_name() {
        assert_eq!(
            planning_version("junos-arm-32-22.4R3-S6.5.tgz").as_deref(),
            Some("22.4R3-S6.5")
        );
        assert_eq!(
            planning_version("junos-srxsme-15.1X49-D240.tgz").as_deref(),
            Some("15.1X49-D240")
        );
        assert_eq!(planning_version("noversion.tgz"), None);
    }

    #[test]
    fn test_running_matches_planned() {
        let file = "junos-arm-32-22.4R3-S6.5.tgz";
        assert!(running_matches_planned(Some("22.4R3-S6.5"), file));
        assert!(!running_matches_planned(Some("21.4R3-S5.4"), file));
        assert!(!running_matches_planned(None, file));
    }

    #[test]
    fn test_switch_and_routing_reports() {
        let switch = "fpc0:\nHostname: sw1\nJunos: 21.4R3-S5.4\nPending: 22.4R3-S6.5\n";
        assert_eq!(parse_switch_pending(switch).as_deref(), Some("22.4R3-S6.5"));
        assert_eq!(parse_switch_pending("Junos: 21.4R3-S5.4\n"), None);

        let routing = "Hostname: mx1\nJUNOS Installation Software [22.4R3-S6.5]\n";
        assert_eq!(parse_routing_pending(routing).as_deref(), Some("22.4R3-S6.5"));
    }

    #[test]
    fn test_branch_snapshot_uses_primary_medium() {
        let items = vec![
            SnapshotItem::Medium(String::from("internal (da0s2a) (backup)")),
            SnapshotItem::SoftwareVersion(vec![package("21.4R3-S5.4")]),
            SnapshotItem::Medium(String::from("internal (da0s1a) (primary)")),
            SnapshotItem::SoftwareVersion(vec![package(" 22.4R3-S6.5 ")]),
        ];
        assert_eq!(parse_branch_pending(&items).as_deref(), Some("22.4R3-S6.5"));
        assert_eq!(parse_branch_pending(&items[..2]), None);
    }

    #[test]
    fn test_install_log_uses_last_block_and_result_code() {
        let ok = "<output>\nupgrade_platform: Staging of /var/tmp/junos-srxentedge-x86-64-20.4R3.8-linux.tgz completed\n\
                  <package-result>1</package-result>\n</output>\n<output>\n\
                  upgrade_platform: Staging of /var/tmp/junos-srxentedge-x86-64-22.4R3-S6.5-linux.tgz completed\n\
                  <package-result>0</package-result>\n</output>";
        assert_eq!(parse_install_log_pending(ok).as_deref(), Some("22.4R3-S6.5"));

        let failed = "<output>\nupgrade_platform: Staging of /var/tmp/junos-srxentedge-x86-64-22.4R3-S6.5-linux.tgz completed\n\
                      <package-result>1</package-result>\n</output>";
        assert_eq!(parse_install_log_pending(failed), None);
    }

    #[tokio::test]
    async fn test_pending_probe_failure_is_none() {
        let device = SimulatedDevice::new(
            DeviceProfile::new(facts(Personality::Switch))
                .failing("get-software-information", FailureKind::Timeout),
        );
        assert_eq!(pending_version(&device).await.ok(), Some(None));
    }

    #[tokio::test]
    async fn test_unknown_personality_is_unsupported() {
        let device = SimulatedDevice::new(DeviceProfile::new(facts(Personality::Other(
            String::from("PTX"),
        ))));
        assert!(matches!(
            pending_version(&device).await,
            Err(LifecycleError::UnsupportedDevice { .. })
        ));
        assert_eq!(pending_version_or_none(&device).await, None);
    }
}
