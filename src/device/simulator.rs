//! Simulated device transport.
//!
//! Devices are described by YAML profiles holding their facts, canned RPC
//! replies, staged files and injected failures. Every call made against a
//! simulated session is appended to a [`Journal`] that outlives the
//! session, so callers can inspect exactly what a workflow did.

use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::fs;
use tracing::{debug, info};

use crate::config::{HashAlgorithm, HostDescriptor};
use crate::error::{ConnectionError, RpcError};

use super::session::{
    ConfigTransaction, CopyRequest, DeviceConnector, DeviceSession, InstallOutcome,
    InstallRequest, Rpc, RpcReply, SoftwareManager,
};
use super::types::{CommitEntry, DeviceFacts, DirectoryListing, FileEntry, SnapshotItem};

/// Path of the rescue configuration on the device.
pub const RESCUE_CONFIG_PATH: &str = "/config/rescue.conf.gz";

/// Reply to `get-reboot-information` when nothing is scheduled.
pub const NO_REBOOT_SCHEDULED: &str = "No shutdown/reboot scheduled.";

/// Output of a loopback ping with no loss.
const HEALTHY_PING_OUTPUT: &str =
    "--- 127.0.0.1 ping statistics ---\n3 packets transmitted, 3 packets received, 0% packet loss";

/// How an injected failure manifests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureKind {
    /// The device returns an RPC error.
    Error,
    /// The call times out.
    Timeout,
    /// The session drops.
    Closed,
}

/// How an injected connection failure manifests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectFailure {
    /// Credentials rejected.
    Auth,
    /// Connection refused.
    Refused,
    /// Connection timed out.
    Timeout,
    /// Name did not resolve.
    UnknownHost,
    /// Anything else.
    Other,
}

/// A simulated device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceProfile {
    /// Facts returned when the session opens.
    pub facts: DeviceFacts,
    /// `get-software-information` text.
    #[serde(default)]
    pub software_information: String,
    /// `get-snapshot-information` items.
    #[serde(default)]
    pub snapshots: Vec<SnapshotItem>,
    /// Install log text returned by `get-log`.
    #[serde(default)]
    pub install_log: String,
    /// Output of `request system software rollback`.
    #[serde(default = "default_rollback_output")]
    pub rollback_output: String,
    /// Existing reboot schedule line, e.g. `reboot requested by admin at ...`.
    #[serde(default)]
    pub reboot_schedule: Option<String>,
    /// Output of `clear system reboot`.
    #[serde(default = "default_clear_reboot_output")]
    pub clear_reboot_output: String,
    /// Commit history, latest first.
    #[serde(default)]
    pub commit_history: Vec<CommitEntry>,
    /// Modification time of the rescue configuration, absent when none exists.
    #[serde(default)]
    pub rescue_epoch: Option<i64>,
    /// Device files by full path, with their checksum.
    #[serde(default)]
    pub remote_files: BTreeMap<String, String>,
    /// Local files by path, with their checksum.
    #[serde(default)]
    pub local_files: BTreeMap<String, String>,
    /// Diff produced after a load, `None` when the load changes nothing.
    #[serde(default)]
    pub candidate_diff: Option<String>,
    /// Canned CLI outputs by command.
    #[serde(default)]
    pub cli_outputs: HashMap<String, String>,
    /// `get-support-information` text.
    #[serde(default)]
    pub support_information: String,
    /// Whether storage cleanup reports success.
    #[serde(default = "default_true")]
    pub storage_cleanup_ok: bool,
    /// Whether package installation reports success.
    #[serde(default = "default_true")]
    pub install_ok: bool,
    /// Injected failures by operation name.
    #[serde(default)]
    pub failures: HashMap<String, FailureKind>,
    /// Injected connection failure.
    #[serde(default)]
    pub connect_error: Option<ConnectFailure>,
}

fn default_rollback_output() -> String {
    String::from("NOTICE: The 'pending' set has been removed")
}

fn default_clear_reboot_output() -> String {
    String::from(NO_REBOOT_SCHEDULED)
}

const fn default_true() -> bool {
    true
}

impl DeviceProfile {
    /// Creates a profile with the given facts and every reply at its default.
    #[must_use]
    pub fn new(facts: DeviceFacts) -> Self {
        Self {
            facts,
            software_information: String::new(),
            snapshots: Vec::new(),
            install_log: String::new(),
            rollback_output: default_rollback_output(),
            reboot_schedule: None,
            clear_reboot_output: default_clear_reboot_output(),
            commit_history: Vec::new(),
            rescue_epoch: None,
            remote_files: BTreeMap::new(),
            local_files: BTreeMap::new(),
            candidate_diff: None,
            cli_outputs: HashMap::new(),
            support_information: String::new(),
            storage_cleanup_ok: true,
            install_ok: true,
            failures: HashMap::new(),
            connect_error: None,
        }
    }

    /// Injects a failure for an operation.
    #[must_use]
    pub fn failing(mut self, operation: &str, kind: FailureKind) -> Self {
        self.failures.insert(operation.to_string(), kind);
        self
    }
}

/// One recorded session call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCall {
    /// An RPC, by wire name.
    Rpc(String),
    /// A CLI command.
    Cli(String),
    /// Configuration lock.
    Lock,
    /// Configuration unlock.
    Unlock,
    /// Candidate load.
    Load,
    /// Candidate diff.
    Diff,
    /// Candidate diff for display.
    Pdiff,
    /// `commit check`.
    CommitCheck,
    /// Commit, with the confirm timeout when one was given.
    Commit(Option<u32>),
    /// Candidate rollback.
    Rollback,
    /// Rescue configuration save.
    RescueSave,
    /// Package copy, by file name.
    SafeCopy(String),
    /// Package install, by file name.
    Install(String),
    /// Local checksum, by path.
    LocalChecksum(String),
    /// Remote checksum, by path.
    RemoteChecksum(String),
    /// Reboot, by requested time.
    Reboot(String),
    /// Session close.
    Close,
}

/// Shared record of session calls for one host.
#[derive(Debug, Clone, Default)]
pub struct Journal {
    calls: Arc<Mutex<Vec<SessionCall>>>,
}

impl Journal {
    fn record(&self, call: SessionCall) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
    }

    /// Returns every recorded call in order.
    #[must_use]
    pub fn calls(&self) -> Vec<SessionCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Counts calls equal to `call`.
    #[must_use]
    pub fn count(&self, call: &SessionCall) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|c| *c == call)
            .count()
    }

    /// Counts RPCs with the given wire name.
    #[must_use]
    pub fn rpc_count(&self, name: &str) -> usize {
        self.count(&SessionCall::Rpc(name.to_string()))
    }
}

/// Mutable device state.
#[derive(Debug)]
struct DeviceState {
    remote_files: BTreeMap<String, String>,
    rescue_epoch: Option<i64>,
    reboot_schedule: Option<String>,
    loaded: bool,
    closed: bool,
    last_copy: Option<CopyRequest>,
    last_install: Option<InstallRequest>,
}

/// A session against a simulated device.
#[derive(Debug)]
pub struct SimulatedDevice {
    user: String,
    profile: DeviceProfile,
    state: Mutex<DeviceState>,
    journal: Journal,
}

impl SimulatedDevice {
    /// Creates a session from a profile.
    #[must_use]
    pub fn new(profile: DeviceProfile) -> Self {
        Self::with_journal(profile, Journal::default(), "junos-ops")
    }

    fn with_journal(profile: DeviceProfile, journal: Journal, user: &str) -> Self {
        let state = DeviceState {
            remote_files: profile.remote_files.clone(),
            rescue_epoch: profile.rescue_epoch,
            reboot_schedule: profile.reboot_schedule.clone(),
            loaded: false,
            closed: false,
            last_copy: None,
            last_install: None,
        };
        Self {
            user: user.to_string(),
            profile,
            state: Mutex::new(state),
            journal,
        }
    }

    /// Returns the call journal.
    #[must_use]
    pub fn journal(&self) -> Journal {
        self.journal.clone()
    }

    /// Returns the most recent copy request.
    #[must_use]
    pub fn last_copy(&self) -> Option<CopyRequest> {
        self.state().last_copy.clone()
    }

    /// Returns the most recent install request.
    #[must_use]
    pub fn last_install(&self) -> Option<InstallRequest> {
        self.state().last_install.clone()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, DeviceState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Records a call and applies any injected failure for `operation`.
    fn enter(&self, call: SessionCall, operation: &str, timeout: Duration) -> Result<(), RpcError> {
        self.journal.record(call);
        if self.state().closed {
            return Err(RpcError::SessionClosed {
                operation: operation.to_string(),
            });
        }
        match self.profile.failures.get(operation) {
            None => Ok(()),
            Some(FailureKind::Error) => Err(RpcError::failed(operation, "injected failure")),
            Some(FailureKind::Timeout) => Err(RpcError::Timeout {
                operation: operation.to_string(),
                timeout_secs: timeout.as_secs(),
            }),
            Some(FailureKind::Closed) => {
                self.state().closed = true;
                Err(RpcError::SessionClosed {
                    operation: operation.to_string(),
                })
            }
        }
    }

    fn list(&self, path: &str) -> DirectoryListing {
        let state = self.state();
        if path == RESCUE_CONFIG_PATH {
            let files = state
                .rescue_epoch
                .map(|epoch| FileEntry {
                    path: RESCUE_CONFIG_PATH.to_string(),
                    is_dir: false,
                    permissions: String::from("-rw-r-----"),
                    owner: String::from("root"),
                    size: 0,
                    date: String::new(),
                    modified_epoch: Some(epoch),
                })
                .into_iter()
                .collect();
            return DirectoryListing {
                path: path.to_string(),
                files,
            };
        }

        let prefix = format!("{}/", path.trim_end_matches('/'));
        let files = state
            .remote_files
            .keys()
            .filter(|name| name.as_str() == path || name.starts_with(&prefix))
            .map(|name| FileEntry {
                path: name.clone(),
                is_dir: false,
                permissions: String::from("-rw-r--r--"),
                owner: String::from("root"),
                size: 0,
                date: String::new(),
                modified_epoch: None,
            })
            .collect();
        DirectoryListing {
            path: path.to_string(),
            files,
        }
    }
}

#[async_trait]
impl ConfigTransaction for SimulatedDevice {
    async fn lock(&self) -> Result<(), RpcError> {
        self.enter(SessionCall::Lock, "lock", Duration::ZERO)
    }

    async fn unlock(&self) -> Result<(), RpcError> {
        self.enter(SessionCall::Unlock, "unlock", Duration::ZERO)
    }

    async fn load(&self, commands: &str) -> Result<(), RpcError> {
        self.enter(SessionCall::Load, "load", Duration::ZERO)?;
        debug!("Loaded {} set commands", commands.lines().count());
        self.state().loaded = true;
        Ok(())
    }

    async fn diff(&self) -> Result<Option<String>, RpcError> {
        self.enter(SessionCall::Diff, "diff", Duration::ZERO)?;
        if !self.state().loaded {
            return Ok(None);
        }
        Ok(self
            .profile
            .candidate_diff
            .clone()
            .filter(|diff| !diff.trim().is_empty()))
    }

    async fn pdiff(&self) -> Result<String, RpcError> {
        self.enter(SessionCall::Pdiff, "pdiff", Duration::ZERO)?;
        if !self.state().loaded {
            return Ok(String::new());
        }
        Ok(self.profile.candidate_diff.clone().unwrap_or_default())
    }

    async fn commit_check(&self) -> Result<(), RpcError> {
        self.enter(SessionCall::CommitCheck, "commit_check", Duration::ZERO)
    }

    async fn commit(&self, confirm_minutes: Option<u32>) -> Result<(), RpcError> {
        let operation = if confirm_minutes.is_some() {
            "commit_confirmed"
        } else {
            "commit"
        };
        self.enter(SessionCall::Commit(confirm_minutes), operation, Duration::ZERO)
    }

    async fn rollback(&self) -> Result<(), RpcError> {
        self.enter(SessionCall::Rollback, "rollback", Duration::ZERO)?;
        self.state().loaded = false;
        Ok(())
    }

    async fn rescue_save(&self) -> Result<bool, RpcError> {
        self.enter(SessionCall::RescueSave, "rescue_save", Duration::ZERO)?;
        self.state().rescue_epoch = Some(Utc::now().timestamp());
        Ok(true)
    }
}

#[async_trait]
impl SoftwareManager for SimulatedDevice {
    async fn safe_copy(&self, request: &CopyRequest) -> Result<bool, RpcError> {
        self.state().last_copy = Some(request.clone());
        self.enter(
            SessionCall::SafeCopy(request.package.clone()),
            "safe_copy",
            request.checksum_timeout,
        )?;
        let destination = format!(
            "{}/{}",
            request.remote_path.trim_end_matches('/'),
            request.package
        );

        let Some(local) = self.profile.local_files.get(&request.package) else {
            return Err(RpcError::failed(
                "safe_copy",
                format!("{}: no such file", request.package),
            ));
        };
        if *local != request.checksum {
            return Ok(false);
        }

        let mut state = self.state();
        if !request.force && state.remote_files.get(&destination) == Some(&request.checksum) {
            debug!("{destination} already present, skipping transfer");
            return Ok(true);
        }
        state.remote_files.insert(destination, request.checksum.clone());
        Ok(true)
    }

    async fn install(&self, request: &InstallRequest) -> Result<InstallOutcome, RpcError> {
        self.state().last_install = Some(request.clone());
        self.enter(
            SessionCall::Install(request.package.clone()),
            "install",
            request.timeout,
        )?;
        if !self.profile.install_ok {
            return Ok(InstallOutcome {
                ok: false,
                message: String::from("Validation failed"),
            });
        }
        let staged = format!(
            "{}/{}",
            request.remote_path.trim_end_matches('/'),
            request.package
        );
        if request.no_copy && !self.state().remote_files.contains_key(&staged) {
            return Ok(InstallOutcome {
                ok: false,
                message: format!("{staged}: no such file"),
            });
        }
        Ok(InstallOutcome {
            ok: true,
            message: String::from(
                "WARNING: A reboot is required to install the software",
            ),
        })
    }

    async fn local_checksum(
        &self,
        path: &str,
        algorithm: HashAlgorithm,
    ) -> Result<Option<String>, RpcError> {
        self.enter(
            SessionCall::LocalChecksum(path.to_string()),
            "local_checksum",
            Duration::ZERO,
        )?;
        debug!("{algorithm} of local {path}");
        Ok(self.profile.local_files.get(path).cloned())
    }

    async fn remote_checksum(
        &self,
        path: &str,
        algorithm: HashAlgorithm,
    ) -> Result<Option<String>, RpcError> {
        self.enter(
            SessionCall::RemoteChecksum(path.to_string()),
            "remote_checksum",
            Duration::ZERO,
        )?;
        debug!("{algorithm} of remote {path}");
        Ok(self.state().remote_files.get(path).cloned())
    }

    async fn reboot(&self, at: &str) -> Result<String, RpcError> {
        self.enter(SessionCall::Reboot(at.to_string()), "reboot", Duration::ZERO)?;
        let when = NaiveDateTime::parse_from_str(at, "%y%m%d%H%M")
            .map_err(|e| RpcError::failed("reboot", format!("invalid time {at}: {e}")))?;
        let stamp = when.format("%a %b %d %H:%M:%S %Y");
        self.state().reboot_schedule =
            Some(format!("reboot requested by {} at {stamp}", self.user));
        Ok(format!("Shutdown at {stamp}. [pid 4242]"))
    }
}

#[async_trait]
impl DeviceSession for SimulatedDevice {
    fn facts(&self) -> &DeviceFacts {
        &self.profile.facts
    }

    async fn rpc(&self, request: &Rpc, timeout: Duration) -> Result<RpcReply, RpcError> {
        let name = request.name();
        self.enter(SessionCall::Rpc(name.to_string()), name, timeout)?;

        let reply = match request {
            Rpc::GetSoftwareInformation => RpcReply::Text(self.profile.software_information.clone()),
            Rpc::GetSnapshotInformation { .. } => RpcReply::Snapshots(self.profile.snapshots.clone()),
            Rpc::GetLog { .. } => RpcReply::Text(self.profile.install_log.clone()),
            Rpc::RequestStorageCleanup => RpcReply::Success(self.profile.storage_cleanup_ok),
            Rpc::RequestSnapshotDelete => RpcReply::Success(true),
            Rpc::RequestPackageRollback => RpcReply::Text(self.profile.rollback_output.clone()),
            Rpc::GetRebootInformation => RpcReply::Text(
                self.state()
                    .reboot_schedule
                    .clone()
                    .unwrap_or_else(|| String::from(NO_REBOOT_SCHEDULED)),
            ),
            Rpc::ClearReboot => {
                self.state().reboot_schedule = None;
                RpcReply::Text(self.profile.clear_reboot_output.clone())
            }
            Rpc::GetCommitInformation => RpcReply::CommitHistory(self.profile.commit_history.clone()),
            Rpc::FileList { path, .. } => RpcReply::Directory(self.list(path)),
            Rpc::GetSupportInformation { .. } => {
                RpcReply::Text(self.profile.support_information.clone())
            }
        };
        Ok(reply)
    }

    async fn cli(&self, command: &str) -> Result<String, RpcError> {
        self.enter(SessionCall::Cli(command.to_string()), "cli", Duration::ZERO)?;
        if let Some(output) = self.profile.cli_outputs.get(command) {
            return Ok(output.clone());
        }
        if command.starts_with("ping") {
            return Ok(String::from(HEALTHY_PING_OUTPUT));
        }
        Ok(String::new())
    }

    async fn close(&self) {
        self.journal.record(SessionCall::Close);
        let mut state = self.state();
        if state.closed {
            debug!("Session already closed");
        }
        state.closed = true;
    }
}

/// Opens simulated sessions from in-memory profiles or a profile directory.
#[derive(Debug, Default)]
pub struct SimulatorConnector {
    profiles: HashMap<String, DeviceProfile>,
    profile_dir: Option<PathBuf>,
    journals: Mutex<HashMap<String, Journal>>,
}

impl SimulatorConnector {
    /// Creates a connector with no devices.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a connector that reads `<dir>/<host>.yaml` on open.
    #[must_use]
    pub fn from_dir(dir: impl AsRef<Path>) -> Self {
        Self {
            profile_dir: Some(dir.as_ref().to_path_buf()),
            ..Self::default()
        }
    }

    /// Registers an in-memory profile for a host name.
    #[must_use]
    pub fn with_profile(mut self, host: &str, profile: DeviceProfile) -> Self {
        self.profiles.insert(host.to_string(), profile);
        self
    }

    /// Returns the journal for a host; it is shared by every session opened to it.
    #[must_use]
    pub fn journal(&self, host: &str) -> Journal {
        self.journals
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(host.to_string())
            .or_default()
            .clone()
    }

    async fn profile_for(&self, host: &str) -> Result<DeviceProfile, ConnectionError> {
        if let Some(profile) = self.profiles.get(host) {
            return Ok(profile.clone());
        }
        let Some(dir) = &self.profile_dir else {
            return Err(ConnectionError::UnknownHost(host.to_string()));
        };

        let path = dir.join(format!("{host}.yaml"));
        let content = fs::read_to_string(&path)
            .await
            .map_err(|e| ConnectionError::UnknownHost(format!("{host}: {}: {e}", path.display())))?;
        serde_yaml::from_str(&content)
            .map_err(|e| ConnectionError::Other(format!("{}: {e}", path.display())))
    }
}

#[async_trait]
impl DeviceConnector for SimulatorConnector {
    async fn open(&self, host: &HostDescriptor) -> Result<Box<dyn DeviceSession>, ConnectionError> {
        let profile = self.profile_for(&host.name).await?;
        let address = format!("{}:{}", host.connection.host, host.connection.port);

        if let Some(failure) = profile.connect_error {
            return Err(match failure {
                ConnectFailure::Auth => ConnectionError::Auth(address),
                ConnectFailure::Refused => ConnectionError::Refused(address),
                ConnectFailure::Timeout => ConnectionError::Timeout(address),
                ConnectFailure::UnknownHost => ConnectionError::UnknownHost(address),
                ConnectFailure::Other => ConnectionError::Other(address),
            });
        }

        info!("Opened simulated session to {address}");
        let user = host.connection.user.as_deref().unwrap_or("junos-ops");
        Ok(Box::new(SimulatedDevice::with_journal(
            profile,
            self.journal(&host.name),
            user,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::Personality;

    fn switch_facts() -> DeviceFacts {
        DeviceFacts {
            hostname: String::from("sw1"),
            model: String::from("EX2300-24T"),
            personality: Personality::Switch,
            version: Some(String::from("21.4R3-S5.4")),
            srx_cluster: false,
            chassis_members: 1,
        }
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let device = SimulatedDevice::new(
            DeviceProfile::new(switch_facts())
                .failing("lock", FailureKind::Error)
                .failing("get-reboot-information", FailureKind::Closed),
        );
        assert!(matches!(device.lock().await, Err(RpcError::Failed { .. })));

        let rpc = Rpc::GetRebootInformation;
        let result = device.rpc(&rpc, rpc.default_timeout()).await;
        assert!(matches!(result, Err(RpcError::SessionClosed { .. })));
        assert!(matches!(device.unlock().await, Err(RpcError::SessionClosed { .. })));
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let device = SimulatedDevice::new(DeviceProfile::new(switch_facts()));
        device.close().await;
        device.close().await;
        assert_eq!(device.journal().count(&SessionCall::Close), 2);
    }

    #[tokio::test]
    async fn test_reboot_updates_schedule() {
        let device = SimulatedDevice::new(DeviceProfile::new(switch_facts()));
        device.reboot("2501020304").await.expect("reboot");

        let rpc = Rpc::GetRebootInformation;
        let text = device
            .rpc(&rpc, rpc.default_timeout())
            .await
            .and_then(|r| r.into_text(rpc.name()))
            .expect("reboot info");
        assert_eq!(text, "reboot requested by junos-ops at Thu Jan 02 03:04:00 2025");
    }

    #[tokio::test]
    async fn test_connector_reads_profile_directory() {
        let temp = tempfile::TempDir::new().expect("temp dir");
        std::fs::write(
            temp.path().join("sw1.yaml"),
            r"
facts:
  hostname: sw1
  model: EX2300-24T
  personality: SWITCH
software_information: 'Pending: 22.4R3-S6.5'
connect_error: auth
",
        )
        .expect("write profile");

        let connector = SimulatorConnector::from_dir(temp.path());
        let inventory = crate::config::InventoryParser::new()
            .parse_yaml("hosts:\n  - name: sw1\n  - name: sw2\n", None)
            .expect("inventory");
        let hosts = inventory.resolve();

        assert!(matches!(
            connector.open(&hosts[0]).await,
            Err(ConnectionError::Auth(_))
        ));
        assert!(matches!(
            connector.open(&hosts[1]).await,
            Err(ConnectionError::UnknownHost(_))
        ));
    }
}
