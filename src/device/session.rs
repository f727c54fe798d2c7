//! Device session traits.
//!
//! A session is one open, stateful connection to a device. Remote
//! procedure calls are an explicit enumeration of typed requests with a
//! typed reply, so every call site states which reply shape it expects.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::{HashAlgorithm, HostDescriptor};
use crate::error::{ConnectionError, RpcError};

use super::types::{CommitEntry, DeviceFacts, DirectoryListing, SnapshotItem};

/// Default RPC timeout in seconds.
pub const DEFAULT_RPC_TIMEOUT_SECS: u64 = 30;

/// Timeout for a validated package install.
pub const INSTALL_TIMEOUT_SECS: u64 = 2400;

/// Timeout for a checksum computation on either side of a copy.
pub const CHECKSUM_TIMEOUT_SECS: u64 = 1200;

/// Timeout for the `cleanfs` step of a copy.
pub const CLEANFS_TIMEOUT_SECS: u64 = 300;

/// Typed remote procedure call requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rpc {
    /// `show system software` / `show version`.
    GetSoftwareInformation,
    /// `show system snapshot media <media>`.
    GetSnapshotInformation {
        /// Snapshot medium, usually `internal`.
        media: String,
    },
    /// `show log <filename>`.
    GetLog {
        /// Log file name.
        filename: String,
    },
    /// `request system storage cleanup`.
    RequestStorageCleanup,
    /// `request system snapshot delete snap*`.
    RequestSnapshotDelete,
    /// `request system software rollback`.
    RequestPackageRollback,
    /// `show system reboot`.
    GetRebootInformation,
    /// `clear system reboot`.
    ClearReboot,
    /// `show system commit`.
    GetCommitInformation,
    /// `file list <path>`.
    FileList {
        /// Directory or file path.
        path: String,
        /// Request long-format details.
        detail: bool,
    },
    /// `request support information`.
    GetSupportInformation {
        /// Cluster node selector, `primary` for clustered devices.
        node: Option<String>,
    },
}

impl Rpc {
    /// Returns the wire name of the RPC.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::GetSoftwareInformation => "get-software-information",
            Self::GetSnapshotInformation { .. } => "get-snapshot-information",
            Self::GetLog { .. } => "get-log",
            Self::RequestStorageCleanup => "request-system-storage-cleanup",
            Self::RequestSnapshotDelete => "request-snapshot",
            Self::RequestPackageRollback => "request-package-rollback",
            Self::GetRebootInformation => "get-reboot-information",
            Self::ClearReboot => "clear-reboot",
            Self::GetCommitInformation => "get-commit-information",
            Self::FileList { .. } => "file-list",
            Self::GetSupportInformation { .. } => "get-support-information",
        }
    }

    /// Returns the timeout used when the caller has no better value.
    #[must_use]
    pub const fn default_timeout(&self) -> Duration {
        let secs = match self {
            Self::RequestStorageCleanup | Self::RequestSnapshotDelete => 60,
            Self::RequestPackageRollback => 120,
            Self::GetSupportInformation { .. } => 600,
            _ => DEFAULT_RPC_TIMEOUT_SECS,
        };
        Duration::from_secs(secs)
    }
}

/// Typed RPC replies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RpcReply {
    /// Free-form text output.
    Text(String),
    /// A success flag, as reported by cleanup-style RPCs.
    Success(bool),
    /// Snapshot information, in document order.
    Snapshots(Vec<SnapshotItem>),
    /// Commit history, latest first.
    CommitHistory(Vec<CommitEntry>),
    /// A directory listing.
    Directory(DirectoryListing),
}

impl RpcReply {
    fn kind(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Success(_) => "success",
            Self::Snapshots(_) => "snapshots",
            Self::CommitHistory(_) => "commit history",
            Self::Directory(_) => "directory",
        }
    }

    fn unexpected(self, operation: &str, expected: &'static str) -> RpcError {
        tracing::debug!("{operation}: expected {expected}, got {}", self.kind());
        RpcError::UnexpectedReply {
            operation: operation.to_string(),
            expected,
        }
    }

    /// Extracts text output.
    ///
    /// # Errors
    ///
    /// Returns `UnexpectedReply` for any other reply shape.
    pub fn into_text(self, operation: &str) -> Result<String, RpcError> {
        match self {
            Self::Text(text) => Ok(text),
            other => Err(other.unexpected(operation, "text")),
        }
    }

    /// Extracts a success flag.
    ///
    /// # Errors
    ///
    /// Returns `UnexpectedReply` for any other reply shape.
    pub fn into_success(self, operation: &str) -> Result<bool, RpcError> {
        match self {
            Self::Success(ok) => Ok(ok),
            other => Err(other.unexpected(operation, "success")),
        }
    }

    /// Extracts snapshot items.
    ///
    /// # Errors
    ///
    /// Returns `UnexpectedReply` for any other reply shape.
    pub fn into_snapshots(self, operation: &str) -> Result<Vec<SnapshotItem>, RpcError> {
        match self {
            Self::Snapshots(items) => Ok(items),
            other => Err(other.unexpected(operation, "snapshots")),
        }
    }

    /// Extracts commit history.
    ///
    /// # Errors
    ///
    /// Returns `UnexpectedReply` for any other reply shape.
    pub fn into_commit_history(self, operation: &str) -> Result<Vec<CommitEntry>, RpcError> {
        match self {
            Self::CommitHistory(entries) => Ok(entries),
            other => Err(other.unexpected(operation, "commit history")),
        }
    }

    /// Extracts a directory listing.
    ///
    /// # Errors
    ///
    /// Returns `UnexpectedReply` for any other reply shape.
    pub fn into_directory(self, operation: &str) -> Result<DirectoryListing, RpcError> {
        match self {
            Self::Directory(listing) => Ok(listing),
            other => Err(other.unexpected(operation, "directory")),
        }
    }
}

/// Parameters of a checksummed file transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyRequest {
    /// Local package file.
    pub package: String,
    /// Remote directory.
    pub remote_path: String,
    /// Expected checksum.
    pub checksum: String,
    /// Checksum algorithm.
    pub algorithm: HashAlgorithm,
    /// Copy even when the remote file already matches.
    pub force: bool,
    /// Run a filesystem cleanup before copying.
    pub cleanfs: bool,
    /// Timeout of each checksum computation.
    pub checksum_timeout: Duration,
    /// Timeout of the filesystem cleanup.
    pub cleanfs_timeout: Duration,
}

/// Parameters of a package installation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallRequest {
    /// Package file.
    pub package: String,
    /// Remote directory holding the staged package.
    pub remote_path: String,
    /// Expected checksum.
    pub checksum: String,
    /// Checksum algorithm.
    pub algorithm: HashAlgorithm,
    /// Validate the running configuration against the new software.
    pub validate: bool,
    /// Install the already-staged file instead of copying.
    pub no_copy: bool,
    /// Install on every routing engine.
    pub all_re: bool,
    /// Run a filesystem cleanup first.
    pub cleanfs: bool,
    /// Install timeout.
    pub timeout: Duration,
    /// Timeout of each checksum computation.
    pub checksum_timeout: Duration,
    /// Timeout of the filesystem cleanup.
    pub cleanfs_timeout: Duration,
}

/// Result of a package installation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallOutcome {
    /// Whether the device reported success.
    pub ok: bool,
    /// Device message.
    pub message: String,
}

/// Candidate-configuration operations.
#[async_trait]
pub trait ConfigTransaction: Send + Sync {
    /// Takes the exclusive configuration lock.
    async fn lock(&self) -> Result<(), RpcError>;

    /// Releases the configuration lock.
    async fn unlock(&self) -> Result<(), RpcError>;

    /// Loads set commands into the candidate configuration.
    async fn load(&self, commands: &str) -> Result<(), RpcError>;

    /// Returns the candidate diff, `None` when nothing changed.
    async fn diff(&self) -> Result<Option<String>, RpcError>;

    /// Returns the candidate diff rendered for display.
    async fn pdiff(&self) -> Result<String, RpcError>;

    /// Validates the candidate without committing.
    async fn commit_check(&self) -> Result<(), RpcError>;

    /// Commits the candidate, with a confirm timeout in minutes when given.
    async fn commit(&self, confirm_minutes: Option<u32>) -> Result<(), RpcError>;

    /// Discards the candidate changes.
    async fn rollback(&self) -> Result<(), RpcError>;

    /// Saves the active configuration as the rescue configuration.
    async fn rescue_save(&self) -> Result<bool, RpcError>;
}

/// Software staging and installation operations.
#[async_trait]
pub trait SoftwareManager: Send + Sync {
    /// Copies a package to the device and verifies its checksum.
    async fn safe_copy(&self, request: &CopyRequest) -> Result<bool, RpcError>;

    /// Installs a package.
    async fn install(&self, request: &InstallRequest) -> Result<InstallOutcome, RpcError>;

    /// Computes the checksum of a local file, `None` when it does not exist.
    async fn local_checksum(
        &self,
        path: &str,
        algorithm: HashAlgorithm,
    ) -> Result<Option<String>, RpcError>;

    /// Computes the checksum of a device file, `None` when it does not exist.
    async fn remote_checksum(
        &self,
        path: &str,
        algorithm: HashAlgorithm,
    ) -> Result<Option<String>, RpcError>;

    /// Schedules a reboot at a `yymmddhhmm` timestamp.
    async fn reboot(&self, at: &str) -> Result<String, RpcError>;
}

/// An open device session.
#[async_trait]
pub trait DeviceSession: ConfigTransaction + SoftwareManager {
    /// Facts gathered when the session opened.
    fn facts(&self) -> &DeviceFacts;

    /// Executes a typed RPC.
    async fn rpc(&self, request: &Rpc, timeout: Duration) -> Result<RpcReply, RpcError>;

    /// Executes a raw CLI command.
    async fn cli(&self, command: &str) -> Result<String, RpcError>;

    /// Closes the session. Closing twice is not an error.
    async fn close(&self);
}

/// Opens device sessions.
#[async_trait]
pub trait DeviceConnector: Send + Sync {
    /// Opens a session to a host.
    async fn open(&self, host: &HostDescriptor) -> Result<Box<dyn DeviceSession>, ConnectionError>;
}

/// Executes an RPC with its default timeout and expects text output.
///
/// # Errors
///
/// Propagates the RPC error or an unexpected reply shape.
pub async fn rpc_text(session: &dyn DeviceSession, request: Rpc) -> Result<String, RpcError> {
    session
        .rpc(&request, request.default_timeout())
        .await?
        .into_text(request.name())
}

/// Lists a device path.
///
/// # Errors
///
/// Propagates the RPC error or an unexpected reply shape.
pub async fn list_directory(
    session: &dyn DeviceSession,
    path: &str,
    detail: bool,
) -> Result<DirectoryListing, RpcError> {
    let request = Rpc::FileList {
        path: path.to_string(),
        detail,
    };
    session
        .rpc(&request, request.default_timeout())
        .await?
        .into_directory(request.name())
}
