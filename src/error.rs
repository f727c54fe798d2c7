//! Error types for junos-ops.
//!
//! Errors are grouped by the component that raises them: inventory
//! configuration, device connection, RPC execution, package staging,
//! the install/reboot lifecycle and the configuration push transaction.
//! Every error is contained at the per-host workflow boundary and turned
//! into a result code there.

use std::path::PathBuf;
use thiserror::Error;

/// Result code for a generic per-host failure.
pub const EXIT_FAILURE: i32 = 1;
/// Result code for a support-information collection failure.
pub const EXIT_RSI_FAILURE: i32 = 2;
/// Result code when an existing reboot schedule could not be cleared.
pub const EXIT_CLEAR_REBOOT_FAILURE: i32 = 3;
/// Result code when the session dropped while scheduling a reboot.
pub const EXIT_REBOOT_CONNECTION_FAILURE: i32 = 4;
/// Result code when the reboot RPC itself failed.
pub const EXIT_REBOOT_RPC_FAILURE: i32 = 5;
/// Result code when the drift re-install before a reboot failed.
pub const EXIT_REINSTALL_FAILURE: i32 = 6;

/// The main error type for junos-ops.
#[derive(Debug, Error)]
pub enum JunosOpsError {
    /// Inventory configuration errors.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Session establishment errors.
    #[error("Connection error: {0}")]
    Connection(#[from] ConnectionError),

    /// RPC execution errors.
    #[error("RPC error: {0}")]
    Rpc(#[from] RpcError),

    /// Package staging errors.
    #[error("Package error: {0}")]
    Package(#[from] PackageError),

    /// Install, rollback and reboot errors.
    #[error("Lifecycle error: {0}")]
    Lifecycle(#[from] LifecycleError),

    /// Configuration push errors.
    #[error("Commit error: {0}")]
    Commit(#[from] CommitError),

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Inventory configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The inventory file was not found.
    #[error("Configuration file not found: {path}")]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// The inventory file could not be parsed.
    #[error("Failed to parse configuration: {message}")]
    ParseError {
        /// Description of the parse error.
        message: String,
        /// Optional source location.
        location: Option<String>,
    },

    /// Validation failed.
    #[error("Configuration validation failed: {message}")]
    ValidationError {
        /// Description of the validation error.
        message: String,
        /// Field that failed validation.
        field: Option<String>,
    },

    /// A host named on the command line is not in the inventory.
    #[error("{host} is not found in the inventory")]
    UnknownHost {
        /// The unknown host name.
        host: String,
    },

    /// No host carries every requested tag.
    #[error("no hosts matched tags: {tags}")]
    NoTagMatch {
        /// The requested tags, comma separated.
        tags: String,
    },

    /// No package is configured for a device model.
    #[error("{host}: {model}.file not found in inventory")]
    MissingPackage {
        /// Host name.
        host: String,
        /// Lowercased device model.
        model: String,
    },

    /// Duplicate host definition.
    #[error("Duplicate host name: {name}")]
    DuplicateHost {
        /// The duplicated name.
        name: String,
    },

    /// A `--at` value could not be parsed.
    #[error("{value} must be yymmddhhmm format, e.g. 2501020304")]
    InvalidRebootTime {
        /// The rejected value.
        value: String,
    },

    /// No device transport is available.
    #[error("No device transport configured: {message}")]
    NoTransport {
        /// Hint for the operator.
        message: String,
    },
}

/// Session establishment errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConnectionError {
    /// Authentication credentials were rejected.
    #[error("Authentication credentials fail to login: {0}")]
    Auth(String),

    /// The device refused the NETCONF connection.
    #[error("NETCONF connection refused: {0}")]
    Refused(String),

    /// The connection attempt timed out.
    #[error("Connection timeout: {0}")]
    Timeout(String),

    /// The host name did not resolve.
    #[error("Unknown host: {0}")]
    UnknownHost(String),

    /// Any other connection failure.
    #[error("Cannot connect to device: {0}")]
    Other(String),
}

/// RPC execution errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RpcError {
    /// The device returned an RPC error.
    #[error("{operation} failed: {message}")]
    Failed {
        /// Operation name.
        operation: String,
        /// Device-reported message.
        message: String,
    },

    /// The RPC did not complete within its timeout.
    #[error("{operation} timed out after {timeout_secs}s")]
    Timeout {
        /// Operation name.
        operation: String,
        /// Timeout that expired.
        timeout_secs: u64,
    },

    /// The reply did not have the expected shape.
    #[error("{operation} returned an unexpected reply: expected {expected}")]
    UnexpectedReply {
        /// Operation name.
        operation: String,
        /// Expected reply kind.
        expected: &'static str,
    },

    /// The session was lost mid-operation.
    #[error("session closed during {operation}")]
    SessionClosed {
        /// Operation name.
        operation: String,
    },
}

/// Package staging errors.
#[derive(Debug, Error)]
pub enum PackageError {
    /// The package is not staged on the device and copying was not requested.
    #[error("remote package {file} is not staged. Please consider copy before install")]
    NotStaged {
        /// Package file name.
        file: String,
    },

    /// The checksummed transfer failed.
    #[error("copy of {file} failed: {reason}")]
    CopyFailed {
        /// Package file name.
        file: String,
        /// Failure reason.
        reason: String,
    },

    /// Storage cleanup did not succeed.
    #[error("system storage cleanup failed: {reason}")]
    StorageCleanupFailed {
        /// Failure reason.
        reason: String,
    },
}

/// Install, rollback and reboot lifecycle errors.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// The device personality has no version probe.
    #[error("unsupported device personality: {personality}")]
    UnsupportedDevice {
        /// The reported personality.
        personality: String,
    },

    /// Software rollback did not report success.
    #[error("request system software rollback failed: {output}")]
    RollbackFailed {
        /// Device output.
        output: String,
    },

    /// Clearing an existing reboot schedule failed.
    #[error("clear reboot schedule failed: {reason}")]
    ClearRebootFailed {
        /// Failure reason.
        reason: String,
    },

    /// Saving the rescue configuration failed.
    #[error("rescue config save failed: {reason}")]
    RescueSaveFailed {
        /// Failure reason.
        reason: String,
    },

    /// The device rejected the package installation.
    #[error("install failed: {message}")]
    InstallFailed {
        /// Device-reported message.
        message: String,
    },

    /// Re-install after configuration drift failed.
    #[error("re-install after config drift failed: {reason}")]
    ReinstallFailed {
        /// Failure reason.
        reason: String,
    },

    /// The reboot schedule could not be read.
    #[error("reboot information unavailable: {0}")]
    RebootInfoUnavailable(RpcError),

    /// Scheduling the reboot failed.
    #[error("reboot scheduling failed: {0}")]
    RebootFailed(RpcError),

    /// Support information collection failed.
    #[error("support information collection failed: {0}")]
    SupportInfoFailed(RpcError),
}

/// Configuration push transaction errors.
#[derive(Debug, Error)]
pub enum CommitError {
    /// The exclusive configuration lock could not be taken.
    #[error("config lock failed: {0}")]
    LockFailed(RpcError),

    /// Loading the set commands failed.
    #[error("config load failed: {0}")]
    LoadFailed(RpcError),

    /// Computing the candidate diff failed.
    #[error("config diff failed: {0}")]
    DiffFailed(RpcError),

    /// `commit check` rejected the candidate.
    #[error("commit check failed: {0}")]
    ValidationFailed(RpcError),

    /// A commit was rejected.
    #[error("commit failed: {0}")]
    CommitFailed(RpcError),

    /// The post-commit health check failed; the device will revert on its own.
    #[error("health check failed, leaving commit unconfirmed: {reason}")]
    HealthCheckFailed {
        /// Failure reason.
        reason: String,
    },
}

/// Result type alias for junos-ops operations.
pub type Result<T> = std::result::Result<T, JunosOpsError>;

impl JunosOpsError {
    /// Creates a new internal error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Returns the per-host result code for this error.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Lifecycle(LifecycleError::SupportInfoFailed(_)) => EXIT_RSI_FAILURE,
            Self::Lifecycle(LifecycleError::ClearRebootFailed { .. }) => EXIT_CLEAR_REBOOT_FAILURE,
            Self::Lifecycle(
                LifecycleError::RebootInfoUnavailable(e) | LifecycleError::RebootFailed(e),
            ) => {
                if e.is_connection_loss() {
                    EXIT_REBOOT_CONNECTION_FAILURE
                } else {
                    EXIT_REBOOT_RPC_FAILURE
                }
            }
            Self::Lifecycle(LifecycleError::ReinstallFailed { .. }) => EXIT_REINSTALL_FAILURE,
            _ => EXIT_FAILURE,
        }
    }
}

impl ConfigError {
    /// Creates a validation error for a specific field.
    #[must_use]
    pub fn validation(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: Some(field.into()),
        }
    }
}

impl RpcError {
    /// Creates a device-reported RPC failure.
    #[must_use]
    pub fn failed(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Failed {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Returns true if the session is gone and further calls are pointless.
    #[must_use]
    pub const fn is_connection_loss(&self) -> bool {
        matches!(self, Self::SessionClosed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reboot_exit_codes() {
        let clear = JunosOpsError::from(LifecycleError::ClearRebootFailed {
            reason: String::from("x"),
        });
        assert_eq!(clear.exit_code(), 3);

        let lost = JunosOpsError::from(LifecycleError::RebootFailed(RpcError::SessionClosed {
            operation: String::from("reboot"),
        }));
        assert_eq!(lost.exit_code(), 4);

        let rpc = JunosOpsError::from(LifecycleError::RebootFailed(RpcError::failed("reboot", "denied")));
        assert_eq!(rpc.exit_code(), 5);

        let info_lost = JunosOpsError::from(LifecycleError::RebootInfoUnavailable(
            RpcError::SessionClosed {
                operation: String::from("get-reboot-information"),
            },
        ));
        assert_eq!(info_lost.exit_code(), 4);

        let info_timeout = JunosOpsError::from(LifecycleError::RebootInfoUnavailable(
            RpcError::Timeout {
                operation: String::from("get-reboot-information"),
                timeout_secs: 30,
            },
        ));
        assert_eq!(info_timeout.exit_code(), 5);

        let reinstall = JunosOpsError::from(LifecycleError::ReinstallFailed {
            reason: String::from("validation"),
        });
        assert_eq!(reinstall.exit_code(), 6);
    }

    #[test]
    fn test_generic_and_rsi_exit_codes() {
        let rsi = JunosOpsError::from(LifecycleError::SupportInfoFailed(RpcError::Timeout {
            operation: String::from("get-support-information"),
            timeout_secs: 600,
        }));
        assert_eq!(rsi.exit_code(), 2);

        let conn = JunosOpsError::from(ConnectionError::Refused(String::from("830")));
        assert_eq!(conn.exit_code(), 1);
        assert_eq!(JunosOpsError::internal("boom").exit_code(), 1);
    }
}
