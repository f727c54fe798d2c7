//! Device session boundary.
//!
//! This module defines what the orchestrator needs from a device:
//! - Facts and structured reply types
//! - Typed RPC requests and replies behind async session traits
//! - A simulated transport driven by YAML device profiles

mod types;
mod session;
mod simulator;

pub use types::{
    CommitEntry, DeviceFacts, DirectoryListing, FileEntry, Personality, SnapshotItem,
    SnapshotPackage,
};
pub use session::{
    CHECKSUM_TIMEOUT_SECS, CLEANFS_TIMEOUT_SECS, ConfigTransaction, CopyRequest,
    DEFAULT_RPC_TIMEOUT_SECS, DeviceConnector, DeviceSession, INSTALL_TIMEOUT_SECS,
    InstallOutcome, InstallRequest, Rpc, RpcReply, SoftwareManager, list_directory, rpc_text,
};
pub use simulator::{
    ConnectFailure, DeviceProfile, FailureKind, Journal, NO_REBOOT_SCHEDULED, RESCUE_CONFIG_PATH,
    SessionCall, SimulatedDevice, SimulatorConnector,
};
