//! Device data types.
//!
//! Facts and structured RPC replies exchanged with a device session.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Device family classification used to select version probes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Personality {
    /// EX/QFX switches.
    Switch,
    /// MX routers.
    Routing,
    /// Dual-partition branch SRX (SRX3xx).
    SecurityBranch,
    /// Midrange SRX (SRX1500).
    SecurityMidrange,
    /// High-end SRX (SRX4600 and up).
    SecurityHighend,
    /// Anything else the device reported.
    Other(String),
}

impl From<String> for Personality {
    fn from(value: String) -> Self {
        match value.to_uppercase().as_str() {
            "SWITCH" => Self::Switch,
            "MX" => Self::Routing,
            "SRX_BRANCH" => Self::SecurityBranch,
            "SRX_MIDRANGE" => Self::SecurityMidrange,
            "SRX_HIGHEND" => Self::SecurityHighend,
            _ => Self::Other(value),
        }
    }
}

impl From<Personality> for String {
    fn from(value: Personality) -> Self {
        value.to_string()
    }
}

impl fmt::Display for Personality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Switch => write!(f, "SWITCH"),
            Self::Routing => write!(f, "MX"),
            Self::SecurityBranch => write!(f, "SRX_BRANCH"),
            Self::SecurityMidrange => write!(f, "SRX_MIDRANGE"),
            Self::SecurityHighend => write!(f, "SRX_HIGHEND"),
            Self::Other(name) => write!(f, "{name}"),
        }
    }
}

/// Facts read once when a session opens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceFacts {
    /// Configured hostname.
    pub hostname: String,
    /// Model identifier, e.g. `EX2300-24T`.
    pub model: String,
    /// Device family.
    pub personality: Personality,
    /// Running software version.
    #[serde(default)]
    pub version: Option<String>,
    /// Whether the device is a member of an SRX chassis cluster.
    #[serde(default)]
    pub srx_cluster: bool,
    /// Number of chassis members (more than one for a Virtual Chassis).
    #[serde(default = "default_members")]
    pub chassis_members: usize,
}

const fn default_members() -> usize {
    1
}

impl DeviceFacts {
    /// Returns true for multi-member chassis.
    #[must_use]
    pub const fn is_virtual_chassis(&self) -> bool {
        self.chassis_members >= 2
    }
}

/// One element of a `get-snapshot-information` reply, in document order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotItem {
    /// A `snapshot-medium` element, e.g. `internal (da0s1a) (primary)`.
    Medium(String),
    /// A `software-version` element listing packages.
    SoftwareVersion(Vec<SnapshotPackage>),
}

/// A package inside a snapshot software-version block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotPackage {
    /// Package name.
    pub name: String,
    /// Package version.
    pub version: String,
}

/// One `commit-history` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitEntry {
    /// Sequence number, 0 is the latest commit.
    pub sequence: u32,
    /// Commit time in epoch seconds.
    pub epoch: i64,
    /// Commit time as displayed by the device.
    pub date_time: String,
    /// Committing user.
    #[serde(default)]
    pub user: String,
    /// Client the commit came from (cli, netconf, ...).
    #[serde(default)]
    pub client: String,
}

/// A `file list` reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct DirectoryListing {
    /// Listed path.
    pub path: String,
    /// Entries in device order.
    #[serde(default)]
    pub files: Vec<FileEntry>,
}

/// A single directory entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    /// Full path.
    pub path: String,
    /// True for directories.
    #[serde(default)]
    pub is_dir: bool,
    /// `-rw-r--r--` style permissions.
    #[serde(default)]
    pub permissions: String,
    /// Owner.
    #[serde(default)]
    pub owner: String,
    /// Size in bytes.
    #[serde(default)]
    pub size: u64,
    /// Modification date as displayed by the device.
    #[serde(default)]
    pub date: String,
    /// Modification time in epoch seconds.
    #[serde(default)]
    pub modified_epoch: Option<i64>,
}

impl DirectoryListing {
    /// Number of files in the listing.
    #[must_use]
    pub fn file_count(&self) -> usize {
        self.files.iter().filter(|f| !f.is_dir).count()
    }
}
