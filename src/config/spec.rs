//! Inventory model types.
//!
//! This module defines the structs that map to the `junos-ops.yaml` inventory
//! file and the resolved, immutable [`HostDescriptor`] each workflow receives.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::path::PathBuf;

/// Default NETCONF port.
pub const DEFAULT_NETCONF_PORT: u16 = 830;

/// Default directory packages are staged in on the device.
pub const DEFAULT_REMOTE_PATH: &str = "/var/tmp";

/// Default `show configuration` pipe used for SCF collection.
pub const DEFAULT_DISPLAY_STYLE: &str = "display set";

/// The root inventory structure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Inventory {
    /// Settings inherited by every host.
    #[serde(default)]
    pub defaults: HostSettings,
    /// Managed hosts, in the order they are processed.
    #[serde(default)]
    pub hosts: Vec<HostEntry>,
}

/// Per-host settings. Every field is optional so that a host entry only
/// names what differs from the defaults section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct HostSettings {
    /// Login user.
    #[serde(default)]
    pub user: Option<String>,
    /// Login password.
    #[serde(default)]
    pub password: Option<String>,
    /// SSH private key file.
    #[serde(default)]
    pub ssh_key: Option<String>,
    /// NETCONF port.
    #[serde(default)]
    pub port: Option<u16>,
    /// Allow very large XML replies.
    #[serde(default)]
    pub huge_tree: Option<bool>,
    /// Checksum algorithm for package verification.
    #[serde(default)]
    pub hash_algorithm: Option<HashAlgorithm>,
    /// Directory packages are staged in on the device.
    #[serde(default)]
    pub remote_path: Option<String>,
    /// Target package per lowercased device model.
    #[serde(default)]
    pub packages: HashMap<String, PackageSpec>,
    /// `show configuration` pipe for SCF collection.
    #[serde(default)]
    pub display_style: Option<String>,
    /// Output directory prefix for RSI/SCF files.
    #[serde(default)]
    pub rsi_dir: Option<String>,
    /// CLI command run after a confirmed commit, or `none`.
    #[serde(default)]
    pub health_check: Option<String>,
    /// Commit-confirm timeout in minutes.
    #[serde(default)]
    pub confirm_timeout: Option<u32>,
}

/// A host entry in the inventory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HostEntry {
    /// Unique name of the host within the inventory.
    pub name: String,
    /// Address to connect to (defaults to the name).
    #[serde(default)]
    pub host: Option<String>,
    /// Free-form tags used for target selection.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Overrides of the defaults section.
    #[serde(flatten)]
    pub settings: HostSettings,
}

/// Package file and expected checksum for one device model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PackageSpec {
    /// Package file name, e.g. `junos-arm-32-22.4R3-S6.5.tgz`.
    pub file: String,
    /// Expected checksum of the package.
    pub hash: String,
}

/// Supported checksum algorithms.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    /// MD5.
    #[default]
    Md5,
    /// SHA-1.
    Sha1,
    /// SHA-256.
    Sha256,
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Md5 => write!(f, "md5"),
            Self::Sha1 => write!(f, "sha1"),
            Self::Sha256 => write!(f, "sha256"),
        }
    }
}

/// Connection parameters for one device.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionParams {
    /// Address to connect to.
    pub host: String,
    /// NETCONF port.
    pub port: u16,
    /// Login user.
    pub user: Option<String>,
    /// Login password.
    pub password: Option<String>,
    /// SSH private key file, with `~` expanded.
    pub ssh_key: Option<PathBuf>,
    /// Allow very large XML replies.
    pub huge_tree: bool,
}

impl fmt::Debug for ConnectionParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionParams")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("ssh_key", &self.ssh_key)
            .field("huge_tree", &self.huge_tree)
            .finish()
    }
}

/// Everything a workflow needs to know about one host.
///
/// Resolved once from the inventory and never mutated during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostDescriptor {
    /// Inventory name of the host.
    pub name: String,
    /// Connection parameters.
    pub connection: ConnectionParams,
    /// Target package per lowercased device model.
    pub packages: HashMap<String, PackageSpec>,
    /// Directory packages are staged in on the device.
    pub remote_path: String,
    /// Checksum algorithm for package verification.
    pub hash_algorithm: HashAlgorithm,
    /// `show configuration` pipe, `None` for the default.
    pub display_style: Option<String>,
    /// Output directory prefix for RSI/SCF files.
    pub rsi_dir: Option<String>,
    /// Lowercased tags.
    pub tags: BTreeSet<String>,
    /// Health-check command override.
    pub health_check: Option<String>,
    /// Commit-confirm timeout override in minutes.
    pub confirm_timeout: Option<u32>,
}

impl Inventory {
    /// Resolves every host entry against the defaults section.
    #[must_use]
    pub fn resolve(&self) -> Vec<HostDescriptor> {
        self.hosts
            .iter()
            .map(|entry| HostDescriptor::resolve(entry, &self.defaults))
            .collect()
    }
}

impl HostSettings {
    /// Overlays `self` on `base`, field by field.
    #[must_use]
    pub fn merged_over(&self, base: &Self) -> Self {
        let mut packages = base.packages.clone();
        packages.extend(self.packages.iter().map(|(k, v)| (k.to_lowercase(), v.clone())));

        Self {
            user: self.user.clone().or_else(|| base.user.clone()),
            password: self.password.clone().or_else(|| base.password.clone()),
            ssh_key: self.ssh_key.clone().or_else(|| base.ssh_key.clone()),
            port: self.port.or(base.port),
            huge_tree: self.huge_tree.or(base.huge_tree),
            hash_algorithm: self.hash_algorithm.or(base.hash_algorithm),
            remote_path: self.remote_path.clone().or_else(|| base.remote_path.clone()),
            packages,
            display_style: self.display_style.clone().or_else(|| base.display_style.clone()),
            rsi_dir: self.rsi_dir.clone().or_else(|| base.rsi_dir.clone()),
            health_check: self.health_check.clone().or_else(|| base.health_check.clone()),
            confirm_timeout: self.confirm_timeout.or(base.confirm_timeout),
        }
    }
}

impl HostDescriptor {
    /// Resolves a host entry against the defaults section.
    #[must_use]
    pub fn resolve(entry: &HostEntry, defaults: &HostSettings) -> Self {
        let settings = entry.settings.merged_over(defaults);
        let packages = settings
            .packages
            .into_iter()
            .map(|(model, spec)| (model.to_lowercase(), spec))
            .collect();

        Self {
            name: entry.name.clone(),
            connection: ConnectionParams {
                host: entry.host.clone().unwrap_or_else(|| entry.name.clone()),
                port: settings.port.unwrap_or(DEFAULT_NETCONF_PORT),
                user: settings.user,
                password: settings.password,
                ssh_key: settings.ssh_key.as_deref().map(expand_home),
                huge_tree: settings.huge_tree.unwrap_or(false),
            },
            packages,
            remote_path: settings
                .remote_path
                .unwrap_or_else(|| String::from(DEFAULT_REMOTE_PATH)),
            hash_algorithm: settings.hash_algorithm.unwrap_or_default(),
            display_style: settings.display_style,
            rsi_dir: settings.rsi_dir,
            tags: entry.tags.iter().map(|t| t.trim().to_lowercase()).collect(),
            health_check: settings.health_check,
            confirm_timeout: settings.confirm_timeout,
        }
    }

    /// Returns the package configured for a device model, if any.
    #[must_use]
    pub fn package_for(&self, model: &str) -> Option<&PackageSpec> {
        self.packages.get(&model.to_lowercase())
    }

    /// Joins a file name onto the remote staging path.
    #[must_use]
    pub fn remote_file(&self, file: &str) -> String {
        format!("{}/{file}", self.remote_path.trim_end_matches('/'))
    }

    /// Returns the CLI command used to collect the SCF.
    #[must_use]
    pub fn scf_command(&self) -> String {
        let style = self.display_style.as_deref().unwrap_or(DEFAULT_DISPLAY_STYLE);
        if style.trim().is_empty() {
            String::from("show configuration")
        } else {
            format!("show configuration | {}", style.trim())
        }
    }

    /// Returns the RSI/SCF output path prefix.
    #[must_use]
    pub fn rsi_prefix(&self) -> &str {
        self.rsi_dir.as_deref().unwrap_or("./")
    }
}

/// Expands a leading `~` to the home directory.
fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => dirs::home_dir().map_or_else(|| PathBuf::from(path), |home| home.join(rest)),
        None => PathBuf::from(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> HostSettings {
        let mut packages = HashMap::new();
        packages.insert(
            String::from("ex2300-24t"),
            PackageSpec {
                file: String::from("junos-arm-32-22.4R3-S6.5.tgz"),
                hash: String::from("abc123def456"),
            },
        );
        HostSettings {
            user: Some(String::from("admin")),
            port: Some(830),
            hash_algorithm: Some(HashAlgorithm::Md5),
            packages,
            ..HostSettings::default()
        }
    }

    #[test]
    fn test_host_inherits_defaults() {
        let entry = HostEntry {
            name: String::from("sw1"),
            host: None,
            tags: vec![String::from(" Tokyo ")],
            settings: HostSettings::default(),
        };
        let host = HostDescriptor::resolve(&entry, &defaults());

        assert_eq!(host.connection.host, "sw1");
        assert_eq!(host.connection.user.as_deref(), Some("admin"));
        assert_eq!(host.remote_path, DEFAULT_REMOTE_PATH);
        assert!(host.tags.contains("tokyo"));
        assert_eq!(
            host.package_for("EX2300-24T").map(|p| p.file.as_str()),
            Some("junos-arm-32-22.4R3-S6.5.tgz")
        );
    }

    #[test]
    fn test_host_overrides_defaults() {
        let entry = HostEntry {
            name: String::from("srx1"),
            host: Some(String::from("192.0.2.10")),
            tags: vec![],
            settings: HostSettings {
                port: Some(2222),
                remote_path: Some(String::from("/var/tmp/")),
                display_style: Some(String::new()),
                ..HostSettings::default()
            },
        };
        let host = HostDescriptor::resolve(&entry, &defaults());

        assert_eq!(host.connection.port, 2222);
        assert_eq!(host.remote_file("pkg.tgz"), "/var/tmp/pkg.tgz");
        assert_eq!(host.scf_command(), "show configuration");
    }

    #[test]
    fn test_default_scf_command() {
        let entry = HostEntry {
            name: String::from("mx1"),
            host: None,
            tags: vec![],
            settings: HostSettings::default(),
        };
        let host = HostDescriptor::resolve(&entry, &HostSettings::default());
        assert_eq!(host.scf_command(), "show configuration | display set");
        assert_eq!(host.rsi_prefix(), "./");
    }
}
