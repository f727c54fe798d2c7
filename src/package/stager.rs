//! Checksum-verified package presence checks.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

use crate::config::{HostDescriptor, PackageSpec};
use crate::device::{DeviceFacts, DeviceSession};
use crate::error::ConfigError;

use super::cache::{HashCache, LOCALHOST_SCOPE};

/// Outcome of a package check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageStatus {
    /// Present with the expected checksum.
    Verified,
    /// Present with a different checksum; copy again.
    Mismatched,
    /// Not present, or the checksum could not be computed.
    Missing,
}

impl PackageStatus {
    /// Returns true for [`PackageStatus::Verified`].
    #[must_use]
    pub const fn is_verified(self) -> bool {
        matches!(self, Self::Verified)
    }
}

impl fmt::Display for PackageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Verified => write!(f, "checksum is OK"),
            Self::Mismatched => write!(f, "checksum is BAD, copy again"),
            Self::Missing => write!(f, "not found"),
        }
    }
}

/// Looks up the package configured for a device's model.
///
/// # Errors
///
/// Returns `MissingPackage` when the inventory has no entry for the model.
pub fn target_package<'a>(
    host: &'a HostDescriptor,
    facts: &DeviceFacts,
) -> Result<&'a PackageSpec, ConfigError> {
    host.package_for(&facts.model)
        .ok_or_else(|| ConfigError::MissingPackage {
            host: host.name.clone(),
            model: facts.model.to_lowercase(),
        })
}

/// Verifies local and staged packages, backed by the shared hash cache.
#[derive(Debug, Clone)]
pub struct PackageStager {
    cache: Arc<HashCache>,
}

impl PackageStager {
    /// Creates a stager over a shared cache.
    #[must_use]
    pub const fn new(cache: Arc<HashCache>) -> Self {
        Self { cache }
    }

    /// Returns the shared cache.
    #[must_use]
    pub fn cache(&self) -> &HashCache {
        &self.cache
    }

    /// Checks the package file on the orchestrating machine.
    ///
    /// # Errors
    ///
    /// Returns an error when no package is configured for the device model.
    pub async fn check_local(
        &self,
        host: &HostDescriptor,
        session: &dyn DeviceSession,
    ) -> Result<PackageStatus, ConfigError> {
        let package = target_package(host, session.facts())?;
        if package.file.is_empty() || package.hash.is_empty() {
            return Ok(PackageStatus::Missing);
        }
        if self.cache.matches(LOCALHOST_SCOPE, &package.file, &package.hash) {
            info!("local package: {} is found, checksum(cache) is OK", package.file);
            return Ok(PackageStatus::Verified);
        }

        let started = Instant::now();
        let computed = match session
            .local_checksum(&package.file, host.hash_algorithm)
            .await
        {
            Ok(value) => value,
            Err(e) => {
                error!("local checksum of {} failed: {e}", package.file);
                None
            }
        };
        debug!("local checksum took {:?}", started.elapsed());

        let status = self.settle(LOCALHOST_SCOPE, package, computed);
        info!("local package: {} {status}", package.file);
        Ok(status)
    }

    /// Checks the package staged under the host's remote path.
    ///
    /// # Errors
    ///
    /// Returns an error when no package is configured for the device model.
    pub async fn check_remote(
        &self,
        host: &HostDescriptor,
        session: &dyn DeviceSession,
    ) -> Result<PackageStatus, ConfigError> {
        let package = target_package(host, session.facts())?;
        if package.file.is_empty() || package.hash.is_empty() {
            return Ok(PackageStatus::Missing);
        }
        if self.cache.matches(&host.name, &package.file, &package.hash) {
            info!("remote package: {} is found, checksum(cache) is OK", package.file);
            return Ok(PackageStatus::Verified);
        }

        let path = host.remote_file(&package.file);
        let computed = match session.remote_checksum(&path, host.hash_algorithm).await {
            Ok(value) => value,
            Err(e) => {
                warn!("Unable to compute remote checksum of {path}: {e}");
                None
            }
        };

        let status = self.settle(&host.name, package, computed);
        info!("remote package: {} {status}", package.file);
        Ok(status)
    }

    fn settle(&self, scope: &str, package: &PackageSpec, computed: Option<String>) -> PackageStatus {
        match computed {
            None => PackageStatus::Missing,
            Some(value) if value == package.hash => {
                self.cache.set(scope, &package.file, &value);
                PackageStatus::Verified
            }
            Some(_) => PackageStatus::Mismatched,
        }
    }
}
