//! Copy, install and rollback of software packages.
//!
//! A full upgrade walks `Start -> CleanedUp -> SnapshotsCleared -> Copied
//! -> RescueSaved -> Installed`. Every mutating step is skipped with a
//! `dry-run:` log line when dry-run is enabled; read-only probes still run.

use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::{HostDescriptor, PackageSpec};
use crate::device::{
    CHECKSUM_TIMEOUT_SECS, CLEANFS_TIMEOUT_SECS, CopyRequest, DeviceSession,
    INSTALL_TIMEOUT_SECS, InstallRequest, Personality, Rpc, rpc_text,
};
use crate::error::{LifecycleError, PackageError, Result, RpcError};
use crate::package::{PackageStager, PackageStatus, target_package};
use crate::version::{
    VersionOrdering, compare_version, pending_version_or_none, planning_version,
    running_matches_planned,
};

use super::{InstallMode, LifecycleOptions, LifecycleOutcome};

/// Device replies that mean a software rollback succeeded, per family.
pub const ROLLBACK_SUCCESS_PHRASES: &[&str] = &[
    // MX
    "Deleting bootstrap installer",
    // EX
    "NOTICE: The 'pending' set has been removed",
    // SRX3xx
    "will become active at next reboot",
    // SRX1500
    "Rollback of staged upgrade succeeded",
    // SRX4600
    "There is NO image for ROLLBACK",
];

/// Device replies that mean a reboot schedule was cleared.
pub const CLEAR_REBOOT_SUCCESS_PHRASES: &[&str] = &["No shutdown/reboot scheduled.", "Terminating..."];

/// Drives the install state machine for one host.
pub struct Installer<'a> {
    host: &'a HostDescriptor,
    session: &'a dyn DeviceSession,
    stager: &'a PackageStager,
    options: LifecycleOptions,
}

impl<'a> Installer<'a> {
    /// Creates an installer for one host session.
    #[must_use]
    pub const fn new(
        host: &'a HostDescriptor,
        session: &'a dyn DeviceSession,
        stager: &'a PackageStager,
        options: LifecycleOptions,
    ) -> Self {
        Self {
            host,
            session,
            stager,
            options,
        }
    }

    /// Open session to the host.
    #[must_use]
    pub fn session(&self) -> &'a dyn DeviceSession {
        self.session
    }

    /// Options in effect.
    #[must_use]
    pub const fn options(&self) -> LifecycleOptions {
        self.options
    }

    pub(crate) fn package(&self) -> Result<&'a PackageSpec> {
        Ok(target_package(self.host, self.session.facts())?)
    }

    fn already_running(&self, package: &PackageSpec) -> bool {
        running_matches_planned(self.session.facts().version.as_deref(), &package.file)
    }

    /// Stages the package on the device.
    ///
    /// # Errors
    ///
    /// Returns an error when storage cleanup or the transfer fails.
    pub async fn copy(&self) -> Result<LifecycleOutcome> {
        let package = self.package()?;

        if self.options.force {
            debug!("force copy");
        } else {
            if self.already_running(package) {
                info!("Already Running, COPY Skip.");
                return Ok(LifecycleOutcome::AlreadyRunning);
            }
            if self.stager.check_remote(self.host, self.session).await?.is_verified() {
                info!("remote package is already copied successfully");
                return Ok(LifecycleOutcome::AlreadyStaged);
            }
        }

        self.storage_cleanup().await?;
        self.delete_snapshots().await;

        if self.options.dry_run {
            info!(
                "dry-run: scp(checksum:{}) {} {}:{}",
                self.host.hash_algorithm, package.file, self.host.name, self.host.remote_path
            );
            return Ok(LifecycleOutcome::DryRun);
        }

        let request = CopyRequest {
            package: package.file.clone(),
            remote_path: self.host.remote_path.clone(),
            checksum: package.hash.clone(),
            algorithm: self.host.hash_algorithm,
            force: self.options.force,
            cleanfs: true,
            checksum_timeout: Duration::from_secs(CHECKSUM_TIMEOUT_SECS),
            cleanfs_timeout: Duration::from_secs(CLEANFS_TIMEOUT_SECS),
        };
        match self.session.safe_copy(&request).await {
            Ok(true) => {
                info!("copy: {} successful", package.file);
                self.stager
                    .cache()
                    .set(&self.host.name, &package.file, &package.hash);
                Ok(LifecycleOutcome::Copied)
            }
            Ok(false) => Err(PackageError::CopyFailed {
                file: package.file.clone(),
                reason: String::from("checksum verification failed"),
            }
            .into()),
            Err(e) => Err(PackageError::CopyFailed {
                file: package.file.clone(),
                reason: e.to_string(),
            }
            .into()),
        }
    }

    /// Installs the package, copying it first unless `mode` is install-only.
    ///
    /// # Errors
    ///
    /// Returns an error when the package is not staged in install-only mode,
    /// or when rollback, copy, rescue save or the install itself fails.
    pub async fn install(&self, mode: InstallMode) -> Result<LifecycleOutcome> {
        let package = self.package()?;

        if self.options.force {
            debug!("force install");
        } else if self.already_running(package) {
            info!("Already Running, INSTALL Skip.");
            return Ok(LifecycleOutcome::AlreadyRunning);
        }

        if let Some(pending) = pending_version_or_none(self.session).await {
            let planning = planning_version(&package.file);
            let ordering = compare_version(Some(&pending), planning.as_deref());
            match ordering {
                VersionOrdering::Greater | VersionOrdering::Equal => {
                    info!("pending={pending} {ordering} planning={planning:?} : No need install.");
                    if !self.options.force {
                        return Ok(LifecycleOutcome::NoInstallNeeded { pending, planning });
                    }
                }
                VersionOrdering::Less => {
                    info!("pending={pending} < planning={planning:?} : NEED INSTALL.");
                }
                VersionOrdering::Undefined => {
                    warn!("pending={pending} has no comparable planning version");
                }
            }

            if let Err(e) = self.rollback().await {
                if !self.options.force {
                    return Err(e.into());
                }
                warn!("rollback failed, continuing because of --force: {e}");
            }
        }

        // Some switches delete the staged file after installing, so the
        // pending check above must come first.
        if self.options.dry_run && mode == InstallMode::Upgrade {
            info!("dry-run: skip remote package check");
        } else if mode == InstallMode::Install && !self.options.force {
            let status = self.stager.check_remote(self.host, self.session).await?;
            if status != PackageStatus::Verified {
                return Err(PackageError::NotStaged {
                    file: package.file.clone(),
                }
                .into());
            }
        }

        self.copy().await?;

        self.clear_reboot()
            .await
            .map_err(|e| LifecycleError::InstallFailed {
                message: e.to_string(),
            })?;
        self.rescue_save().await?;

        if self.options.dry_run {
            info!(
                "dry-run: request system software add {}",
                self.host.remote_file(&package.file)
            );
            return Ok(LifecycleOutcome::DryRun);
        }

        self.install_staged(package, true).await?;
        Ok(LifecycleOutcome::Installed)
    }

    /// Runs a validated install of the already-staged package.
    pub(crate) async fn install_staged(
        &self,
        package: &PackageSpec,
        cleanfs: bool,
    ) -> std::result::Result<(), LifecycleError> {
        let request = InstallRequest {
            package: package.file.clone(),
            remote_path: self.host.remote_path.clone(),
            checksum: package.hash.clone(),
            algorithm: self.host.hash_algorithm,
            validate: true,
            no_copy: true,
            all_re: true,
            cleanfs,
            timeout: Duration::from_secs(INSTALL_TIMEOUT_SECS),
            checksum_timeout: Duration::from_secs(CHECKSUM_TIMEOUT_SECS),
            cleanfs_timeout: Duration::from_secs(CLEANFS_TIMEOUT_SECS),
        };

        let outcome = self
            .session
            .install(&request)
            .await
            .map_err(|e| LifecycleError::InstallFailed {
                message: e.to_string(),
            })?;
        debug!("install message: {}", outcome.message);

        if outcome.ok {
            info!("install successful");
            Ok(())
        } else {
            Err(LifecycleError::InstallFailed {
                message: outcome.message,
            })
        }
    }

    /// Probes the pending version and rolls it back when there is one.
    ///
    /// # Errors
    ///
    /// Returns an error when the rollback is not confirmed by the device.
    pub async fn rollback_pending(&self) -> Result<LifecycleOutcome> {
        let pending = pending_version_or_none(self.session).await;
        info!("rollback: pending version is {pending:?}");
        let Some(pending) = pending else {
            info!("rollback: skip");
            return Ok(LifecycleOutcome::NothingPending);
        };

        self.rollback().await?;
        if self.options.dry_run {
            return Ok(LifecycleOutcome::DryRun);
        }
        info!("rollback: successful");
        Ok(LifecycleOutcome::RolledBack { pending })
    }

    /// Requests a software rollback and checks the device's reply.
    ///
    /// # Errors
    ///
    /// Returns `RollbackFailed` when the RPC fails or the reply contains no
    /// known success phrase.
    pub async fn rollback(&self) -> std::result::Result<(), LifecycleError> {
        if self.options.dry_run {
            info!("dry-run: request system software rollback");
            return Ok(());
        }

        let output = rpc_text(self.session, Rpc::RequestPackageRollback)
            .await
            .map_err(|e| LifecycleError::RollbackFailed {
                output: e.to_string(),
            })?;

        if ROLLBACK_SUCCESS_PHRASES.iter().any(|p| output.contains(p)) {
            info!("rollback: request system software rollback successful");
            debug!("{output}");
            Ok(())
        } else {
            Err(LifecycleError::RollbackFailed { output })
        }
    }

    /// Clears any scheduled reboot, shutdown or halt.
    ///
    /// # Errors
    ///
    /// Returns `ClearRebootFailed` when the RPC fails or the reply is not
    /// a known success phrase.
    pub async fn clear_reboot(&self) -> std::result::Result<(), LifecycleError> {
        if self.options.dry_run {
            info!("dry-run: clear system reboot");
            return Ok(());
        }

        let output = rpc_text(self.session, Rpc::ClearReboot)
            .await
            .map_err(|e| LifecycleError::ClearRebootFailed {
                reason: e.to_string(),
            })?;

        if CLEAR_REBOOT_SUCCESS_PHRASES.iter().any(|p| output.contains(p)) {
            info!("clear reboot schedule successful");
            Ok(())
        } else {
            Err(LifecycleError::ClearRebootFailed { reason: output })
        }
    }

    /// Saves the active configuration as the rescue configuration.
    ///
    /// # Errors
    ///
    /// Returns `RescueSaveFailed` when the device does not confirm the save.
    pub async fn rescue_save(&self) -> std::result::Result<(), LifecycleError> {
        if self.options.dry_run {
            info!("dry-run: request system configuration rescue save");
            return Ok(());
        }

        match self.session.rescue_save().await {
            Ok(true) => {
                info!("rescue config save successful");
                Ok(())
            }
            Ok(false) => Err(LifecycleError::RescueSaveFailed {
                reason: String::from("device did not confirm the save"),
            }),
            Err(e) => Err(LifecycleError::RescueSaveFailed {
                reason: e.to_string(),
            }),
        }
    }

    async fn storage_cleanup(&self) -> std::result::Result<(), PackageError> {
        if self.options.dry_run {
            info!("dry-run: request system storage cleanup");
            return Ok(());
        }

        let request = Rpc::RequestStorageCleanup;
        let cleaned = match self.session.rpc(&request, request.default_timeout()).await {
            Ok(reply) => reply.into_success(request.name()),
            Err(e) => Err(e),
        };
        match cleaned {
            Ok(true) => {
                info!("system storage cleanup successful");
                Ok(())
            }
            Ok(false) => Err(PackageError::StorageCleanupFailed {
                reason: String::from("device did not report success"),
            }),
            Err(e) => Err(PackageError::StorageCleanupFailed {
                reason: e.to_string(),
            }),
        }
    }

    /// Deletes every snapshot on EX/QFX switches to free space.
    ///
    /// Failures are logged and ignored.
    pub async fn delete_snapshots(&self) {
        if self.session.facts().personality != Personality::Switch {
            return;
        }
        if self.options.dry_run {
            info!("dry-run: request system snapshot delete *");
            return;
        }

        let request = Rpc::RequestSnapshotDelete;
        let result: std::result::Result<bool, RpcError> =
            match self.session.rpc(&request, request.default_timeout()).await {
                Ok(reply) => reply.into_success(request.name()),
                Err(e) => Err(e),
            };
        match result {
            Ok(_) => info!("snapshot delete successful"),
            Err(e) => warn!("snapshot delete skipped: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InventoryParser;
    use crate::device::{
        DeviceFacts, DeviceProfile, FailureKind, SessionCall, SimulatedDevice,
    };
    use crate::error::JunosOpsError;
    use crate::package::HashCache;
    use std::sync::Arc;

    const FILE: &str = "junos-arm-32-22.4R3-S6.5.tgz";
    const HASH: &str = "0f1e2d3c";
    const REMOTE: &str = "/var/tmp/junos-arm-32-22.4R3-S6.5.tgz";

    fn host() -> HostDescriptor {
        let yaml = format!(
            "defaults:\n  packages:\n    ex2300-24t:\n      file: {FILE}\n      hash: {HASH}\nhosts:\n  - name: sw1\n"
        );
        InventoryParser::new()
            .parse_yaml(&yaml, None)
            .expect("inventory")
            .resolve()
            .remove(0)
    }

    fn profile(running: &str) -> DeviceProfile {
        let mut profile = DeviceProfile::new(DeviceFacts {
            hostname: String::from("sw1"),
            model: String::from("EX2300-24T"),
            personality: Personality::Switch,
            version: Some(running.to_string()),
            srx_cluster: false,
            chassis_members: 1,
        });
        profile.local_files.insert(FILE.to_string(), HASH.to_string());
        profile
    }

    fn stager() -> PackageStager {
        PackageStager::new(Arc::new(HashCache::new()))
    }

    fn options(force: bool, dry_run: bool) -> LifecycleOptions {
        LifecycleOptions { force, dry_run }
    }

    #[tokio::test]
    async fn test_equal_pending_needs_no_install() {
        let mut profile = profile("21.4R3-S5.4");
        profile.software_information = String::from("Pending: 22.4R3-S6.5\n");
        let device = SimulatedDevice::new(profile);
        let (host, stager) = (host(), stager());

        let outcome = Installer::new(&host, &device, &stager, options(false, false))
            .install(InstallMode::Upgrade)
            .await
            .expect("install");

        assert!(matches!(outcome, LifecycleOutcome::NoInstallNeeded { .. }));
        let journal = device.journal();
        assert_eq!(journal.rpc_count("request-package-rollback"), 0);
        assert_eq!(journal.rpc_count("request-system-storage-cleanup"), 0);
        assert_eq!(journal.count(&SessionCall::SafeCopy(FILE.to_string())), 0);
        assert_eq!(journal.count(&SessionCall::Install(FILE.to_string())), 0);
    }

    #[tokio::test]
    async fn test_already_running_skips_everything() {
        let device = SimulatedDevice::new(profile("22.4R3-S6.5"));
        let (host, stager) = (host(), stager());

        let outcome = Installer::new(&host, &device, &stager, options(false, false))
            .install(InstallMode::Upgrade)
            .await
            .expect("install");

        assert_eq!(outcome, LifecycleOutcome::AlreadyRunning);
        assert!(device.journal().calls().is_empty());
    }

    #[tokio::test]
    async fn test_upgrade_runs_full_sequence() {
        let mut profile = profile("21.4R3-S5.4");
        profile.software_information = String::from("Pending: 22.4R3-S5\n");
        let device = SimulatedDevice::new(profile);
        let (host, stager) = (host(), stager());

        let outcome = Installer::new(&host, &device, &stager, options(false, false))
            .install(InstallMode::Upgrade)
            .await
            .expect("install");
        assert_eq!(outcome, LifecycleOutcome::Installed);

        let calls = device.journal().calls();
        let position = |call: &SessionCall| calls.iter().position(|c| c == call).expect("call made");
        let rollback = position(&SessionCall::Rpc(String::from("request-package-rollback")));
        let cleanup = position(&SessionCall::Rpc(String::from("request-system-storage-cleanup")));
        let snapshots = position(&SessionCall::Rpc(String::from("request-snapshot")));
        let copy = position(&SessionCall::SafeCopy(FILE.to_string()));
        let rescue = position(&SessionCall::RescueSave);
        let install = position(&SessionCall::Install(FILE.to_string()));
        assert!(rollback < cleanup && cleanup < snapshots && snapshots < copy);
        assert!(copy < rescue && rescue < install);
    }

    #[tokio::test]
    async fn test_install_only_requires_staged_package() {
        let device = SimulatedDevice::new(profile("21.4R3-S5.4"));
        let (host, stager) = (host(), stager());

        let result = Installer::new(&host, &device, &stager, options(false, false))
            .install(InstallMode::Install)
            .await;
        assert!(matches!(
            result,
            Err(JunosOpsError::Package(PackageError::NotStaged { .. }))
        ));
        assert_eq!(device.journal().count(&SessionCall::SafeCopy(FILE.to_string())), 0);
    }

    #[tokio::test]
    async fn test_install_only_with_staged_package_skips_copy() {
        let mut profile = profile("21.4R3-S5.4");
        profile.remote_files.insert(REMOTE.to_string(), HASH.to_string());
        let device = SimulatedDevice::new(profile);
        let (host, stager) = (host(), stager());

        let outcome = Installer::new(&host, &device, &stager, options(false, false))
            .install(InstallMode::Install)
            .await
            .expect("install");
        assert_eq!(outcome, LifecycleOutcome::Installed);
        assert_eq!(device.journal().count(&SessionCall::SafeCopy(FILE.to_string())), 0);
    }

    #[tokio::test]
    async fn test_storage_cleanup_failure_aborts_copy() {
        let mut profile = profile("21.4R3-S5.4");
        profile.storage_cleanup_ok = false;
        let device = SimulatedDevice::new(profile);
        let (host, stager) = (host(), stager());

        let result = Installer::new(&host, &device, &stager, options(false, false))
            .copy()
            .await;
        assert!(matches!(
            result,
            Err(JunosOpsError::Package(PackageError::StorageCleanupFailed { .. }))
        ));
        assert_eq!(device.journal().count(&SessionCall::SafeCopy(FILE.to_string())), 0);
    }

    #[tokio::test]
    async fn test_snapshot_delete_failure_is_ignored() {
        let device = SimulatedDevice::new(
            profile("21.4R3-S5.4").failing("request-snapshot", FailureKind::Timeout),
        );
        let (host, stager) = (host(), stager());

        let outcome = Installer::new(&host, &device, &stager, options(false, false))
            .copy()
            .await
            .expect("copy");
        assert_eq!(outcome, LifecycleOutcome::Copied);
        assert!(stager.cache().matches("sw1", FILE, HASH));
    }

    #[tokio::test]
    async fn test_rollback_requires_known_phrase() {
        let mut profile = profile("21.4R3-S5.4");
        profile.software_information = String::from("Pending: 22.4R3-S5\n");
        profile.rollback_output = String::from("error: rollback in progress");
        let device = SimulatedDevice::new(profile);
        let (host, stager) = (host(), stager());

        let result = Installer::new(&host, &device, &stager, options(false, false))
            .install(InstallMode::Upgrade)
            .await;
        assert!(matches!(
            result,
            Err(JunosOpsError::Lifecycle(LifecycleError::RollbackFailed { .. }))
        ));
        assert_eq!(device.journal().count(&SessionCall::SafeCopy(FILE.to_string())), 0);
    }

    #[tokio::test]
    async fn test_dry_run_mutates_nothing() {
        let mut profile = profile("21.4R3-S5.4");
        profile.software_information = String::from("Pending: 22.4R3-S5\n");
        let device = SimulatedDevice::new(profile);
        let (host, stager) = (host(), stager());

        let outcome = Installer::new(&host, &device, &stager, options(false, true))
            .install(InstallMode::Upgrade)
            .await
            .expect("install");
        assert_eq!(outcome, LifecycleOutcome::DryRun);

        let journal = device.journal();
        assert_eq!(journal.rpc_count("request-package-rollback"), 0);
        assert_eq!(journal.rpc_count("request-system-storage-cleanup"), 0);
        assert_eq!(journal.count(&SessionCall::RescueSave), 0);
        assert_eq!(journal.count(&SessionCall::Install(FILE.to_string())), 0);
    }

    #[tokio::test]
    async fn test_transfer_carries_checksum_and_cleanfs_timeouts() {
        let device = SimulatedDevice::new(profile("21.4R3-S5.4"));
        let (host, stager) = (host(), stager());

        let outcome = Installer::new(&host, &device, &stager, options(false, false))
            .install(InstallMode::Upgrade)
            .await
            .expect("install");
        assert_eq!(outcome, LifecycleOutcome::Installed);

        let copy = device.last_copy().expect("copy request");
        assert_eq!(copy.checksum_timeout, Duration::from_secs(1200));
        assert_eq!(copy.cleanfs_timeout, Duration::from_secs(300));
        let install = device.last_install().expect("install request");
        assert_eq!(install.timeout, Duration::from_secs(2400));
        assert_eq!(install.checksum_timeout, Duration::from_secs(1200));
        assert_eq!(install.cleanfs_timeout, Duration::from_secs(300));
    }

    #[tokio::test]
    async fn test_copy_timeout_reports_checksum_timeout() {
        let device = SimulatedDevice::new(
            profile("21.4R3-S5.4").failing("safe_copy", FailureKind::Timeout),
        );
        let (host, stager) = (host(), stager());

        let result = Installer::new(&host, &device, &stager, options(false, false))
            .copy()
            .await;
        match result {
            Err(JunosOpsError::Package(PackageError::CopyFailed { reason, .. })) => {
                assert!(reason.contains("1200s"), "{reason}");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_checksum_mismatch_on_transfer_aborts_install() {
        let mut profile = profile("21.4R3-S5.4");
        profile.local_files.insert(FILE.to_string(), String::from("deadbeef"));
        let device = SimulatedDevice::new(profile);
        let (host, stager) = (host(), stager());

        let result = Installer::new(&host, &device, &stager, options(false, false))
            .install(InstallMode::Upgrade)
            .await;
        assert!(matches!(
            result,
            Err(JunosOpsError::Package(PackageError::CopyFailed { .. }))
        ));
        let journal = device.journal();
        assert_eq!(journal.count(&SessionCall::SafeCopy(FILE.to_string())), 1);
        assert_eq!(journal.count(&SessionCall::RescueSave), 0);
        assert_eq!(journal.count(&SessionCall::Install(FILE.to_string())), 0);
        assert!(!stager.cache().matches("sw1", FILE, HASH));
    }

    #[tokio::test]
    async fn test_transfer_error_aborts_install() {
        let device = SimulatedDevice::new(
            profile("21.4R3-S5.4").failing("safe_copy", FailureKind::Error),
        );
        let (host, stager) = (host(), stager());

        let result = Installer::new(&host, &device, &stager, options(false, false))
            .install(InstallMode::Upgrade)
            .await;
        assert!(matches!(
            result,
            Err(JunosOpsError::Package(PackageError::CopyFailed { .. }))
        ));
        let journal = device.journal();
        assert_eq!(journal.count(&SessionCall::RescueSave), 0);
        assert_eq!(journal.count(&SessionCall::Install(FILE.to_string())), 0);
    }

    #[tokio::test]
    async fn test_rescue_save_failure_aborts_before_install() {
        let device = SimulatedDevice::new(
            profile("21.4R3-S5.4").failing("rescue_save", FailureKind::Error),
        );
        let (host, stager) = (host(), stager());

        let result = Installer::new(&host, &device, &stager, options(false, false))
            .install(InstallMode::Upgrade)
            .await;
        assert!(matches!(
            result,
            Err(JunosOpsError::Lifecycle(LifecycleError::RescueSaveFailed { .. }))
        ));
        let journal = device.journal();
        assert_eq!(journal.count(&SessionCall::SafeCopy(FILE.to_string())), 1);
        assert_eq!(journal.count(&SessionCall::RescueSave), 1);
        assert_eq!(journal.count(&SessionCall::Install(FILE.to_string())), 0);
    }

    #[tokio::test]
    async fn test_force_reinstalls_equal_pending() {
        let mut profile = profile("21.4R3-S5.4");
        profile.software_information = String::from("Pending: 22.4R3-S6.5\n");
        let device = SimulatedDevice::new(profile);
        let (host, stager) = (host(), stager());

        let outcome = Installer::new(&host, &device, &stager, options(true, false))
            .install(InstallMode::Upgrade)
            .await
            .expect("install");
        assert_eq!(outcome, LifecycleOutcome::Installed);

        let journal = device.journal();
        assert_eq!(journal.rpc_count("request-package-rollback"), 1);
        assert_eq!(journal.count(&SessionCall::SafeCopy(FILE.to_string())), 1);
        assert_eq!(journal.count(&SessionCall::Install(FILE.to_string())), 1);
    }

    #[tokio::test]
    async fn test_force_continues_after_rollback_failure() {
        let mut profile = profile("21.4R3-S5.4");
        profile.software_information = String::from("Pending: 22.4R3-S5\n");
        profile.rollback_output = String::from("error: rollback in progress");
        let device = SimulatedDevice::new(profile);
        let (host, stager) = (host(), stager());

        let outcome = Installer::new(&host, &device, &stager, options(true, false))
            .install(InstallMode::Upgrade)
            .await
            .expect("install");
        assert_eq!(outcome, LifecycleOutcome::Installed);

        let journal = device.journal();
        assert_eq!(journal.rpc_count("request-package-rollback"), 1);
        assert_eq!(journal.count(&SessionCall::RescueSave), 1);
        assert_eq!(journal.count(&SessionCall::Install(FILE.to_string())), 1);
    }

    #[tokio::test]
    async fn test_rollback_pending_skips_when_nothing_staged() {
        let device = SimulatedDevice::new(profile("21.4R3-S5.4"));
        let (host, stager) = (host(), stager());

        let outcome = Installer::new(&host, &device, &stager, options(false, false))
            .rollback_pending()
            .await
            .expect("rollback");
        assert_eq!(outcome, LifecycleOutcome::NothingPending);
        assert_eq!(device.journal().rpc_count("request-package-rollback"), 0);
    }
}
