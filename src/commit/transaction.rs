//! Configuration push transaction.
//!
//! `lock -> load -> diff -> commit check -> commit confirmed -> health check
//! -> commit -> unlock`. The lock is released exactly once on every path
//! that acquired it. When the health check fails the final commit is not
//! issued and the device reverts the change when its confirm timer expires.

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::device::DeviceSession;
use crate::error::CommitError;

use super::health::{HealthCheck, HealthStatus};

/// Default commit-confirm timeout in minutes.
pub const DEFAULT_CONFIRM_TIMEOUT_MINUTES: u32 = 1;

/// Transaction state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitState {
    /// Nothing done yet.
    Idle,
    /// Configuration lock held.
    Locked,
    /// Set commands loaded into the candidate.
    Loaded,
    /// Candidate diff computed.
    Diffed,
    /// The candidate matched the active configuration.
    NoChange,
    /// `commit check` passed.
    Validated,
    /// Committed with a confirm timer running.
    ConfirmPending,
    /// Health probe passed or was skipped.
    HealthChecked,
    /// Change made permanent.
    Confirmed,
    /// Candidate discarded.
    RolledBack,
}

/// Settings for one push.
#[derive(Debug, Clone)]
pub struct PushOptions {
    /// Show the diff and discard the candidate.
    pub dry_run: bool,
    /// Commit-confirm timeout in minutes.
    pub confirm_timeout: u32,
    /// Probe run between the confirmed and the final commit.
    pub health_check: HealthCheck,
}

impl Default for PushOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            confirm_timeout: DEFAULT_CONFIRM_TIMEOUT_MINUTES,
            health_check: HealthCheck::default(),
        }
    }
}

/// Successful end of a push.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PushOutcome {
    /// Nothing to commit.
    NoChanges,
    /// Dry-run: the diff was shown and the candidate discarded.
    DryRun {
        /// Candidate diff.
        diff: String,
    },
    /// Committed and confirmed.
    Committed {
        /// Candidate diff.
        diff: String,
        /// Health probe result, `None` when disabled.
        health: Option<HealthStatus>,
    },
}

/// One configuration push against one session.
pub struct ConfigPush<'a> {
    session: &'a dyn DeviceSession,
    options: PushOptions,
    state: CommitState,
}

impl<'a> ConfigPush<'a> {
    /// Creates a push over an open session.
    #[must_use]
    pub fn new(session: &'a dyn DeviceSession, options: PushOptions) -> Self {
        Self {
            session,
            options,
            state: CommitState::Idle,
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> CommitState {
        self.state
    }

    fn transition(&mut self, next: CommitState) {
        debug!("commit transaction {:?} -> {next:?}", self.state);
        self.state = next;
    }

    /// Runs the transaction for a list of set commands.
    ///
    /// # Errors
    ///
    /// Returns an error when the lock cannot be taken, when any step after
    /// the lock fails, or when the health check fails. The candidate is
    /// rolled back and the lock released before the error is returned.
    pub async fn run(&mut self, commands: &[String]) -> Result<PushOutcome, CommitError> {
        self.session.lock().await.map_err(CommitError::LockFailed)?;
        self.transition(CommitState::Locked);

        let result = self.apply(commands).await;
        if let Err(e) = &result {
            error!("config push failed: {e}");
            if let Err(rollback_error) = self.session.rollback().await {
                warn!("rollback after failure failed: {rollback_error}");
            } else if self.state != CommitState::ConfirmPending {
                self.transition(CommitState::RolledBack);
            }
        }

        if let Err(e) = self.session.unlock().await {
            warn!("config unlock failed: {e}");
        }
        result
    }

    async fn apply(&mut self, commands: &[String]) -> Result<PushOutcome, CommitError> {
        self.session
            .load(&commands.join("\n"))
            .await
            .map_err(CommitError::LoadFailed)?;
        self.transition(CommitState::Loaded);

        let diff = self.session.diff().await.map_err(CommitError::DiffFailed)?;
        self.transition(CommitState::Diffed);
        if diff.is_none() {
            info!("no changes");
            self.transition(CommitState::NoChange);
            return Ok(PushOutcome::NoChanges);
        }

        let diff = self.session.pdiff().await.map_err(CommitError::DiffFailed)?;

        if self.options.dry_run {
            info!("dry-run: rollback (no commit)");
            if let Err(e) = self.session.rollback().await {
                warn!("dry-run rollback failed: {e}");
            }
            self.transition(CommitState::RolledBack);
            return Ok(PushOutcome::DryRun { diff });
        }

        self.session
            .commit_check()
            .await
            .map_err(CommitError::ValidationFailed)?;
        info!("commit check passed");
        self.transition(CommitState::Validated);

        let minutes = self.options.confirm_timeout;
        self.session
            .commit(Some(minutes))
            .await
            .map_err(CommitError::CommitFailed)?;
        info!("commit confirmed {minutes} applied");
        self.transition(CommitState::ConfirmPending);

        let health = self.options.health_check.run(self.session).await;
        if let Some(status) = &health {
            if !status.healthy {
                return Err(CommitError::HealthCheckFailed {
                    reason: status
                        .error
                        .clone()
                        .unwrap_or_else(|| String::from("unhealthy")),
                });
            }
            info!("health check passed: {}", status.command);
        }
        self.transition(CommitState::HealthChecked);

        self.session
            .commit(None)
            .await
            .map_err(CommitError::CommitFailed)?;
        info!("commit confirmed, changes are now permanent");
        self.transition(CommitState::Confirmed);

        Ok(PushOutcome::Committed { diff, health })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{
        DeviceFacts, DeviceProfile, FailureKind, Personality, SessionCall, SimulatedDevice,
    };

    fn profile(diff: Option<&str>) -> DeviceProfile {
        let mut profile = DeviceProfile::new(DeviceFacts {
            hostname: String::from("sw1"),
            model: String::from("EX4300-48T"),
            personality: Personality::Switch,
            version: Some(String::from("22.4R3-S6.5")),
            srx_cluster: false,
            chassis_members: 1,
        });
        profile.candidate_diff = diff.map(String::from);
        profile
    }

    fn commands() -> Vec<String> {
        vec![String::from("set system ntp server 192.0.2.123")]
    }

    const NTP_DIFF: &str = "[edit system ntp]\n+    server 192.0.2.123;";

    async fn push(device: &SimulatedDevice, options: PushOptions) -> (Result<PushOutcome, CommitError>, CommitState) {
        let mut push = ConfigPush::new(device, options);
        let result = push.run(&commands()).await;
        (result, push.state())
    }

    #[tokio::test]
    async fn test_empty_diff_never_commits() {
        let device = SimulatedDevice::new(profile(None));
        let (result, state) = push(&device, PushOptions::default()).await;

        assert!(matches!(result, Ok(PushOutcome::NoChanges)));
        assert_eq!(state, CommitState::NoChange);
        let journal = device.journal();
        assert_eq!(journal.count(&SessionCall::Commit(None)), 0);
        assert_eq!(journal.count(&SessionCall::Commit(Some(1))), 0);
        assert_eq!(journal.count(&SessionCall::CommitCheck), 0);
        assert_eq!(journal.count(&SessionCall::Unlock), 1);
    }

    #[tokio::test]
    async fn test_successful_push_sequence() {
        let device = SimulatedDevice::new(profile(Some(NTP_DIFF)));
        let (result, state) = push(&device, PushOptions::default()).await;

        assert!(matches!(result, Ok(PushOutcome::Committed { health: Some(_), .. })));
        assert_eq!(state, CommitState::Confirmed);
        assert_eq!(
            device.journal().calls(),
            vec![
                SessionCall::Lock,
                SessionCall::Load,
                SessionCall::Diff,
                SessionCall::Pdiff,
                SessionCall::CommitCheck,
                SessionCall::Commit(Some(1)),
                SessionCall::Cli(String::from("ping count 3 rapid 127.0.0.1")),
                SessionCall::Commit(None),
                SessionCall::Unlock,
            ]
        );
    }

    #[tokio::test]
    async fn test_failed_health_check_leaves_commit_unconfirmed() {
        let mut profile = profile(Some(NTP_DIFF));
        profile.cli_outputs.insert(
            String::from("ping count 3 rapid 127.0.0.1"),
            String::from("3 packets transmitted, 0 packets received, 100% packet loss"),
        );
        let device = SimulatedDevice::new(profile);
        let options = PushOptions {
            confirm_timeout: 5,
            ..PushOptions::default()
        };
        let (result, state) = push(&device, options).await;

        assert!(matches!(result, Err(CommitError::HealthCheckFailed { .. })));
        assert_eq!(state, CommitState::ConfirmPending);
        let journal = device.journal();
        assert_eq!(journal.count(&SessionCall::Commit(Some(5))), 1);
        assert_eq!(journal.count(&SessionCall::Commit(None)), 0);
        assert_eq!(journal.count(&SessionCall::Unlock), 1);
    }

    #[tokio::test]
    async fn test_health_check_cli_error_is_failure() {
        let device = SimulatedDevice::new(profile(Some(NTP_DIFF)).failing("cli", FailureKind::Error));
        let (result, _) = push(&device, PushOptions::default()).await;

        assert!(matches!(result, Err(CommitError::HealthCheckFailed { .. })));
        assert_eq!(device.journal().count(&SessionCall::Commit(None)), 0);
    }

    #[tokio::test]
    async fn test_disabled_health_check_confirms_directly() {
        let device = SimulatedDevice::new(profile(Some(NTP_DIFF)));
        let options = PushOptions {
            health_check: HealthCheck::Disabled,
            ..PushOptions::default()
        };
        let (result, _) = push(&device, options).await;

        assert!(matches!(result, Ok(PushOutcome::Committed { health: None, .. })));
        let journal = device.journal();
        assert!(!journal.calls().iter().any(|c| matches!(c, SessionCall::Cli(_))));
        assert_eq!(journal.count(&SessionCall::Commit(None)), 1);
    }

    #[tokio::test]
    async fn test_dry_run_rolls_back_without_commit() {
        let device = SimulatedDevice::new(profile(Some(NTP_DIFF)));
        let options = PushOptions {
            dry_run: true,
            ..PushOptions::default()
        };
        let (result, state) = push(&device, options).await;

        match result {
            Ok(PushOutcome::DryRun { diff }) => assert_eq!(diff, NTP_DIFF),
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(state, CommitState::RolledBack);
        let journal = device.journal();
        assert_eq!(journal.count(&SessionCall::Rollback), 1);
        assert_eq!(journal.count(&SessionCall::CommitCheck), 0);
        assert_eq!(journal.count(&SessionCall::Unlock), 1);
    }

    #[tokio::test]
    async fn test_lock_failure_loads_nothing() {
        let device = SimulatedDevice::new(profile(Some(NTP_DIFF)).failing("lock", FailureKind::Error));
        let (result, state) = push(&device, PushOptions::default()).await;

        assert!(matches!(result, Err(CommitError::LockFailed(_))));
        assert_eq!(state, CommitState::Idle);
        assert_eq!(device.journal().calls(), vec![SessionCall::Lock]);
    }

    #[tokio::test]
    async fn test_commit_check_failure_rolls_back_and_unlocks() {
        let device =
            SimulatedDevice::new(profile(Some(NTP_DIFF)).failing("commit_check", FailureKind::Error));
        let (result, state) = push(&device, PushOptions::default()).await;

        assert!(matches!(result, Err(CommitError::ValidationFailed(_))));
        assert_eq!(state, CommitState::RolledBack);
        let journal = device.journal();
        assert_eq!(journal.count(&SessionCall::Rollback), 1);
        assert_eq!(journal.count(&SessionCall::Unlock), 1);
        assert_eq!(journal.count(&SessionCall::Commit(Some(1))), 0);
    }

    #[tokio::test]
    async fn test_load_failure_still_unlocks_when_rollback_fails() {
        let device = SimulatedDevice::new(
            profile(Some(NTP_DIFF))
                .failing("load", FailureKind::Error)
                .failing("rollback", FailureKind::Error),
        );
        let (result, _) = push(&device, PushOptions::default()).await;

        assert!(matches!(result, Err(CommitError::LoadFailed(_))));
        assert_eq!(device.journal().count(&SessionCall::Unlock), 1);
    }
}
