//! Post-commit health checking.
//!
//! A health check runs one CLI command on the device after the
//! commit-confirmed step and decides from its output whether the device is
//! still healthy. The default probe pings the loopback address.

use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;
use std::time::Instant;
use tracing::{debug, warn};

use crate::device::DeviceSession;

/// Default probe command.
pub const DEFAULT_HEALTH_CHECK: &str = "ping count 3 rapid 127.0.0.1";

/// Output markers of a probe with total loss. `10 packets received` is not one.
static FAILURE_MARKERS: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\b(0 packets received|100% packet loss)").ok());

/// Result of one health probe.
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    /// Command that was run.
    pub command: String,
    /// Whether the device is considered healthy.
    pub healthy: bool,
    /// Probe duration in milliseconds.
    pub response_time_ms: u64,
    /// Error or failure description.
    pub error: Option<String>,
}

/// Probe selection for a config push.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthCheck {
    /// Skip the probe and confirm immediately.
    Disabled,
    /// Run this CLI command.
    Command(String),
}

impl Default for HealthCheck {
    fn default() -> Self {
        Self::Command(String::from(DEFAULT_HEALTH_CHECK))
    }
}

impl HealthCheck {
    /// Resolves the probe from command-line flags and the host setting.
    ///
    /// A host setting of `none` (or an empty string) disables the probe.
    #[must_use]
    pub fn resolve(disabled: bool, override_command: Option<&str>, host_setting: Option<&str>) -> Self {
        if disabled {
            return Self::Disabled;
        }
        match override_command.or(host_setting).map(str::trim) {
            None => Self::default(),
            Some(cmd) if cmd.is_empty() || cmd.eq_ignore_ascii_case("none") => Self::Disabled,
            Some(cmd) => Self::Command(cmd.to_string()),
        }
    }

    /// Runs the probe, `None` when disabled.
    pub async fn run(&self, session: &dyn DeviceSession) -> Option<HealthStatus> {
        match self {
            Self::Disabled => None,
            Self::Command(command) => Some(probe(session, command).await),
        }
    }
}

/// Returns the failure marker found in probe output, if any.
#[must_use]
pub fn failure_marker(output: &str) -> Option<&str> {
    FAILURE_MARKERS
        .as_ref()?
        .find(output)
        .map(|m| m.as_str())
}

async fn probe(session: &dyn DeviceSession, command: &str) -> HealthStatus {
    let start = Instant::now();
    let result = session.cli(command).await;
    let response_time_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

    match result {
        Ok(output) => {
            debug!("health check output: {output}");
            let marker = failure_marker(&output);
            if let Some(marker) = marker {
                warn!("health check failed: {marker}");
            }
            HealthStatus {
                command: command.to_string(),
                healthy: marker.is_none(),
                response_time_ms,
                error: marker.map(String::from),
            }
        }
        Err(e) => {
            warn!("health check command failed: {e}");
            HealthStatus {
                command: command.to_string(),
                healthy: false,
                response_time_ms,
                error: Some(e.to_string()),
            }
        }
    }
}
