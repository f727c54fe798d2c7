//! Support information (RSI) and set-format configuration (SCF) collection.

use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use tokio::fs;
use tracing::{debug, info};

use crate::config::HostDescriptor;
use crate::device::{DeviceFacts, DeviceSession, Personality, Rpc};
use crate::error::{LifecycleError, Result};

/// Default worker count for the `rsi` command.
pub const DEFAULT_RSI_WORKERS: usize = 20;

/// Files written for one host.
#[derive(Debug, Clone, Serialize)]
pub struct RsiOutcome {
    /// Configuration file.
    pub scf_path: PathBuf,
    /// Support information file.
    pub rsi_path: PathBuf,
    /// Timeout used for the support information RPC.
    pub timeout_secs: u64,
}

/// Returns how long `request support information` may take on a device.
#[must_use]
pub fn rsi_timeout(facts: &DeviceFacts) -> Duration {
    let secs = if facts.personality == Personality::SecurityBranch || facts.model == "EX2300-24T" {
        1200
    } else if facts.is_virtual_chassis() {
        if facts.model == "QFX5110-48S-4C" { 2400 } else { 1800 }
    } else {
        600
    };
    Duration::from_secs(secs)
}

/// Writes `<rsi_dir><host>.SCF` and `<rsi_dir><host>.RSI`, trimmed of
/// surrounding whitespace.
///
/// # Errors
///
/// Returns an RPC or IO error when the configuration cannot be saved and
/// `SupportInfoFailed` when the support information cannot be collected.
pub async fn collect_support_information(
    host: &HostDescriptor,
    session: &dyn DeviceSession,
) -> Result<RsiOutcome> {
    let prefix = host.rsi_prefix();

    let command = host.scf_command();
    debug!("{command}");
    let scf = session.cli(&command).await?;
    let scf_path = PathBuf::from(format!("{prefix}{}.SCF", host.name));
    fs::write(&scf_path, scf.trim()).await?;
    info!("{} written", scf_path.display());

    let facts = session.facts();
    let timeout = rsi_timeout(facts);
    let request = Rpc::GetSupportInformation {
        node: facts.srx_cluster.then(|| String::from("primary")),
    };
    debug!("{} timeout {}s", request.name(), timeout.as_secs());
    let rsi = session
        .rpc(&request, timeout)
        .await
        .and_then(|reply| reply.into_text(request.name()))
        .map_err(LifecycleError::SupportInfoFailed)?;
    let rsi_path = PathBuf::from(format!("{prefix}{}.RSI", host.name));
    fs::write(&rsi_path, rsi.trim()).await?;
    info!("{} written", rsi_path.display());

    Ok(RsiOutcome {
        scf_path,
        rsi_path,
        timeout_secs: timeout.as_secs(),
    })
}
