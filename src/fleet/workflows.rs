//! Per-host workflows.
//!
//! A workflow opens one session, runs one operation and always closes the
//! session before turning the outcome into a [`HostResult`].

use chrono::NaiveDateTime;
use serde::Serialize;
use std::fmt::Write;
use std::sync::Arc;
use tracing::{error, info};

use crate::commit::{ConfigPush, DEFAULT_CONFIRM_TIMEOUT_MINUTES, HealthCheck, PushOptions, PushOutcome};
use crate::config::HostDescriptor;
use crate::device::{DeviceConnector, DeviceSession, DirectoryListing, list_directory};
use crate::error::{JunosOpsError, Result};
use crate::lifecycle::{InstallMode, Installer, LifecycleOptions, schedule_reboot};
use crate::package::PackageStager;
use crate::version::build_report;

use super::executor::HostResult;
use super::rsi::collect_support_information;

/// Settings of a `config` run shared by every host.
#[derive(Debug, Clone, Default)]
pub struct ConfigRequest {
    /// Set commands to load.
    pub commands: Vec<String>,
    /// Commit-confirm timeout override in minutes.
    pub confirm_timeout: Option<u32>,
    /// Skip the health check.
    pub no_health_check: bool,
    /// Health-check command override.
    pub health_check: Option<String>,
}

impl ConfigRequest {
    /// Resolves push options for one host. Command-line values win over the
    /// inventory.
    #[must_use]
    pub fn push_options(&self, host: &HostDescriptor, dry_run: bool) -> PushOptions {
        PushOptions {
            dry_run,
            confirm_timeout: self
                .confirm_timeout
                .or(host.confirm_timeout)
                .unwrap_or(DEFAULT_CONFIRM_TIMEOUT_MINUTES),
            health_check: HealthCheck::resolve(
                self.no_health_check,
                self.health_check.as_deref(),
                host.health_check.as_deref(),
            ),
        }
    }
}

/// What to do on each host.
#[derive(Debug, Clone)]
pub enum Operation {
    /// Print device facts.
    Facts,
    /// Copy, then install.
    Upgrade,
    /// Stage the package only.
    Copy,
    /// Install an already staged package.
    Install,
    /// Roll back the pending version.
    Rollback,
    /// Version report.
    Version,
    /// Schedule a reboot.
    Reboot {
        /// Requested reboot time.
        at: NaiveDateTime,
    },
    /// List the remote package directory.
    List {
        /// Long format.
        long: bool,
    },
    /// Collect SCF and RSI files.
    Rsi,
    /// Run a raw CLI command.
    Show {
        /// Command text.
        command: String,
    },
    /// Push set commands.
    Config(ConfigRequest),
}

/// Shared state of one fleet run.
pub struct WorkflowContext {
    connector: Arc<dyn DeviceConnector>,
    stager: PackageStager,
    options: LifecycleOptions,
    operation: Operation,
}

impl WorkflowContext {
    /// Creates a context for one operation.
    #[must_use]
    pub fn new(
        connector: Arc<dyn DeviceConnector>,
        stager: PackageStager,
        options: LifecycleOptions,
        operation: Operation,
    ) -> Self {
        Self {
            connector,
            stager,
            options,
            operation,
        }
    }

    /// Runs the operation against one host. Never fails; errors become a
    /// non-zero result code.
    pub async fn run_host(&self, host: &HostDescriptor) -> HostResult {
        match self.execute(host).await {
            Ok(result) => result,
            Err(e) => {
                error!("{}: {e}", host.name);
                HostResult::failed(&host.name, &e)
            }
        }
    }

    async fn execute(&self, host: &HostDescriptor) -> Result<HostResult> {
        let session = self.connector.open(host).await?;
        let result = self.dispatch(host, session.as_ref()).await;
        session.close().await;
        result
    }

    async fn dispatch(&self, host: &HostDescriptor, session: &dyn DeviceSession) -> Result<HostResult> {
        let installer = Installer::new(host, session, &self.stager, self.options);
        let name = host.name.as_str();

        match &self.operation {
            Operation::Facts => {
                let facts = session.facts();
                let body = format!(
                    "hostname: {}\nmodel: {}\npersonality: {}\nversion: {}\n",
                    facts.hostname,
                    facts.model,
                    facts.personality,
                    facts.version.as_deref().unwrap_or("unknown")
                );
                Ok(HostResult::ok(name, "ok")
                    .with_detail(to_detail(facts)?)
                    .with_body(body))
            }
            Operation::Upgrade => lifecycle(name, installer.install(InstallMode::Upgrade).await),
            Operation::Copy => lifecycle(name, installer.copy().await),
            Operation::Install => lifecycle(name, installer.install(InstallMode::Install).await),
            Operation::Rollback => lifecycle(name, installer.rollback_pending().await),
            Operation::Version => {
                let report = build_report(host, session, &self.stager).await;
                Ok(HostResult::ok(name, "ok")
                    .with_body(report.to_string())
                    .with_detail(to_detail(&report)?))
            }
            Operation::Reboot { at } => {
                let outcome = schedule_reboot(&installer, at).await?;
                Ok(HostResult::ok(name, outcome.message.clone()).with_detail(to_detail(&outcome)?))
            }
            Operation::List { long } => {
                let listing = list_directory(session, &host.remote_path, *long).await?;
                Ok(HostResult::ok(name, format!("{} files", listing.file_count()))
                    .with_body(render_listing(&listing, *long))
                    .with_detail(to_detail(&listing)?))
            }
            Operation::Rsi => {
                let outcome = collect_support_information(host, session).await?;
                Ok(HostResult::ok(name, format!("{} written", outcome.rsi_path.display()))
                    .with_detail(to_detail(&outcome)?))
            }
            Operation::Show { command } => {
                let output = session.cli(command).await?;
                Ok(HostResult::ok(name, "ok").with_body(output))
            }
            Operation::Config(request) => {
                let mut push = ConfigPush::new(session, request.push_options(host, self.options.dry_run));
                let outcome = push.run(&request.commands).await?;
                info!("{name}: config push finished in state {:?}", push.state());
                let (status, body) = match &outcome {
                    PushOutcome::NoChanges => (String::from("no changes"), None),
                    PushOutcome::DryRun { diff } => (String::from("dry-run, rolled back"), Some(diff.clone())),
                    PushOutcome::Committed { diff, .. } => (String::from("committed"), Some(diff.clone())),
                };
                let result = HostResult::ok(name, status).with_detail(to_detail(&outcome)?);
                Ok(match body {
                    Some(diff) => result.with_body(diff),
                    None => result,
                })
            }
        }
    }
}

fn lifecycle(name: &str, outcome: Result<crate::lifecycle::LifecycleOutcome>) -> Result<HostResult> {
    let outcome = outcome?;
    Ok(HostResult::ok(name, outcome.to_string()).with_detail(to_detail(&outcome)?))
}

fn to_detail<T: Serialize>(value: &T) -> Result<serde_json::Value> {
    serde_json::to_value(value).map_err(|e| JunosOpsError::internal(e.to_string()))
}

/// Renders a directory listing in `ls` or `ls -l` form.
#[must_use]
pub fn render_listing(listing: &DirectoryListing, long: bool) -> String {
    let mut out = String::new();
    for file in &listing.files {
        let suffix = if file.is_dir { "/" } else { "" };
        if long {
            let _ = writeln!(
                out,
                "{} {} {:>12} {} {}{suffix}",
                file.permissions, file.owner, file.size, file.date, file.path
            );
        } else {
            let _ = writeln!(out, "{}{suffix}", file.path);
        }
    }
    if long {
        let _ = writeln!(out, "total files: {}", listing.file_count());
    }
    out
}
