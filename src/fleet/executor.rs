//! Bounded per-host worker pool.
//!
//! Each host runs as its own task on a [`JoinSet`], gated by a semaphore
//! sized to the worker count. A failure or panic on one host never stops
//! the others, and results come back in submission order.

use serde::Serialize;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{Instrument, debug, error, info_span};

use crate::config::HostDescriptor;
use crate::error::{EXIT_FAILURE, JunosOpsError};

/// Outcome of one host's workflow.
#[derive(Debug, Clone, Serialize)]
pub struct HostResult {
    /// Inventory host name.
    pub host: String,
    /// Per-host result code, 0 on success.
    pub code: i32,
    /// One-line status.
    pub status: String,
    /// Structured result for JSON output.
    #[serde(skip_serializing_if = "serde_json::Value::is_null")]
    pub detail: serde_json::Value,
    /// Text shown under the host header.
    #[serde(skip)]
    pub body: Option<String>,
}

impl HostResult {
    /// Creates a successful result.
    #[must_use]
    pub fn ok(host: &str, status: impl Into<String>) -> Self {
        Self {
            host: host.to_string(),
            code: 0,
            status: status.into(),
            detail: serde_json::Value::Null,
            body: None,
        }
    }

    /// Creates a failed result from an error.
    #[must_use]
    pub fn failed(host: &str, error: &JunosOpsError) -> Self {
        Self {
            host: host.to_string(),
            code: error.exit_code(),
            status: error.to_string(),
            detail: serde_json::Value::Null,
            body: None,
        }
    }

    /// Attaches structured detail.
    #[must_use]
    pub fn with_detail(mut self, detail: serde_json::Value) -> Self {
        self.detail = detail;
        self
    }

    /// Attaches a text body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Returns true when the workflow succeeded.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.code == 0
    }
}

/// Results of a fleet run, in submission order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FleetReport {
    /// One entry per targeted host.
    pub results: Vec<HostResult>,
}

impl FleetReport {
    /// Returns the first non-zero result code, or 0.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        self.results
            .iter()
            .map(|r| r.code)
            .find(|code| *code != 0)
            .unwrap_or(0)
    }

    /// Number of hosts processed.
    #[must_use]
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Returns true when no host was processed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Number of hosts that failed.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.results.iter().filter(|r| !r.is_success()).count()
    }
}

/// Runs one workflow per host with at most `workers` in flight.
#[derive(Debug, Clone, Copy)]
pub struct FleetExecutor {
    workers: usize,
}

impl FleetExecutor {
    /// Creates an executor; a worker count of 0 is treated as 1.
    #[must_use]
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
        }
    }

    /// Runs `task` once per host and waits for every host to finish.
    pub async fn run<F, Fut>(&self, hosts: Vec<HostDescriptor>, task: F) -> FleetReport
    where
        F: Fn(HostDescriptor) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HostResult> + Send + 'static,
    {
        debug!("running {} hosts on {} workers", hosts.len(), self.workers);
        let semaphore = Arc::new(Semaphore::new(self.workers));
        let task = Arc::new(task);
        let names: Vec<String> = hosts.iter().map(|h| h.name.clone()).collect();

        let mut set = JoinSet::new();
        let mut positions = HashMap::new();
        for (index, host) in hosts.into_iter().enumerate() {
            let semaphore = Arc::clone(&semaphore);
            let task = Arc::clone(&task);
            let span = info_span!("host", name = %host.name);
            let handle = set.spawn(
                async move {
                    let Ok(_permit) = semaphore.acquire_owned().await else {
                        let closed = JunosOpsError::internal("worker pool closed");
                        return (index, HostResult::failed(&host.name, &closed));
                    };
                    (index, (*task)(host).await)
                }
                .instrument(span),
            );
            positions.insert(handle.id(), index);
        }

        let mut slots: Vec<Option<HostResult>> = vec![None; names.len()];
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((index, result)) => slots[index] = Some(result),
                Err(e) => {
                    let name = positions
                        .get(&e.id())
                        .and_then(|index| names.get(*index))
                        .map_or("unknown", String::as_str);
                    error!("{name}: worker task failed: {e}");
                }
            }
        }

        let results = slots
            .into_iter()
            .zip(&names)
            .map(|(slot, name)| {
                slot.unwrap_or_else(|| HostResult {
                    host: name.clone(),
                    code: EXIT_FAILURE,
                    status: String::from("worker task failed"),
                    detail: serde_json::Value::Null,
                    body: None,
                })
            })
            .collect();
        FleetReport { results }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InventoryParser;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn hosts(names: &[&str]) -> Vec<HostDescriptor> {
        let yaml = names
            .iter()
            .fold(String::from("hosts:\n"), |acc, n| acc + &format!("  - name: {n}\n"));
        InventoryParser::new()
            .parse_yaml(&yaml, None)
            .expect("inventory")
            .resolve()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_one_failure_does_not_stop_others() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let report = FleetExecutor::new(2)
            .run(hosts(&["rt1", "rt2", "rt3"]), move |host| {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    if host.name == "rt2" {
                        HostResult::failed(&host.name, &JunosOpsError::internal("injected"))
                    } else {
                        HostResult::ok(&host.name, "ok")
                    }
                }
            })
            .await;

        assert_eq!(report.len(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        let names: Vec<&str> = report.results.iter().map(|r| r.host.as_str()).collect();
        assert_eq!(names, vec!["rt1", "rt2", "rt3"]);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.exit_code(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_worker_bound_and_submission_order() {
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let (a, p) = (Arc::clone(&active), Arc::clone(&peak));
        let report = FleetExecutor::new(2)
            .run(hosts(&["h1", "h2", "h3", "h4", "h5"]), move |host| {
                let (active, peak) = (Arc::clone(&a), Arc::clone(&p));
                async move {
                    let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    // Earlier hosts finish last.
                    let delay = match host.name.as_str() {
                        "h1" => 40,
                        "h2" => 30,
                        _ => 5,
                    };
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                    active.fetch_sub(1, Ordering::SeqCst);
                    HostResult::ok(&host.name, "ok")
                }
            })
            .await;

        assert!(peak.load(Ordering::SeqCst) <= 2);
        let names: Vec<&str> = report.results.iter().map(|r| r.host.as_str()).collect();
        assert_eq!(names, vec!["h1", "h2", "h3", "h4", "h5"]);
        assert_eq!(report.exit_code(), 0);
    }

    #[tokio::test]
    async fn test_panicking_host_records_failure() {
        let report = FleetExecutor::new(1)
            .run(hosts(&["ok1", "boom", "ok2"]), |host| async move {
                assert_ne!(host.name, "boom", "simulated worker panic");
                HostResult::ok(&host.name, "ok")
            })
            .await;

        assert_eq!(report.len(), 3);
        assert_eq!(report.results[1].host, "boom");
        assert_eq!(report.results[1].code, 1);
        assert!(report.results[2].is_success());
    }

    #[test]
    fn test_exit_code_is_first_non_zero() {
        let mut report = FleetReport::default();
        assert_eq!(report.exit_code(), 0);
        report.results.push(HostResult::ok("a", "ok"));
        report.results.push(HostResult {
            code: 5,
            ..HostResult::ok("b", "reboot failed")
        });
        report.results.push(HostResult {
            code: 3,
            ..HostResult::ok("c", "clear failed")
        });
        assert_eq!(report.exit_code(), 5);
    }
}
