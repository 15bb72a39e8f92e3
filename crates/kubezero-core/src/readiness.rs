//! Polls a namespace until every required workload reports ready.
//!
//! Each required entry is a pod-name prefix. Every tick takes a fresh pod
//! snapshot; for each prefix the first matching pod in the snapshot decides
//! whether that prefix is ready. Nothing carries over between ticks.

use crate::cluster::{ControlPlane, PodInfo};
use crate::config::PollSettings;
use serde::Serialize;
use tokio::time::{interval_at, sleep_until, Instant};

/// Exact, case-sensitive prefix match.
pub fn matches(pod_name: &str, prefix: &str) -> bool {
    pod_name.starts_with(prefix)
}

/// Terminal and non-terminal monitor states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MonitorState {
    Waiting,
    AllReady,
    TimedOut,
}

/// Readiness of one required prefix in a single snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetStatus {
    pub prefix: String,
    /// Name of the first pod matching the prefix, if any.
    pub pod: Option<String>,
    pub ready: bool,
}

/// Evaluate every required prefix against one pod snapshot.
pub fn evaluate(pods: &[PodInfo], required: &[String]) -> Vec<TargetStatus> {
    required
        .iter()
        .map(|prefix| {
            let first = pods.iter().find(|p| matches(&p.name, prefix));
            TargetStatus {
                prefix: prefix.clone(),
                pod: first.map(|p| p.name.clone()),
                ready: first.is_some_and(PodInfo::is_ready),
            }
        })
        .collect()
}

/// Loop-private polling state; dropped when the monitor returns.
#[derive(Debug)]
pub struct PollState {
    pub state: MonitorState,
    pub attempts: u32,
    pub targets: Vec<TargetStatus>,
    pub deadline: Instant,
}

impl PollState {
    fn pending(&self) -> Vec<String> {
        self.targets
            .iter()
            .filter(|t| !t.ready)
            .map(|t| t.prefix.clone())
            .collect()
    }

    fn all_ready(&self) -> bool {
        !self.targets.is_empty() && self.targets.iter().all(|t| t.ready)
    }
}

/// How the monitor finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorOutcome {
    pub state: MonitorState,
    pub attempts: u32,
    /// Prefixes not ready in the last snapshot.
    pub pending: Vec<String>,
}

pub struct WorkloadMonitor<'a, C> {
    client: &'a C,
    namespace: &'a str,
    required: &'a [String],
}

impl<'a, C: ControlPlane> WorkloadMonitor<'a, C> {
    pub fn new(client: &'a C, namespace: &'a str, required: &'a [String]) -> Self {
        Self {
            client,
            namespace,
            required,
        }
    }

    /// Take one snapshot and evaluate it. Query failures read as "nothing
    /// ready yet".
    pub async fn snapshot(&self) -> Vec<TargetStatus> {
        match self.client.list_pods(self.namespace).await {
            Ok(pods) => evaluate(&pods, self.required),
            Err(e) => {
                tracing::info!(namespace = self.namespace, error = %e, "waiting for namespace");
                evaluate(&[], self.required)
            }
        }
    }

    /// Poll until every prefix is ready or the deadline passes. An empty
    /// requirement list is ready immediately.
    pub async fn run(&self, settings: PollSettings) -> MonitorOutcome {
        if self.required.is_empty() {
            return MonitorOutcome {
                state: MonitorState::AllReady,
                attempts: 0,
                pending: Vec::new(),
            };
        }

        let start = Instant::now();
        let mut state = PollState {
            state: MonitorState::Waiting,
            attempts: 0,
            targets: evaluate(&[], self.required),
            deadline: start + settings.timeout,
        };
        let mut ticker = interval_at(start + settings.interval, settings.interval);

        loop {
            tokio::select! {
                biased;
                _ = sleep_until(state.deadline) => {
                    state.state = MonitorState::TimedOut;
                    let pending = state.pending();
                    tracing::warn!(pending = ?pending, "timed out waiting for workloads");
                    return MonitorOutcome {
                        state: state.state,
                        attempts: state.attempts,
                        pending,
                    };
                }
                _ = ticker.tick() => {
                    state.attempts += 1;
                    state.targets = self.snapshot().await;
                    log_targets(&state.targets);
                    if state.all_ready() {
                        state.state = MonitorState::AllReady;
                        tracing::info!(attempts = state.attempts, "all required workloads are ready");
                        return MonitorOutcome {
                            state: state.state,
                            attempts: state.attempts,
                            pending: Vec::new(),
                        };
                    }
                }
            }
        }
    }
}

fn log_targets(targets: &[TargetStatus]) {
    for t in targets {
        match (&t.pod, t.ready) {
            (Some(pod), true) => tracing::info!(%pod, "ready"),
            (Some(pod), false) => tracing::info!(%pod, "not ready yet"),
            (None, _) => tracing::debug!(prefix = %t.prefix, "no matching pod"),
        }
    }
}
