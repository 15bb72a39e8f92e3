use crate::cluster::ControlPlane;
use crate::config::PollSettings;
use crate::error::{KubezeroError, Result};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tokio::time::{interval_at, sleep, sleep_until, Instant};

// ---------------------------------------------------------------------------
// ClusterTool
// ---------------------------------------------------------------------------

/// External tool that creates and removes local clusters.
pub trait ClusterTool {
    /// Check that the tool is installed and `config` exists.
    fn check_prerequisites(&self, config: &Path) -> Result<()>;
    /// Create a cluster. Not idempotent; callers never retry.
    fn create(&self, config: &Path) -> Result<()>;
    fn exists(&self, name: &str) -> bool;
    fn delete(&self, name: &str) -> Result<()>;
}

/// `k3d`, invoked synchronously with the terminal's stdout/stderr.
#[derive(Debug, Clone)]
pub struct K3d {
    binary: String,
}

impl Default for K3d {
    fn default() -> Self {
        Self {
            binary: "k3d".to_string(),
        }
    }
}

impl K3d {
    pub fn new() -> Self {
        Self::default()
    }

    fn locate(&self) -> Result<PathBuf> {
        which::which(&self.binary).map_err(|_| KubezeroError::ToolNotFound(self.binary.clone()))
    }

    fn run_inherited(&self, args: &[&str]) -> Result<()> {
        let bin = self.locate()?;
        tracing::debug!(command = ?args, "running {}", self.binary);
        let status = Command::new(bin)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .map_err(|e| KubezeroError::ClusterToolFailed(e.to_string()))?;
        if !status.success() {
            return Err(KubezeroError::ClusterToolFailed(format!(
                "{} {} exited with {status}",
                self.binary,
                args.join(" ")
            )));
        }
        Ok(())
    }
}

impl ClusterTool for K3d {
    fn check_prerequisites(&self, config: &Path) -> Result<()> {
        self.locate()?;
        if !config.is_file() {
            return Err(KubezeroError::ClusterConfigMissing(config.to_path_buf()));
        }
        Ok(())
    }

    fn create(&self, config: &Path) -> Result<()> {
        let config = config.to_string_lossy();
        self.run_inherited(&["cluster", "create", "--config", &config])
    }

    fn exists(&self, name: &str) -> bool {
        let Ok(bin) = self.locate() else {
            return false;
        };
        Command::new(bin)
            .args(["cluster", "list", name])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .is_ok_and(|s| s.success())
    }

    fn delete(&self, name: &str) -> Result<()> {
        self.run_inherited(&["cluster", "delete", name])
    }
}

// ---------------------------------------------------------------------------
// Control plane readiness
// ---------------------------------------------------------------------------

/// Wait until the control plane lists at least one node.
///
/// Sleeps for `settings.warmup`, then polls every `settings.interval`. Query
/// failures count as "not yet ready". The deadline is fixed when polling
/// starts; reaching it is an error. Returns the node count.
pub async fn await_control_plane<C: ControlPlane>(
    client: &C,
    settings: PollSettings,
) -> Result<usize> {
    sleep(settings.warmup).await;

    let start = Instant::now();
    let deadline = start + settings.timeout;
    let mut ticker = interval_at(start + settings.interval, settings.interval);
    let mut attempts: u32 = 0;

    loop {
        tokio::select! {
            biased;
            _ = sleep_until(deadline) => {
                return Err(KubezeroError::ControlPlaneTimeout(settings.timeout));
            }
            _ = ticker.tick() => {
                attempts += 1;
                match client.list_nodes().await {
                    Ok(nodes) if !nodes.is_empty() => {
                        tracing::info!(nodes = nodes.len(), attempts, "cluster API is ready");
                        return Ok(nodes.len());
                    }
                    Ok(_) => tracing::info!(attempts, "waiting for cluster API (no nodes yet)"),
                    Err(e) => tracing::info!(attempts, error = %e, "waiting for cluster API"),
                }
            }
        }
    }
}
