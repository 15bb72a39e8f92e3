use crate::error::Result;
use crate::paths;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const UPSTREAM_REPO: &str = "https://github.com/kubezero/kubezero";
pub const FORK_REMOTE: &str = "fork";
pub const CLUSTER_NAME: &str = "kubezero";
pub const NAMESPACE: &str = "kubezero";

// ---------------------------------------------------------------------------
// PollSettings
// ---------------------------------------------------------------------------

/// Timing for one polling loop. The deadline is derived once from `timeout`
/// when the loop starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub warmup: Duration,
    pub interval: Duration,
    pub timeout: Duration,
}

// ---------------------------------------------------------------------------
// TimeoutConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutConfig {
    #[serde(default = "default_warmup")]
    pub control_plane_warmup_secs: u64,
    #[serde(default = "default_cp_interval")]
    pub control_plane_interval_secs: u64,
    #[serde(default = "default_cp_timeout")]
    pub control_plane_timeout_secs: u64,
    #[serde(default = "default_workload_interval")]
    pub workload_interval_secs: u64,
    #[serde(default = "default_workload_timeout")]
    pub workload_timeout_secs: u64,
}

fn default_warmup() -> u64 {
    10
}

fn default_cp_interval() -> u64 {
    5
}

fn default_cp_timeout() -> u64 {
    300
}

fn default_workload_interval() -> u64 {
    10
}

fn default_workload_timeout() -> u64 {
    600
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            control_plane_warmup_secs: default_warmup(),
            control_plane_interval_secs: default_cp_interval(),
            control_plane_timeout_secs: default_cp_timeout(),
            workload_interval_secs: default_workload_interval(),
            workload_timeout_secs: default_workload_timeout(),
        }
    }
}

impl TimeoutConfig {
    pub fn control_plane(&self) -> PollSettings {
        PollSettings {
            warmup: Duration::from_secs(self.control_plane_warmup_secs),
            interval: Duration::from_secs(self.control_plane_interval_secs.max(1)),
            timeout: Duration::from_secs(self.control_plane_timeout_secs),
        }
    }

    pub fn workloads(&self) -> PollSettings {
        PollSettings {
            warmup: Duration::ZERO,
            interval: Duration::from_secs(self.workload_interval_secs.max(1)),
            timeout: Duration::from_secs(self.workload_timeout_secs),
        }
    }
}

// ---------------------------------------------------------------------------
// GitopsConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitopsConfig {
    #[serde(default = "default_upstream_repo")]
    pub upstream_repo: String,
    #[serde(default = "default_fork_remote")]
    pub fork_remote: String,
    #[serde(default = "default_reference_manifests")]
    pub reference_manifests: Vec<PathBuf>,
}

fn default_upstream_repo() -> String {
    UPSTREAM_REPO.to_string()
}

fn default_fork_remote() -> String {
    FORK_REMOTE.to_string()
}

fn default_reference_manifests() -> Vec<PathBuf> {
    paths::REPO_REFERENCE_MANIFESTS
        .iter()
        .map(PathBuf::from)
        .collect()
}

impl Default for GitopsConfig {
    fn default() -> Self {
        Self {
            upstream_repo: default_upstream_repo(),
            fork_remote: default_fork_remote(),
            reference_manifests: default_reference_manifests(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Bootstrap settings, read from `.kubezero/config.yaml` when present.
/// Every field defaults to the stock KubeZero layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_packages_dir")]
    pub packages_dir: PathBuf,
    #[serde(default = "default_registry_dir")]
    pub registry_dir: PathBuf,
    #[serde(default = "default_cluster_config")]
    pub cluster_config: PathBuf,
    #[serde(default = "default_cluster_name")]
    pub cluster_name: String,
    #[serde(default = "default_namespace")]
    pub namespace: String,
    #[serde(default = "default_required_workloads")]
    pub required_workloads: Vec<String>,
    #[serde(default)]
    pub gitops: GitopsConfig,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
}

fn default_packages_dir() -> PathBuf {
    PathBuf::from(paths::PACKAGES_DIR)
}

fn default_registry_dir() -> PathBuf {
    PathBuf::from(paths::REGISTRY_DIR)
}

fn default_cluster_config() -> PathBuf {
    PathBuf::from(paths::CLUSTER_CONFIG)
}

fn default_cluster_name() -> String {
    CLUSTER_NAME.to_string()
}

fn default_namespace() -> String {
    NAMESPACE.to_string()
}

fn default_required_workloads() -> Vec<String> {
    vec![
        "argo-cd-server".to_string(),
        "argo-cd-app-controller".to_string(),
        "argo-cd-repo-server".to_string(),
    ]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            packages_dir: default_packages_dir(),
            registry_dir: default_registry_dir(),
            cluster_config: default_cluster_config(),
            cluster_name: default_cluster_name(),
            namespace: default_namespace(),
            required_workloads: default_required_workloads(),
            gitops: GitopsConfig::default(),
            timeouts: TimeoutConfig::default(),
        }
    }
}

impl Config {
    /// Load `.kubezero/config.yaml` under `root`, falling back to defaults
    /// when the file does not exist.
    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(&path)?;
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }
}
