//! Runs the bootstrap pipeline end to end.
//!
//! Stages run strictly in order and never overlap. A fatal error is tagged
//! with the stage it came from; soft failures are collected as warnings on
//! the final report.

use crate::catalog::{self, Provider};
use crate::cluster::ControlPlane;
use crate::config::Config;
use crate::error::{KubezeroError, Result, Stage, StageExt};
use crate::fork_sync::{ForkReport, ForkSync, ForkTarget};
use crate::git::Git;
use crate::paths;
use crate::provisioner::{await_control_plane, ClusterTool};
use crate::readiness::{MonitorState, WorkloadMonitor};
use crate::templater::{ConfigTemplater, Package};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;

// ---------------------------------------------------------------------------
// Request / report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapRequest {
    pub provider: Provider,
    pub region: String,
    pub local_mode: bool,
    pub fork_owner: Option<String>,
}

impl BootstrapRequest {
    /// Build a request from user input. Unknown providers and regions are
    /// selection failures.
    pub fn validate(provider: &str, region: &str) -> Result<Self> {
        let provider = catalog::validate(provider, region).stage(Stage::Selection)?;
        Ok(Self {
            provider,
            region: region.to_string(),
            local_mode: false,
            fork_owner: None,
        })
    }

    /// Enable local mode, publishing to `owner`'s fork.
    pub fn with_local_mode(mut self, owner: Option<String>) -> Self {
        self.local_mode = true;
        self.fork_owner = owner;
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BootstrapReport {
    pub provider: Provider,
    pub region: String,
    pub packages: Vec<Package>,
    pub fork: Option<ForkReport>,
    pub nodes: usize,
    pub warnings: Vec<String>,
    pub completed_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Bootstrapper
// ---------------------------------------------------------------------------

pub struct Bootstrapper<T, P, G> {
    root: PathBuf,
    config: Config,
    tool: T,
    control_plane: P,
    git: G,
}

impl<T, P, G> Bootstrapper<T, P, G>
where
    T: ClusterTool,
    P: ControlPlane,
    G: Git,
{
    pub fn new(
        root: impl Into<PathBuf>,
        config: Config,
        tool: T,
        control_plane: P,
        git: G,
    ) -> Self {
        Self {
            root: root.into(),
            config,
            tool,
            control_plane,
            git,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub async fn run(&self, request: &BootstrapRequest) -> Result<BootstrapReport> {
        let provider = catalog::validate(request.provider.as_str(), &request.region)
            .stage(Stage::Selection)?;
        let profile = catalog::profile(provider);
        tracing::info!(provider = %profile.name, region = %request.region, "starting bootstrap");

        let mut warnings = Vec::new();

        let packages_dir = paths::resolve(&self.root, &self.config.packages_dir);
        let registry_dir = paths::resolve(&self.root, &self.config.registry_dir);
        let prepared = ConfigTemplater::new(&packages_dir, &registry_dir)
            .prepare(provider, &request.region)
            .stage(Stage::PackagePreparation)?;
        warnings.extend(prepared.warnings);

        let fork = if request.local_mode {
            let (report, fork_warnings) = self.sync_fork(request).stage(Stage::LocalMode)?;
            warnings.extend(fork_warnings);
            Some(report)
        } else {
            None
        };

        let cluster_config = paths::resolve(&self.root, &self.config.cluster_config);
        self.tool
            .check_prerequisites(&cluster_config)
            .stage(Stage::Prerequisites)?;

        tracing::info!(config = %cluster_config.display(), "creating cluster");
        self.tool
            .create(&cluster_config)
            .stage(Stage::ClusterCreation)?;

        tracing::info!("waiting for cluster API");
        let nodes = await_control_plane(&self.control_plane, self.config.timeouts.control_plane())
            .await
            .stage(Stage::ClusterReadiness)?;

        self.await_workloads()
            .await
            .stage(Stage::WorkloadReadiness)?;

        tracing::info!("bootstrap complete");
        Ok(BootstrapReport {
            provider,
            region: request.region.clone(),
            packages: prepared.packages,
            fork,
            nodes,
            warnings,
            completed_at: Utc::now(),
        })
    }

    fn sync_fork(&self, request: &BootstrapRequest) -> Result<(ForkReport, Vec<String>)> {
        let owner = request
            .fork_owner
            .as_deref()
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .ok_or(KubezeroError::MissingForkOwner)?;
        let target = ForkTarget::new(owner);
        tracing::info!(owner, "configuring local mode");
        ForkSync::new(&self.git, &self.root, &self.config).run(&target)
    }

    async fn await_workloads(&self) -> Result<()> {
        let namespace = &self.config.namespace;
        tracing::info!(%namespace, "waiting for workloads");
        let outcome = WorkloadMonitor::new(
            &self.control_plane,
            namespace,
            &self.config.required_workloads,
        )
        .run(self.config.timeouts.workloads())
        .await;
        match outcome.state {
            MonitorState::AllReady => Ok(()),
            _ => Err(KubezeroError::WorkloadTimeout {
                namespace: namespace.clone(),
                pending: outcome.pending,
            }),
        }
    }
}
