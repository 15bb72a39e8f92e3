//! Read-only view of the cluster control plane.
//!
//! Pipeline code depends on [`ControlPlane`]; [`KubeControlPlane`] is the
//! `kube`-backed implementation that talks to the cluster described by the
//! ambient kubeconfig.

use crate::error::{KubezeroError, Result};
use k8s_openapi::api::core::v1::{Node, Pod};
use kube::api::{Api, ListParams};
use kube::Client;
use serde::Serialize;
use std::fmt;
use tokio::sync::OnceCell;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeInfo {
    pub name: String,
    pub ready: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PodPhase {
    Pending,
    Running,
    Succeeded,
    Failed,
    Unknown,
}

impl PodPhase {
    pub fn parse(phase: Option<&str>) -> Self {
        match phase {
            Some("Pending") => PodPhase::Pending,
            Some("Running") => PodPhase::Running,
            Some("Succeeded") => PodPhase::Succeeded,
            Some("Failed") => PodPhase::Failed,
            _ => PodPhase::Unknown,
        }
    }
}

impl fmt::Display for PodPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PodPhase::Pending => "Pending",
            PodPhase::Running => "Running",
            PodPhase::Succeeded => "Succeeded",
            PodPhase::Failed => "Failed",
            PodPhase::Unknown => "Unknown",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PodCondition {
    pub kind: String,
    pub status: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PodInfo {
    pub name: String,
    pub phase: PodPhase,
    pub conditions: Vec<PodCondition>,
}

impl PodInfo {
    /// Running and carrying a `Ready` condition whose status is true.
    pub fn is_ready(&self) -> bool {
        self.phase == PodPhase::Running
            && self
                .conditions
                .iter()
                .find(|c| c.kind == "Ready")
                .is_some_and(|c| c.status)
    }
}

// ---------------------------------------------------------------------------
// ControlPlane
// ---------------------------------------------------------------------------

#[allow(async_fn_in_trait)]
pub trait ControlPlane {
    async fn list_nodes(&self) -> Result<Vec<NodeInfo>>;
    async fn list_pods(&self, namespace: &str) -> Result<Vec<PodInfo>>;
}

/// Control plane reached through `kube`. The client is built on first use so
/// that a kubeconfig written by cluster creation is picked up.
#[derive(Default)]
pub struct KubeControlPlane {
    client: OnceCell<Client>,
}

impl KubeControlPlane {
    pub fn new() -> Self {
        Self::default()
    }

    async fn client(&self) -> Result<Client> {
        let client = self
            .client
            .get_or_try_init(|| async {
                Client::try_default()
                    .await
                    .map_err(|e| KubezeroError::Kube(e.to_string()))
            })
            .await?;
        Ok(client.clone())
    }
}

impl ControlPlane for KubeControlPlane {
    async fn list_nodes(&self) -> Result<Vec<NodeInfo>> {
        let api: Api<Node> = Api::all(self.client().await?);
        let nodes = api
            .list(&ListParams::default())
            .await
            .map_err(|e| KubezeroError::Kube(e.to_string()))?;
        Ok(nodes.items.iter().map(node_info).collect())
    }

    async fn list_pods(&self, namespace: &str) -> Result<Vec<PodInfo>> {
        let api: Api<Pod> = Api::namespaced(self.client().await?, namespace);
        let pods = api
            .list(&ListParams::default())
            .await
            .map_err(|e| KubezeroError::Kube(e.to_string()))?;
        Ok(pods.items.iter().map(pod_info).collect())
    }
}

fn node_info(node: &Node) -> NodeInfo {
    let ready = node
        .status
        .as_ref()
        .and_then(|s| s.conditions.as_ref())
        .is_some_and(|conds| {
            conds
                .iter()
                .any(|c| c.type_ == "Ready" && c.status == "True")
        });
    NodeInfo {
        name: node.metadata.name.clone().unwrap_or_default(),
        ready,
    }
}

fn pod_info(pod: &Pod) -> PodInfo {
    let status = pod.status.as_ref();
    let conditions = status
        .and_then(|s| s.conditions.as_ref())
        .map(|conds| {
            conds
                .iter()
                .map(|c| PodCondition {
                    kind: c.type_.clone(),
                    status: c.status == "True",
                })
                .collect()
        })
        .unwrap_or_default();
    PodInfo {
        name: pod.metadata.name.clone().unwrap_or_default(),
        phase: PodPhase::parse(status.and_then(|s| s.phase.as_deref())),
        conditions,
    }
}
