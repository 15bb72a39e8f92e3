use crate::output::{print_json, print_table};
use anyhow::Context;
use kubezero_core::cluster::{ControlPlane, KubeControlPlane, NodeInfo};
use kubezero_core::config::Config;
use kubezero_core::provisioner::{ClusterTool, K3d};
use kubezero_core::readiness::{self, TargetStatus};
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
struct StatusOutput<'a> {
    cluster: &'a str,
    namespace: &'a str,
    nodes: Vec<NodeInfo>,
    pods_total: usize,
    pods_running: usize,
    workloads: Vec<TargetStatus>,
}

pub fn run(root: &Path, json: bool) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load .kubezero/config.yaml")?;
    if !K3d::new().exists(&config.cluster_name) {
        anyhow::bail!("no KubeZero cluster '{}' found", config.cluster_name);
    }

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    let control_plane = KubeControlPlane::new();
    let (nodes, pods) = rt.block_on(async {
        let nodes = control_plane
            .list_nodes()
            .await
            .context("failed to connect to cluster")?;
        let pods = match control_plane.list_pods(&config.namespace).await {
            Ok(pods) => pods,
            Err(e) => {
                tracing::warn!(namespace = %config.namespace, error = %e, "could not list pods");
                Vec::new()
            }
        };
        anyhow::Ok((nodes, pods))
    })?;

    let workloads = readiness::evaluate(&pods, &config.required_workloads);
    let output = StatusOutput {
        cluster: &config.cluster_name,
        namespace: &config.namespace,
        pods_total: pods.len(),
        pods_running: pods.iter().filter(|p| p.is_ready()).count(),
        nodes,
        workloads,
    };

    if json {
        return print_json(&output);
    }

    println!("Cluster: {}", output.cluster);
    println!();
    print_table(
        &["NODE", "READY"],
        output
            .nodes
            .iter()
            .map(|n| vec![n.name.clone(), yes_no(n.ready)])
            .collect(),
    );
    println!();
    print_table(
        &["WORKLOAD", "POD", "READY"],
        output
            .workloads
            .iter()
            .map(|w| {
                vec![
                    w.prefix.clone(),
                    w.pod.clone().unwrap_or_else(|| "-".to_string()),
                    yes_no(w.ready),
                ]
            })
            .collect(),
    );
    println!();
    println!(
        "{}/{} pods ready in namespace '{}'",
        output.pods_running, output.pods_total, output.namespace
    );
    Ok(())
}

fn yes_no(value: bool) -> String {
    let s = if value { "yes" } else { "no" };
    s.to_string()
}
