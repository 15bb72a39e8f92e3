use crate::prompt;
use anyhow::Context;
use kubezero_core::config::Config;
use kubezero_core::provisioner::{ClusterTool, K3d};
use std::path::Path;

pub fn run(root: &Path, force: bool) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load .kubezero/config.yaml")?;
    let name = &config.cluster_name;
    let tool = K3d::new();

    if !tool.exists(name) {
        println!("No cluster named '{name}' found");
        return Ok(());
    }

    if !force && !prompt::confirm(&format!("Delete cluster '{name}'? This cannot be undone"))? {
        println!("Cancelled");
        return Ok(());
    }

    tool.delete(name)
        .with_context(|| format!("failed to delete cluster '{name}'"))?;
    println!("Deleted cluster '{name}'");
    Ok(())
}
