use crate::output::print_json;
use crate::prompt;
use anyhow::Context;
use kubezero_core::catalog::{self, Provider};
use kubezero_core::cluster::KubeControlPlane;
use kubezero_core::config::Config;
use kubezero_core::error::Stage;
use kubezero_core::fork_sync;
use kubezero_core::git::GitCommand;
use kubezero_core::orchestrator::{BootstrapReport, BootstrapRequest, Bootstrapper};
use kubezero_core::provisioner::K3d;
use std::path::{Path, PathBuf};

pub struct Options {
    pub cloud: Option<String>,
    pub region: Option<String>,
    pub local: bool,
    pub fork_owner: Option<String>,
    pub config: Option<PathBuf>,
    pub no_open: bool,
}

pub fn run(root: &Path, opts: Options, json: bool) -> anyhow::Result<()> {
    let mut config = Config::load(root).context("failed to load .kubezero/config.yaml")?;
    if let Some(path) = opts.config {
        config.cluster_config = path;
    }

    let request = select(opts.cloud, opts.region)?;
    let request = if opts.local {
        let owner = match opts.fork_owner {
            Some(owner) => Some(owner),
            None => ask_fork_owner(&config.gitops.upstream_repo, opts.no_open)?,
        };
        request.with_local_mode(owner)
    } else {
        request
    };

    let boot = Bootstrapper::new(
        root,
        config,
        K3d::new(),
        KubeControlPlane::new(),
        GitCommand::new(root),
    );
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    let report = rt.block_on(boot.run(&request))?;

    if json {
        print_json(&report)?;
    } else {
        print_summary(&report, boot.config());
    }
    Ok(())
}

/// Provider and region from flags, prompting for whichever is missing.
fn select(cloud: Option<String>, region: Option<String>) -> anyhow::Result<BootstrapRequest> {
    let cloud = match cloud {
        Some(c) => c,
        None => {
            let names: Vec<&str> = Provider::all().iter().map(|p| p.as_str()).collect();
            prompt::choose("Cloud provider", &names)?.unwrap_or_default()
        }
    };
    let profile = catalog::resolve(&cloud).map_err(|e| e.at(Stage::Selection))?;

    let region = match region {
        Some(r) => r,
        None => {
            prompt::choose(&format!("{} region", profile.name), profile.regions)?
                .unwrap_or_default()
        }
    };
    Ok(BootstrapRequest::validate(profile.provider.as_str(), &region)?)
}

fn ask_fork_owner(upstream_repo: &str, no_open: bool) -> anyhow::Result<Option<String>> {
    let url = fork_sync::fork_page_url(upstream_repo);
    if no_open {
        eprintln!("Fork the repository at {url}");
    } else if let Err(e) = fork_sync::open_fork_page(upstream_repo) {
        tracing::warn!(error = %e, "could not open browser");
        eprintln!("Open {url} to create your fork");
    }
    eprintln!("Complete the fork in your browser, then enter the GitHub owner of the fork.");
    prompt::ask("GitHub username")
}

fn print_summary(report: &BootstrapReport, config: &Config) {
    let profile = catalog::profile(report.provider);
    println!(
        "KubeZero bootstrap complete: {} in {}",
        profile.name, report.region
    );
    println!("  nodes:     {}", report.nodes);
    if report.packages.is_empty() {
        println!("  packages:  none");
    } else {
        let names: Vec<&str> = report.packages.iter().map(|p| p.name.as_str()).collect();
        println!("  packages:  {}", names.join(", "));
    }
    if let Some(fork) = &report.fork {
        println!("  fork:      https://github.com/{}/kubezero", fork.owner);
        println!(
            "  pushed:    {}/{}{}",
            config.gitops.fork_remote,
            fork.branch,
            if fork.committed { "" } else { " (nothing new to commit)" }
        );
    }
    for warning in &report.warnings {
        println!("  warning:   {warning}");
    }
    println!();
    println!("Next steps:");
    println!("  kubectl get pods -n {}", config.namespace);
    println!("  kubezero status");
}
