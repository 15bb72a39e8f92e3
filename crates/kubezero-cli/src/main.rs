mod cmd;
mod output;
mod prompt;
mod root;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "kubezero",
    about = "KubeZero CLI - bootstrap a local GitOps control cluster",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from .kubezero/ or .git/)
    #[arg(long, global = true, env = "KUBEZERO_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Bootstrap a local KubeZero cluster with cloud provider setup
    Bootstrap {
        /// Cloud provider (aws, gcp); prompted for when omitted
        #[arg(long)]
        cloud: Option<String>,

        /// Cloud region (e.g. eu-west-1, us-central1); prompted for when omitted
        #[arg(long)]
        region: Option<String>,

        /// Publish the prepared registry to your GitHub fork before provisioning
        #[arg(long)]
        local: bool,

        /// GitHub owner of your kubezero fork (local mode)
        #[arg(long)]
        fork_owner: Option<String>,

        /// Path to the k3d cluster configuration file
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,

        /// Do not open the fork page in a browser
        #[arg(long)]
        no_open: bool,
    },

    /// Show the status of the KubeZero cluster
    Status,

    /// Delete the KubeZero cluster
    Cleanup {
        /// Delete without confirmation
        #[arg(long, short = 'f')]
        force: bool,
    },

    /// List available packages and registry contents
    List,

    /// List supported cloud providers and regions
    Regions {
        /// Only show this provider
        #[arg(long)]
        cloud: Option<String>,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Bootstrap { .. } => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .init();

    let root = root::resolve_root(cli.root.as_deref());

    let result = match cli.command {
        Commands::Bootstrap {
            cloud,
            region,
            local,
            fork_owner,
            config,
            no_open,
        } => cmd::bootstrap::run(
            &root,
            cmd::bootstrap::Options {
                cloud,
                region,
                local,
                fork_owner,
                config,
                no_open,
            },
            cli.json,
        ),
        Commands::Status => cmd::status::run(&root, cli.json),
        Commands::Cleanup { force } => cmd::cleanup::run(&root, force),
        Commands::List => cmd::list::run(&root, cli.json),
        Commands::Regions { cloud } => cmd::regions::run(cloud.as_deref(), cli.json),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
