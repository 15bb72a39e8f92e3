//! Region-aware Crossplane patches written into a package's
//! `infrastructure/` directory.
//!
//! The network patch always lays out four subnets over the region's first two
//! zones (public a/b, private a/b), whatever the region's zone count.

use crate::catalog::{self, Provider};
use crate::error::Result;
use crate::io;
use crate::paths;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const VPC_CIDR: &str = "192.168.0.0/16";
const SUBNET_CIDRS: [&str; 4] = [
    "192.168.0.0/18",
    "192.168.64.0/18",
    "192.168.128.0/18",
    "192.168.192.0/18",
];
const SECRET_NAMESPACE: &str = "crossplane-system";

// ---------------------------------------------------------------------------
// Manifest shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest<S> {
    pub api_version: String,
    pub kind: String,
    pub metadata: Metadata,
    pub spec: S,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkSpec {
    pub parameters: NetworkParameters,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkParameters {
    pub provider_config_name: String,
    pub region: String,
    pub vpc_cidr_block: String,
    pub subnets: Vec<Subnet>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubnetType {
    Public,
    Private,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subnet {
    pub availability_zone: String,
    #[serde(rename = "type")]
    pub kind: SubnetType,
    pub cidr_block: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSpec {
    pub parameters: ClusterParameters,
    pub write_connection_secret_to_ref: SecretRef,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterParameters {
    pub provider_config_name: String,
    pub region: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecretRef {
    pub name: String,
    pub namespace: String,
}

pub type NetworkPatch = Manifest<NetworkSpec>;
pub type ClusterPatch = Manifest<ClusterSpec>;

// ---------------------------------------------------------------------------
// PackageType
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageType {
    Management,
    Worker,
}

impl PackageType {
    /// Worker packages are recognised by "worker" in the package name.
    pub fn for_package(name: &str) -> Self {
        if name.contains("worker") {
            PackageType::Worker
        } else {
            PackageType::Management
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PackageType::Management => "management",
            PackageType::Worker => "worker",
        }
    }
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

/// Build the AWS network patch. Returns `None` when fewer than two zones
/// are known for the region.
pub fn network_patch(region: &str, zones: &[&str]) -> Option<NetworkPatch> {
    let [first, second, ..] = zones else {
        return None;
    };
    let layout = [
        (*first, SubnetType::Public),
        (*second, SubnetType::Public),
        (*first, SubnetType::Private),
        (*second, SubnetType::Private),
    ];
    let subnets = layout
        .iter()
        .zip(SUBNET_CIDRS)
        .map(|((zone, kind), cidr)| Subnet {
            availability_zone: zone.to_string(),
            kind: *kind,
            cidr_block: cidr.to_string(),
        })
        .collect();

    Some(Manifest {
        api_version: "aws.platform.upbound.io/v1alpha1".to_string(),
        kind: "XNetwork".to_string(),
        metadata: Metadata {
            name: "aws-network".to_string(),
        },
        spec: NetworkSpec {
            parameters: NetworkParameters {
                provider_config_name: "management-provider-aws".to_string(),
                region: region.to_string(),
                vpc_cidr_block: VPC_CIDR.to_string(),
                subnets,
            },
        },
    })
}

/// Build the managed Kubernetes control-plane patch for `provider`.
pub fn cluster_patch(provider: Provider, package_type: PackageType, region: &str) -> ClusterPatch {
    let (api_version, kind, name, flavour) = match provider {
        Provider::Aws => ("aws.platform.upbound.io/v1alpha1", "XEKS", "aws-eks", "eks"),
        Provider::Gcp => ("gcp.platform.upbound.io/v1alpha1", "XGKE", "gcp-gke", "gke"),
    };
    let ty = package_type.as_str();

    Manifest {
        api_version: api_version.to_string(),
        kind: kind.to_string(),
        metadata: Metadata {
            name: name.to_string(),
        },
        spec: ClusterSpec {
            parameters: ClusterParameters {
                provider_config_name: format!("{ty}-provider-{provider}"),
                region: region.to_string(),
            },
            write_connection_secret_to_ref: SecretRef {
                name: format!("{ty}-{provider}-{flavour}-kubeconfig"),
                namespace: SECRET_NAMESPACE.to_string(),
            },
        },
    }
}

/// Render a manifest as a single YAML document with a leading separator.
pub fn render<S: Serialize>(manifest: &Manifest<S>) -> Result<String> {
    Ok(format!("---\n{}", serde_yaml::to_string(manifest)?))
}

// ---------------------------------------------------------------------------
// Writing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchOutcome {
    Written(Vec<PathBuf>),
    /// The region has no zone mapping; nothing was written.
    NoZones,
}

/// Write the infrastructure patches for `provider`/`region` into `infra_dir`.
pub fn write_patches(
    infra_dir: &Path,
    package_type: PackageType,
    provider: Provider,
    region: &str,
) -> Result<PatchOutcome> {
    let Some(zones) = catalog::zones_for(region) else {
        tracing::warn!(region, "no predefined availability zones, using default configuration");
        return Ok(PatchOutcome::NoZones);
    };

    let mut written = Vec::new();

    if provider == Provider::Aws {
        if let Some(patch) = network_patch(region, zones) {
            let path = infra_dir.join(paths::NETWORK_PATCH);
            io::atomic_write(&path, render(&patch)?.as_bytes())?;
            tracing::info!(region, file = paths::NETWORK_PATCH, "updated patch");
            written.push(path);
        }
    }

    let patch = cluster_patch(provider, package_type, region);
    let path = infra_dir.join(paths::CLUSTER_PATCH);
    io::atomic_write(&path, render(&patch)?.as_bytes())?;
    tracing::info!(region, file = paths::CLUSTER_PATCH, "updated patch");
    written.push(path);

    Ok(PatchOutcome::Written(written))
}
