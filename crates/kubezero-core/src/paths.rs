use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const KUBEZERO_DIR: &str = ".kubezero";
pub const CONFIG_FILE: &str = ".kubezero/config.yaml";

pub const PACKAGES_DIR: &str = "packages";
pub const REGISTRY_DIR: &str = "registry";
pub const CLUSTER_CONFIG: &str = "bootstrap/k3d-bootstrap-cluster.yaml";

pub const INFRASTRUCTURE_DIR: &str = "infrastructure";
pub const NETWORK_PATCH: &str = "patch-xnetwork.yaml";
pub const CLUSTER_PATCH: &str = "patch-xeks.yaml";

/// Manifests at a package root that carry placeholder tokens.
pub const TEMPLATED_MANIFESTS: [&str; 3] = ["gitops.yaml", "kustomization.yaml", "values.yaml"];

/// Manifests outside the registry that reference the upstream repository.
pub const REPO_REFERENCE_MANIFESTS: [&str; 5] = [
    "bootstrap/kubezero-bootstrap-manifests.yaml",
    "controller/argo-cd/application.yaml",
    "controller/crossplane/application.yaml",
    "controller/external-secrets/application.yaml",
    "controller/gitops/application.yaml",
];

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn kubezero_dir(root: &Path) -> PathBuf {
    root.join(KUBEZERO_DIR)
}

/// Whether `path` is a GitOps manifest that may carry repository references.
pub fn is_gitops_manifest(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.ends_with("gitops.yaml") || n.ends_with("_gitops.yaml"))
}

/// Resolve a configured path against the project root. Absolute paths are
/// kept as-is.
pub fn resolve(root: &Path, configured: &Path) -> PathBuf {
    if configured.is_absolute() {
        configured.to_path_buf()
    } else {
        root.join(configured)
    }
}
