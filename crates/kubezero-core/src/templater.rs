//! Copies provider packages into the registry and fills in region and
//! provider placeholders.

use crate::catalog::Provider;
use crate::error::Result;
use crate::io;
use crate::patches::{self, PackageType, PatchOutcome};
use crate::paths;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// One deployable package directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Package {
    pub name: String,
    pub source: PathBuf,
    pub destination: PathBuf,
}

/// Result of preparing all packages for one provider/region.
#[derive(Debug, Default)]
pub struct Prepared {
    pub packages: Vec<Package>,
    pub warnings: Vec<String>,
}

pub struct ConfigTemplater<'a> {
    packages_dir: &'a Path,
    registry_dir: &'a Path,
}

impl<'a> ConfigTemplater<'a> {
    pub fn new(packages_dir: &'a Path, registry_dir: &'a Path) -> Self {
        Self {
            packages_dir,
            registry_dir,
        }
    }

    /// Find every package directory whose name contains the provider token.
    /// A missing packages directory yields no packages.
    pub fn discover(&self, provider: Provider) -> Result<Vec<Package>> {
        if !self.packages_dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut packages = Vec::new();
        for entry in std::fs::read_dir(self.packages_dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.contains(provider.as_str()) {
                packages.push(Package {
                    destination: self.registry_dir.join(&name),
                    source: entry.path(),
                    name,
                });
            }
        }
        packages.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(packages)
    }

    /// Copy and rewrite every matching package into the registry.
    pub fn prepare(&self, provider: Provider, region: &str) -> Result<Prepared> {
        let packages = self.discover(provider)?;
        let mut prepared = Prepared::default();

        if packages.is_empty() {
            let msg = format!("no specific packages found for provider {provider}, using default configuration");
            tracing::warn!("{msg}");
            prepared.warnings.push(msg);
            return Ok(prepared);
        }

        let names: Vec<&str> = packages.iter().map(|p| p.name.as_str()).collect();
        tracing::info!(count = packages.len(), packages = ?names, "found packages");

        io::ensure_dir(self.registry_dir)?;

        for package in packages {
            tracing::info!(package = %package.name, "preparing package");
            if let Some(warning) = prepare_package(&package, provider, region)? {
                prepared.warnings.push(warning);
            }
            prepared.packages.push(package);
        }
        Ok(prepared)
    }
}

/// Copy one package and rewrite it in place. Returns a warning if the
/// infrastructure patches had to be skipped.
fn prepare_package(package: &Package, provider: Provider, region: &str) -> Result<Option<String>> {
    io::replace_dir(&package.source, &package.destination)?;

    for name in paths::TEMPLATED_MANIFESTS {
        let path = package.destination.join(name);
        if path.is_file() && substitute_file(&path, provider, region)? {
            tracing::info!(file = name, package = %package.name, "updated");
        }
    }

    let infra = package.destination.join(paths::INFRASTRUCTURE_DIR);
    if infra.is_dir() {
        let package_type = PackageType::for_package(&package.name);
        if let PatchOutcome::NoZones =
            patches::write_patches(&infra, package_type, provider, region)?
        {
            return Ok(Some(format!(
                "no predefined availability zones for region {region}; {} keeps its default infrastructure patches",
                package.name
            )));
        }
    }
    Ok(None)
}

/// Package directories under `dir`: non-hidden directories holding a
/// `gitops.yaml`, an `infrastructure/` or an `applications/` directory.
pub fn list_packages(dir: &Path) -> Result<Vec<String>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if !entry.file_type()?.is_dir() || name.starts_with('.') || name == "test" {
            continue;
        }
        let path = entry.path();
        if path.join("gitops.yaml").is_file()
            || path.join(paths::INFRASTRUCTURE_DIR).is_dir()
            || path.join("applications").is_dir()
        {
            names.push(name);
        }
    }
    names.sort();
    Ok(names)
}

/// Provider token found in a package name, or `"other"`.
pub fn provider_of(package: &str) -> &'static str {
    ["aws", "gcp", "virtual"]
        .into_iter()
        .find(|token| package.contains(token))
        .unwrap_or("other")
}

/// Replace every known placeholder token in `content`.
pub fn substitute(content: &str, provider: Provider, region: &str) -> String {
    let provider = provider.as_str();
    let replacements = [
        ("REGION_PLACEHOLDER", region),
        ("CLOUD_PROVIDER_PLACEHOLDER", provider),
        ("${AWS_REGION}", region),
        ("${GCP_REGION}", region),
        ("${CLOUD_PROVIDER}", provider),
    ];
    replacements
        .iter()
        .fold(content.to_string(), |acc, (token, value)| acc.replace(token, value))
}

/// Substitute placeholders in a file. The file is only written when its
/// content changes; returns whether it was rewritten.
pub fn substitute_file(path: &Path, provider: Provider, region: &str) -> Result<bool> {
    io::rewrite_file(path, |content| substitute(content, provider, region))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(path: &Path, content: &str) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn substitute_replaces_all_tokens() {
        let input = "region: REGION_PLACEHOLDER\ncloud: CLOUD_PROVIDER_PLACEHOLDER\n\
                     a: ${AWS_REGION}\ng: ${GCP_REGION}\nc: ${CLOUD_PROVIDER}\n";
        let out = substitute(input, Provider::Aws, "eu-west-1");
        assert_eq!(
            out,
            "region: eu-west-1\ncloud: aws\na: eu-west-1\ng: eu-west-1\nc: aws\n"
        );
    }

    #[test]
    fn substitute_file_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("values.yaml");
        write(&path, "region: REGION_PLACEHOLDER\nprovider: CLOUD_PROVIDER_PLACEHOLDER\n");

        assert!(substitute_file(&path, Provider::Aws, "eu-west-1").unwrap());
        let first = std::fs::read_to_string(&path).unwrap();
        assert!(!first.contains("REGION_PLACEHOLDER"));
        assert!(!first.contains("CLOUD_PROVIDER_PLACEHOLDER"));
        assert!(first.contains("eu-west-1"));
        assert!(first.contains("aws"));

        let modified = std::fs::metadata(&path).unwrap().modified().unwrap();
        assert!(!substitute_file(&path, Provider::Aws, "eu-west-1").unwrap());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), first);
        assert_eq!(std::fs::metadata(&path).unwrap().modified().unwrap(), modified);
    }

    #[test]
    fn discover_matches_provider_token_in_dir_names() {
        let dir = TempDir::new().unwrap();
        let packages = dir.path().join("packages");
        for name in ["aws-management", "gcp-management", "aws-worker", "shared"] {
            std::fs::create_dir_all(packages.join(name)).unwrap();
        }
        write(&packages.join("aws-notes.txt"), "not a package");

        let registry = dir.path().join("registry");
        let templater = ConfigTemplater::new(&packages, &registry);
        let found = templater.discover(Provider::Aws).unwrap();
        let names: Vec<&str> = found.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["aws-management", "aws-worker"]);
        assert_eq!(found[0].destination, registry.join("aws-management"));
    }

    #[test]
    fn missing_packages_dir_is_a_warning() {
        let dir = TempDir::new().unwrap();
        let packages = dir.path().join("packages");
        let registry = dir.path().join("registry");
        let prepared = ConfigTemplater::new(&packages, &registry)
            .prepare(Provider::Gcp, "us-central1")
            .unwrap();
        assert!(prepared.packages.is_empty());
        assert_eq!(prepared.warnings.len(), 1);
        assert!(!registry.exists());
    }

    #[test]
    fn prepare_copies_and_rewrites_packages() {
        let dir = TempDir::new().unwrap();
        let packages = dir.path().join("packages");
        let src = packages.join("aws-management");
        write(&src.join("gitops.yaml"), "region: ${AWS_REGION}\n");
        write(&src.join("apps/values.yaml"), "region: REGION_PLACEHOLDER\n");
        write(&src.join("infrastructure/kustomization.yaml"), "resources: []\n");

        let registry = dir.path().join("registry");
        let prepared = ConfigTemplater::new(&packages, &registry)
            .prepare(Provider::Aws, "eu-west-1")
            .unwrap();

        assert_eq!(prepared.packages.len(), 1);
        assert!(prepared.warnings.is_empty());
        let dst = registry.join("aws-management");
        assert_eq!(
            std::fs::read_to_string(dst.join("gitops.yaml")).unwrap(),
            "region: eu-west-1\n"
        );
        // Only manifests at the package root are templated.
        assert_eq!(
            std::fs::read_to_string(dst.join("apps/values.yaml")).unwrap(),
            "region: REGION_PLACEHOLDER\n"
        );
        assert!(dst.join("infrastructure").join(paths::NETWORK_PATCH).exists());
        assert!(dst.join("infrastructure").join(paths::CLUSTER_PATCH).exists());
        // The source package is left untouched.
        assert_eq!(
            std::fs::read_to_string(src.join("gitops.yaml")).unwrap(),
            "region: ${AWS_REGION}\n"
        );
    }

    #[test]
    fn list_packages_requires_package_markers() {
        let dir = TempDir::new().unwrap();
        write(&dir.path().join("aws-management/gitops.yaml"), "");
        std::fs::create_dir_all(dir.path().join("gcp-worker/infrastructure")).unwrap();
        std::fs::create_dir_all(dir.path().join("virtual-dev/applications")).unwrap();
        std::fs::create_dir_all(dir.path().join("docs")).unwrap();
        write(&dir.path().join("test/gitops.yaml"), "");
        write(&dir.path().join(".cache/gitops.yaml"), "");

        let names = list_packages(dir.path()).unwrap();
        assert_eq!(names, vec!["aws-management", "gcp-worker", "virtual-dev"]);
        assert_eq!(provider_of("gcp-worker"), "gcp");
        assert_eq!(provider_of("shared"), "other");
        assert!(list_packages(&dir.path().join("missing")).unwrap().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn prepare_reruns_over_read_only_package() {
        use std::os::unix::fs::PermissionsExt;
        let dir = TempDir::new().unwrap();
        let packages = dir.path().join("packages");
        let src = packages.join("aws-management");
        write(&src.join("gitops.yaml"), "region: REGION_PLACEHOLDER\n");
        write(&src.join("obsolete.yaml"), "kind: Old\n");
        std::fs::set_permissions(src.join("gitops.yaml"), std::fs::Permissions::from_mode(0o444))
            .unwrap();
        std::fs::set_permissions(&src, std::fs::Permissions::from_mode(0o555)).unwrap();

        let registry = dir.path().join("registry");
        let templater = ConfigTemplater::new(&packages, &registry);
        templater.prepare(Provider::Aws, "eu-west-1").unwrap();

        std::fs::set_permissions(&src, std::fs::Permissions::from_mode(0o755)).unwrap();
        std::fs::remove_file(src.join("obsolete.yaml")).unwrap();
        std::fs::set_permissions(&src, std::fs::Permissions::from_mode(0o555)).unwrap();

        templater.prepare(Provider::Aws, "us-west-1").unwrap();
        let dst = registry.join("aws-management");
        assert_eq!(
            std::fs::read_to_string(dst.join("gitops.yaml")).unwrap(),
            "region: us-west-1\n"
        );
        assert!(!dst.join("obsolete.yaml").exists());

        std::fs::set_permissions(&src, std::fs::Permissions::from_mode(0o755)).unwrap();
    }

    #[test]
    fn package_type_ignores_checkout_location() {
        let dir = TempDir::new().unwrap();
        let checkout = dir.path().join("home/ci-worker/kubezero");
        let packages = checkout.join("packages");
        write(&packages.join("aws-management/infrastructure/kustomization.yaml"), "");
        write(&packages.join("aws-worker/infrastructure/kustomization.yaml"), "");
        let registry = checkout.join("registry");

        ConfigTemplater::new(&packages, &registry)
            .prepare(Provider::Aws, "eu-west-1")
            .unwrap();

        let read = |package: &str| -> patches::ClusterPatch {
            let path = registry
                .join(package)
                .join(paths::INFRASTRUCTURE_DIR)
                .join(paths::CLUSTER_PATCH);
            serde_yaml::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
        };
        let management = read("aws-management");
        assert_eq!(
            management.spec.parameters.provider_config_name,
            "management-provider-aws"
        );
        assert_eq!(
            management.spec.write_connection_secret_to_ref.name,
            "management-aws-eks-kubeconfig"
        );
        assert_eq!(
            read("aws-worker").spec.parameters.provider_config_name,
            "worker-provider-aws"
        );
    }

    #[test]
    fn prepare_overwrites_previous_registry_copy() {
        let dir = TempDir::new().unwrap();
        let packages = dir.path().join("packages");
        write(&packages.join("gcp-management/values.yaml"), "provider: CLOUD_PROVIDER_PLACEHOLDER\n");
        let registry = dir.path().join("registry");
        write(&registry.join("gcp-management/values.yaml"), "provider: stale\n");

        ConfigTemplater::new(&packages, &registry)
            .prepare(Provider::Gcp, "asia-east1")
            .unwrap();
        assert_eq!(
            std::fs::read_to_string(registry.join("gcp-management/values.yaml")).unwrap(),
            "provider: gcp\n"
        );
    }
}
