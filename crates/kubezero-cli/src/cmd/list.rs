use crate::output::print_json;
use anyhow::Context;
use kubezero_core::config::Config;
use kubezero_core::paths;
use kubezero_core::templater;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

type ByProvider = BTreeMap<&'static str, Vec<String>>;

#[derive(Serialize)]
struct ListOutput {
    packages: ByProvider,
    registry: ByProvider,
}

pub fn run(root: &Path, json: bool) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load .kubezero/config.yaml")?;
    let packages_dir = paths::resolve(root, &config.packages_dir);
    let registry_dir = paths::resolve(root, &config.registry_dir);

    let output = ListOutput {
        packages: group(
            templater::list_packages(&packages_dir).context("failed to list packages")?,
        ),
        registry: group(
            templater::list_packages(&registry_dir).context("failed to list registry")?,
        ),
    };

    if json {
        return print_json(&output);
    }

    println!("Available packages ({}):", packages_dir.display());
    print_group(&output.packages, "no packages found");
    println!();
    println!("Registry ({}):", registry_dir.display());
    print_group(&output.registry, "empty; run `kubezero bootstrap` to prepare packages");
    Ok(())
}

fn group(names: Vec<String>) -> ByProvider {
    let mut grouped = ByProvider::new();
    for name in names {
        grouped
            .entry(templater::provider_of(&name))
            .or_default()
            .push(name);
    }
    grouped
}

fn print_group(grouped: &ByProvider, empty: &str) {
    if grouped.is_empty() {
        println!("  {empty}");
        return;
    }
    for (provider, names) in grouped {
        println!("  {}:", provider.to_uppercase());
        for name in names {
            println!("    {name}");
        }
    }
}
