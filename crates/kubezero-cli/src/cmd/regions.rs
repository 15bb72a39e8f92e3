use crate::output::{print_json, print_table};
use kubezero_core::catalog::{self, ProviderProfile};
use kubezero_core::error::Stage;

pub fn run(cloud: Option<&str>, json: bool) -> anyhow::Result<()> {
    let profiles: Vec<&ProviderProfile> = match cloud {
        Some(c) => vec![catalog::resolve(c).map_err(|e| e.at(Stage::Selection))?],
        None => catalog::profiles().iter().collect(),
    };

    if json {
        return print_json(&profiles);
    }

    let rows = profiles
        .iter()
        .flat_map(|p| {
            p.regions.iter().map(move |region| {
                let zones = catalog::zones_for(region)
                    .map(|z| z.join(", "))
                    .unwrap_or_else(|| "-".to_string());
                vec![p.provider.to_string(), region.to_string(), zones]
            })
        })
        .collect();
    print_table(&["PROVIDER", "REGION", "ZONES"], rows);
    Ok(())
}
