//! Static table of supported cloud providers, their regions, and the
//! availability zones used when generating infrastructure patches.

use crate::error::{KubezeroError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Provider
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Aws,
    Gcp,
}

impl Provider {
    pub fn all() -> &'static [Provider] {
        &[Provider::Aws, Provider::Gcp]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Aws => "aws",
            Provider::Gcp => "gcp",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = KubezeroError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "aws" => Ok(Provider::Aws),
            "gcp" => Ok(Provider::Gcp),
            other => Err(KubezeroError::UnsupportedProvider {
                provider: other.to_string(),
                available: Provider::all().iter().map(|p| p.to_string()).collect(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// ProviderProfile
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct ProviderProfile {
    pub provider: Provider,
    pub name: &'static str,
    pub regions: &'static [&'static str],
}

impl ProviderProfile {
    pub fn supports(&self, region: &str) -> bool {
        self.regions.contains(&region)
    }
}

static PROFILES: [ProviderProfile; 2] = [
    ProviderProfile {
        provider: Provider::Aws,
        name: "Amazon Web Services (AWS)",
        regions: &[
            "us-east-1",
            "us-east-2",
            "us-west-1",
            "us-west-2",
            "eu-west-1",
            "eu-west-2",
            "eu-central-1",
            "ap-southeast-1",
            "ap-southeast-2",
            "ap-northeast-1",
        ],
    },
    ProviderProfile {
        provider: Provider::Gcp,
        name: "Google Cloud Platform (GCP)",
        regions: &[
            "us-central1",
            "us-east1",
            "us-west1",
            "us-west2",
            "europe-west1",
            "europe-west2",
            "europe-central2",
            "asia-southeast1",
            "asia-east1",
            "asia-northeast1",
        ],
    },
];

static ZONES: &[(&str, &[&str])] = &[
    // AWS
    ("us-east-1", &["us-east-1a", "us-east-1b", "us-east-1c"]),
    ("us-east-2", &["us-east-2a", "us-east-2b", "us-east-2c"]),
    ("us-west-1", &["us-west-1a", "us-west-1b"]),
    ("us-west-2", &["us-west-2a", "us-west-2b", "us-west-2c"]),
    ("eu-west-1", &["eu-west-1a", "eu-west-1b", "eu-west-1c"]),
    ("eu-west-2", &["eu-west-2a", "eu-west-2b", "eu-west-2c"]),
    ("eu-central-1", &["eu-central-1a", "eu-central-1b", "eu-central-1c"]),
    ("ap-southeast-1", &["ap-southeast-1a", "ap-southeast-1b", "ap-southeast-1c"]),
    ("ap-southeast-2", &["ap-southeast-2a", "ap-southeast-2b", "ap-southeast-2c"]),
    ("ap-northeast-1", &["ap-northeast-1a", "ap-northeast-1b", "ap-northeast-1c"]),
    // GCP
    ("us-central1", &["us-central1-a", "us-central1-b", "us-central1-c"]),
    ("us-east1", &["us-east1-a", "us-east1-b", "us-east1-c"]),
    ("us-west1", &["us-west1-a", "us-west1-b", "us-west1-c"]),
    ("us-west2", &["us-west2-a", "us-west2-b", "us-west2-c"]),
    ("europe-west1", &["europe-west1-a", "europe-west1-b", "europe-west1-c"]),
    ("europe-west2", &["europe-west2-a", "europe-west2-b", "europe-west2-c"]),
    ("europe-central2", &["europe-central2-a", "europe-central2-b", "europe-central2-c"]),
    ("asia-southeast1", &["asia-southeast1-a", "asia-southeast1-b", "asia-southeast1-c"]),
    ("asia-east1", &["asia-east1-a", "asia-east1-b", "asia-east1-c"]),
    ("asia-northeast1", &["asia-northeast1-a", "asia-northeast1-b", "asia-northeast1-c"]),
];

// ---------------------------------------------------------------------------
// Lookups
// ---------------------------------------------------------------------------

pub fn profiles() -> &'static [ProviderProfile] {
    &PROFILES
}

/// Look up the profile for a provider token such as `"aws"`.
pub fn resolve(provider: &str) -> Result<&'static ProviderProfile> {
    let provider: Provider = provider.parse()?;
    Ok(profile(provider))
}

pub fn profile(provider: Provider) -> &'static ProviderProfile {
    PROFILES
        .iter()
        .find(|p| p.provider == provider)
        .unwrap_or(&PROFILES[0])
}

/// Ordered availability zones for `region`, if the catalog knows them.
pub fn zones_for(region: &str) -> Option<&'static [&'static str]> {
    ZONES
        .iter()
        .find(|(r, _)| *r == region)
        .map(|(_, zones)| *zones)
}

/// Validate a provider/region pair selected by the operator.
pub fn validate(provider: &str, region: &str) -> Result<Provider> {
    let profile = resolve(provider)?;
    let provider = profile.provider;
    if !profile.supports(region) {
        return Err(KubezeroError::UnsupportedRegion {
            region: region.to_string(),
            provider: provider.to_string(),
            available: profile.regions.iter().map(|r| r.to_string()).collect(),
        });
    }
    Ok(provider)
}
