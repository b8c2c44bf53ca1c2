//! Resolves a chromedriver download URL for a given Chrome major version.
//!
//! Google publishes two mutually incompatible release catalogs: the Chrome
//! for Testing JSON endpoints (major 115 and up) and the legacy flat files on
//! chromedriver.storage.googleapis.com below that. The generation is picked
//! by a hard version threshold and callers only ever see one result type.

use crate::error::InstallerError;
use crate::platform::Platform;
use serde::Deserialize;
use std::collections::HashMap;

/// First Chrome major version served by the Chrome for Testing endpoints.
pub const CHROME_FOR_TESTING_MIN_MAJOR: u32 = 115;

const MILESTONE_CATALOG_URL: &str =
    "https://googlechromelabs.github.io/chrome-for-testing/latest-versions-per-milestone-with-downloads.json";
const LEGACY_STORAGE_URL: &str = "https://chromedriver.storage.googleapis.com";

/// Exact driver release resolved for the host, whichever catalog produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDriver {
    pub version: String,
    pub url: String,
}

/// The two release-catalog generations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogGeneration {
    ChromeForTesting,
    Legacy,
}

impl CatalogGeneration {
    /// Selects the generation for a browser major version.
    pub fn for_major(major: u32) -> Self {
        if major >= CHROME_FOR_TESTING_MIN_MAJOR {
            Self::ChromeForTesting
        } else {
            Self::Legacy
        }
    }

    /// Fetches the catalog and resolves the download for `platform`.
    pub async fn resolve(
        self,
        client: &reqwest::Client,
        major: u32,
        platform: Platform,
    ) -> Result<ResolvedDriver, InstallerError> {
        match self {
            Self::ChromeForTesting => resolve_chrome_for_testing(client, major, platform).await,
            Self::Legacy => resolve_legacy(client, major, platform).await,
        }
    }
}

/// Resolves the driver download for a browser major version, branching on the
/// catalog-generation threshold.
pub async fn resolve_driver(
    client: &reqwest::Client,
    major: u32,
    platform: Platform,
) -> Result<ResolvedDriver, InstallerError> {
    CatalogGeneration::for_major(major)
        .resolve(client, major, platform)
        .await
}

#[derive(Debug, Deserialize)]
struct MilestoneCatalog {
    milestones: HashMap<String, Milestone>,
}

#[derive(Debug, Deserialize)]
struct Milestone {
    version: String,
    downloads: MilestoneDownloads,
}

#[derive(Debug, Deserialize)]
struct MilestoneDownloads {
    // Early milestones predate the chromedriver artifact and omit the key.
    chromedriver: Option<Vec<Download>>,
}

#[derive(Debug, Deserialize)]
struct Download {
    platform: String,
    url: String,
}

async fn resolve_chrome_for_testing(
    client: &reqwest::Client,
    major: u32,
    platform: Platform,
) -> Result<ResolvedDriver, InstallerError> {
    log::info!("fetching Chrome for Testing catalog for milestone {major}");
    let catalog: MilestoneCatalog = client
        .get(MILESTONE_CATALOG_URL)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;
    find_milestone_download(&catalog, major, platform)
}

/// Pure lookup into an already-fetched milestone document.
fn find_milestone_download(
    catalog: &MilestoneCatalog,
    major: u32,
    platform: Platform,
) -> Result<ResolvedDriver, InstallerError> {
    let milestone = catalog
        .milestones
        .get(&major.to_string())
        .ok_or(InstallerError::MilestoneNotFound { major })?;
    let downloads = milestone.downloads.chromedriver.as_deref().unwrap_or(&[]);
    let entry = downloads
        .iter()
        .find(|download| download.platform == platform.as_str())
        .ok_or_else(|| InstallerError::PlatformNotInMilestone {
            major,
            platform: platform.as_str().to_string(),
        })?;
    Ok(ResolvedDriver {
        version: milestone.version.clone(),
        url: entry.url.clone(),
    })
}

async fn resolve_legacy(
    client: &reqwest::Client,
    major: u32,
    platform: Platform,
) -> Result<ResolvedDriver, InstallerError> {
    let release_url = format!("{LEGACY_STORAGE_URL}/LATEST_RELEASE_{major}");
    log::info!("fetching legacy chromedriver release for Chrome {major}");
    let body = client
        .get(&release_url)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;
    let version = body.trim();
    if version.is_empty() || !version.starts_with(|c: char| c.is_ascii_digit()) {
        return Err(InstallerError::LegacyVersionLookup {
            major,
            reason: format!("unexpected release body: '{version}'"),
        });
    }
    Ok(ResolvedDriver {
        version: version.to_string(),
        url: legacy_download_url(version, platform),
    })
}

/// The legacy archives follow one fixed naming template.
fn legacy_download_url(version: &str, platform: Platform) -> String {
    format!(
        "{LEGACY_STORAGE_URL}/{version}/chromedriver_{}.zip",
        platform.legacy_token()
    )
}
