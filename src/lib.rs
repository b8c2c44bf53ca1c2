//! Resolves and installs the ChromeDriver matching the locally installed
//! Chrome.
//!
//! The pipeline is strictly linear: detect the browser version, normalize
//! the host platform, resolve a download URL from the release catalog
//! generation matching the browser's major version, then download and unpack
//! the archive so exactly one executable sits at the installation root.

// Top-level public modules
pub mod browser;
pub mod catalog;
pub mod downloader;
pub mod error;
pub mod platform;

pub use browser::{BrowserProbe, BrowserVersion, SystemChrome};
pub use catalog::{CatalogGeneration, ResolvedDriver};
pub use error::InstallerError;
pub use platform::Platform;

use std::path::{Path, PathBuf};
use std::time::Duration;

// Bounded timeouts so a hung catalog or storage endpoint fails the run
// instead of stalling it. Nothing is retried; a failure is terminal.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// HTTP client shared by the catalog fetches and the archive download.
pub fn http_client() -> Result<reqwest::Client, InstallerError> {
    Ok(reqwest::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(REQUEST_TIMEOUT)
        .build()?)
}

/// Runs the full detect, resolve, download, install pipeline.
///
/// Returns the canonical path of the installed executable. Stages run in
/// sequence and the first failing stage aborts the run.
pub async fn install_chromedriver(
    probe: &dyn BrowserProbe,
    install_root: &Path,
) -> Result<PathBuf, InstallerError> {
    let client = http_client()?;

    let version = probe.browser_version().await?;
    log::info!("detected Chrome version: {version}");

    let platform = Platform::detect()?;
    let resolved = catalog::resolve_driver(&client, version.major, platform).await?;
    log::info!(
        "resolved ChromeDriver {} for {platform}",
        resolved.version
    );

    downloader::download_and_install(&client, &resolved.url, install_root).await
}
