//! Detects the version of the locally installed Chrome.
//!
//! Each operating system gets its own probe strategy, selected at compile
//! time: macOS asks the application bundle binary directly, Linux walks a
//! list of candidate command names, and Windows reads the update beacon key
//! from the registry.

use crate::error::InstallerError;
use async_trait::async_trait;
use std::fmt;
use std::io;
use std::process::Command;
use std::str::FromStr;

/// Full dotted Chrome version. Only `major` participates in catalog lookup,
/// but detection fails rather than defaulting when fewer than four numeric
/// components are present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct BrowserVersion {
    pub major: u32,
    pub minor: u32,
    pub build: u32,
    pub patch: u32,
}

impl FromStr for BrowserVersion {
    type Err = InstallerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse_error = || InstallerError::VersionParse {
            output: s.to_string(),
        };
        let parts: Vec<&str> = s.split('.').collect();
        if parts.len() != 4 {
            return Err(parse_error());
        }
        let mut numbers = [0u32; 4];
        for (slot, part) in numbers.iter_mut().zip(&parts) {
            *slot = part.parse().map_err(|_| parse_error())?;
        }
        Ok(Self {
            major: numbers[0],
            minor: numbers[1],
            build: numbers[2],
            patch: numbers[3],
        })
    }
}

impl fmt::Display for BrowserVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}.{}", self.major, self.minor, self.build, self.patch)
    }
}

/// Pulls the first 4-component dotted version out of free-form probe output,
/// e.g. `"Google Chrome 117.0.5938.149"` or a `reg.exe` query dump.
///
/// The version may sit next to punctuation or a distro suffix, so the scan
/// looks for a dotted 4-number substring rather than whole tokens.
pub fn extract_version(output: &str) -> Option<BrowserVersion> {
    output
        .split(|c: char| !c.is_ascii_digit() && c != '.')
        .find_map(|run| {
            let fields: Vec<&str> = run.split('.').filter(|field| !field.is_empty()).collect();
            fields
                .windows(4)
                .find_map(|window| window.join(".").parse().ok())
        })
}

/// Narrow capability interface over the host's browser installation.
///
/// The real implementation spawns processes and queries the registry; tests
/// inject fixed versions so the rest of the pipeline stays deterministic.
#[async_trait]
pub trait BrowserProbe {
    /// Version of the installed browser, or `DetectionFailed` when no probe
    /// strategy succeeds.
    async fn browser_version(&self) -> Result<BrowserVersion, InstallerError>;
}

/// Probes the Chrome actually installed on this machine.
pub struct SystemChrome;

#[async_trait]
impl BrowserProbe for SystemChrome {
    async fn browser_version(&self) -> Result<BrowserVersion, InstallerError> {
        detect_system_version()
    }
}

#[cfg(any(target_os = "macos", target_os = "linux", target_os = "windows"))]
fn capture_stdout(mut command: Command) -> Result<String, InstallerError> {
    let rendered = format!("{command:?}");
    let output = command
        .output()
        .map_err(|source| InstallerError::CommandExecution {
            command: rendered.clone(),
            source,
        })?;
    if !output.status.success() {
        return Err(InstallerError::CommandExecution {
            command: rendered,
            source: io::Error::other(format!("exited with {}", output.status)),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

#[cfg(target_os = "macos")]
fn detect_system_version() -> Result<BrowserVersion, InstallerError> {
    let chrome =
        std::path::Path::new("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome");
    if !chrome.exists() {
        return Err(InstallerError::DetectionFailed);
    }
    let mut command = Command::new(chrome);
    command.arg("--version");
    let output = capture_stdout(command)?;
    // Output reads "Google Chrome 117.0.5938.149"; the surrounding text is discarded.
    extract_version(&output).ok_or(InstallerError::VersionParse { output })
}

#[cfg(target_os = "linux")]
fn detect_system_version() -> Result<BrowserVersion, InstallerError> {
    const CANDIDATES: [&str; 4] = [
        "google-chrome",
        "google-chrome-stable",
        "chromium",
        "chromium-browser",
    ];
    for name in CANDIDATES {
        let Ok(binary) = which::which(name) else {
            continue;
        };
        let mut command = Command::new(binary);
        command.arg("--version");
        let Ok(output) = capture_stdout(command) else {
            continue;
        };
        if let Some(version) = extract_version(&output) {
            return Ok(version);
        }
    }
    Err(InstallerError::DetectionFailed)
}

#[cfg(target_os = "windows")]
fn detect_system_version() -> Result<BrowserVersion, InstallerError> {
    // The 32-bit view first, then the WOW64 view.
    const BEACON_KEYS: [&str; 2] = [
        r"HKLM\SOFTWARE\Google\Chrome\BLBeacon",
        r"HKLM\SOFTWARE\Wow6432Node\Google\Chrome\BLBeacon",
    ];
    for key in BEACON_KEYS {
        let mut command = Command::new("reg");
        command.args(["query", key, "/v", "version"]);
        let Ok(output) = capture_stdout(command) else {
            continue;
        };
        if let Some(version) = extract_version(&output) {
            return Ok(version);
        }
    }
    Err(InstallerError::DetectionFailed)
}

#[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
fn detect_system_version() -> Result<BrowserVersion, InstallerError> {
    Err(InstallerError::DetectionFailed)
}
