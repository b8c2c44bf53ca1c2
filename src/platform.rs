//! Maps the host OS and CPU architecture to the platform identifiers used by
//! the ChromeDriver download catalogs.

use crate::error::InstallerError;
use std::fmt;

/// Canonical platform identifier recognized by the Chrome for Testing catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    MacArm64,
    MacX64,
    Linux64,
    Win64,
    Win32,
}

impl Platform {
    /// Resolves the platform for the machine this process is running on.
    pub fn detect() -> Result<Self, InstallerError> {
        Self::from_host(std::env::consts::OS, std::env::consts::ARCH)
    }

    /// Maps an OS name and raw architecture token to a platform identifier.
    ///
    /// The mapping is total over the supported matrix; everything outside it
    /// is an explicit `UnsupportedPlatform` error. 32-bit Linux in particular
    /// has no compatible modern chromedriver release.
    pub fn from_host(os: &str, arch: &str) -> Result<Self, InstallerError> {
        match os {
            "macos" => {
                if arch == "aarch64" || arch == "arm64" {
                    Ok(Self::MacArm64)
                } else {
                    Ok(Self::MacX64)
                }
            }
            "linux" => {
                if arch.contains("64") {
                    Ok(Self::Linux64)
                } else {
                    Err(InstallerError::UnsupportedPlatform(format!("{os}-{arch}")))
                }
            }
            "windows" => {
                if arch.contains("64") {
                    Ok(Self::Win64)
                } else {
                    Ok(Self::Win32)
                }
            }
            _ => Err(InstallerError::UnsupportedPlatform(format!("{os}-{arch}"))),
        }
    }

    /// Identifier as it appears in the Chrome for Testing download entries.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MacArm64 => "mac-arm64",
            Self::MacX64 => "mac-x64",
            Self::Linux64 => "linux64",
            Self::Win64 => "win64",
            Self::Win32 => "win32",
        }
    }

    /// Token used by the pre-115 archive names.
    ///
    /// The legacy catalog shipped a single universal mac archive and never
    /// published a 64-bit Windows archive, so both mac identifiers collapse
    /// to `mac64` and `win64` collapses to `win32`.
    pub fn legacy_token(self) -> &'static str {
        match self {
            Self::MacArm64 | Self::MacX64 => "mac64",
            Self::Linux64 => "linux64",
            Self::Win64 | Self::Win32 => "win32",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_every_supported_host_pair() {
        assert_eq!(Platform::from_host("macos", "aarch64").unwrap(), Platform::MacArm64);
        assert_eq!(Platform::from_host("macos", "x86_64").unwrap(), Platform::MacX64);
        assert_eq!(Platform::from_host("linux", "x86_64").unwrap(), Platform::Linux64);
        assert_eq!(Platform::from_host("linux", "aarch64").unwrap(), Platform::Linux64);
        assert_eq!(Platform::from_host("windows", "x86_64").unwrap(), Platform::Win64);
        assert_eq!(Platform::from_host("windows", "x86").unwrap(), Platform::Win32);
    }

    #[test]
    fn rejects_hosts_outside_the_matrix() {
        assert!(matches!(
            Platform::from_host("linux", "i686"),
            Err(InstallerError::UnsupportedPlatform(_))
        ));
        assert!(matches!(
            Platform::from_host("freebsd", "x86_64"),
            Err(InstallerError::UnsupportedPlatform(_))
        ));
    }

    #[test]
    fn legacy_tokens_collapse_deterministically() {
        assert_eq!(Platform::MacArm64.legacy_token(), "mac64");
        assert_eq!(Platform::MacX64.legacy_token(), "mac64");
        assert_eq!(Platform::Win64.legacy_token(), "win32");
        assert_eq!(Platform::Win32.legacy_token(), "win32");
        assert_eq!(Platform::Linux64.legacy_token(), "linux64");
    }

    #[test]
    fn detect_succeeds_on_the_test_host() {
        // Anything this suite builds on is inside the supported matrix.
        Platform::detect().unwrap();
    }
}
