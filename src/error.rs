use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Error type for every failure the installer pipeline can report.
#[derive(Error, Debug)]
pub enum InstallerError {
    #[error("failed to execute command '{command}': {source}")]
    CommandExecution {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("could not detect an installed Chrome version")]
    DetectionFailed,

    #[error("could not parse a Chrome version out of: '{output}'")]
    VersionParse { output: String },

    #[error("unsupported platform: {0}")]
    UnsupportedPlatform(String),

    #[error("Chrome milestone {major} not present in the Chrome for Testing catalog")]
    MilestoneNotFound { major: u32 },

    #[error("no chromedriver download for platform '{platform}' in milestone {major}")]
    PlatformNotInMilestone { major: u32, platform: String },

    #[error("legacy release lookup for Chrome {major} failed: {reason}")]
    LegacyVersionLookup { major: u32, reason: String },

    #[error("network request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("I/O error accessing '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to extract archive '{path}': {source}")]
    Zip {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("no chromedriver executable found under '{path}' after extraction")]
    ExecutableNotFound { path: PathBuf },
}
