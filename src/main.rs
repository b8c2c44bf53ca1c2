//! Interactive installer binary.
//!
//! Checks for an existing install, asks before replacing it, then runs the
//! detect/resolve/install pipeline. Exit status is 0 on success or a
//! declined overwrite, 1 on any stage failure.

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use chromedriver_installer::{InstallerError, SystemChrome, downloader, install_chromedriver};

enum Outcome {
    Installed(PathBuf),
    Cancelled,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    env_logger::init();

    match run().await {
        Ok(Outcome::Installed(path)) => {
            println!("ChromeDriver is ready to use at: {}", path.display());
            ExitCode::SUCCESS
        }
        Ok(Outcome::Cancelled) => {
            println!("Installation cancelled.");
            ExitCode::SUCCESS
        }
        Err(error) => {
            log::error!("installation failed: {error}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<Outcome, InstallerError> {
    let install_root = std::env::current_dir().map_err(|source| InstallerError::Io {
        path: PathBuf::from("."),
        source,
    })?;

    let existing = install_root.join(downloader::driver_executable_name());
    if existing.exists() {
        if !confirm_overwrite(&existing, &mut io::stdin().lock())? {
            return Ok(Outcome::Cancelled);
        }
        std::fs::remove_file(&existing).map_err(|source| InstallerError::Io {
            path: existing.clone(),
            source,
        })?;
    }

    let path = install_chromedriver(&SystemChrome, &install_root).await?;

    // The artifact is in place either way; a verification problem is only a warning.
    match downloader::verify_driver(&path).await {
        Ok(banner) => log::info!("installed driver reports: {banner}"),
        Err(error) => log::warn!("installed driver failed its --version check: {error}"),
    }

    Ok(Outcome::Installed(path))
}

/// Asks whether to replace an existing driver; only an explicit `y` proceeds.
fn confirm_overwrite(existing: &Path, input: &mut impl BufRead) -> Result<bool, InstallerError> {
    print!(
        "ChromeDriver already exists at {}. Replace it? (y/n): ",
        existing.display()
    );
    let stdout_error = |source| InstallerError::Io {
        path: PathBuf::from("stdout"),
        source,
    };
    io::stdout().flush().map_err(stdout_error)?;

    let mut answer = String::new();
    input
        .read_line(&mut answer)
        .map_err(|source| InstallerError::Io {
            path: PathBuf::from("stdin"),
            source,
        })?;
    Ok(answer.trim().eq_ignore_ascii_case("y"))
}
