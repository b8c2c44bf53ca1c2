//! Downloads a resolved chromedriver archive and installs the executable.
//!
//! The archive is downloaded to a temporary file inside the installation
//! root, extracted in place, and the executable is relocated to the root if
//! the archive nested it one directory down. Leftover extraction directories
//! are pruned so repeated installs do not accumulate stale folders.

use crate::error::InstallerError;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use walkdir::WalkDir;

/// Name of the driver executable per OS convention.
pub fn driver_executable_name() -> &'static str {
    if cfg!(target_os = "windows") {
        "chromedriver.exe"
    } else {
        "chromedriver"
    }
}

/// Downloads `url` and installs the driver under `install_root`.
///
/// Returns the canonical path of the installed executable. The temporary
/// archive is removed on every exit path; a failed run may leave partial
/// extraction behind, which the next run overwrites.
pub async fn download_and_install(
    client: &reqwest::Client,
    url: &str,
    install_root: &Path,
) -> Result<PathBuf, InstallerError> {
    fs::create_dir_all(install_root)
        .await
        .map_err(|source| InstallerError::Io {
            path: install_root.to_path_buf(),
            source,
        })?;

    // Dropping the handle deletes the archive, whichever way we leave.
    let archive = tempfile::Builder::new()
        .prefix("chromedriver-download-")
        .suffix(".zip")
        .tempfile_in(install_root)
        .map_err(|source| InstallerError::Io {
            path: install_root.to_path_buf(),
            source,
        })?;

    log::info!("downloading {url}");
    download_file(client, url, archive.path()).await?;
    install_from_archive(archive.path(), install_root).await
}

/// Downloads a file from `url` to `dest_path`.
pub async fn download_file(
    client: &reqwest::Client,
    url: &str,
    dest_path: &Path,
) -> Result<(), InstallerError> {
    let response = client.get(url).send().await?.error_for_status()?;
    let content = response.bytes().await?;

    let io_error = |source| InstallerError::Io {
        path: dest_path.to_path_buf(),
        source,
    };
    let mut dest_file = File::create(dest_path).await.map_err(io_error)?;
    dest_file.write_all(&content).await.map_err(io_error)?;
    dest_file.flush().await.map_err(io_error)?;
    Ok(())
}

/// Extracts the archive into the root, relocates the executable, applies
/// permissions, and prunes leftover extraction directories.
async fn install_from_archive(
    archive_path: &Path,
    install_root: &Path,
) -> Result<PathBuf, InstallerError> {
    unzip_file(archive_path, install_root).await?;

    let driver_path = locate_and_relocate(install_root).await?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&driver_path, std::fs::Permissions::from_mode(0o755))
            .await
            .map_err(|source| InstallerError::Io {
                path: driver_path.clone(),
                source,
            })?;
    }

    remove_stale_directories(install_root).await?;

    dunce::canonicalize(&driver_path).map_err(|source| InstallerError::Io {
        path: driver_path,
        source,
    })
}

/// Decompresses a zip archive into a directory.
///
/// The zip crate is synchronous, so the work runs under `spawn_blocking`.
pub async fn unzip_file(archive_path: &Path, extract_to: &Path) -> Result<(), InstallerError> {
    let archive_path_buf = archive_path.to_path_buf();
    let extract_to_buf = extract_to.to_path_buf();

    let task_archive = archive_path.to_path_buf();
    tokio::task::spawn_blocking(move || extract_zip(&archive_path_buf, &extract_to_buf))
        .await
        .map_err(|join_error| InstallerError::Io {
            path: task_archive,
            source: io::Error::other(join_error),
        })?
}

fn extract_zip(archive_path: &Path, extract_to: &Path) -> Result<(), InstallerError> {
    let file = std::fs::File::open(archive_path).map_err(|source| InstallerError::Io {
        path: archive_path.to_path_buf(),
        source,
    })?;
    let mut archive = zip::ZipArchive::new(file).map_err(|source| InstallerError::Zip {
        path: archive_path.to_path_buf(),
        source,
    })?;

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index).map_err(|source| InstallerError::Zip {
            path: archive_path.to_path_buf(),
            source,
        })?;

        // Entries with unsafe paths are skipped rather than extracted.
        let Some(relative) = entry.enclosed_name() else {
            continue;
        };
        let outpath = extract_to.join(relative);
        let io_error = |path: &Path| {
            let path = path.to_path_buf();
            move |source| InstallerError::Io { path, source }
        };

        if entry.is_dir() {
            std::fs::create_dir_all(&outpath).map_err(io_error(&outpath))?;
            continue;
        }

        if let Some(parent) = outpath.parent() {
            std::fs::create_dir_all(parent).map_err(io_error(parent))?;
        }
        let mut outfile = std::fs::File::create(&outpath).map_err(io_error(&outpath))?;
        std::io::copy(&mut entry, &mut outfile).map_err(io_error(&outpath))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Some(mode) = entry.unix_mode() {
                std::fs::set_permissions(&outpath, std::fs::Permissions::from_mode(mode))
                    .map_err(io_error(&outpath))?;
            }
        }
    }
    Ok(())
}

/// Finds the driver executable under the root and moves it to the top level.
///
/// Chrome for Testing archives nest the binary one directory down
/// (`chromedriver-linux64/chromedriver`); legacy archives put it at the top.
/// A nested hit is always the fresh extraction, so it wins over a binary
/// sitting at the root, which may be left from an earlier install.
async fn locate_and_relocate(install_root: &Path) -> Result<PathBuf, InstallerError> {
    let exe_name = driver_executable_name();

    let mut root_match = None;
    let mut nested_match = None;
    for entry in WalkDir::new(install_root) {
        let entry = entry.map_err(|error| InstallerError::Io {
            path: error
                .path()
                .unwrap_or(install_root)
                .to_path_buf(),
            source: error
                .into_io_error()
                .unwrap_or_else(|| io::Error::other("directory walk failed")),
        })?;
        if !entry.file_type().is_file()
            || entry.path().file_name().and_then(|n| n.to_str()) != Some(exe_name)
        {
            continue;
        }
        if entry.path().parent() == Some(install_root) {
            root_match = Some(entry.into_path());
        } else {
            nested_match = Some(entry.into_path());
            break;
        }
    }
    let found = nested_match
        .or(root_match)
        .ok_or_else(|| InstallerError::ExecutableNotFound {
            path: install_root.to_path_buf(),
        })?;

    let destination = install_root.join(exe_name);
    if found == destination {
        return Ok(destination);
    }

    // Replace any previous install at the destination before the move.
    match fs::remove_file(&destination).await {
        Ok(()) => {}
        Err(error) if error.kind() == io::ErrorKind::NotFound => {}
        Err(source) => {
            return Err(InstallerError::Io {
                path: destination,
                source,
            });
        }
    }
    fs::rename(&found, &destination)
        .await
        .map_err(|source| InstallerError::Io {
            path: found,
            source,
        })?;
    Ok(destination)
}

/// Removes extraction directories left under the root, keyed on the product
/// name so unrelated folders are untouched.
async fn remove_stale_directories(install_root: &Path) -> Result<(), InstallerError> {
    let io_error = |source| InstallerError::Io {
        path: install_root.to_path_buf(),
        source,
    };
    let mut entries = fs::read_dir(install_root).await.map_err(io_error)?;
    while let Some(entry) = entries.next_entry().await.map_err(io_error)? {
        let file_type = entry.file_type().await.map_err(io_error)?;
        if !file_type.is_dir() {
            continue;
        }
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if name.to_ascii_lowercase().contains("chromedriver") {
            fs::remove_dir_all(entry.path())
                .await
                .map_err(|source| InstallerError::Io {
                    path: entry.path(),
                    source,
                })?;
        }
    }
    Ok(())
}

/// Runs the installed driver with `--version` and returns its banner line.
pub async fn verify_driver(driver_path: &Path) -> Result<String, InstallerError> {
    let mut command = tokio::process::Command::new(driver_path);
    command.arg("--version");
    let rendered = format!("{:?}", command.as_std());

    let output = command
        .output()
        .await
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
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn build_archive(path: &Path, entries: &[(&str, &[u8])]) {
        let file = std::fs::File::create(path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        let options = SimpleFileOptions::default();
        for (name, contents) in entries {
            if name.ends_with('/') {
                writer.add_directory(name.trim_end_matches('/'), options).unwrap();
            } else {
                writer.start_file(*name, options).unwrap();
                writer.write_all(contents).unwrap();
            }
        }
        writer.finish().unwrap();
    }

    #[cfg(unix)]
    fn mode_of(path: &Path) -> u32 {
        use std::os::unix::fs::PermissionsExt;
        std::fs::metadata(path).unwrap().permissions().mode() & 0o777
    }

    #[tokio::test]
    async fn installs_a_nested_executable_at_the_root() {
        let workdir = tempfile::tempdir().unwrap();
        let install_root = workdir.path().join("drivers");
        std::fs::create_dir_all(&install_root).unwrap();

        let archive = workdir.path().join("download.zip");
        let nested = format!("chromedriver-linux64/{}", driver_executable_name());
        build_archive(
            &archive,
            &[
                ("chromedriver-linux64/", b""),
                (&nested, b"driver binary"),
                ("chromedriver-linux64/LICENSE.chromedriver", b"license"),
            ],
        );

        let installed = install_from_archive(&archive, &install_root).await.unwrap();

        let expected = dunce::canonicalize(&install_root)
            .unwrap()
            .join(driver_executable_name());
        assert_eq!(installed, expected);
        assert!(installed.is_file());
        // The nested extraction directory is pruned.
        assert!(!install_root.join("chromedriver-linux64").exists());
        #[cfg(unix)]
        assert_eq!(mode_of(&installed), 0o755);
    }

    #[tokio::test]
    async fn installs_a_top_level_executable_in_place() {
        let workdir = tempfile::tempdir().unwrap();
        let install_root = workdir.path().join("drivers");
        std::fs::create_dir_all(&install_root).unwrap();

        let archive = workdir.path().join("download.zip");
        build_archive(&archive, &[(driver_executable_name(), b"driver binary")]);

        let installed = install_from_archive(&archive, &install_root).await.unwrap();
        assert!(installed.is_file());
        assert_eq!(
            installed.file_name().and_then(|n| n.to_str()),
            Some(driver_executable_name())
        );
        #[cfg(unix)]
        assert_eq!(mode_of(&installed), 0o755);
    }

    #[tokio::test]
    async fn reports_a_missing_executable_after_extraction() {
        let workdir = tempfile::tempdir().unwrap();
        let install_root = workdir.path().join("drivers");
        std::fs::create_dir_all(&install_root).unwrap();

        let archive = workdir.path().join("download.zip");
        build_archive(&archive, &[("LICENSE", b"no driver in here")]);

        let err = install_from_archive(&archive, &install_root)
            .await
            .unwrap_err();
        assert!(matches!(err, InstallerError::ExecutableNotFound { .. }));
    }

    #[tokio::test]
    async fn reinstalling_over_an_existing_driver_is_idempotent() {
        let workdir = tempfile::tempdir().unwrap();
        let install_root = workdir.path().join("drivers");
        std::fs::create_dir_all(&install_root).unwrap();

        let archive = workdir.path().join("download.zip");
        let nested = format!("chromedriver-linux64/{}", driver_executable_name());
        build_archive(&archive, &[(&nested, b"first install")]);
        let first = install_from_archive(&archive, &install_root).await.unwrap();

        build_archive(&archive, &[(&nested, b"second install")]);
        let second = install_from_archive(&archive, &install_root).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(std::fs::read(&second).unwrap(), b"second install");
        assert!(!install_root.join("chromedriver-linux64").exists());
        #[cfg(unix)]
        assert_eq!(mode_of(&second), 0o755);
    }

    #[tokio::test]
    async fn a_nested_fresh_driver_replaces_a_stale_root_binary() {
        let workdir = tempfile::tempdir().unwrap();
        let install_root = workdir.path().join("drivers");
        std::fs::create_dir_all(&install_root).unwrap();
        std::fs::write(install_root.join(driver_executable_name()), b"stale driver").unwrap();

        let archive = workdir.path().join("download.zip");
        let nested = format!("chromedriver-linux64/{}", driver_executable_name());
        build_archive(&archive, &[(&nested, b"fresh driver")]);

        let installed = install_from_archive(&archive, &install_root).await.unwrap();

        assert_eq!(std::fs::read(&installed).unwrap(), b"fresh driver");
        assert!(!install_root.join("chromedriver-linux64").exists());
    }

    #[tokio::test]
    async fn corrupt_archives_are_an_extraction_failure() {
        let workdir = tempfile::tempdir().unwrap();
        let archive = workdir.path().join("download.zip");
        std::fs::write(&archive, b"this is not a zip file").unwrap();

        let err = install_from_archive(&archive, workdir.path())
            .await
            .unwrap_err();
        assert!(matches!(err, InstallerError::Zip { .. }));
    }
}
