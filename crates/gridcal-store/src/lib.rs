// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod cache;
mod selection;

pub use cache::{CacheRecord, EventCache};
pub use selection::SelectionFile;

use anyhow::{Context, Result, anyhow, bail};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const APP_NAME: &str = "gridcal";
pub const CACHE_FILE_NAME: &str = "events_cache.json";
pub const SELECTION_FILE_NAME: &str = "selection.json";
pub const DATA_DIR_ENV: &str = "GRIDCAL_DATA_DIR";

/// Directory holding the cache, selection, token and log files.
pub fn default_data_dir() -> Result<PathBuf> {
    if let Some(override_dir) = env::var_os(DATA_DIR_ENV) {
        return Ok(PathBuf::from(override_dir));
    }

    let config_root = dirs::config_dir().ok_or_else(|| {
        anyhow!("cannot resolve config directory; set {DATA_DIR_ENV} to a writable directory")
    })?;
    Ok(config_root.join(APP_NAME))
}

pub fn ensure_data_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("create data directory {}", dir.display()))
}

pub fn validate_data_dir(path: &str) -> Result<()> {
    if path.trim().is_empty() {
        bail!("data directory must not be empty");
    }

    if let Some(index) = path.find("://")
        && index > 0
    {
        let scheme = &path[..index];
        if scheme.chars().all(char::is_alphabetic) {
            bail!("data directory {path:?} looks like a URI ({scheme}://); pass a filesystem path");
        }
    }

    if path.starts_with("file:") {
        bail!("data directory {path:?} uses file: URI syntax; pass a plain filesystem path");
    }
    Ok(())
}

/// Replaces `path` wholesale: write a sibling temp file, then rename over.
fn write_private(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        ensure_data_dir(parent)?;
    }

    let mut staging = path.as_os_str().to_owned();
    staging.push(".tmp");
    let staging = PathBuf::from(staging);

    fs::write(&staging, contents).with_context(|| format!("write {}", staging.display()))?;
    set_private_permissions(&staging)?;
    fs::rename(&staging, path)
        .with_context(|| format!("replace {} with {}", path.display(), staging.display()))
}

fn set_private_permissions(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        let mut permissions = fs::metadata(path)
            .with_context(|| format!("stat {}", path.display()))?
            .permissions();
        permissions.set_mode(0o600);
        fs::set_permissions(path, permissions)
            .with_context(|| format!("set permissions on {}", path.display()))?;
    }
    Ok(())
}

/// `Ok(None)` when the file does not exist.
fn read_optional(path: &Path) -> Result<Option<Vec<u8>>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(error) => Err(error).with_context(|| format!("read {}", path.display())),
    }
}
