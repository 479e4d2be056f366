// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow};
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// A non-empty `RUST_LOG` replaces the configured level.
pub fn build_filter(env_directives: Option<&str>, level: &str) -> Result<EnvFilter> {
    let directives = match env_directives {
        Some(raw) if !raw.trim().is_empty() => raw.trim(),
        _ => level,
    };
    EnvFilter::try_new(directives).with_context(|| format!("invalid log filter {directives:?}"))
}

/// Logs go to a file. The terminal belongs to the UI.
pub fn init(level: &str, path: &Path) -> Result<()> {
    let filter = build_filter(std::env::var("RUST_LOG").ok().as_deref(), level)?;

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create log directory {}", parent.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open log file {}", path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(true)
        .try_init()
        .map_err(|error| anyhow!("install log subscriber: {error}"))
}
