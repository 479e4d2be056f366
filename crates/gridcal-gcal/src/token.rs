// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;

pub const ACCESS_TOKEN_ENV: &str = "GRIDCAL_ACCESS_TOKEN";

#[derive(Debug, Deserialize)]
struct TokenFile {
    #[serde(default)]
    access_token: String,
}

/// Bearer token from `GRIDCAL_ACCESS_TOKEN`, else from an OAuth token file.
pub fn load_access_token(path: &Path) -> Result<String> {
    resolve_access_token(env::var(ACCESS_TOKEN_ENV).ok(), path)
}

pub fn resolve_access_token(env_token: Option<String>, path: &Path) -> Result<String> {
    if let Some(token) = env_token
        && !token.trim().is_empty()
    {
        return Ok(token.trim().to_owned());
    }

    let raw = fs::read_to_string(path).map_err(|error| {
        anyhow!(
            "no credentials: cannot read {} ({error}); set {ACCESS_TOKEN_ENV} or write a token file",
            path.display()
        )
    })?;
    let parsed: TokenFile =
        serde_json::from_str(&raw).with_context(|| format!("parse token file {}", path.display()))?;
    let token = parsed.access_token.trim();
    if token.is_empty() {
        bail!("token file {} has no access_token", path.display());
    }
    Ok(token.to_owned())
}
