// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use gridcal_gcal::{DEFAULT_BASE_URL, DEFAULT_MAX_RESULTS};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_VERSION: i64 = 1;
const CONFIG_PATH_ENV: &str = "GRIDCAL_CONFIG_PATH";
const DEFAULT_CACHE_TTL_HOURS: i64 = 24;
const DEFAULT_TIMEOUT: &str = "30s";
const DEFAULT_LOG_LEVEL: &str = "info";
const TOKEN_FILE_NAME: &str = "token.json";
const LOG_FILE_NAME: &str = "gridcal.log";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub version: i64,
    #[serde(default)]
    pub storage: Storage,
    #[serde(default)]
    pub google: Google,
    #[serde(default)]
    pub log: Log,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            storage: Storage::default(),
            google: Google::default(),
            log: Log::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Storage {
    pub data_dir: Option<String>,
    pub cache_ttl_hours: Option<i64>,
}

impl Default for Storage {
    fn default() -> Self {
        Self {
            data_dir: None,
            cache_ttl_hours: Some(DEFAULT_CACHE_TTL_HOURS),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Google {
    pub base_url: Option<String>,
    pub token_path: Option<String>,
    pub timeout: Option<String>,
    pub max_results: Option<i64>,
}

impl Default for Google {
    fn default() -> Self {
        Self {
            base_url: Some(DEFAULT_BASE_URL.to_owned()),
            token_path: None,
            timeout: Some(DEFAULT_TIMEOUT.to_owned()),
            max_results: Some(i64::from(DEFAULT_MAX_RESULTS)),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Log {
    pub level: Option<String>,
    pub file: Option<String>,
}

impl Default for Log {
    fn default() -> Self {
        Self {
            level: Some(DEFAULT_LOG_LEVEL.to_owned()),
            file: None,
        }
    }
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = env::var_os(CONFIG_PATH_ENV) {
            return Ok(PathBuf::from(path));
        }

        let config_root = dirs::config_dir().ok_or_else(|| {
            anyhow!("cannot resolve config directory; set {CONFIG_PATH_ENV} to the config file")
        })?;

        let app_dir = config_root.join(gridcal_store::APP_NAME);
        fs::create_dir_all(&app_dir)
            .with_context(|| format!("create config directory {}", app_dir.display()))?;
        Ok(app_dir.join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        let value: toml::Value = toml::from_str(&raw)
            .with_context(|| format!("parse TOML config {}", path.display()))?;

        let version = value
            .get("version")
            .and_then(toml::Value::as_integer)
            .ok_or_else(|| {
                anyhow!(
                    "config file {} has no version; add `version = 1` and put values under [storage], [google], and [log]",
                    path.display()
                )
            })?;

        if version != CONFIG_VERSION {
            bail!(
                "unsupported config version {} in {}; expected version = 1",
                version,
                path.display()
            );
        }

        let config: Config = value
            .try_into()
            .with_context(|| format!("decode config {}", path.display()))?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        if let Some(data_dir) = &self.storage.data_dir {
            gridcal_store::validate_data_dir(data_dir)
                .with_context(|| format!("storage.data_dir in {}", path.display()))?;
        }

        if let Some(ttl_hours) = self.storage.cache_ttl_hours
            && ttl_hours <= 0
        {
            bail!(
                "storage.cache_ttl_hours in {} must be positive, got {}",
                path.display(),
                ttl_hours
            );
        }

        if let Some(base_url) = &self.google.base_url
            && base_url.trim().is_empty()
        {
            bail!("google.base_url in {} must not be empty", path.display());
        }

        if let Some(timeout) = &self.google.timeout {
            let parsed = parse_duration(timeout)?;
            if parsed <= Duration::ZERO {
                bail!(
                    "google.timeout in {} must be positive, got {}",
                    path.display(),
                    timeout
                );
            }
        }

        if let Some(max_results) = self.google.max_results
            && !(1..=i64::from(DEFAULT_MAX_RESULTS)).contains(&max_results)
        {
            bail!(
                "google.max_results in {} must be between 1 and {DEFAULT_MAX_RESULTS}, got {}",
                path.display(),
                max_results
            );
        }

        if let Some(level) = &self.log.level {
            crate::logging::build_filter(None, level)
                .with_context(|| format!("log.level in {}", path.display()))?;
        }

        Ok(())
    }

    pub fn data_dir(&self) -> Result<PathBuf> {
        match &self.storage.data_dir {
            Some(dir) => Ok(PathBuf::from(dir)),
            None => gridcal_store::default_data_dir(),
        }
    }

    pub fn cache_ttl(&self) -> time::Duration {
        time::Duration::hours(
            self.storage
                .cache_ttl_hours
                .unwrap_or(DEFAULT_CACHE_TTL_HOURS),
        )
    }

    pub fn google_base_url(&self) -> &str {
        self.google
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/')
    }

    pub fn token_path(&self) -> Result<PathBuf> {
        match &self.google.token_path {
            Some(path) => Ok(PathBuf::from(path)),
            None => Ok(self.data_dir()?.join(TOKEN_FILE_NAME)),
        }
    }

    pub fn google_timeout(&self) -> Result<Duration> {
        parse_duration(self.google.timeout.as_deref().unwrap_or(DEFAULT_TIMEOUT))
    }

    pub fn max_results(&self) -> u32 {
        self.google
            .max_results
            .and_then(|value| u32::try_from(value).ok())
            .unwrap_or(DEFAULT_MAX_RESULTS)
    }

    pub fn log_level(&self) -> &str {
        self.log.level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }

    pub fn log_file(&self) -> Result<PathBuf> {
        match &self.log.file {
            Some(path) => Ok(PathBuf::from(path)),
            None => Ok(self.data_dir()?.join(LOG_FILE_NAME)),
        }
    }

    pub fn example_config(path: &Path) -> String {
        format!(
            "# gridcal config\n# Place this file at: {}\n\nversion = 1\n\n[storage]\n# Optional. Default is the platform config dir (for example ~/.config/gridcal)\n# data_dir = \"/absolute/path/to/gridcal\"\ncache_ttl_hours = {}\n\n[google]\nbase_url = \"{}\"\n# Optional. Default is <data_dir>/token.json; GRIDCAL_ACCESS_TOKEN takes precedence\n# token_path = \"/absolute/path/to/token.json\"\ntimeout = \"{}\"\nmax_results = {}\n\n[log]\n# RUST_LOG takes precedence\nlevel = \"{}\"\n# Optional. Default is <data_dir>/gridcal.log\n# file = \"/absolute/path/to/gridcal.log\"\n",
            path.display(),
            DEFAULT_CACHE_TTL_HOURS,
            DEFAULT_BASE_URL,
            DEFAULT_TIMEOUT,
            DEFAULT_MAX_RESULTS,
            DEFAULT_LOG_LEVEL,
        )
    }
}

fn parse_duration(raw: &str) -> Result<Duration> {
    if let Some(value) = raw.strip_suffix("ms") {
        let millis: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        return Ok(Duration::from_millis(millis));
    }
    if let Some(value) = raw.strip_suffix('s') {
        let secs: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        return Ok(Duration::from_secs(secs));
    }
    if let Some(value) = raw.strip_suffix('m') {
        let mins: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        return Ok(Duration::from_secs(mins.saturating_mul(60)));
    }

    bail!("invalid duration {raw:?}; use one of: <N>ms, <N>s, <N>m (for example 500ms or 30s)")
}
