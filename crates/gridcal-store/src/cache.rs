// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use gridcal_app::{CachedEvents, EventStore};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use time::{Duration, OffsetDateTime};

use crate::{CACHE_FILE_NAME, read_optional, write_private};

/// On-disk shape of the single cached year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheRecord {
    pub year: i32,
    pub events: EventStore,
    #[serde(with = "time::serde::rfc3339")]
    pub saved_at: OffsetDateTime,
}

/// Single-record event cache. Each save overwrites whatever year was there.
#[derive(Debug, Clone)]
pub struct EventCache {
    path: PathBuf,
    ttl: Duration,
}

impl EventCache {
    pub const DEFAULT_TTL: Duration = Duration::hours(24);

    pub fn new(path: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            path: path.into(),
            ttl,
        }
    }

    pub fn in_dir(dir: &Path, ttl: Duration) -> Self {
        Self::new(dir.join(CACHE_FILE_NAME), ttl)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The stored year when it matches `year`, stale or not. Missing,
    /// unreadable and mismatched records all come back as `None`.
    pub fn load(&self, year: i32, now: OffsetDateTime) -> Option<CachedEvents> {
        let record = match self.read_record() {
            Ok(Some(record)) => record,
            Ok(None) => return None,
            Err(error) => {
                tracing::warn!(path = %self.path.display(), "ignoring unreadable cache: {error:#}");
                return None;
            }
        };

        if record.year != year || record.events.year() != year {
            tracing::debug!(cached = record.year, requested = year, "cache year mismatch");
            return None;
        }

        let fresh = now - record.saved_at < self.ttl;
        Some(CachedEvents {
            store: record.events.normalized(),
            fresh,
        })
    }

    pub fn save(&self, store: &EventStore, now: OffsetDateTime) -> Result<()> {
        let record = CacheRecord {
            year: store.year(),
            events: store.clone(),
            saved_at: now,
        };
        let bytes = serde_json::to_vec(&record).context("encode event cache")?;
        write_private(&self.path, &bytes)?;
        tracing::debug!(year = record.year, path = %self.path.display(), "cache saved");
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(error) => Err(error).with_context(|| format!("remove {}", self.path.display())),
        }
    }

    pub fn read_record(&self) -> Result<Option<CacheRecord>> {
        let Some(bytes) = read_optional(&self.path)? else {
            return Ok(None);
        };
        let record = serde_json::from_slice(&bytes)
            .with_context(|| format!("decode {}", self.path.display()))?;
        Ok(Some(record))
    }
}
