// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use gridcal_app::CalendarSelection;
use std::path::{Path, PathBuf};

use crate::{SELECTION_FILE_NAME, read_optional, write_private};

#[derive(Debug, Clone)]
pub struct SelectionFile {
    path: PathBuf,
}

impl SelectionFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(SELECTION_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing or unreadable files yield the default selection.
    pub fn load(&self) -> CalendarSelection {
        match self.try_load() {
            Ok(Some(selection)) => selection,
            Ok(None) => CalendarSelection::default(),
            Err(error) => {
                tracing::warn!(path = %self.path.display(), "using default selection: {error:#}");
                CalendarSelection::default()
            }
        }
    }

    pub fn try_load(&self) -> Result<Option<CalendarSelection>> {
        let Some(bytes) = read_optional(&self.path)? else {
            return Ok(None);
        };
        let selection: CalendarSelection = serde_json::from_slice(&bytes)
            .with_context(|| format!("decode {}", self.path.display()))?;
        Ok(Some(selection.normalized()))
    }

    pub fn save(&self, selection: &CalendarSelection) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(selection).context("encode calendar selection")?;
        write_private(&self.path, &bytes)
    }
}
