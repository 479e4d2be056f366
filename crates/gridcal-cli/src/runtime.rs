// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow};
use gridcal_app::{
    CachedEvents, CalendarId, CalendarListing, CalendarSelection, EventStore, InFlightSync,
    SYNC_UNAVAILABLE, SyncCompletion, SyncReport,
};
use gridcal_gcal::Client;
use gridcal_store::{EventCache, SelectionFile};
use gridcal_tui::InternalEvent;
use std::sync::mpsc::Sender;
use std::thread;
use time::OffsetDateTime;

pub struct GcalRuntime {
    cache: EventCache,
    selection: SelectionFile,
    client: Option<Client>,
}

impl GcalRuntime {
    pub fn new(cache: EventCache, selection: SelectionFile, client: Option<Client>) -> Self {
        Self {
            cache,
            selection,
            client,
        }
    }

    fn client(&self) -> Result<&Client> {
        self.client.as_ref().ok_or_else(|| anyhow!(SYNC_UNAVAILABLE))
    }
}

impl gridcal_tui::AppRuntime for GcalRuntime {
    fn load_cached_events(&mut self, year: i32) -> Option<CachedEvents> {
        self.cache.load(year, OffsetDateTime::now_utc())
    }

    fn save_cached_events(&mut self, store: &EventStore) -> Result<()> {
        self.cache.save(store, OffsetDateTime::now_utc())
    }

    fn clear_cached_events(&mut self) -> Result<()> {
        self.cache.clear()
    }

    fn save_selection(&mut self, selection: &CalendarSelection) -> Result<()> {
        self.selection.save(selection)
    }

    fn list_calendars(&mut self) -> Result<Vec<CalendarListing>> {
        Ok(self.client()?.list_calendars().context("list calendars")?)
    }

    fn fetch_year(&mut self, calendar_ids: &[CalendarId], year: i32) -> Result<SyncReport> {
        self.client()?.fetch_year(calendar_ids, year)
    }

    fn spawn_sync(&mut self, request: &InFlightSync, tx: Sender<InternalEvent>) -> Result<()> {
        let client = self.client()?.clone();
        let request = request.clone();
        thread::Builder::new()
            .name("gridcal-sync".to_owned())
            .spawn(move || {
                tracing::debug!(
                    year = request.year,
                    calendars = request.calendar_ids.len(),
                    "sync started"
                );
                let result = client
                    .fetch_year(&request.calendar_ids, request.year)
                    .map_err(|error| format!("{error:#}"));
                if let Err(error) = &result {
                    tracing::warn!(year = request.year, %error, "sync failed");
                }
                // The UI may have exited; nothing to report to.
                let _ = tx.send(InternalEvent::SyncFinished(SyncCompletion::for_request(
                    &request, result,
                )));
            })
            .context("spawn sync thread")?;
        Ok(())
    }
}
