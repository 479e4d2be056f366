// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use time::OffsetDateTime;
use time::macros::format_description;

use crate::date::CalendarPosition;
use crate::ids::CalendarId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub title: String,
    #[serde(with = "time::serde::rfc3339")]
    pub start: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub end: OffsetDateTime,
    pub is_all_day: bool,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub location: String,
    pub source_calendar_id: CalendarId,
    pub source_calendar_name: String,
    #[serde(default)]
    pub color_tag: String,
}

impl Event {
    /// Day the event starts on, in the offset it was delivered with.
    pub fn start_position(&self) -> CalendarPosition {
        CalendarPosition::from_date(self.start.date())
    }

    pub fn time_range_label(&self) -> String {
        if self.is_all_day {
            return "all day".to_owned();
        }
        let clock = format_description!("[hour]:[minute]");
        let start = self.start.format(&clock).unwrap_or_default();
        let end = self.end.format(&clock).unwrap_or_default();
        format!("{start} - {end}")
    }

    /// Calendar label for display; `None` when the name adds nothing over the id.
    pub fn calendar_label(&self) -> Option<&str> {
        let name = self.source_calendar_name.trim();
        if name.is_empty() || name == self.source_calendar_id.as_str() {
            None
        } else {
            Some(name)
        }
    }
}

/// One year of events, bucketed by month then day-of-month. Buckets keep
/// arrival order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventStore {
    year: i32,
    months: BTreeMap<u8, BTreeMap<u8, Vec<Event>>>,
}

impl EventStore {
    pub fn new(year: i32) -> Self {
        Self {
            year,
            months: BTreeMap::new(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    /// Appends `event` to the bucket of its start date. Returns `false` and
    /// drops the event when it starts outside this store's year.
    pub fn insert(&mut self, event: Event) -> bool {
        let position = event.start_position();
        if position.year != self.year {
            return false;
        }
        self.months
            .entry(position.month)
            .or_default()
            .entry(position.day)
            .or_default()
            .push(event);
        true
    }

    pub fn extend(&mut self, events: impl IntoIterator<Item = Event>) -> usize {
        events
            .into_iter()
            .map(|event| self.insert(event))
            .filter(|inserted| *inserted)
            .count()
    }

    pub fn events_on(&self, month: u8, day: u8) -> &[Event] {
        self.months
            .get(&month)
            .and_then(|days| days.get(&day))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn events_at(&self, position: CalendarPosition) -> &[Event] {
        if position.year != self.year {
            return &[];
        }
        self.events_on(position.month, position.day)
    }

    pub fn has_events(&self, month: u8, day: u8) -> bool {
        !self.events_on(month, day).is_empty()
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.months
            .values()
            .all(|days| days.values().all(Vec::is_empty))
    }

    /// Events in month, day, arrival order.
    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.months
            .values()
            .flat_map(|days| days.values())
            .flatten()
    }

    pub fn into_events(self) -> impl Iterator<Item = Event> {
        self.months
            .into_values()
            .flat_map(BTreeMap::into_values)
            .flatten()
    }

    /// Rebuilds the buckets from the events themselves, dropping anything
    /// filed under the wrong day. Used on data read back from disk.
    pub fn normalized(self) -> Self {
        let mut store = Self::new(self.year);
        store.extend(self.into_events());
        store
    }
}

/// Result of reading the disk cache for one year.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedEvents {
    pub store: EventStore,
    pub fresh: bool,
}

/// Events fetched from a single calendar for one year.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub calendar_id: CalendarId,
    pub calendar_name: String,
    pub outcome: std::result::Result<EventStore, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarFailure {
    pub calendar_id: CalendarId,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub store: EventStore,
    pub failed: Vec<CalendarFailure>,
    pub calendar_count: usize,
}

impl SyncReport {
    pub fn is_partial(&self) -> bool {
        !self.failed.is_empty()
    }

    pub fn summary(&self) -> String {
        let events = self.store.len();
        let noun = if events == 1 { "event" } else { "events" };
        if self.is_partial() {
            format!(
                "synced {events} {noun}; {} of {} calendars failed",
                self.failed.len(),
                self.calendar_count
            )
        } else {
            format!("synced {events} {noun}")
        }
    }
}

/// Merges per-calendar fragments into one store for `year`.
///
/// Buckets are concatenated in fragment order with no deduplication, so an
/// event shared by two calendars shows up twice. Failed fragments contribute
/// nothing; the call only errors when every fragment failed.
pub fn aggregate(year: i32, fragments: Vec<Fragment>) -> Result<SyncReport> {
    let calendar_count = fragments.len();
    let mut store = EventStore::new(year);
    let mut failed = Vec::new();

    for fragment in fragments {
        match fragment.outcome {
            Ok(events) => {
                let dropped = events.len() - store.extend(events.into_events());
                if dropped > 0 {
                    tracing::debug!(
                        calendar = %fragment.calendar_id,
                        dropped,
                        "dropped events outside {year}"
                    );
                }
            }
            Err(error) => failed.push(CalendarFailure {
                calendar_id: fragment.calendar_id,
                error,
            }),
        }
    }

    if calendar_count > 0 && failed.len() == calendar_count {
        let first = failed
            .first()
            .map(|failure| format!("{}: {}", failure.calendar_id, failure.error))
            .unwrap_or_default();
        if calendar_count == 1 {
            bail!("{first}");
        }
        bail!("all {calendar_count} calendars failed ({first})");
    }

    Ok(SyncReport {
        store,
        failed,
        calendar_count,
    })
}
