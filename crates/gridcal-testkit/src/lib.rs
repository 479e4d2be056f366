// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use gridcal_app::{CalendarId, CalendarListing, Event, EventStore};
use std::path::PathBuf;
use time::{Date, Duration, Month, OffsetDateTime, Time};

const TITLES: [&str; 12] = [
    "Standup",
    "Dentist",
    "Team lunch",
    "1:1",
    "Planning",
    "Yoga",
    "Flight",
    "Book club",
    "Retro",
    "Haircut",
    "Parent meeting",
    "Demo day",
];

const LOCATIONS: [&str; 6] = [
    "",
    "Room 4B",
    "Main St Clinic",
    "Zoom",
    "Cafe Luna",
    "Gate 23",
];

const COLOR_TAGS: [&str; 5] = ["", "1", "5", "9", "11"];

#[derive(Debug, Clone)]
struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
        if state == 0 {
            state = 0xA409_3822_299F_31D0;
        }
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);

        let mut x = self.state;
        x ^= x >> 13;
        x ^= x << 7;
        x ^= x >> 17;
        x
    }

    fn int_n(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        (self.next_u64() % (n as u64)) as usize
    }
}

/// Seeded generator for plausible calendar events.
#[derive(Debug, Clone)]
pub struct EventFaker {
    rng: DeterministicRng,
    next_id: u64,
}

impl EventFaker {
    pub fn new(seed: u64) -> Self {
        let normalized = if seed == 0 { 1 } else { seed };
        Self {
            rng: DeterministicRng::new(normalized),
            next_id: 1,
        }
    }

    pub fn event_in_year(&mut self, year: i32, calendar: &str) -> Event {
        let day_of_year = self.rng.int_n(365) as i64;
        let hour = 7 + self.rng.int_n(12) as u8;
        let minute = [0u8, 15, 30, 45][self.rng.int_n(4)];
        let date = jan_first(year) + Duration::days(day_of_year);
        let start = date
            .with_time(Time::from_hms(hour, minute, 0).unwrap_or(Time::MIDNIGHT))
            .assume_utc();
        let mut event = timed_event(&self.next_id(), calendar, start, Duration::minutes(45));
        event.title = self.pick(&TITLES).to_owned();
        event.location = self.pick(&LOCATIONS).to_owned();
        event.color_tag = self.pick(&COLOR_TAGS).to_owned();
        event
    }

    pub fn store(&mut self, year: i32, calendar: &str, count: usize) -> EventStore {
        let mut store = EventStore::new(year);
        for _ in 0..count {
            store.insert(self.event_in_year(year, calendar));
        }
        store
    }

    fn next_id(&mut self) -> String {
        let id = format!("evt{:04}", self.next_id);
        self.next_id += 1;
        id
    }

    fn pick<'a>(&mut self, items: &'a [&'a str]) -> &'a str {
        items[self.rng.int_n(items.len())]
    }
}

fn jan_first(year: i32) -> Date {
    Date::from_calendar_date(year, Month::January, 1).unwrap_or(Date::MIN)
}

pub fn timed_event(id: &str, calendar: &str, start: OffsetDateTime, length: Duration) -> Event {
    Event {
        id: id.to_owned(),
        title: format!("Event {id}"),
        start,
        end: start + length,
        is_all_day: false,
        description: String::new(),
        location: String::new(),
        source_calendar_id: CalendarId::from(calendar),
        source_calendar_name: calendar.to_owned(),
        color_tag: String::new(),
    }
}

pub fn all_day_event(id: &str, calendar: &str, date: Date) -> Event {
    let start = date.midnight().assume_utc();
    Event {
        is_all_day: true,
        ..timed_event(id, calendar, start, Duration::days(1))
    }
}

pub fn store_with(year: i32, events: impl IntoIterator<Item = Event>) -> EventStore {
    let mut store = EventStore::new(year);
    store.extend(events);
    store
}

/// A primary calendar followed by two secondary ones.
pub fn sample_listing() -> Vec<CalendarListing> {
    vec![
        CalendarListing {
            id: "me@example.com".into(),
            display_name: "Me".to_owned(),
            primary: true,
        },
        CalendarListing {
            id: "family@group.calendar.google.com".into(),
            display_name: "Family".to_owned(),
            primary: false,
        },
        CalendarListing {
            id: "en.usa#holiday@group.v.calendar.google.com".into(),
            display_name: "Holidays in United States".to_owned(),
            primary: false,
        },
    ]
}

pub fn temp_data_dir() -> Result<(tempfile::TempDir, PathBuf)> {
    let dir = tempfile::tempdir().context("create temp dir")?;
    let data_dir = dir.path().join("gridcal");
    Ok((dir, data_dir))
}

pub fn fixture_datetime() -> &'static str {
    "2026-02-19T12:34:56Z"
}

pub fn fixture_now() -> OffsetDateTime {
    time::macros::datetime!(2026-02-19 12:34:56 UTC)
}
