// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Wire shapes for the Calendar v3 REST API.

use gridcal_app::{CalendarId, CalendarListing, Event};
use serde::Deserialize;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ApiEvent {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub color_id: String,
    pub start: Option<ApiEventTime>,
    pub end: Option<ApiEventTime>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ApiEventTime {
    pub date_time: Option<String>,
    pub date: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct EventListResponse {
    #[serde(default)]
    pub items: Vec<ApiEvent>,
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CalendarListResponse {
    #[serde(default)]
    pub items: Vec<ApiCalendarListEntry>,
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ApiCalendarListEntry {
    pub id: String,
    #[serde(default)]
    pub summary: String,
    pub summary_override: Option<String>,
    #[serde(default)]
    pub primary: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiCalendar {
    #[serde(default)]
    pub summary: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GoogleErrorEnvelope {
    pub error: Option<GoogleErrorBody>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GoogleErrorBody {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub errors: Vec<GoogleErrorDetail>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GoogleErrorDetail {
    #[serde(default)]
    pub reason: String,
}

impl ApiCalendarListEntry {
    pub fn into_listing(self) -> CalendarListing {
        let display_name = self
            .summary_override
            .filter(|name| !name.trim().is_empty())
            .or_else(|| Some(self.summary).filter(|name| !name.trim().is_empty()))
            .unwrap_or_else(|| self.id.clone());
        CalendarListing {
            id: CalendarId::new(self.id),
            display_name,
            primary: self.primary,
        }
    }
}

/// A parsed start or end, with whether it came from an all-day `date`.
fn parse_event_time(time: &ApiEventTime) -> Option<(OffsetDateTime, bool)> {
    if let Some(value) = time.date_time.as_deref().filter(|value| !value.is_empty()) {
        return OffsetDateTime::parse(value, &Rfc3339)
            .ok()
            .map(|parsed| (parsed, false));
    }
    let value = time.date.as_deref().filter(|value| !value.is_empty())?;
    Date::parse(value, format_description!("[year]-[month]-[day]"))
        .ok()
        .map(|date| (date.midnight().assume_utc(), true))
}

impl ApiEvent {
    /// `None` for cancelled items and items whose times do not parse.
    pub fn into_event(self, calendar_id: &CalendarId, calendar_name: &str) -> Option<Event> {
        if self.status == "cancelled" {
            return None;
        }
        let (start, is_all_day) = parse_event_time(self.start.as_ref()?)?;
        let end = match &self.end {
            Some(end) => parse_event_time(end)?.0,
            None => start,
        };
        Some(Event {
            id: self.id,
            title: self.summary,
            start,
            end,
            is_all_day,
            description: self.description,
            location: self.location,
            source_calendar_id: calendar_id.clone(),
            source_calendar_name: calendar_name.to_owned(),
            color_tag: self.color_id,
        })
    }
}
