// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, bail};
use gridcal_app::{CalendarId, CalendarListing, EventStore, Fragment, SyncReport, aggregate};
use reqwest::StatusCode;
use reqwest::blocking::{Client as HttpClient, Response};
use reqwest::header::RETRY_AFTER;
use serde::de::DeserializeOwned;
use std::time::Duration;
use time::format_description::well_known::Rfc3339;
use time::{Date, Month, Time, UtcOffset};
use url::Url;

use crate::error::GcalError;
use crate::types::{ApiCalendar, CalendarListResponse, EventListResponse, GoogleErrorEnvelope};

pub const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/calendar/v3";
pub const DEFAULT_MAX_RESULTS: u32 = 2500;
const MAX_PAGES: usize = 64;

/// Blocking Calendar v3 client. Cheap to clone; sync threads take their own copy.
#[derive(Debug, Clone)]
pub struct Client {
    base_url: Url,
    access_token: String,
    max_results: u32,
    offset: UtcOffset,
    http: HttpClient,
}

impl Client {
    pub fn new(base_url: &str, access_token: &str, timeout: Duration) -> Result<Self> {
        let trimmed = base_url.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            bail!("google.base_url must not be empty");
        }
        let base_url =
            Url::parse(trimmed).with_context(|| format!("parse google.base_url {trimmed:?}"))?;
        if base_url.cannot_be_a_base() {
            bail!("google.base_url {trimmed:?} cannot carry a path");
        }
        if access_token.trim().is_empty() {
            bail!("access token must not be empty");
        }

        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .context("build HTTP client")?;

        Ok(Self {
            base_url,
            access_token: access_token.trim().to_owned(),
            max_results: DEFAULT_MAX_RESULTS,
            offset: UtcOffset::UTC,
            http,
        })
    }

    pub fn with_max_results(mut self, max_results: u32) -> Self {
        self.max_results = max_results.max(1);
        self
    }

    /// Offset used for the year window sent to the server. Defaults to UTC;
    /// resolve the local offset before spawning threads and pass it here.
    pub fn with_offset(mut self, offset: UtcOffset) -> Self {
        self.offset = offset;
        self
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    pub fn list_calendars(&self) -> Result<Vec<CalendarListing>, GcalError> {
        let mut listing = Vec::new();
        let mut page_token: Option<String> = None;
        for _ in 0..MAX_PAGES {
            let mut url = self.endpoint(&["users", "me", "calendarList"]);
            if let Some(token) = &page_token {
                url.query_pairs_mut().append_pair("pageToken", token);
            }
            let page: CalendarListResponse = self.get_json(url, "calendar list", None)?;
            listing.extend(page.items.into_iter().map(|entry| entry.into_listing()));
            page_token = page.next_page_token.filter(|token| !token.is_empty());
            if page_token.is_none() {
                break;
            }
        }
        tracing::debug!(calendars = listing.len(), "listed calendars");
        Ok(listing)
    }

    pub fn calendar_name(&self, calendar_id: &CalendarId) -> Result<String, GcalError> {
        let url = self.endpoint(&["calendars", calendar_id.as_str()]);
        let calendar: ApiCalendar = self.get_json(url, "calendar", Some(calendar_id))?;
        Ok(calendar.summary)
    }

    /// All events of one calendar that start inside `year`, following pages.
    pub fn fetch_calendar_year(
        &self,
        calendar_id: &CalendarId,
        calendar_name: &str,
        year: i32,
    ) -> Result<EventStore, GcalError> {
        let (time_min, time_max) = self.year_window(year)?;
        let mut store = EventStore::new(year);
        let mut skipped = 0usize;
        let mut page_token: Option<String> = None;

        for _ in 0..MAX_PAGES {
            let mut url = self.endpoint(&["calendars", calendar_id.as_str(), "events"]);
            {
                let mut query = url.query_pairs_mut();
                query
                    .append_pair("timeMin", &time_min)
                    .append_pair("timeMax", &time_max)
                    .append_pair("singleEvents", "true")
                    .append_pair("orderBy", "startTime")
                    .append_pair("showDeleted", "false")
                    .append_pair("maxResults", &self.max_results.to_string());
                if let Some(token) = &page_token {
                    query.append_pair("pageToken", token);
                }
            }

            let page: EventListResponse = self.get_json(url, "event list", Some(calendar_id))?;
            for item in page.items {
                match item.into_event(calendar_id, calendar_name) {
                    Some(event) => {
                        if !store.insert(event) {
                            skipped += 1;
                        }
                    }
                    None => skipped += 1,
                }
            }

            page_token = page.next_page_token.filter(|token| !token.is_empty());
            if page_token.is_none() {
                break;
            }
        }

        if skipped > 0 {
            tracing::debug!(calendar = %calendar_id, skipped, "skipped unusable events");
        }
        Ok(store)
    }

    /// Fetches every calendar in turn and aggregates the fragments. Fails
    /// only when all calendars fail.
    pub fn fetch_year(&self, calendar_ids: &[CalendarId], year: i32) -> Result<SyncReport> {
        if calendar_ids.is_empty() {
            return aggregate(year, Vec::new());
        }
        if let Err(error) = self.year_window(year) {
            bail!(error.user_message());
        }

        let fragments = calendar_ids
            .iter()
            .map(|calendar_id| {
                let calendar_name = match self.calendar_name(calendar_id) {
                    Ok(name) if !name.trim().is_empty() => name,
                    Ok(_) => calendar_id.to_string(),
                    Err(error) => {
                        tracing::debug!(calendar = %calendar_id, %error, "calendar name lookup failed");
                        calendar_id.to_string()
                    }
                };
                let outcome = self
                    .fetch_calendar_year(calendar_id, &calendar_name, year)
                    .map_err(|error| {
                        tracing::warn!(calendar = %calendar_id, %error, "calendar fetch failed");
                        error.user_message()
                    });
                Fragment {
                    calendar_id: calendar_id.clone(),
                    calendar_name,
                    outcome,
                }
            })
            .collect();

        aggregate(year, fragments)
    }

    fn year_window(&self, year: i32) -> Result<(String, String), GcalError> {
        let out_of_range = || GcalError::YearOutOfRange(year);
        if !(0..=9999).contains(&year) {
            return Err(out_of_range());
        }
        let first = Date::from_calendar_date(year, Month::January, 1).map_err(|_| out_of_range())?;
        let last = Date::from_calendar_date(year, Month::December, 31).map_err(|_| out_of_range())?;
        let end_of_day = Time::from_hms(23, 59, 59).map_err(|_| out_of_range())?;

        let time_min = first
            .midnight()
            .assume_offset(self.offset)
            .format(&Rfc3339)
            .map_err(|_| out_of_range())?;
        let time_max = last
            .with_time(end_of_day)
            .assume_offset(self.offset)
            .format(&Rfc3339)
            .map_err(|_| out_of_range())?;
        Ok((time_min, time_max))
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        what: &'static str,
        calendar_id: Option<&CalendarId>,
    ) -> Result<T, GcalError> {
        let response = self
            .http
            .get(url)
            .bearer_auth(&self.access_token)
            .send()
            .map_err(|source| GcalError::Network {
                base_url: self.base_url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(error_for_response(response, calendar_id));
        }

        let body = response.text().map_err(|source| GcalError::Network {
            base_url: self.base_url.to_string(),
            source,
        })?;
        serde_json::from_str(&body).map_err(|error| GcalError::Decode {
            what,
            message: error.to_string(),
        })
    }
}

fn error_for_response(response: Response, calendar_id: Option<&CalendarId>) -> GcalError {
    let status = response.status();
    let retry_after = response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok());
    let body = response.text().unwrap_or_default();
    clean_error_response(status, &body, retry_after, calendar_id)
}

fn clean_error_response(
    status: StatusCode,
    body: &str,
    retry_after: Option<u64>,
    calendar_id: Option<&CalendarId>,
) -> GcalError {
    let parsed = serde_json::from_str::<GoogleErrorEnvelope>(body)
        .ok()
        .and_then(|envelope| envelope.error);
    let rate_limited = parsed.as_ref().is_some_and(|error| {
        error
            .errors
            .iter()
            .any(|detail| matches!(detail.reason.as_str(), "rateLimitExceeded" | "userRateLimitExceeded"))
    });
    let message = match parsed {
        Some(error) if !error.message.is_empty() => error.message,
        _ if body.len() < 100 && !body.contains('{') && !body.trim().is_empty() => {
            body.trim().to_owned()
        }
        _ => status
            .canonical_reason()
            .unwrap_or("unexpected response")
            .to_owned(),
    };

    match status {
        StatusCode::UNAUTHORIZED => GcalError::AuthRequired,
        StatusCode::TOO_MANY_REQUESTS => GcalError::RateLimited { retry_after },
        StatusCode::FORBIDDEN if rate_limited => GcalError::RateLimited { retry_after },
        StatusCode::FORBIDDEN => GcalError::Forbidden(message),
        StatusCode::NOT_FOUND => match calendar_id {
            Some(id) => GcalError::CalendarNotFound(id.to_string()),
            None => GcalError::Status {
                status: status.as_u16(),
                message,
            },
        },
        _ => GcalError::Status {
            status: status.as_u16(),
            message,
        },
    }
}
