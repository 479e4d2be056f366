// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Read-only Google Calendar v3 access: calendar listing and per-year event
//! fetches aggregated across the selected calendars.

mod client;
mod error;
mod token;
mod types;

pub use client::{Client, DEFAULT_BASE_URL, DEFAULT_MAX_RESULTS};
pub use error::GcalError;
pub use token::{ACCESS_TOKEN_ENV, load_access_token, resolve_access_token};
