// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use thiserror::Error;

/// Failures talking to the calendar service.
#[derive(Error, Debug)]
pub enum GcalError {
    #[error("authentication required (HTTP 401)")]
    AuthRequired,

    #[error("access denied: {0}")]
    Forbidden(String),

    #[error("rate limited{}", retry_suffix(.retry_after))]
    RateLimited { retry_after: Option<u64> },

    #[error("calendar not found: {0}")]
    CalendarNotFound(String),

    #[error("server error ({status}): {message}")]
    Status { status: u16, message: String },

    #[error("decode {what}: {message}")]
    Decode { what: &'static str, message: String },

    #[error("year {0} is outside the supported range")]
    YearOutOfRange(i32),

    #[error("cannot reach {base_url}: {source}")]
    Network {
        base_url: String,
        #[source]
        source: reqwest::Error,
    },
}

fn retry_suffix(retry_after: &Option<u64>) -> String {
    retry_after
        .map(|secs| format!(", retry after {secs}s"))
        .unwrap_or_default()
}

impl GcalError {
    /// One-line message for the status bar.
    pub fn user_message(&self) -> String {
        match self {
            Self::AuthRequired => "not signed in; refresh token.json".to_owned(),
            Self::Forbidden(_) => "access to calendar denied".to_owned(),
            Self::RateLimited {
                retry_after: Some(secs),
            } => format!("rate limited; retry in {secs}s"),
            Self::RateLimited { retry_after: None } => "rate limited; retry later".to_owned(),
            Self::CalendarNotFound(id) => format!("calendar {id} not found"),
            Self::Status { status, .. } => format!("calendar service error (HTTP {status})"),
            Self::Decode { what, .. } => format!("unexpected {what} from calendar service"),
            Self::YearOutOfRange(year) => format!("cannot sync year {year}"),
            Self::Network { .. } => "network error; check your connection".to_owned(),
        }
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, Self::AuthRequired)
    }
}
