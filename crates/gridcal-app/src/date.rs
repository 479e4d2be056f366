// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Calendar arithmetic over a `(year, month, day)` cursor.
//!
//! Month and year steps hold the day-of-month and may leave it past the end
//! of the target month; [`clamp`] pulls it back. Callers run `clamp` after
//! every transition.

use serde::{Deserialize, Serialize};
use std::fmt;
use time::{Date, Duration, Month};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CalendarPosition {
    pub year: i32,
    pub month: u8,
    pub day: u8,
}

impl CalendarPosition {
    pub const fn new(year: i32, month: u8, day: u8) -> Self {
        Self { year, month, day }
    }

    pub fn from_date(date: Date) -> Self {
        Self {
            year: date.year(),
            month: date.month() as u8,
            day: date.day(),
        }
    }

    /// `None` when the position is not a real date or lies outside the
    /// range the date library can represent.
    pub fn to_date(self) -> Option<Date> {
        let month = Month::try_from(self.month).ok()?;
        Date::from_calendar_date(self.year, month, self.day).ok()
    }

    pub fn month_name(self) -> &'static str {
        month_name(self.month)
    }
}

impl fmt::Display for CalendarPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

pub fn month_name(month: u8) -> &'static str {
    match month {
        1 => "January",
        2 => "February",
        3 => "March",
        4 => "April",
        5 => "May",
        6 => "June",
        7 => "July",
        8 => "August",
        9 => "September",
        10 => "October",
        11 => "November",
        12 => "December",
        _ => "?",
    }
}

/// Last day of `month` in `year`, taken as the day before the first of the
/// following month.
pub fn days_in_month(year: i32, month: u8) -> u8 {
    let month = month.clamp(1, 12);
    let (next_year, next_month) = if month == 12 {
        (year.saturating_add(1), 1)
    } else {
        (year, month + 1)
    };

    let via_next_month = Month::try_from(next_month)
        .ok()
        .and_then(|next| Date::from_calendar_date(next_year, next, 1).ok())
        .and_then(Date::previous_day)
        .map(Date::day);

    match via_next_month {
        Some(days) => days,
        // Outside the representable date range; same rule, computed directly.
        None => Month::try_from(month)
            .map(|month| time::util::days_in_year_month(year, month))
            .unwrap_or(31),
    }
}

pub fn clamp(pos: CalendarPosition) -> CalendarPosition {
    let month = pos.month.clamp(1, 12);
    let last = days_in_month(pos.year, month);
    CalendarPosition {
        year: pos.year,
        month,
        day: pos.day.clamp(1, last),
    }
}

pub fn step_day(pos: CalendarPosition, delta: i64) -> CalendarPosition {
    let pos = clamp(pos);
    match pos
        .to_date()
        .and_then(|date| date.checked_add(Duration::days(delta)))
    {
        Some(date) => CalendarPosition::from_date(date),
        None => step_day_by_month(pos, delta),
    }
}

/// Walks month by month for positions the date library cannot hold.
fn step_day_by_month(mut pos: CalendarPosition, delta: i64) -> CalendarPosition {
    let mut remaining = delta;
    while remaining > 0 {
        let last = days_in_month(pos.year, pos.month);
        let room = i64::from(last - pos.day);
        if remaining <= room {
            pos.day += remaining as u8;
            return pos;
        }
        if pos.year == i32::MAX && pos.month == 12 {
            pos.day = last;
            return pos;
        }
        remaining -= room + 1;
        pos = CalendarPosition {
            day: 1,
            ..step_month(pos, 1)
        };
    }
    while remaining < 0 {
        let room = u64::from(pos.day - 1);
        if remaining.unsigned_abs() <= room {
            pos.day -= remaining.unsigned_abs() as u8;
            return pos;
        }
        if pos.year == i32::MIN && pos.month == 1 {
            pos.day = 1;
            return pos;
        }
        remaining += room as i64 + 1;
        let previous = step_month(pos, -1);
        pos = CalendarPosition {
            day: days_in_month(previous.year, previous.month),
            ..previous
        };
    }
    pos
}

pub fn step_month(pos: CalendarPosition, delta: i32) -> CalendarPosition {
    let zero_based = i64::from(pos.month.clamp(1, 12)) - 1 + i64::from(delta);
    let year = i64::from(pos.year) + zero_based.div_euclid(12);
    let month = zero_based.rem_euclid(12) as u8 + 1;
    CalendarPosition {
        year: saturate_year(year),
        month,
        day: pos.day,
    }
}

pub fn step_year(pos: CalendarPosition, delta: i32) -> CalendarPosition {
    CalendarPosition {
        year: pos.year.saturating_add(delta),
        ..pos
    }
}

/// Weekday of the first of the month, 0 = Sunday through 6 = Saturday.
pub fn first_weekday_of_month(year: i32, month: u8) -> u8 {
    let month = month.clamp(1, 12);
    match CalendarPosition::new(year, month, 1).to_date() {
        Some(date) => date.weekday().number_days_from_sunday(),
        None => weekday_by_formula(year, month),
    }
}

/// Sakamoto's method; covers years past the date library's range.
fn weekday_by_formula(year: i32, month: u8) -> u8 {
    const OFFSETS: [i64; 12] = [0, 3, 2, 5, 0, 3, 5, 1, 4, 6, 2, 4];
    let mut y = i64::from(year);
    if month < 3 {
        y -= 1;
    }
    let index = usize::from(month - 1);
    let value = y + y.div_euclid(4) - y.div_euclid(100) + y.div_euclid(400) + OFFSETS[index] + 1;
    value.rem_euclid(7) as u8
}

fn saturate_year(year: i64) -> i32 {
    i32::try_from(year).unwrap_or(if year < 0 { i32::MIN } else { i32::MAX })
}
