// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::ids::CalendarId;

/// The calendars a sync fetches. Never empty: an empty set collapses to the
/// primary calendar alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarSelection {
    calendar_ids: Vec<CalendarId>,
}

impl Default for CalendarSelection {
    fn default() -> Self {
        Self {
            calendar_ids: vec![CalendarId::primary()],
        }
    }
}

impl CalendarSelection {
    /// Keeps first occurrences in order, drops blanks and duplicates.
    pub fn from_ids(ids: impl IntoIterator<Item = CalendarId>) -> Self {
        let mut seen = BTreeSet::new();
        let calendar_ids: Vec<_> = ids
            .into_iter()
            .filter(|id| !id.as_str().trim().is_empty())
            .filter(|id| seen.insert(id.clone()))
            .collect();
        if calendar_ids.is_empty() {
            return Self::default();
        }
        Self { calendar_ids }
    }

    pub fn ids(&self) -> &[CalendarId] {
        &self.calendar_ids
    }

    pub fn contains(&self, id: &CalendarId) -> bool {
        self.calendar_ids.contains(id)
    }

    pub fn is_default(&self) -> bool {
        self.calendar_ids.len() == 1 && self.calendar_ids[0].is_primary_alias()
    }

    /// Re-applies the non-empty and dedup rules after deserializing.
    pub fn normalized(self) -> Self {
        Self::from_ids(self.calendar_ids)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarListing {
    pub id: CalendarId,
    pub display_name: String,
    #[serde(default)]
    pub primary: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionInput {
    Up,
    Down,
    Toggle,
    Apply,
    Cancel,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionOutcome {
    Open,
    Cancelled,
    Applied(CalendarSelection),
}

/// The open calendar-selection overlay, built from a fresh listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionView {
    calendars: Vec<CalendarListing>,
    selected: BTreeSet<CalendarId>,
    cursor: usize,
}

impl SelectionView {
    pub fn open(calendars: Vec<CalendarListing>, current: &CalendarSelection) -> Self {
        let primary = calendars
            .iter()
            .find(|calendar| calendar.primary)
            .map(|calendar| calendar.id.clone());
        let selected = current
            .ids()
            .iter()
            .map(|id| match (&primary, id.is_primary_alias()) {
                (Some(primary), true) => primary.clone(),
                _ => id.clone(),
            })
            .collect();
        Self {
            calendars,
            selected,
            cursor: 0,
        }
    }

    pub fn calendars(&self) -> &[CalendarListing] {
        &self.calendars
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_selected(&self, id: &CalendarId) -> bool {
        self.selected.contains(id)
    }

    pub fn apply(&mut self, input: SelectionInput) -> SelectionOutcome {
        match input {
            SelectionInput::Up => {
                self.cursor = self.cursor.saturating_sub(1);
            }
            SelectionInput::Down => {
                if self.cursor + 1 < self.calendars.len() {
                    self.cursor += 1;
                }
            }
            SelectionInput::Toggle => {
                if let Some(calendar) = self.calendars.get(self.cursor)
                    && !self.selected.remove(&calendar.id)
                {
                    self.selected.insert(calendar.id.clone());
                }
            }
            SelectionInput::Apply => return SelectionOutcome::Applied(self.selection()),
            SelectionInput::Cancel => return SelectionOutcome::Cancelled,
        }
        SelectionOutcome::Open
    }

    /// Selected calendars in listing order. Ids missing from the listing
    /// cannot be toggled here and are dropped.
    pub fn selection(&self) -> CalendarSelection {
        CalendarSelection::from_ids(
            self.calendars
                .iter()
                .filter(|calendar| self.selected.contains(&calendar.id))
                .map(|calendar| calendar.id.clone()),
        )
    }
}
