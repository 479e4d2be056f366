// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::date::{self, CalendarPosition};
use crate::events::{CachedEvents, EventStore, SyncReport};
use crate::ids::{CalendarId, SyncRequestId};
use crate::picker::{PickerCommit, PickerInput, PickerKind, PickerOutcome, PickerState};
use crate::selection::{
    CalendarListing, CalendarSelection, SelectionInput, SelectionOutcome, SelectionView,
};

pub const SYNC_UNAVAILABLE: &str = "sync unavailable";

/// The single overlay that currently owns keystrokes, if any.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Modal {
    #[default]
    None,
    Picker(PickerState),
    CalendarSelection(SelectionView),
    /// Events are read from the store for this day when drawn.
    EventDetail(CalendarPosition),
    Help,
}

impl Modal {
    pub fn picker_kind(&self) -> Option<PickerKind> {
        match self {
            Self::Picker(picker) => Some(picker.kind()),
            _ => None,
        }
    }
}

/// Where the events on screen came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    Empty,
    Cache { fresh: bool },
    Sync,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InFlightSync {
    pub request_id: SyncRequestId,
    pub year: i32,
    pub calendar_ids: Vec<CalendarId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncCompletion {
    pub request_id: SyncRequestId,
    pub year: i32,
    pub calendar_ids: Vec<CalendarId>,
    pub result: Result<SyncReport, String>,
}

impl SyncCompletion {
    pub fn for_request(request: &InFlightSync, result: Result<SyncReport, String>) -> Self {
        Self {
            request_id: request.request_id,
            year: request.year,
            calendar_ids: request.calendar_ids.clone(),
            result,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppState {
    pub position: CalendarPosition,
    pub store: EventStore,
    pub source: DataSource,
    pub selection: CalendarSelection,
    pub modal: Modal,
    pub in_flight: Option<InFlightSync>,
    pub sync_error: Option<String>,
    pub credential_error: Option<String>,
    pub status_line: Option<String>,
    next_request_id: SyncRequestId,
}

impl AppState {
    pub fn new(today: CalendarPosition, selection: CalendarSelection) -> Self {
        let position = date::clamp(today);
        Self {
            position,
            store: EventStore::new(position.year),
            source: DataSource::Empty,
            selection,
            modal: Modal::None,
            in_flight: None,
            sync_error: None,
            credential_error: None,
            status_line: None,
            next_request_id: SyncRequestId::new(1),
        }
    }

    pub fn is_syncing(&self) -> bool {
        self.in_flight.is_some()
    }

    /// True when the cursor sits in a different year than the loaded events.
    pub fn needs_year_load(&self) -> bool {
        self.position.year != self.store.year()
    }

    /// Persistent error for the footer; sync failures win over credentials.
    pub fn error_line(&self) -> Option<&str> {
        self.sync_error
            .as_deref()
            .or(self.credential_error.as_deref())
    }

    pub fn selected_day_events(&self) -> &[crate::Event] {
        self.store.events_at(self.position)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    StepDay(i64),
    StepMonth(i32),
    StepYear(i32),
    JumpTo(CalendarPosition),
    TogglePicker(PickerKind),
    Picker(PickerInput),
    OpenEventDetail,
    OpenHelp,
    CloseOverlay,
    OpenCalendarSelection(Vec<CalendarListing>),
    Selection(SelectionInput),
    SetStatus(String),
    ClearStatus,
    SetCredentialError(String),
    /// Cache hit for the year under the cursor.
    AdoptCachedStore(CachedEvents),
    /// Cache miss: show an empty year and fetch it.
    ResetStore(i32),
    BeginSync,
    FinishSync(SyncCompletion),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    PositionChanged(CalendarPosition),
    ModalChanged,
    StatusUpdated(String),
    StatusCleared,
    /// The runtime should launch this sync.
    SyncStarted(InFlightSync),
    /// `state.store` holds fresh sync data that should be persisted.
    SyncApplied { year: i32 },
    SyncFailed(String),
    SyncDiscarded(SyncRequestId),
    /// The new selection should be persisted and the disk cache cleared.
    SelectionApplied(CalendarSelection),
    StoreReplaced { year: i32 },
}

impl AppState {
    pub fn dispatch(&mut self, command: AppCommand) -> Vec<AppEvent> {
        let before = self.position;
        let mut events = match command {
            AppCommand::StepDay(delta) => {
                self.position = date::step_day(self.position, delta);
                Vec::new()
            }
            AppCommand::StepMonth(delta) => {
                self.position = date::step_month(self.position, delta);
                Vec::new()
            }
            AppCommand::StepYear(delta) => {
                self.position = date::step_year(self.position, delta);
                Vec::new()
            }
            AppCommand::JumpTo(position) => {
                self.position = position;
                Vec::new()
            }
            AppCommand::TogglePicker(kind) => self.toggle_picker(kind),
            AppCommand::Picker(input) => self.picker_input(input),
            AppCommand::OpenEventDetail => self.open_event_detail(),
            AppCommand::OpenHelp => {
                self.modal = Modal::Help;
                vec![AppEvent::ModalChanged]
            }
            AppCommand::CloseOverlay => {
                self.modal = Modal::None;
                vec![AppEvent::ModalChanged]
            }
            AppCommand::OpenCalendarSelection(listing) => {
                self.modal = Modal::CalendarSelection(SelectionView::open(listing, &self.selection));
                vec![AppEvent::ModalChanged]
            }
            AppCommand::Selection(input) => self.selection_input(input),
            AppCommand::SetStatus(message) => vec![self.set_status(message)],
            AppCommand::ClearStatus => {
                self.status_line = None;
                vec![AppEvent::StatusCleared]
            }
            AppCommand::SetCredentialError(message) => {
                self.credential_error = Some(message);
                Vec::new()
            }
            AppCommand::AdoptCachedStore(cached) => self.adopt_cached(cached),
            AppCommand::ResetStore(year) => {
                self.store = EventStore::new(year);
                self.source = DataSource::Empty;
                let mut events = vec![AppEvent::StoreReplaced { year }];
                events.extend(self.begin_sync(false));
                events
            }
            AppCommand::BeginSync => self.begin_sync(true),
            AppCommand::FinishSync(completion) => self.finish_sync(completion),
        };

        self.position = date::clamp(self.position);
        if self.position != before {
            tracing::debug!(position = %self.position, "position changed");
            events.insert(0, AppEvent::PositionChanged(self.position));
        }
        events
    }

    fn toggle_picker(&mut self, kind: PickerKind) -> Vec<AppEvent> {
        if self.modal.picker_kind() == Some(kind) {
            self.modal = Modal::None;
        } else {
            self.modal = Modal::Picker(match kind {
                PickerKind::Year => PickerState::open_year(self.position.year),
                PickerKind::Month => PickerState::open_month(self.position.month),
            });
        }
        vec![AppEvent::ModalChanged]
    }

    fn picker_input(&mut self, input: PickerInput) -> Vec<AppEvent> {
        let Modal::Picker(picker) = &mut self.modal else {
            return Vec::new();
        };
        match picker.apply(input) {
            PickerOutcome::Open => Vec::new(),
            PickerOutcome::Closed => {
                self.modal = Modal::None;
                vec![AppEvent::ModalChanged]
            }
            PickerOutcome::Committed(commit) => {
                match commit {
                    PickerCommit::Year(year) => self.position.year = year,
                    PickerCommit::Month(month) => self.position.month = month,
                }
                self.modal = Modal::None;
                vec![AppEvent::ModalChanged]
            }
        }
    }

    fn open_event_detail(&mut self) -> Vec<AppEvent> {
        if self.selected_day_events().is_empty() {
            return vec![self.set_status(format!("no events on {}", self.position))];
        }
        self.modal = Modal::EventDetail(self.position);
        vec![AppEvent::ModalChanged]
    }

    fn selection_input(&mut self, input: SelectionInput) -> Vec<AppEvent> {
        let Modal::CalendarSelection(view) = &mut self.modal else {
            return Vec::new();
        };
        match view.apply(input) {
            SelectionOutcome::Open => Vec::new(),
            SelectionOutcome::Cancelled => {
                self.modal = Modal::None;
                vec![AppEvent::ModalChanged]
            }
            SelectionOutcome::Applied(selection) => {
                self.modal = Modal::None;
                self.selection = selection.clone();
                let count = selection.ids().len();
                let noun = if count == 1 { "calendar" } else { "calendars" };
                let mut events = vec![
                    AppEvent::ModalChanged,
                    AppEvent::SelectionApplied(selection),
                    self.set_status(format!("{count} {noun} selected")),
                ];
                events.extend(self.begin_sync(false));
                events
            }
        }
    }

    fn adopt_cached(&mut self, cached: CachedEvents) -> Vec<AppEvent> {
        let year = cached.store.year();
        self.store = cached.store;
        self.source = DataSource::Cache {
            fresh: cached.fresh,
        };
        let mut events = vec![AppEvent::StoreReplaced { year }];
        if !cached.fresh {
            events.extend(self.begin_sync(false));
        }
        events
    }

    /// Starts a sync for the loaded year. A second request while one is in
    /// flight is dropped. `explicit` requests report why nothing started.
    fn begin_sync(&mut self, explicit: bool) -> Vec<AppEvent> {
        if self.in_flight.is_some() {
            if explicit {
                return vec![self.set_status("sync already running")];
            }
            return Vec::new();
        }
        if self.credential_error.is_some() {
            if explicit {
                return vec![self.set_status(SYNC_UNAVAILABLE)];
            }
            return Vec::new();
        }

        let request = InFlightSync {
            request_id: self.next_request_id,
            year: self.store.year(),
            calendar_ids: self.selection.ids().to_vec(),
        };
        self.next_request_id = self.next_request_id.next();
        tracing::info!(
            request_id = request.request_id.get(),
            year = request.year,
            calendars = request.calendar_ids.len(),
            "sync started"
        );
        self.in_flight = Some(request.clone());
        vec![AppEvent::SyncStarted(request)]
    }

    fn finish_sync(&mut self, completion: SyncCompletion) -> Vec<AppEvent> {
        let expected = self.in_flight.as_ref().map(|sync| sync.request_id);
        if expected != Some(completion.request_id) {
            tracing::debug!(
                request_id = completion.request_id.get(),
                "ignoring completion for unknown sync"
            );
            return vec![AppEvent::SyncDiscarded(completion.request_id)];
        }
        self.in_flight = None;

        let year_moved = completion.year != self.store.year();
        let selection_changed = completion.calendar_ids.as_slice() != self.selection.ids();
        if year_moved || selection_changed {
            tracing::info!(
                request_id = completion.request_id.get(),
                year = completion.year,
                loaded_year = self.store.year(),
                selection_changed,
                "discarding stale sync result"
            );
            let mut events = vec![AppEvent::SyncDiscarded(completion.request_id)];
            let needs_refresh = matches!(
                self.source,
                DataSource::Empty | DataSource::Cache { fresh: false }
            );
            if needs_refresh || selection_changed {
                events.extend(self.begin_sync(false));
            }
            return events;
        }

        match completion.result {
            Ok(report) => {
                let summary = report.summary();
                if report.is_partial() {
                    tracing::warn!(failed = ?report.failed, "partial sync");
                } else {
                    tracing::info!(events = report.store.len(), "sync finished");
                }
                let year = report.store.year();
                self.store = report.store;
                self.source = DataSource::Sync;
                self.sync_error = None;
                vec![
                    AppEvent::StoreReplaced { year },
                    AppEvent::SyncApplied { year },
                    self.set_status(summary),
                ]
            }
            Err(error) => {
                tracing::warn!(%error, "sync failed");
                let message = format!("sync failed: {error}");
                self.sync_error = Some(message.clone());
                vec![AppEvent::SyncFailed(message)]
            }
        }
    }

    fn set_status(&mut self, message: impl Into<String>) -> AppEvent {
        let message = message.into();
        self.status_line = Some(message.clone());
        AppEvent::StatusUpdated(message)
    }
}
