// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod render;

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use gridcal_app::{
    AppCommand, AppEvent, AppState, CachedEvents, CalendarId, CalendarListing, CalendarPosition,
    CalendarSelection, EventStore, InFlightSync, Modal, PickerInput, PickerKind, SYNC_UNAVAILABLE,
    SelectionInput, SyncCompletion, SyncReport,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use std::collections::VecDeque;
use std::io;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;
use time::{OffsetDateTime, UtcOffset};

const STATUS_CLEAR_AFTER: Duration = Duration::from_secs(4);

/// Everything the engine needs from disk and the network.
pub trait AppRuntime {
    /// Cached events for `year`, stale or not. `None` on miss or corruption.
    fn load_cached_events(&mut self, year: i32) -> Option<CachedEvents>;
    fn save_cached_events(&mut self, store: &EventStore) -> Result<()>;
    fn clear_cached_events(&mut self) -> Result<()>;
    fn save_selection(&mut self, selection: &CalendarSelection) -> Result<()>;
    fn list_calendars(&mut self) -> Result<Vec<CalendarListing>>;
    fn fetch_year(&mut self, calendar_ids: &[CalendarId], year: i32) -> Result<SyncReport>;
    /// Runs the sync and reports back through `tx`. The default runs inline;
    /// real runtimes move the fetch onto a worker thread.
    fn spawn_sync(&mut self, request: &InFlightSync, tx: Sender<InternalEvent>) -> Result<()> {
        let result = self
            .fetch_year(&request.calendar_ids, request.year)
            .map_err(|error| format!("{error:#}"));
        tx.send(InternalEvent::SyncFinished(SyncCompletion::for_request(
            request, result,
        )))
        .map_err(|_| anyhow::anyhow!("sync event channel closed"))?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InternalEvent {
    ClearStatus { token: u64 },
    SyncFinished(SyncCompletion),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ViewData {
    status_token: u64,
    /// Offset used to resolve "today". Captured before any thread starts.
    offset: UtcOffset,
}

impl Default for ViewData {
    fn default() -> Self {
        Self {
            status_token: 0,
            offset: UtcOffset::UTC,
        }
    }
}

/// Local UTC offset, or UTC when the platform cannot tell us. Call before
/// spawning threads.
pub fn local_offset() -> UtcOffset {
    UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC)
}

pub fn today_in(offset: UtcOffset) -> CalendarPosition {
    CalendarPosition::from_date(OffsetDateTime::now_utc().to_offset(offset).date())
}

pub fn run_app<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    offset: UtcOffset,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen).context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    let mut view_data = ViewData {
        offset,
        ..ViewData::default()
    };
    let (internal_tx, internal_rx) = mpsc::channel();

    start(state, runtime, &mut view_data, &internal_tx);

    let mut result = Ok(());
    loop {
        process_internal_events(state, runtime, &mut view_data, &internal_tx, &internal_rx);

        if let Err(error) = terminal.draw(|frame| render::render(frame, state)) {
            result = Err(error).context("draw frame");
            break;
        }

        let has_event = match event::poll(Duration::from_millis(120)).context("poll event") {
            Ok(has_event) => has_event,
            Err(error) => {
                result = Err(error);
                break;
            }
        };
        if has_event {
            match event::read().context("read event") {
                Ok(Event::Key(key)) => {
                    if handle_key_event(state, runtime, &mut view_data, &internal_tx, key) {
                        break;
                    }
                }
                Ok(_) => {}
                Err(error) => {
                    result = Err(error);
                    break;
                }
            }
        }
    }

    disable_raw_mode().context("disable raw mode")?;
    execute!(io::stdout(), terminal::LeaveAlternateScreen).context("leave alternate screen")?;
    result
}

/// Loads the year under the cursor from cache and syncs when the cache is
/// missing or stale.
fn start<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    let year = state.position.year;
    load_year(state, runtime, view_data, internal_tx, year);
}

fn process_internal_events<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    rx: &Receiver<InternalEvent>,
) {
    while let Ok(event) = rx.try_recv() {
        match event {
            InternalEvent::ClearStatus { token } if token == view_data.status_token => {
                state.dispatch(AppCommand::ClearStatus);
            }
            InternalEvent::ClearStatus { .. } => {}
            InternalEvent::SyncFinished(completion) => {
                let events = state.dispatch(AppCommand::FinishSync(completion));
                apply_app_events(state, runtime, view_data, tx, events);
            }
        }
    }
}

fn schedule_status_clear(internal_tx: &Sender<InternalEvent>, token: u64) {
    let sender = internal_tx.clone();
    thread::spawn(move || {
        thread::sleep(STATUS_CLEAR_AFTER);
        let _ = sender.send(InternalEvent::ClearStatus { token });
    });
}

/// Carries out the side effects the state machine asked for. Effects may
/// feed new commands back in, so this drains a queue.
fn apply_app_events<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    events: Vec<AppEvent>,
) {
    let mut pending = VecDeque::from(events);
    while let Some(event) = pending.pop_front() {
        match event {
            AppEvent::StatusUpdated(_) => {
                view_data.status_token = view_data.status_token.saturating_add(1);
                schedule_status_clear(internal_tx, view_data.status_token);
            }
            AppEvent::SyncStarted(request) => {
                if let Err(error) = runtime.spawn_sync(&request, internal_tx.clone()) {
                    let completion =
                        SyncCompletion::for_request(&request, Err(format!("{error:#}")));
                    pending.extend(state.dispatch(AppCommand::FinishSync(completion)));
                }
            }
            AppEvent::SyncApplied { year } => {
                if let Err(error) = runtime.save_cached_events(&state.store) {
                    tracing::warn!(year, "cache write failed: {error:#}");
                }
            }
            AppEvent::SelectionApplied(selection) => {
                if let Err(error) = runtime.save_selection(&selection) {
                    tracing::warn!("selection write failed: {error:#}");
                    pending.extend(state.dispatch(AppCommand::SetStatus(format!(
                        "save selection failed: {error:#}"
                    ))));
                }
                if let Err(error) = runtime.clear_cached_events() {
                    tracing::warn!("cache clear failed: {error:#}");
                }
            }
            AppEvent::PositionChanged(_)
            | AppEvent::ModalChanged
            | AppEvent::StatusCleared
            | AppEvent::SyncFailed(_)
            | AppEvent::SyncDiscarded(_)
            | AppEvent::StoreReplaced { .. } => {}
        }
    }
}

/// Swaps in the events for `year`: cached data when there is any, else an
/// empty store and a sync.
fn load_year<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    year: i32,
) {
    let events = match runtime.load_cached_events(year) {
        Some(cached) => {
            tracing::debug!(year, fresh = cached.fresh, "cache hit");
            state.dispatch(AppCommand::AdoptCachedStore(cached))
        }
        None => {
            tracing::debug!(year, "cache miss");
            state.dispatch(AppCommand::ResetStore(year))
        }
    };
    apply_app_events(state, runtime, view_data, internal_tx, events);
}

fn ensure_year_loaded<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    if state.needs_year_load() {
        let year = state.position.year;
        load_year(state, runtime, view_data, internal_tx, year);
    }
}

enum NavAction {
    Quit,
    Today,
    Calendars,
    Dispatch(AppCommand),
}

fn nav_action_for_key(key: KeyEvent) -> Option<NavAction> {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return None;
    }
    let command = match key.code {
        KeyCode::Char('q') | KeyCode::Esc => return Some(NavAction::Quit),
        KeyCode::Char('t' | 'T') => return Some(NavAction::Today),
        KeyCode::Char('c' | 'C') => return Some(NavAction::Calendars),
        KeyCode::Left | KeyCode::Char('h') => AppCommand::StepDay(-1),
        KeyCode::Right | KeyCode::Char('l') => AppCommand::StepDay(1),
        KeyCode::Up | KeyCode::Char('k') => AppCommand::StepDay(-7),
        KeyCode::Down | KeyCode::Char('j') => AppCommand::StepDay(7),
        KeyCode::Char('n') => AppCommand::StepMonth(1),
        KeyCode::Char('p') => AppCommand::StepMonth(-1),
        KeyCode::Char('N') => AppCommand::StepYear(1),
        KeyCode::Char('P') => AppCommand::StepYear(-1),
        KeyCode::Char('y' | 'Y') => AppCommand::TogglePicker(PickerKind::Year),
        KeyCode::Char('m' | 'M') => AppCommand::TogglePicker(PickerKind::Month),
        KeyCode::Char('s' | 'S') => AppCommand::BeginSync,
        KeyCode::Char('e' | 'E') | KeyCode::Enter => AppCommand::OpenEventDetail,
        KeyCode::Char('?') => AppCommand::OpenHelp,
        _ => return None,
    };
    Some(NavAction::Dispatch(command))
}

fn picker_command_for_key(key: KeyEvent) -> Option<AppCommand> {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('h') => Some(AppCommand::Picker(PickerInput::Backspace)),
            _ => None,
        };
    }
    let input = match key.code {
        KeyCode::Char('y' | 'Y') => return Some(AppCommand::TogglePicker(PickerKind::Year)),
        KeyCode::Char('m' | 'M') => return Some(AppCommand::TogglePicker(PickerKind::Month)),
        KeyCode::Char(ch) => PickerInput::Char(ch),
        KeyCode::Backspace => PickerInput::Backspace,
        KeyCode::Up => PickerInput::Up,
        KeyCode::Down => PickerInput::Down,
        KeyCode::PageUp => PickerInput::PageUp,
        KeyCode::PageDown => PickerInput::PageDown,
        KeyCode::Enter => PickerInput::Confirm,
        KeyCode::Esc => PickerInput::Cancel,
        _ => return None,
    };
    Some(AppCommand::Picker(input))
}

fn selection_input_for_key(key: KeyEvent) -> Option<SelectionInput> {
    match key.code {
        KeyCode::Up | KeyCode::Char('k') => Some(SelectionInput::Up),
        KeyCode::Down | KeyCode::Char('j') => Some(SelectionInput::Down),
        KeyCode::Char(' ') | KeyCode::Enter => Some(SelectionInput::Toggle),
        KeyCode::Char('a' | 'A') => Some(SelectionInput::Apply),
        KeyCode::Esc | KeyCode::Char('q' | 'c' | 'C') => Some(SelectionInput::Cancel),
        _ => None,
    }
}

fn open_calendar_selection<R: AppRuntime>(state: &mut AppState, runtime: &mut R) -> Vec<AppEvent> {
    if state.credential_error.is_some() {
        return state.dispatch(AppCommand::SetStatus(SYNC_UNAVAILABLE.to_owned()));
    }
    match runtime.list_calendars() {
        Ok(listing) => state.dispatch(AppCommand::OpenCalendarSelection(listing)),
        Err(error) => {
            tracing::warn!("calendar listing failed: {error:#}");
            Vec::new()
        }
    }
}

/// Returns true when the app should quit.
fn handle_key_event<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    if key.modifiers.contains(KeyModifiers::CONTROL)
        && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('q'))
    {
        return true;
    }

    let events = match state.modal {
        Modal::EventDetail(_) => match key.code {
            KeyCode::Esc | KeyCode::Char('e' | 'E' | 'q') => {
                state.dispatch(AppCommand::CloseOverlay)
            }
            _ => Vec::new(),
        },
        Modal::Help => match key.code {
            KeyCode::Esc | KeyCode::Char('?' | 'q') => state.dispatch(AppCommand::CloseOverlay),
            _ => Vec::new(),
        },
        Modal::CalendarSelection(_) => match selection_input_for_key(key) {
            Some(input) => state.dispatch(AppCommand::Selection(input)),
            None => Vec::new(),
        },
        Modal::Picker(_) => match picker_command_for_key(key) {
            Some(command) => state.dispatch(command),
            None => Vec::new(),
        },
        Modal::None => match nav_action_for_key(key) {
            Some(NavAction::Quit) => return true,
            Some(NavAction::Today) => {
                state.dispatch(AppCommand::JumpTo(today_in(view_data.offset)))
            }
            Some(NavAction::Calendars) => open_calendar_selection(state, runtime),
            Some(NavAction::Dispatch(command)) => state.dispatch(command),
            None => Vec::new(),
        },
    };

    apply_app_events(state, runtime, view_data, internal_tx, events);
    ensure_year_loaded(state, runtime, view_data, internal_tx);
    false
}

#[cfg(test)]
mod tests {
    use super::{
        AppRuntime, InternalEvent, ViewData, handle_key_event, nav_action_for_key,
        process_internal_events, start, today_in,
    };
    use anyhow::{Result, anyhow};
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use gridcal_app::{
        AppState, CachedEvents, CalendarId, CalendarListing, CalendarPosition, CalendarSelection,
        DataSource, EventStore, Fragment, Modal, PickerKind, SYNC_UNAVAILABLE, SyncReport,
        aggregate,
    };
    use gridcal_testkit::{sample_listing, store_with, timed_event};
    use std::collections::BTreeMap;
    use std::sync::mpsc;
    use time::{Duration, UtcOffset};

    #[derive(Debug, Default)]
    struct TestRuntime {
        cache: BTreeMap<i32, CachedEvents>,
        saved_stores: Vec<EventStore>,
        cache_clears: usize,
        saved_selections: Vec<CalendarSelection>,
        listing: Option<Vec<CalendarListing>>,
        /// Per-year remote contents. Missing years fail the fetch.
        remote: BTreeMap<i32, EventStore>,
        fetches: Vec<(Vec<CalendarId>, i32)>,
        hold_syncs: bool,
        held: Vec<super::InFlightSync>,
    }

    impl AppRuntime for TestRuntime {
        fn load_cached_events(&mut self, year: i32) -> Option<CachedEvents> {
            self.cache.get(&year).cloned()
        }

        fn save_cached_events(&mut self, store: &EventStore) -> Result<()> {
            self.saved_stores.push(store.clone());
            self.cache.insert(
                store.year(),
                CachedEvents {
                    store: store.clone(),
                    fresh: true,
                },
            );
            Ok(())
        }

        fn clear_cached_events(&mut self) -> Result<()> {
            self.cache_clears += 1;
            self.cache.clear();
            Ok(())
        }

        fn save_selection(&mut self, selection: &CalendarSelection) -> Result<()> {
            self.saved_selections.push(selection.clone());
            Ok(())
        }

        fn list_calendars(&mut self) -> Result<Vec<CalendarListing>> {
            self.listing
                .clone()
                .ok_or_else(|| anyhow!("listing unavailable"))
        }

        fn fetch_year(&mut self, calendar_ids: &[CalendarId], year: i32) -> Result<SyncReport> {
            self.fetches.push((calendar_ids.to_vec(), year));
            let store = self
                .remote
                .get(&year)
                .cloned()
                .ok_or_else(|| anyhow!("network error; check your connection"))?;
            aggregate(
                year,
                vec![Fragment {
                    calendar_id: CalendarId::primary(),
                    calendar_name: "primary".to_owned(),
                    outcome: Ok(store),
                }],
            )
        }

        fn spawn_sync(
            &mut self,
            request: &super::InFlightSync,
            tx: mpsc::Sender<InternalEvent>,
        ) -> Result<()> {
            if self.hold_syncs {
                self.held.push(request.clone());
                return Ok(());
            }
            let result = self
                .fetch_year(&request.calendar_ids, request.year)
                .map_err(|error| format!("{error:#}"));
            tx.send(InternalEvent::SyncFinished(
                gridcal_app::SyncCompletion::for_request(request, result),
            ))
            .map_err(|_| anyhow!("closed"))?;
            Ok(())
        }
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ch(c: char) -> KeyEvent {
        key(KeyCode::Char(c))
    }

    fn internal_channel() -> (
        mpsc::Sender<InternalEvent>,
        mpsc::Receiver<InternalEvent>,
    ) {
        mpsc::channel()
    }

    fn pump_internal(
        state: &mut AppState,
        runtime: &mut TestRuntime,
        view_data: &mut ViewData,
        tx: &mpsc::Sender<InternalEvent>,
        rx: &mpsc::Receiver<InternalEvent>,
    ) {
        process_internal_events(state, runtime, view_data, tx, rx);
    }

    fn run_key_script(
        state: &mut AppState,
        runtime: &mut TestRuntime,
        view_data: &mut ViewData,
        tx: &mpsc::Sender<InternalEvent>,
        rx: &mpsc::Receiver<InternalEvent>,
        keys: &[KeyEvent],
    ) {
        for key in keys {
            let _ = handle_key_event(state, runtime, view_data, tx, *key);
            pump_internal(state, runtime, view_data, tx, rx);
        }
    }

    fn state_at(year: i32, month: u8, day: u8) -> AppState {
        AppState::new(
            CalendarPosition::new(year, month, day),
            CalendarSelection::default(),
        )
    }

    fn at(year: i32, month: u8, day: u8, hour: u8) -> time::OffsetDateTime {
        time::Date::from_calendar_date(
            year,
            time::Month::try_from(month).expect("valid month"),
            day,
        )
        .expect("valid date")
        .with_hms(hour, 0, 0)
        .expect("valid time")
        .assume_utc()
    }

    #[test]
    fn fresh_start_syncs_and_detail_shows_only_that_day() {
        let today = today_in(UtcOffset::UTC);
        let mut state = AppState::new(today, CalendarSelection::default());
        let mut runtime = TestRuntime::default();
        runtime.remote.insert(
            today.year,
            store_with(
                today.year,
                [timed_event(
                    "checkup",
                    "primary",
                    at(today.year, today.month, 15, 9),
                    Duration::hours(1),
                )],
            ),
        );
        let mut view_data = ViewData::default();
        let (tx, rx) = internal_channel();

        start(&mut state, &mut runtime, &mut view_data, &tx);
        pump_internal(&mut state, &mut runtime, &mut view_data, &tx, &rx);

        assert_eq!(runtime.fetches.len(), 1);
        assert_eq!(state.source, DataSource::Sync);
        assert_eq!(state.store.len(), 1);
        assert_eq!(state.store.events_on(today.month, 15).len(), 1);
        assert_eq!(runtime.saved_stores.len(), 1);

        state.position = CalendarPosition::new(today.year, today.month, 15);
        run_key_script(&mut state, &mut runtime, &mut view_data, &tx, &rx, &[ch('e')]);
        assert_eq!(
            state.modal,
            Modal::EventDetail(CalendarPosition::new(today.year, today.month, 15))
        );
        assert_eq!(state.selected_day_events()[0].title, "Event checkup");

        run_key_script(
            &mut state,
            &mut runtime,
            &mut view_data,
            &tx,
            &rx,
            &[key(KeyCode::Esc), ch('l'), ch('e')],
        );
        assert_eq!(state.position.day, 16);
        assert_eq!(state.modal, Modal::None);
        assert!(state.selected_day_events().is_empty());
    }

    #[test]
    fn fresh_cache_at_startup_skips_sync() {
        let mut state = state_at(2026, 3, 10);
        let mut runtime = TestRuntime::default();
        runtime.cache.insert(
            2026,
            CachedEvents {
                store: store_with(
                    2026,
                    [timed_event("a", "primary", at(2026, 3, 10, 8), Duration::hours(1))],
                ),
                fresh: true,
            },
        );
        let mut view_data = ViewData::default();
        let (tx, rx) = internal_channel();

        start(&mut state, &mut runtime, &mut view_data, &tx);
        pump_internal(&mut state, &mut runtime, &mut view_data, &tx, &rx);

        assert!(runtime.fetches.is_empty());
        assert_eq!(state.source, DataSource::Cache { fresh: true });
        assert_eq!(state.selected_day_events().len(), 1);
    }

    #[test]
    fn stale_cache_is_shown_then_refreshed() {
        let mut state = state_at(2026, 3, 10);
        let mut runtime = TestRuntime::default();
        runtime.cache.insert(
            2026,
            CachedEvents {
                store: store_with(
                    2026,
                    [timed_event("old", "primary", at(2026, 3, 10, 8), Duration::hours(1))],
                ),
                fresh: false,
            },
        );
        runtime.hold_syncs = true;
        let mut view_data = ViewData::default();
        let (tx, _rx) = internal_channel();

        start(&mut state, &mut runtime, &mut view_data, &tx);
        assert!(state.is_syncing());
        assert_eq!(state.selected_day_events()[0].title, "Event old");
        assert_eq!(runtime.held.len(), 1);
    }

    #[test]
    fn credential_error_blocks_sync_and_listing() {
        let mut state = state_at(2026, 3, 10);
        state.credential_error = Some("no credentials".to_owned());
        let mut runtime = TestRuntime {
            listing: Some(sample_listing()),
            ..TestRuntime::default()
        };
        let mut view_data = ViewData::default();
        let (tx, rx) = internal_channel();

        start(&mut state, &mut runtime, &mut view_data, &tx);
        assert!(runtime.fetches.is_empty());
        assert_eq!(state.error_line(), Some("no credentials"));

        run_key_script(&mut state, &mut runtime, &mut view_data, &tx, &rx, &[ch('s')]);
        assert_eq!(state.status_line.as_deref(), Some(SYNC_UNAVAILABLE));

        state.status_line = None;
        run_key_script(&mut state, &mut runtime, &mut view_data, &tx, &rx, &[ch('c')]);
        assert_eq!(state.modal, Modal::None);
        assert_eq!(state.status_line.as_deref(), Some(SYNC_UNAVAILABLE));
    }

    #[test]
    fn navigation_keys_move_the_cursor() {
        let mut state = state_at(2026, 1, 31);
        let mut runtime = TestRuntime::default();
        runtime.cache.insert(
            2026,
            CachedEvents {
                store: EventStore::new(2026),
                fresh: true,
            },
        );
        let mut view_data = ViewData::default();
        let (tx, rx) = internal_channel();

        run_key_script(&mut state, &mut runtime, &mut view_data, &tx, &rx, &[ch('n')]);
        assert_eq!(state.position, CalendarPosition::new(2026, 2, 28));
        run_key_script(
            &mut state,
            &mut runtime,
            &mut view_data,
            &tx,
            &rx,
            &[key(KeyCode::Down), ch('l'), ch('k'), key(KeyCode::Left), ch('p')],
        );
        assert_eq!(state.position, CalendarPosition::new(2026, 1, 28));
    }

    #[test]
    fn crossing_a_year_boundary_loads_that_year() {
        let mut state = state_at(2026, 12, 31);
        let mut runtime = TestRuntime::default();
        runtime.cache.insert(
            2027,
            CachedEvents {
                store: store_with(
                    2027,
                    [timed_event("ny", "primary", at(2027, 1, 1, 0), Duration::hours(1))],
                ),
                fresh: true,
            },
        );
        let mut view_data = ViewData::default();
        let (tx, rx) = internal_channel();

        run_key_script(&mut state, &mut runtime, &mut view_data, &tx, &rx, &[ch('l')]);
        assert_eq!(state.position, CalendarPosition::new(2027, 1, 1));
        assert_eq!(state.store.year(), 2027);
        assert_eq!(state.selected_day_events().len(), 1);
        assert!(runtime.fetches.is_empty());
    }

    #[test]
    fn year_step_without_cache_clears_and_fetches() {
        let mut state = state_at(2026, 6, 1);
        state.store = store_with(
            2026,
            [timed_event("x", "primary", at(2026, 6, 1, 9), Duration::hours(1))],
        );
        let mut runtime = TestRuntime::default();
        runtime.remote.insert(2027, EventStore::new(2027));
        let mut view_data = ViewData::default();
        let (tx, rx) = internal_channel();

        run_key_script(&mut state, &mut runtime, &mut view_data, &tx, &rx, &[ch('N')]);
        assert_eq!(state.store.year(), 2027);
        assert!(state.store.is_empty());
        assert_eq!(runtime.fetches, vec![(vec![CalendarId::primary()], 2027)]);
        assert!(!state.is_syncing());
        assert_eq!(state.status_line.as_deref(), Some("synced 0 events"));
    }

    #[test]
    fn failed_sync_keeps_store_and_shows_error() {
        let mut state = state_at(2026, 6, 1);
        state.store = store_with(
            2026,
            [timed_event("x", "primary", at(2026, 6, 1, 9), Duration::hours(1))],
        );
        let mut runtime = TestRuntime::default();
        let mut view_data = ViewData::default();
        let (tx, rx) = internal_channel();

        run_key_script(&mut state, &mut runtime, &mut view_data, &tx, &rx, &[ch('s')]);
        assert_eq!(state.store.len(), 1);
        assert!(!state.is_syncing());
        assert_eq!(
            state.error_line(),
            Some("sync failed: network error; check your connection")
        );
        assert!(runtime.saved_stores.is_empty());
    }

    #[test]
    fn result_for_an_abandoned_year_is_not_applied() {
        let mut state = state_at(2026, 6, 1);
        let mut runtime = TestRuntime {
            hold_syncs: true,
            ..TestRuntime::default()
        };
        runtime.remote.insert(
            2026,
            store_with(
                2026,
                [timed_event("x", "primary", at(2026, 6, 1, 9), Duration::hours(1))],
            ),
        );
        runtime.remote.insert(2027, EventStore::new(2027));
        let mut view_data = ViewData::default();
        let (tx, rx) = internal_channel();

        run_key_script(&mut state, &mut runtime, &mut view_data, &tx, &rx, &[ch('s'), ch('N')]);
        assert_eq!(runtime.held.len(), 1);
        assert_eq!(state.store.year(), 2027);

        let request = runtime.held.remove(0);
        runtime.hold_syncs = false;
        let report = runtime
            .fetch_year(&request.calendar_ids, request.year)
            .expect("2026 fetch");
        tx.send(InternalEvent::SyncFinished(
            gridcal_app::SyncCompletion::for_request(&request, Ok(report)),
        ))
        .expect("send completion");
        pump_internal(&mut state, &mut runtime, &mut view_data, &tx, &rx);

        assert_eq!(state.store.year(), 2027);
        assert!(state.store.is_empty());
        assert!(
            runtime
                .saved_stores
                .iter()
                .all(|store| store.year() == 2027)
        );
        assert_eq!(
            runtime.fetches.last().map(|(_, year)| *year),
            Some(2027),
            "follow-up sync for the loaded year"
        );
    }

    #[test]
    fn picker_consumes_keys_until_committed() {
        let mut state = state_at(2026, 3, 31);
        let mut runtime = TestRuntime::default();
        runtime.cache.insert(
            2026,
            CachedEvents {
                store: EventStore::new(2026),
                fresh: true,
            },
        );
        let mut view_data = ViewData::default();
        let (tx, rx) = internal_channel();

        run_key_script(
            &mut state,
            &mut runtime,
            &mut view_data,
            &tx,
            &rx,
            &[ch('m'), ch('q'), ch('j'), ch('0'), ch('2')],
        );
        assert_eq!(state.modal.picker_kind(), Some(PickerKind::Month));
        assert_eq!(state.position, CalendarPosition::new(2026, 3, 31));

        run_key_script(
            &mut state,
            &mut runtime,
            &mut view_data,
            &tx,
            &rx,
            &[key(KeyCode::Enter)],
        );
        assert_eq!(state.modal, Modal::None);
        assert_eq!(state.position, CalendarPosition::new(2026, 2, 28));
    }

    #[test]
    fn year_picker_commit_loads_the_new_year() {
        let mut state = state_at(2026, 3, 1);
        let mut runtime = TestRuntime::default();
        runtime.remote.insert(1999, EventStore::new(1999));
        let mut view_data = ViewData::default();
        let (tx, rx) = internal_channel();

        let mut keys = vec![ch('y')];
        keys.extend("1999".chars().map(ch));
        keys.push(key(KeyCode::Enter));
        run_key_script(&mut state, &mut runtime, &mut view_data, &tx, &rx, &keys);

        assert_eq!(state.position.year, 1999);
        assert_eq!(state.store.year(), 1999);
        assert_eq!(runtime.fetches.last().map(|(_, year)| *year), Some(1999));
    }

    #[test]
    fn picker_switches_kind_and_escape_cancels() {
        let mut state = state_at(2026, 3, 1);
        let mut runtime = TestRuntime::default();
        let mut view_data = ViewData::default();
        let (tx, rx) = internal_channel();

        run_key_script(&mut state, &mut runtime, &mut view_data, &tx, &rx, &[ch('y'), ch('M')]);
        assert_eq!(state.modal.picker_kind(), Some(PickerKind::Month));
        run_key_script(
            &mut state,
            &mut runtime,
            &mut view_data,
            &tx,
            &rx,
            &[key(KeyCode::Down), key(KeyCode::Esc)],
        );
        assert_eq!(state.modal, Modal::None);
        assert_eq!(state.position, CalendarPosition::new(2026, 3, 1));
    }

    #[test]
    fn calendar_selection_apply_persists_and_resyncs() {
        let mut state = state_at(2026, 3, 1);
        state.source = DataSource::Cache { fresh: true };
        let mut runtime = TestRuntime {
            listing: Some(sample_listing()),
            ..TestRuntime::default()
        };
        runtime.remote.insert(2026, EventStore::new(2026));
        let mut view_data = ViewData::default();
        let (tx, rx) = internal_channel();

        run_key_script(
            &mut state,
            &mut runtime,
            &mut view_data,
            &tx,
            &rx,
            &[ch('c'), ch('j'), ch(' '), ch('a')],
        );

        let expected = CalendarSelection::from_ids(
            ["me@example.com", "family@group.calendar.google.com"].map(CalendarId::from),
        );
        assert_eq!(state.modal, Modal::None);
        assert_eq!(state.selection, expected);
        assert_eq!(runtime.saved_selections, vec![expected.clone()]);
        assert_eq!(runtime.cache_clears, 1);
        assert_eq!(
            runtime.fetches.last(),
            Some(&(expected.ids().to_vec(), 2026))
        );
    }

    #[test]
    fn calendar_selection_cancel_changes_nothing() {
        let mut state = state_at(2026, 3, 1);
        let mut runtime = TestRuntime {
            listing: Some(sample_listing()),
            ..TestRuntime::default()
        };
        let mut view_data = ViewData::default();
        let (tx, rx) = internal_channel();

        run_key_script(
            &mut state,
            &mut runtime,
            &mut view_data,
            &tx,
            &rx,
            &[ch('c'), ch(' '), ch('s'), key(KeyCode::Esc)],
        );
        assert_eq!(state.modal, Modal::None);
        assert!(state.selection.is_default());
        assert!(runtime.saved_selections.is_empty());
        assert_eq!(runtime.cache_clears, 0);
        assert!(runtime.fetches.is_empty(), "s is swallowed by the overlay");
    }

    #[test]
    fn listing_failure_leaves_selection_closed() {
        let mut state = state_at(2026, 3, 1);
        let mut runtime = TestRuntime::default();
        let mut view_data = ViewData::default();
        let (tx, rx) = internal_channel();

        run_key_script(&mut state, &mut runtime, &mut view_data, &tx, &rx, &[ch('C')]);
        assert_eq!(state.modal, Modal::None);
        assert!(state.status_line.is_none());
    }

    #[test]
    fn detail_overlay_only_closes_on_close_keys() {
        let mut state = state_at(2026, 3, 10);
        state.store = store_with(
            2026,
            [timed_event("a", "primary", at(2026, 3, 10, 8), Duration::hours(1))],
        );
        let mut runtime = TestRuntime::default();
        let mut view_data = ViewData::default();
        let (tx, rx) = internal_channel();

        run_key_script(
            &mut state,
            &mut runtime,
            &mut view_data,
            &tx,
            &rx,
            &[key(KeyCode::Enter), ch('l'), ch('n'), ch('s')],
        );
        assert!(matches!(state.modal, Modal::EventDetail(_)));
        assert_eq!(state.position, CalendarPosition::new(2026, 3, 10));
        assert!(runtime.fetches.is_empty());

        let quit = handle_key_event(&mut state, &mut runtime, &mut view_data, &tx, ch('q'));
        assert!(!quit, "q closes the overlay first");
        assert_eq!(state.modal, Modal::None);
    }

    #[test]
    fn help_toggles_with_question_mark() {
        let mut state = state_at(2026, 3, 10);
        let mut runtime = TestRuntime::default();
        let mut view_data = ViewData::default();
        let (tx, rx) = internal_channel();

        run_key_script(&mut state, &mut runtime, &mut view_data, &tx, &rx, &[ch('?')]);
        assert_eq!(state.modal, Modal::Help);
        run_key_script(&mut state, &mut runtime, &mut view_data, &tx, &rx, &[ch('?')]);
        assert_eq!(state.modal, Modal::None);
    }

    #[test]
    fn quit_keys() {
        let mut state = state_at(2026, 3, 10);
        let mut runtime = TestRuntime::default();
        let mut view_data = ViewData::default();
        let (tx, _rx) = internal_channel();

        state.modal = Modal::Help;
        assert!(handle_key_event(
            &mut state,
            &mut runtime,
            &mut view_data,
            &tx,
            KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL),
        ));
        assert!(matches!(nav_action_for_key(ch('q')), Some(super::NavAction::Quit)));
        assert!(matches!(
            nav_action_for_key(key(KeyCode::Esc)),
            Some(super::NavAction::Quit)
        ));
    }

    #[test]
    fn stale_status_clear_is_ignored() {
        let mut state = state_at(2026, 3, 10);
        let mut runtime = TestRuntime::default();
        let mut view_data = ViewData::default();
        let (tx, rx) = internal_channel();

        run_key_script(&mut state, &mut runtime, &mut view_data, &tx, &rx, &[ch('e')]);
        assert_eq!(state.status_line.as_deref(), Some("no events on 2026-03-10"));
        let first = view_data.status_token;

        run_key_script(&mut state, &mut runtime, &mut view_data, &tx, &rx, &[ch('e')]);
        assert_eq!(view_data.status_token, first + 1);

        tx.send(InternalEvent::ClearStatus { token: first })
            .expect("send clear");
        pump_internal(&mut state, &mut runtime, &mut view_data, &tx, &rx);
        assert!(state.status_line.is_some());

        tx.send(InternalEvent::ClearStatus {
            token: view_data.status_token,
        })
        .expect("send clear");
        pump_internal(&mut state, &mut runtime, &mut view_data, &tx, &rx);
        assert!(state.status_line.is_none());
    }
}
