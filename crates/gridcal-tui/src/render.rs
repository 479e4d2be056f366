// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use gridcal_app::{AppState, CalendarPosition, Modal, PickerKind, PickerState, SelectionView, date};
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

const MONTH_WIDTH: usize = 20;
const MONTH_GAP: usize = 4;
/// Title, weekday header, six week rows.
const MONTH_HEIGHT: usize = 8;
const MAX_COLUMNS: usize = 4;
const DEFAULT_COLUMNS: usize = 3;
const YEAR_DROPDOWN_ROWS: i32 = 9;
const DESCRIPTION_LIMIT: usize = 100;
const CONTROL_GAP: &str = "      ";
const WEEKDAY_HEADER: &str = "Su Mo Tu We Th Fr Sa";
const KEY_HINTS: &str =
    "h/j/k/l move | n/p month | N/P year | y/m pick | t today | e events | s sync | c calendars | ? help | q quit";
const PICKER_HINTS: &str = "enter apply | esc cancel | up/down move | pgup/pgdn ±10 | type digits";

const HEADER: Style = Style::new().fg(Color::Magenta).add_modifier(Modifier::BOLD);
const WEEKDAY: Style = Style::new().fg(Color::LightBlue).add_modifier(Modifier::BOLD);
const DAY: Style = Style::new().fg(Color::Gray);
const WEEKEND: Style = Style::new().fg(Color::LightRed);
const EVENT_DAY: Style = Style::new().fg(Color::Cyan).add_modifier(Modifier::BOLD);
const EVENT_WEEKEND: Style = Style::new()
    .fg(Color::LightMagenta)
    .add_modifier(Modifier::BOLD);
const SELECTED_DAY: Style = Style::new()
    .fg(Color::White)
    .bg(Color::Blue)
    .add_modifier(Modifier::BOLD);
const SELECTED_WEEKEND: Style = Style::new()
    .fg(Color::White)
    .bg(Color::Magenta)
    .add_modifier(Modifier::BOLD);
const CONTROL: Style = Style::new().fg(Color::LightCyan).add_modifier(Modifier::BOLD);
const ACTIVE: Style = Style::new()
    .fg(Color::White)
    .bg(Color::Blue)
    .add_modifier(Modifier::BOLD);
const MUTED: Style = Style::new().fg(Color::DarkGray);
const ERROR: Style = Style::new().fg(Color::Red);

pub(crate) fn render(frame: &mut ratatui::Frame<'_>, state: &AppState) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(4),
        ])
        .split(frame.area());

    let control = Paragraph::new(control_bar_line(state))
        .block(Block::default().title("gridcal").borders(Borders::ALL));
    frame.render_widget(control, layout[0]);

    let grid_area = layout[1];
    let columns = grid_columns(grid_area.width.saturating_sub(2));
    let scroll = grid_scroll(
        state.position.month,
        columns,
        grid_area.height.saturating_sub(2),
    );
    let grid = Paragraph::new(grid_lines(state, columns))
        .scroll((scroll, 0))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(grid, grid_area);

    let footer = Paragraph::new(footer_lines(state)).block(Block::default().borders(Borders::ALL));
    frame.render_widget(footer, layout[2]);

    match &state.modal {
        Modal::None => {}
        Modal::Picker(picker) => render_picker(frame, layout[0], state, picker),
        Modal::EventDetail(position) => {
            let area = centered_rect(70, 60, frame.area());
            frame.render_widget(Clear, area);
            let detail = Paragraph::new(event_detail_text(state, *position))
                .wrap(Wrap { trim: false })
                .block(Block::default().title("events").borders(Borders::ALL));
            frame.render_widget(detail, area);
        }
        Modal::CalendarSelection(view) => {
            let area = centered_rect(60, 60, frame.area());
            frame.render_widget(Clear, area);
            let selection = Paragraph::new(selection_lines(view))
                .block(Block::default().title("calendars").borders(Borders::ALL));
            frame.render_widget(selection, area);
        }
        Modal::Help => {
            let area = centered_rect(60, 50, frame.area());
            frame.render_widget(Clear, area);
            let help = Paragraph::new(help_overlay_text())
                .block(Block::default().title("help").borders(Borders::ALL));
            frame.render_widget(help, area);
        }
    }
}

/// Dropdown hanging under its control-bar label.
fn render_picker(
    frame: &mut ratatui::Frame<'_>,
    control_area: Rect,
    state: &AppState,
    picker: &PickerState,
) {
    let (lines, left) = match picker.kind() {
        PickerKind::Year => (year_dropdown_lines(picker.cursor()), 0),
        PickerKind::Month => (
            month_dropdown_lines(picker.cursor()),
            year_label(state).len() + CONTROL_GAP.len(),
        ),
    };
    let width = lines.iter().map(Line::width).max().unwrap_or(0) + 2;
    let title = if picker.buffer().is_empty() {
        picker.kind().as_str().to_owned()
    } else {
        format!("{} {}", picker.kind().as_str(), picker.buffer())
    };
    let width = width.max(title.len() + 2);

    let area = Rect::new(
        control_area.x.saturating_add(1).saturating_add(to_u16(left)),
        control_area.y.saturating_add(control_area.height.saturating_sub(1)),
        to_u16(width),
        to_u16(lines.len() + 2),
    )
    .intersection(frame.area());
    frame.render_widget(Clear, area);
    let dropdown =
        Paragraph::new(lines).block(Block::default().title(title).borders(Borders::ALL));
    frame.render_widget(dropdown, area);
}

fn to_u16(value: usize) -> u16 {
    u16::try_from(value).unwrap_or(u16::MAX)
}

/// How many months fit side by side in `width` cells.
fn grid_columns(width: u16) -> usize {
    if width == 0 {
        return DEFAULT_COLUMNS;
    }
    let width = usize::from(width);
    (1..=MAX_COLUMNS)
        .rev()
        .find(|columns| columns * MONTH_WIDTH + (columns - 1) * MONTH_GAP <= width)
        .unwrap_or(1)
}

/// First grid line to show so the selected month's row stays on screen.
fn grid_scroll(month: u8, columns: usize, height: u16) -> u16 {
    let row = usize::from(month.saturating_sub(1)) / columns.max(1);
    let bottom = row * (MONTH_HEIGHT + 1) + MONTH_HEIGHT;
    to_u16(bottom.saturating_sub(usize::from(height)))
}

fn grid_lines(state: &AppState, columns: usize) -> Vec<Line<'static>> {
    let year = state.position.year;
    let months: Vec<Vec<Line<'static>>> = (1..=12).map(|month| month_lines(state, year, month)).collect();
    let gap = " ".repeat(MONTH_GAP);

    let mut lines = Vec::new();
    for (row_index, row) in months.chunks(columns.max(1)).enumerate() {
        if row_index > 0 {
            lines.push(Line::default());
        }
        for line_index in 0..MONTH_HEIGHT {
            let mut spans = Vec::new();
            for (column, month) in row.iter().enumerate() {
                if column > 0 {
                    spans.push(Span::raw(gap.clone()));
                }
                if let Some(line) = month.get(line_index) {
                    spans.extend(line.spans.iter().cloned());
                }
            }
            lines.push(Line::from(spans));
        }
    }
    lines
}

fn month_lines(state: &AppState, year: i32, month: u8) -> Vec<Line<'static>> {
    let mut lines = Vec::with_capacity(MONTH_HEIGHT);
    let title = format!("{} {year}", date::month_name(month));
    lines.push(Line::from(Span::styled(
        center_text(&title, MONTH_WIDTH),
        HEADER,
    )));
    lines.push(Line::from(Span::styled(WEEKDAY_HEADER, WEEKDAY)));

    let first = date::first_weekday_of_month(year, month);
    let days = date::days_in_month(year, month);
    let show_events = state.store.year() == year;

    for week in 0..6u8 {
        let mut spans = Vec::with_capacity(13);
        for weekday in 0..7u8 {
            let index = week * 7 + weekday;
            let span = match (index + 1).checked_sub(first) {
                Some(day) if (1..=days).contains(&day) => {
                    let selected = state.position == CalendarPosition::new(year, month, day);
                    let has_events = show_events && state.store.has_events(month, day);
                    let weekend = weekday == 0 || weekday == 6;
                    Span::styled(format!("{day:2}"), day_style(selected, has_events, weekend))
                }
                _ => Span::raw("  "),
            };
            spans.push(span);
            if weekday < 6 {
                spans.push(Span::raw(" "));
            }
        }
        lines.push(Line::from(spans));
    }
    lines
}

fn day_style(selected: bool, has_events: bool, weekend: bool) -> Style {
    match (selected, has_events, weekend) {
        (true, _, false) => SELECTED_DAY,
        (true, _, true) => SELECTED_WEEKEND,
        (false, true, false) => EVENT_DAY,
        (false, true, true) => EVENT_WEEKEND,
        (false, false, true) => WEEKEND,
        (false, false, false) => DAY,
    }
}

fn center_text(text: &str, width: usize) -> String {
    let len = text.chars().count();
    if len >= width {
        return text.to_owned();
    }
    let left = (width - len) / 2;
    let right = width - len - left;
    format!("{}{text}{}", " ".repeat(left), " ".repeat(right))
}

fn year_label(state: &AppState) -> String {
    format!("Year [{}]", state.position.year)
}

fn control_bar_line(state: &AppState) -> Line<'static> {
    let active = state.modal.picker_kind();
    let style_for = |kind| if active == Some(kind) { ACTIVE } else { CONTROL };
    Line::from(vec![
        Span::styled(year_label(state), style_for(PickerKind::Year)),
        Span::raw(CONTROL_GAP),
        Span::styled(
            format!("Month [{}]", state.position.month_name()),
            style_for(PickerKind::Month),
        ),
    ])
}

/// Nine years centered on `cursor`, right-aligned.
fn year_dropdown_lines(cursor: i32) -> Vec<Line<'static>> {
    let start = cursor.saturating_sub(YEAR_DROPDOWN_ROWS / 2);
    let years: Vec<i32> = (0..YEAR_DROPDOWN_ROWS)
        .map(|offset| start.saturating_add(offset))
        .collect();
    let width = years
        .iter()
        .map(|year| year.to_string().len())
        .max()
        .unwrap_or(0);
    years
        .into_iter()
        .map(|year| {
            let style = if year == cursor { ACTIVE } else { DAY };
            Line::from(Span::styled(format!(" {year:>width$} "), style))
        })
        .collect()
}

fn month_dropdown_lines(cursor: i32) -> Vec<Line<'static>> {
    let labels: Vec<String> = (1..=12u8)
        .map(|month| format!("{month:2} {}", date::month_name(month)))
        .collect();
    let width = labels.iter().map(String::len).max().unwrap_or(0);
    labels
        .into_iter()
        .enumerate()
        .map(|(index, label)| {
            let style = if i32::try_from(index).ok() == Some(cursor) {
                ACTIVE
            } else {
                DAY
            };
            Line::from(Span::styled(format!(" {label:<width$} "), style))
        })
        .collect()
}

fn footer_lines(state: &AppState) -> Vec<Line<'static>> {
    let mut first = vec![Span::styled(
        format!("selected {}", state.position),
        Style::new().fg(Color::Gray),
    )];
    if state.is_syncing() {
        first.push(Span::raw(" | "));
        first.push(Span::styled("⟳ syncing", ACTIVE));
    }
    if let Some(status) = &state.status_line {
        first.push(Span::raw(" | "));
        first.push(Span::styled(status.clone(), Style::new().fg(Color::Yellow)));
    }

    let second = match state.error_line() {
        Some(error) => Line::from(Span::styled(format!("error: {error}"), ERROR)),
        None if state.modal.picker_kind().is_some() => Line::from(Span::styled(PICKER_HINTS, MUTED)),
        None => Line::from(Span::styled(KEY_HINTS, MUTED)),
    };
    vec![Line::from(first), second]
}

fn truncate_description(description: &str) -> String {
    if description.chars().count() <= DESCRIPTION_LIMIT {
        return description.to_owned();
    }
    let mut truncated: String = description.chars().take(DESCRIPTION_LIMIT).collect();
    truncated.push_str("...");
    truncated
}

fn event_detail_text(state: &AppState, position: CalendarPosition) -> String {
    let mut out = format!("Events for {position}\n\n");
    let events = if state.store.year() == position.year {
        state.store.events_at(position)
    } else {
        &[]
    };
    if events.is_empty() {
        out.push_str("no events for this day\n");
    }
    for (index, event) in events.iter().enumerate() {
        if index > 0 {
            out.push('\n');
        }
        out.push_str(&format!("  {}\n", event.title));
        if let Some(calendar) = event.calendar_label() {
            out.push_str(&format!("  calendar: {calendar}\n"));
        }
        out.push_str(&format!("  {}\n", event.time_range_label()));
        if !event.location.is_empty() {
            out.push_str(&format!("  location: {}\n", event.location));
        }
        if !event.description.is_empty() {
            out.push_str(&format!("  {}\n", truncate_description(&event.description)));
        }
    }
    out.push_str("\ne/esc close");
    out
}

fn selection_lines(view: &SelectionView) -> Vec<Line<'static>> {
    let mut lines = vec![
        Line::from(Span::styled(
            "up/down move | space toggle | a apply | esc cancel",
            MUTED,
        )),
        Line::default(),
    ];
    if view.calendars().is_empty() {
        lines.push(Line::from("no calendars"));
    }
    for (index, calendar) in view.calendars().iter().enumerate() {
        let mark = if view.is_selected(&calendar.id) { "x" } else { " " };
        let label = format!("[{mark}] {}", calendar.display_name);
        let line = if index == view.cursor() {
            Line::from(Span::styled(format!("> {label} "), ACTIVE))
        } else {
            Line::from(format!("  {label}"))
        };
        lines.push(line);
    }
    lines
}

fn help_overlay_text() -> &'static str {
    "global: ctrl+c/ctrl+q quit\n\
nav: h/l day | j/k week | arrows | n/p month | N/P year | t today | q/esc quit\n\
nav: y year picker | m month picker | e/enter events | s sync | c calendars | ? help\n\
picker: digits type | backspace | up/down step | pgup/pgdn ±10 years | enter apply | esc cancel\n\
calendars: j/k move | space/enter toggle | a apply | esc/q cancel\n\
events: e/esc/q close"
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::{
        EVENT_DAY, SELECTED_DAY, SELECTED_WEEKEND, event_detail_text, footer_lines,
        grid_columns, grid_lines, grid_scroll, help_overlay_text, month_dropdown_lines,
        month_lines, render, selection_lines, year_dropdown_lines,
    };
    use gridcal_app::{
        AppState, CalendarPosition, CalendarSelection, Modal, PickerState, SelectionView,
    };
    use gridcal_testkit::{all_day_event, sample_listing, store_with, timed_event};
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;
    use ratatui::text::Line;
    use time::Duration;
    use time::macros::{date, datetime};

    fn plain(line: &Line<'_>) -> String {
        line.spans.iter().map(|span| span.content.as_ref()).collect()
    }

    fn state_at(year: i32, month: u8, day: u8) -> AppState {
        AppState::new(
            CalendarPosition::new(year, month, day),
            CalendarSelection::default(),
        )
    }

    #[test]
    fn columns_follow_terminal_width() {
        assert_eq!(grid_columns(0), 3);
        assert_eq!(grid_columns(10), 1);
        assert_eq!(grid_columns(43), 1);
        assert_eq!(grid_columns(44), 2);
        assert_eq!(grid_columns(67), 2);
        assert_eq!(grid_columns(68), 3);
        assert_eq!(grid_columns(92), 4);
        assert_eq!(grid_columns(300), 4);
    }

    #[test]
    fn month_block_is_fixed_width() {
        let state = state_at(2026, 1, 1);
        let lines = month_lines(&state, 2026, 1);
        assert_eq!(lines.len(), 8);
        assert_eq!(plain(&lines[0]), "    January 2026    ");
        assert_eq!(plain(&lines[1]), "Su Mo Tu We Th Fr Sa");
        // 2026-01-01 is a Thursday.
        assert_eq!(plain(&lines[2]), "             1  2  3");
        assert_eq!(plain(&lines[6]), "25 26 27 28 29 30 31");
        assert_eq!(plain(&lines[7]).trim(), "");
        assert!(lines.iter().all(|line| plain(line).chars().count() == 20));
    }

    #[test]
    fn selected_and_event_days_are_styled() {
        let mut state = state_at(2026, 2, 10);
        state.store = store_with(
            2026,
            [timed_event(
                "a",
                "primary",
                datetime!(2026-02-12 09:00 UTC),
                Duration::hours(1),
            )],
        );
        let lines = month_lines(&state, 2026, 2);
        let style_of = |label: &str| {
            lines
                .iter()
                .flat_map(|line| line.spans.iter())
                .find(|span| span.content.as_ref() == label)
                .map(|span| span.style)
                .expect("day rendered")
        };
        assert_eq!(style_of("10"), SELECTED_DAY);
        assert_eq!(style_of("12"), EVENT_DAY);

        state.position = CalendarPosition::new(2026, 2, 14);
        let lines = month_lines(&state, 2026, 2);
        let saturday = lines
            .iter()
            .flat_map(|line| line.spans.iter())
            .find(|span| span.content.as_ref() == "14")
            .map(|span| span.style);
        assert_eq!(saturday, Some(SELECTED_WEEKEND));
    }

    #[test]
    fn grid_rows_join_months_with_gap() {
        let state = state_at(2026, 1, 1);
        let lines = grid_lines(&state, 3);
        assert_eq!(lines.len(), 4 * 8 + 3);
        assert!(plain(&lines[0]).contains("January 2026"));
        assert!(plain(&lines[0]).contains("March 2026"));
        assert_eq!(plain(&lines[1]).chars().count(), 3 * 20 + 2 * 4);
        assert_eq!(plain(&lines[8]), "");
        assert!(plain(&lines[9]).contains("April 2026"));
    }

    #[test]
    fn grid_scrolls_to_selected_row() {
        assert_eq!(grid_scroll(1, 1, 20), 0);
        assert_eq!(grid_scroll(12, 4, 30), 0);
        // Row 11 in single-column mode ends at line 11 * 9 + 8.
        assert_eq!(grid_scroll(12, 1, 27), 80);
    }

    #[test]
    fn year_dropdown_centers_cursor() {
        let lines = year_dropdown_lines(2026);
        let labels: Vec<String> = lines.iter().map(plain).collect();
        assert_eq!(labels.len(), 9);
        assert_eq!(labels[0], " 2022 ");
        assert_eq!(labels[4], " 2026 ");
        assert_eq!(labels[8], " 2030 ");
        assert_eq!(lines[4].spans[0].style, super::ACTIVE);

        let near_zero: Vec<String> = year_dropdown_lines(2).iter().map(plain).collect();
        assert_eq!(near_zero[0], " -2 ");
        assert_eq!(near_zero[2], "  0 ");
    }

    #[test]
    fn month_dropdown_lists_all_months() {
        let lines = month_dropdown_lines(2);
        let labels: Vec<String> = lines.iter().map(plain).collect();
        assert_eq!(labels.len(), 12);
        assert_eq!(labels[0], "  1 January   ");
        assert_eq!(labels[8], "  9 September ");
        assert_eq!(labels[11], " 12 December  ");
        assert_eq!(lines[2].spans[0].style, super::ACTIVE);
    }

    #[test]
    fn detail_lists_each_event() {
        let mut state = state_at(2026, 7, 4);
        let mut family = timed_event(
            "bbq",
            "family@group.calendar.google.com",
            datetime!(2026-07-04 17:00 UTC),
            Duration::hours(3),
        );
        family.source_calendar_name = "Family".to_owned();
        family.location = "Backyard".to_owned();
        family.description = "x".repeat(150);
        let holiday = all_day_event("july4", "primary", date!(2026-07-04));
        state.store = store_with(2026, [holiday, family]);

        let text = event_detail_text(&state, CalendarPosition::new(2026, 7, 4));
        assert!(text.starts_with("Events for 2026-07-04"));
        assert!(text.contains("all day"));
        assert!(text.contains("17:00 - 20:00"));
        assert!(text.contains("calendar: Family"));
        assert!(text.contains("location: Backyard"));
        assert!(text.contains(&format!("{}...", "x".repeat(100))));
        assert!(!text.contains(&"x".repeat(101)));
    }

    #[test]
    fn selection_overlay_marks_checked_calendars() {
        let view = SelectionView::open(sample_listing(), &CalendarSelection::default());
        let lines: Vec<String> = selection_lines(&view).iter().map(plain).collect();
        assert_eq!(lines[2], "> [x] Me ");
        assert_eq!(lines[3], "  [ ] Family");
        assert_eq!(lines[4], "  [ ] Holidays in United States");
    }

    #[test]
    fn footer_shows_status_sync_and_error() {
        let mut state = state_at(2026, 3, 1);
        let footer: Vec<String> = footer_lines(&state).iter().map(plain).collect();
        assert_eq!(footer[0], "selected 2026-03-01");
        assert!(footer[1].contains("? help"));

        state.status_line = Some("synced 3 events".to_owned());
        state.sync_error = Some("sync failed: offline".to_owned());
        state.dispatch(gridcal_app::AppCommand::BeginSync);
        let footer: Vec<String> = footer_lines(&state).iter().map(plain).collect();
        assert_eq!(footer[0], "selected 2026-03-01 | ⟳ syncing | synced 3 events");
        assert_eq!(footer[1], "error: sync failed: offline");
    }

    #[test]
    fn help_mentions_every_mode() {
        let help = help_overlay_text();
        for section in ["global:", "nav:", "picker:", "calendars:", "events:"] {
            assert!(help.contains(section), "missing {section}");
        }
    }

    #[test]
    fn every_modal_renders_without_panicking() {
        let mut state = state_at(2026, 3, 10);
        state.store = store_with(
            2026,
            [timed_event(
                "a",
                "primary",
                datetime!(2026-03-10 09:00 UTC),
                Duration::hours(1),
            )],
        );
        let modals = [
            Modal::None,
            Modal::Picker(PickerState::open_year(2026)),
            Modal::Picker(PickerState::open_month(3)),
            Modal::EventDetail(CalendarPosition::new(2026, 3, 10)),
            Modal::CalendarSelection(SelectionView::open(
                sample_listing(),
                &CalendarSelection::default(),
            )),
            Modal::Help,
        ];
        for (width, height) in [(120, 50), (30, 12), (1, 1)] {
            let mut terminal =
                Terminal::new(TestBackend::new(width, height)).expect("test terminal");
            for modal in &modals {
                state.modal = modal.clone();
                terminal
                    .draw(|frame| render(frame, &state))
                    .expect("draw frame");
            }
        }
    }
}
