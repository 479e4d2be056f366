// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Modal year/month picker driven by arrows or typed digits.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickerKind {
    Year,
    Month,
}

impl PickerKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Year => "year",
            Self::Month => "month",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickerInput {
    Char(char),
    Backspace,
    Up,
    Down,
    PageUp,
    PageDown,
    Confirm,
    Cancel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickerCommit {
    Year(i32),
    /// 1-based month.
    Month(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickerOutcome {
    Open,
    Closed,
    Committed(PickerCommit),
}

/// An open picker. Year cursors are unbounded signed years; month cursors
/// are zero-based (`0..=11`). While the digit buffer is non-empty it drives
/// the cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickerState {
    kind: PickerKind,
    cursor: i32,
    buffer: String,
}

impl PickerState {
    pub fn open_year(year: i32) -> Self {
        Self {
            kind: PickerKind::Year,
            cursor: year,
            buffer: String::new(),
        }
    }

    /// `month` is 1-based, as stored on the calendar position.
    pub fn open_month(month: u8) -> Self {
        Self {
            kind: PickerKind::Month,
            cursor: i32::from(month.clamp(1, 12)) - 1,
            buffer: String::new(),
        }
    }

    pub fn kind(&self) -> PickerKind {
        self.kind
    }

    pub fn cursor(&self) -> i32 {
        self.cursor
    }

    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    pub fn apply(&mut self, input: PickerInput) -> PickerOutcome {
        match input {
            PickerInput::Char(ch) => self.push_char(ch),
            PickerInput::Backspace => {
                if self.buffer.pop().is_some() {
                    self.reparse();
                }
            }
            PickerInput::Up => self.step(-1),
            PickerInput::Down => self.step(1),
            PickerInput::PageUp => self.page(-10),
            PickerInput::PageDown => self.page(10),
            PickerInput::Confirm => {
                self.buffer.clear();
                return PickerOutcome::Committed(self.commit());
            }
            PickerInput::Cancel => {
                self.buffer.clear();
                return PickerOutcome::Closed;
            }
        }
        PickerOutcome::Open
    }

    pub fn commit(&self) -> PickerCommit {
        match self.kind {
            PickerKind::Year => PickerCommit::Year(self.cursor),
            PickerKind::Month => PickerCommit::Month(self.cursor.rem_euclid(12) as u8 + 1),
        }
    }

    fn push_char(&mut self, ch: char) {
        match self.kind {
            PickerKind::Year => {
                if ch.is_ascii_digit() || (ch == '-' && self.buffer.is_empty()) {
                    self.buffer.push(ch);
                }
            }
            PickerKind::Month => {
                if !ch.is_ascii_digit() {
                    return;
                }
                self.buffer.push(ch);
                let excess = self.buffer.chars().count().saturating_sub(2);
                if excess > 0 {
                    self.buffer = self.buffer.chars().skip(excess).collect();
                }
            }
        }
        self.reparse();
    }

    fn reparse(&mut self) {
        if self.buffer.is_empty() {
            return;
        }
        let Ok(value) = self.buffer.parse::<i32>() else {
            return;
        };
        match self.kind {
            PickerKind::Year => self.cursor = value,
            PickerKind::Month => {
                if (1..=12).contains(&value) {
                    self.cursor = value - 1;
                }
            }
        }
    }

    fn step(&mut self, delta: i32) {
        self.buffer.clear();
        self.cursor = match self.kind {
            PickerKind::Year => self.cursor.saturating_add(delta),
            PickerKind::Month => (self.cursor + delta).rem_euclid(12),
        };
    }

    fn page(&mut self, delta: i32) {
        if self.kind == PickerKind::Year {
            self.buffer.clear();
            self.cursor = self.cursor.saturating_add(delta);
        }
    }
}
