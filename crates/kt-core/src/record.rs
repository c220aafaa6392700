//! The persisted day record.
//!
//! A [`DayRecord`] is the durable unit of typing telemetry: one per calendar
//! date. The camelCase field names are the on-disk contract shared with every
//! stored day, so renaming a field here breaks existing history.
//!
//! Derived values (`accuracy`, `vimRatio`) are written for readers of the
//! files but recomputed from the totals whenever a record is loaded.

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::key::ShortcutNamespace;
use crate::metrics::recompute_derived;

/// Frequency key recorded when a deletion joins two lines.
pub const LINE_BREAK: &str = "⏎";

/// The character that terminates a counted word.
pub const WORD_BOUNDARY: char = ' ';

/// Errors reading or writing a day record blob.
#[derive(Debug, Error)]
pub enum RecordError {
    /// The blob is not a valid day record document.
    #[error("invalid day record: {0}")]
    Json(#[from] serde_json::Error),
}

/// One contiguous span of activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub start: NaiveDateTime,
    /// `None` while the session is still open.
    pub end: Option<NaiveDateTime>,
    pub duration_minutes: i64,
}

impl Session {
    pub const fn open(start: NaiveDateTime) -> Self {
        Self {
            start,
            end: None,
            duration_minutes: 0,
        }
    }

    pub const fn is_open(&self) -> bool {
        self.end.is_none()
    }

    /// Closes the session at `end` and returns its rounded length in minutes.
    pub fn close(&mut self, end: NaiveDateTime) -> i64 {
        self.end = Some(end);
        self.duration_minutes = round_minutes((end - self.start).num_milliseconds());
        self.duration_minutes
    }
}

/// Monotonic counters for a single day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    pub words_typed: u64,
    pub chars_typed: u64,
    /// Kept for schema compatibility; no event path produces word deletions.
    pub words_deleted: u64,
    pub chars_deleted: u64,
}

/// Typing rate committed at the end of a one-minute activity window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeedSample {
    pub timestamp: NaiveDateTime,
    pub words_per_minute: f64,
    pub chars_per_minute: f64,
}

/// Shortcut counts, namespaced by origin.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShortcutUsage {
    pub vim: BTreeMap<String, u64>,
    pub system: BTreeMap<String, u64>,
}

impl ShortcutUsage {
    pub const fn namespace(&self, namespace: ShortcutNamespace) -> &BTreeMap<String, u64> {
        match namespace {
            ShortcutNamespace::System => &self.system,
            ShortcutNamespace::Vim => &self.vim,
        }
    }

    pub fn namespace_mut(&mut self, namespace: ShortcutNamespace) -> &mut BTreeMap<String, u64> {
        match namespace {
            ShortcutNamespace::System => &mut self.system,
            ShortcutNamespace::Vim => &mut self.vim,
        }
    }

    /// Sum of every shortcut count in a namespace.
    pub fn total(&self, namespace: ShortcutNamespace) -> u64 {
        self.namespace(namespace).values().sum()
    }
}

/// Typing telemetry for one calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayRecord {
    pub date: NaiveDate,
    pub session_start: NaiveDateTime,
    pub session_end: Option<NaiveDateTime>,
    pub sessions: Vec<Session>,
    pub totals: Totals,
    pub speed_history: Vec<SpeedSample>,
    pub shortcut_usage: ShortcutUsage,
    pub key_frequency: BTreeMap<String, u64>,
    pub deleted_char_frequency: BTreeMap<String, u64>,
    pub focus_streaks: Vec<u32>,
    pub current_focus_streak: u32,
    pub active_minutes: u32,
    pub accuracy: f64,
    pub vim_ratio: f64,
    pub focus_index: f64,
    /// Set after a hard reset; the next opened session starts a fresh day.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub restart_pending: bool,
}

impl DayRecord {
    /// Creates an empty record for `date` with one session opened at `now`.
    pub fn new(date: NaiveDate, now: NaiveDateTime) -> Self {
        Self {
            date,
            session_start: now,
            session_end: None,
            sessions: vec![Session::open(now)],
            totals: Totals::default(),
            speed_history: Vec::new(),
            shortcut_usage: ShortcutUsage::default(),
            key_frequency: BTreeMap::new(),
            deleted_char_frequency: BTreeMap::new(),
            focus_streaks: Vec::new(),
            current_focus_streak: 0,
            active_minutes: 0,
            accuracy: 1.0,
            vim_ratio: 0.0,
            focus_index: 0.0,
            restart_pending: false,
        }
    }

    /// Parses a stored blob and recomputes the derived values from its counters.
    pub fn from_json(bytes: &[u8]) -> Result<Self, RecordError> {
        let mut record: Self = serde_json::from_slice(bytes)?;
        recompute_derived(&mut record);
        Ok(record)
    }

    /// Serializes the record as a pretty-printed JSON document.
    pub fn to_json(&self) -> Result<Vec<u8>, RecordError> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    /// The open session, if any. Only the last session may be open.
    pub fn open_session(&self) -> Option<&Session> {
        self.sessions.last().filter(|s| s.is_open())
    }

    pub fn open_session_mut(&mut self) -> Option<&mut Session> {
        self.sessions.last_mut().filter(|s| s.is_open())
    }

    /// Minutes covered by sessions: closed durations plus the open session's
    /// elapsed time at `now`.
    pub fn session_minutes(&self, now: NaiveDateTime) -> i64 {
        self.sessions
            .iter()
            .map(|s| match s.end {
                Some(_) => s.duration_minutes,
                None => round_minutes((now - s.start).num_milliseconds()),
            })
            .sum()
    }

    /// Whether any character was typed on this day.
    pub const fn is_active(&self) -> bool {
        self.totals.chars_typed > 0
    }
}

/// Converts a millisecond span to whole minutes, rounding half up.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
pub fn round_minutes(ms: i64) -> i64 {
    (ms as f64 / 60_000.0).round() as i64
}
