//! Status command for showing the current day's statistics.

use std::fmt::Write as _;
use std::io::Write;

use anyhow::Result;
use chrono::NaiveDateTime;
use kt_core::{DayRecord, SessionTracker};
use kt_core::session::SessionState;
use kt_store::{FsStorage, load_current};

use crate::Config;

pub fn run<W: Write>(writer: &mut W, config: &Config, now: NaiveDateTime, json: bool) -> Result<()> {
    let storage = FsStorage::new(&config.stats_dir);
    let stored = load_current(&storage)?;

    let record = match stored.as_deref().map(DayRecord::from_json) {
        None => {
            writeln!(writer, "No current day recorded in {}.", config.stats_dir.display())?;
            return Ok(());
        }
        Some(Err(err)) => {
            writeln!(writer, "Current day record is unreadable: {err}")?;
            writeln!(writer, "It will be replaced the next time keytally starts.")?;
            return Ok(());
        }
        Some(Ok(record)) => record,
    };

    if json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&record)?)?;
        return Ok(());
    }

    writeln!(writer, "Statistics: {}", config.stats_dir.display())?;
    write!(writer, "{}", format_status(&record, now))?;
    Ok(())
}

/// Formats the summary block for one record.
pub fn format_status(record: &DayRecord, now: NaiveDateTime) -> String {
    let mut out = String::new();
    writeln!(out, "Date: {}", record.date).unwrap();
    writeln!(out, "Characters: {}", record.totals.chars_typed).unwrap();
    writeln!(out, "Words: {}", record.totals.words_typed).unwrap();
    writeln!(out, "Deleted: {}", record.totals.chars_deleted).unwrap();
    writeln!(out, "Accuracy: {:.1}%", record.accuracy * 100.0).unwrap();
    writeln!(out, "Active minutes: {}", record.active_minutes).unwrap();

    let state = match SessionTracker::state(record) {
        SessionState::OpenSession => "one open",
        SessionState::NoOpenSession => "none open",
    };
    writeln!(out, "Sessions: {} ({state})", record.sessions.len()).unwrap();
    writeln!(out, "Session minutes: {}", record.session_minutes(now)).unwrap();
    writeln!(
        out,
        "Focus streak: {} min ({} ended)",
        record.current_focus_streak,
        record.focus_streaks.len()
    )
    .unwrap();
    if record.restart_pending {
        writeln!(out, "A new day starts with the next session.").unwrap();
    }
    out
}
