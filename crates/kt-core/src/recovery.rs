//! Startup reconciliation of the persisted current day.
//!
//! Deciding what to do is pure; the engine carries out the writes the
//! decision implies.

use chrono::NaiveDateTime;

use crate::record::{DayRecord, RecordError};

/// Outcome of reconciling the stored current-day blob with today.
#[derive(Debug)]
pub enum Recovery {
    /// Nothing was stored; a fresh record must be written.
    Fresh(DayRecord),
    /// The stored record is today's and is resumed unchanged.
    Resumed(DayRecord),
    /// The stored record belongs to an earlier day. `stale` must be finalized
    /// once, then `fresh` written as the current record.
    Rolled { stale: DayRecord, fresh: DayRecord },
    /// The stored blob was unreadable and is replaced by `fresh`.
    Discarded { fresh: DayRecord, reason: RecordError },
}

impl Recovery {
    /// The record that becomes current after recovery.
    pub const fn current(&self) -> &DayRecord {
        match self {
            Self::Fresh(record) | Self::Resumed(record) => record,
            Self::Rolled { fresh, .. } | Self::Discarded { fresh, .. } => fresh,
        }
    }

    /// Whether the current record must be written back.
    pub const fn needs_write(&self) -> bool {
        !matches!(self, Self::Resumed(_))
    }

    pub const fn label(&self) -> &'static str {
        match self {
            Self::Fresh(_) => "fresh",
            Self::Resumed(_) => "resumed",
            Self::Rolled { .. } => "rolled",
            Self::Discarded { .. } => "discarded",
        }
    }

    /// Splits into the current record and, for a rollover, the stale one.
    pub fn into_parts(self) -> (DayRecord, Option<DayRecord>) {
        match self {
            Self::Fresh(record) | Self::Resumed(record) => (record, None),
            Self::Rolled { stale, fresh } => (fresh, Some(stale)),
            Self::Discarded { fresh, .. } => (fresh, None),
        }
    }
}

/// Reconciles the stored current-day blob (if any) with the date of `now`.
pub fn recover(stored: Option<&[u8]>, now: NaiveDateTime) -> Recovery {
    let today = now.date();
    let fresh = || DayRecord::new(today, now);

    let Some(bytes) = stored else {
        return Recovery::Fresh(fresh());
    };

    match DayRecord::from_json(bytes) {
        Ok(record) if record.date == today => Recovery::Resumed(record),
        Ok(stale) => Recovery::Rolled {
            stale,
            fresh: fresh(),
        },
        Err(reason) => Recovery::Discarded {
            fresh: fresh(),
            reason,
        },
    }
}
