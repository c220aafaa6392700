//! Reading and writing day records.

use chrono::NaiveDate;
use kt_core::{DayRecord, render_day};
use rayon::prelude::*;

use crate::StoreError;
use crate::layout;
use crate::storage::Storage;

/// The stored current-day blob, unparsed.
pub fn load_current(storage: &dyn Storage) -> Result<Option<Vec<u8>>, StoreError> {
    storage.read(layout::CURRENT)
}

pub fn save_current(storage: &dyn Storage, record: &DayRecord) -> Result<(), StoreError> {
    storage.write(layout::CURRENT, &record.to_json()?)
}

/// Writes the day's record into its month folder.
pub fn write_day(storage: &dyn Storage, record: &DayRecord) -> Result<(), StoreError> {
    storage.write(&layout::day_record(record.date), &record.to_json()?)
}

/// Writes the day's record and its Markdown report.
pub fn write_day_outputs(storage: &dyn Storage, record: &DayRecord) -> Result<(), StoreError> {
    write_day(storage, record)?;
    storage.write(
        &layout::day_report(record.date),
        render_day(record).as_bytes(),
    )?;
    tracing::debug!(date = %record.date, "wrote day outputs");
    Ok(())
}

pub fn read_day(storage: &dyn Storage, date: NaiveDate) -> Result<Option<DayRecord>, StoreError> {
    storage
        .read(&layout::day_record(date))?
        .map(|bytes| DayRecord::from_json(&bytes))
        .transpose()
        .map_err(StoreError::from)
}

/// Result of clearing modal-editing shortcut counts from the current record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VimPurge {
    /// Counts were removed; carries how many shortcut entries were dropped.
    Purged(usize),
    /// The record had no vim shortcut counts.
    AlreadyEmpty,
    /// No current record is stored.
    Missing,
}

/// Clears `shortcutUsage.vim` in the stored current record and rewrites it.
///
/// An unreadable record is reported as an error and left untouched.
pub fn purge_vim(storage: &dyn Storage) -> Result<VimPurge, StoreError> {
    let Some(bytes) = load_current(storage)? else {
        return Ok(VimPurge::Missing);
    };
    let mut record = DayRecord::from_json(&bytes)?;
    let dropped = record.shortcut_usage.vim.len();
    if dropped == 0 {
        return Ok(VimPurge::AlreadyEmpty);
    }
    record.shortcut_usage.vim.clear();
    record.vim_ratio = 0.0;
    save_current(storage, &record)?;
    tracing::info!(dropped, "purged vim shortcut counts");
    Ok(VimPurge::Purged(dropped))
}

/// Deletes every file in the statistics tree except the writer lock, then
/// removes the emptied folders. Returns how many files were deleted.
///
/// A file that cannot be deleted is logged and skipped.
pub fn wipe_all(storage: &dyn Storage) -> Result<usize, StoreError> {
    let mut deleted = 0;
    for path in storage.list_under("")? {
        if path == layout::LOCK_FILE {
            continue;
        }
        match storage.delete(&path) {
            Ok(()) => deleted += 1,
            Err(err) => tracing::warn!(path, error = %err, "failed to delete file"),
        }
    }
    let folders = storage.remove_empty_folders("")?;
    tracing::info!(deleted, folders, "wiped statistics tree");
    Ok(deleted)
}

/// Reads every day record below `folder`, ordered by date.
///
/// Files that cannot be read or parsed are skipped with a warning so one
/// damaged day does not hide the rest of the month.
pub fn read_days(storage: &dyn Storage, folder: &str) -> Result<Vec<DayRecord>, StoreError> {
    let paths: Vec<String> = storage
        .list_under(folder)?
        .into_iter()
        .filter(|path| layout::parse_day_record(path).is_some())
        .collect();

    let mut records: Vec<DayRecord> = paths
        .par_iter()
        .filter_map(|path| match storage.read(path) {
            Ok(Some(bytes)) => match DayRecord::from_json(&bytes) {
                Ok(record) => Some(record),
                Err(err) => {
                    tracing::warn!(path, error = %err, "skipping unreadable day record");
                    None
                }
            },
            Ok(None) => None,
            Err(err) => {
                tracing::warn!(path, error = %err, "failed to read day record");
                None
            }
        })
        .collect();

    records.sort_by_key(|record| record.date);
    Ok(records)
}
