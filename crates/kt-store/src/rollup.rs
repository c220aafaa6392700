//! Day → month → year recomputation.
//!
//! Each level is rebuilt from the day records currently stored for it, never
//! from the level below's previous output, so re-running a rollup over
//! unchanged days rewrites identical files.

use std::collections::BTreeSet;

use chrono::{Datelike, NaiveDate};
use kt_core::{Aggregate, AggregateOptions, Scope, aggregate, render_aggregate};

use crate::StoreError;
use crate::layout;
use crate::persist::read_days;
use crate::storage::Storage;

/// Aggregates written by one cascade run. `None` where the scope had no days.
#[derive(Debug, Clone, PartialEq)]
pub struct Cascade {
    pub month: Option<Aggregate>,
    pub year: Option<Aggregate>,
}

/// Recomputes the month and then the year containing `date`.
pub fn cascade(
    storage: &dyn Storage,
    date: NaiveDate,
    options: &AggregateOptions,
) -> Result<Cascade, StoreError> {
    let month = rollup_month(storage, date.year(), date.month(), options)?;
    let year = rollup_year(storage, date.year(), options)?;
    Ok(Cascade { month, year })
}

/// Rebuilds one month's aggregate files. A month without day records
/// writes nothing.
pub fn rollup_month(
    storage: &dyn Storage,
    year: i32,
    month: u32,
    options: &AggregateOptions,
) -> Result<Option<Aggregate>, StoreError> {
    rollup_scope(storage, Scope::Month { year, month }, options)
}

/// Rebuilds one year's aggregate files from every day stored in the year.
pub fn rollup_year(
    storage: &dyn Storage,
    year: i32,
    options: &AggregateOptions,
) -> Result<Option<Aggregate>, StoreError> {
    rollup_scope(storage, Scope::Year { year }, options)
}

/// Rebuilds every month that has day records, then their years.
///
/// Restricted to one year when `year` is given.
pub fn rollup_all(
    storage: &dyn Storage,
    year: Option<i32>,
    options: &AggregateOptions,
) -> Result<Vec<Aggregate>, StoreError> {
    let root = year.map(layout::year_folder).unwrap_or_default();
    let months: BTreeSet<(i32, u32)> = storage
        .list_under(&root)?
        .iter()
        .filter_map(|path| layout::parse_day_record(path))
        .map(|date| (date.year(), date.month()))
        .collect();
    let years: BTreeSet<i32> = months.iter().map(|(year, _)| *year).collect();

    let mut written = Vec::new();
    for (year, month) in months {
        written.extend(rollup_month(storage, year, month, options)?);
    }
    for year in years {
        written.extend(rollup_year(storage, year, options)?);
    }
    Ok(written)
}

fn rollup_scope(
    storage: &dyn Storage,
    scope: Scope,
    options: &AggregateOptions,
) -> Result<Option<Aggregate>, StoreError> {
    let (Some(folder), Some(json_path), Some(report_path)) = (
        layout::scope_folder(scope),
        layout::aggregate_json(scope),
        layout::aggregate_report(scope),
    ) else {
        return Err(StoreError::InvalidPath(scope.to_string()));
    };

    let days = read_days(storage, &folder)?;
    if days.is_empty() {
        tracing::debug!(%scope, "no day records, skipping rollup");
        return Ok(None);
    }

    let aggregate = aggregate(scope, &days, options);
    storage.write(&json_path, &serde_json::to_vec_pretty(&aggregate)?)?;
    storage.write(&report_path, render_aggregate(&aggregate).as_bytes())?;
    tracing::info!(
        %scope,
        days = days.len(),
        active_days = aggregate.active_day_count,
        "rolled up"
    );
    Ok(Some(aggregate))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStorage;
    use crate::persist::write_day;
    use kt_core::DayRecord;

    fn record(month: u32, day: u32, chars: u64) -> DayRecord {
        let date = NaiveDate::from_ymd_opt(2025, month, day).unwrap();
        let mut record = DayRecord::new(date, date.and_hms_opt(8, 0, 0).unwrap());
        record.totals.chars_typed = chars;
        record.active_minutes = 1;
        record.key_frequency.insert("a".into(), chars);
        record
    }

    fn date(month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, month, day).unwrap()
    }

    #[test]
    fn cascade_writes_month_then_year() {
        let storage = MemoryStorage::new();
        write_day(&storage, &record(1, 15, 40)).unwrap();
        write_day(&storage, &record(2, 3, 60)).unwrap();

        let result = cascade(&storage, date(1, 15), &AggregateOptions::default()).unwrap();
        let month = result.month.unwrap();
        let year = result.year.unwrap();
        assert_eq!(month.total_chars_typed, 40);
        assert_eq!(year.total_chars_typed, 100);
        assert_eq!(year.active_day_count, 2);

        for path in [
            "2025/01-January/month-2025-01.json",
            "2025/01-January/month-2025-01.md",
            "2025/year-2025.json",
            "2025/year-2025.md",
        ] {
            assert!(storage.exists(path).unwrap(), "missing {path}");
        }
        // February was not touched by a January cascade.
        assert!(!storage.exists("2025/02-February/month-2025-02.json").unwrap());
    }

    #[test]
    fn empty_month_writes_nothing() {
        let storage = MemoryStorage::new();
        let result = cascade(&storage, date(5, 1), &AggregateOptions::default()).unwrap();
        assert_eq!(result, Cascade { month: None, year: None });
        assert!(storage.paths().is_empty());
    }

    #[test]
    fn repeated_cascade_is_idempotent() {
        let storage = MemoryStorage::new();
        write_day(&storage, &record(1, 15, 40)).unwrap();
        write_day(&storage, &record(1, 16, 10)).unwrap();
        let options = AggregateOptions::default();

        let first = cascade(&storage, date(1, 16), &options).unwrap();
        let json = storage.read_string("2025/01-January/month-2025-01.json");
        let report = storage.read_string("2025/year-2025.md");

        let second = cascade(&storage, date(1, 16), &options).unwrap();
        assert_eq!(first, second);
        assert_eq!(storage.read_string("2025/01-January/month-2025-01.json"), json);
        assert_eq!(storage.read_string("2025/year-2025.md"), report);
    }

    #[test]
    fn aggregate_json_uses_camel_case() {
        let storage = MemoryStorage::new();
        write_day(&storage, &record(3, 2, 5)).unwrap();
        rollup_month(&storage, 2025, 3, &AggregateOptions::default()).unwrap();

        let json: serde_json::Value = serde_json::from_str(
            &storage
                .read_string("2025/03-March/month-2025-03.json")
                .unwrap(),
        )
        .unwrap();
        assert_eq!(json["scope"]["kind"], "month");
        assert_eq!(json["activeDayCount"], 1);
        assert_eq!(json["days"].as_array().unwrap().len(), 31);
        assert_eq!(json["days"][1]["charsTyped"], 5);
    }

    #[test]
    fn rollup_all_covers_every_month_with_days() {
        let storage = MemoryStorage::new();
        write_day(&storage, &record(1, 15, 40)).unwrap();
        write_day(&storage, &record(3, 2, 5)).unwrap();
        let eve = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
        write_day(&storage, &DayRecord::new(eve, eve.and_hms_opt(8, 0, 0).unwrap())).unwrap();

        let written = rollup_all(&storage, Some(2025), &AggregateOptions::default()).unwrap();
        let scopes: Vec<String> = written.iter().map(|a| a.scope.to_string()).collect();
        assert_eq!(scopes, vec!["2025-01", "2025-03", "2025"]);
        assert!(!storage.exists("2024/year-2024.json").unwrap());

        let everything = rollup_all(&storage, None, &AggregateOptions::default()).unwrap();
        assert_eq!(everything.len(), 5);
    }
}
