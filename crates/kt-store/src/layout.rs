//! Logical paths inside the statistics tree.

use chrono::{Datelike, NaiveDate};
use kt_core::Scope;

/// The persisted current-day record.
pub const CURRENT: &str = "current.json";

/// Advisory lock held by the single writer of a statistics tree.
pub const LOCK_FILE: &str = ".lock";

const DAYS: &str = "days";
const REPORTS: &str = "reports";

pub fn year_folder(year: i32) -> String {
    format!("{year:04}")
}

/// Month folder, e.g. `2025/01-January`. `None` for an invalid month.
pub fn month_folder(year: i32, month: u32) -> Option<String> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    Some(format!("{}/{}", year_folder(year), first.format("%m-%B")))
}

fn month_folder_of(date: NaiveDate) -> String {
    format!("{}/{}", year_folder(date.year()), date.format("%m-%B"))
}

/// Folder holding a month's day records.
pub fn days_folder(year: i32, month: u32) -> Option<String> {
    month_folder(year, month).map(|folder| format!("{folder}/{DAYS}"))
}

pub fn day_record(date: NaiveDate) -> String {
    format!("{}/{DAYS}/{date}.json", month_folder_of(date))
}

pub fn day_report(date: NaiveDate) -> String {
    format!("{}/{REPORTS}/{date}.md", month_folder_of(date))
}

/// Folder a scope's aggregate files live in.
pub fn scope_folder(scope: Scope) -> Option<String> {
    match scope {
        Scope::Month { year, month } => month_folder(year, month),
        Scope::Year { year } => Some(year_folder(year)),
    }
}

pub fn aggregate_json(scope: Scope) -> Option<String> {
    scope_folder(scope).map(|folder| format!("{folder}/{}.json", scope.stem()))
}

pub fn aggregate_report(scope: Scope) -> Option<String> {
    scope_folder(scope).map(|folder| format!("{folder}/{}.md", scope.stem()))
}

/// The date of a day record path, or `None` for any other path.
pub fn parse_day_record(path: &str) -> Option<NaiveDate> {
    let (folder, file) = path.rsplit_once('/')?;
    if !folder.ends_with(&format!("/{DAYS}")) {
        return None;
    }
    let stem = file.strip_suffix(".json")?;
    let date = NaiveDate::parse_from_str(stem, "%Y-%m-%d").ok()?;
    (path == day_record(date)).then_some(date)
}
