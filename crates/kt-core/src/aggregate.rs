//! Month and year aggregation over day records.
//!
//! An [`Aggregate`] is a pure function of the day records in its scope:
//! aggregating the same set twice yields equal values, so the rollup can be
//! re-run on every save without drift.
//!
//! # Ranking
//!
//! - Alphabet and symbol tables follow the fixed order of [`ALPHABET`] and
//!   [`SYMBOLS`]; absent keys count zero.
//! - Shortcut tables are sorted by count, descending. Equal counts keep
//!   ascending key order.
//! - The most-deleted symbol is chosen over all deletions, the word boundary
//!   included. The top deletions list never contains the word boundary.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{Datelike, Months, NaiveDate, Weekday};
use serde::Serialize;

use crate::record::{DayRecord, LINE_BREAK, WORD_BOUNDARY};

/// Letters reported in the alphabet table, in order.
pub const ALPHABET: [&str; 26] = [
    "a", "b", "c", "d", "e", "f", "g", "h", "i", "j", "k", "l", "m", "n", "o", "p", "q", "r", "s",
    "t", "u", "v", "w", "x", "y", "z",
];

/// Symbols reported in the symbol table, in order.
pub const SYMBOLS: [&str; 30] = [
    " ", "ä", "ö", "ü", "à", "è", "é", "ç", ".", ",", ";", ":", "!", "?", "'", "\"", "-", "_", "(",
    ")", "/", "+", "*", "@", "#", "§", "$", "%", "&", "=",
];

/// Length of the top deletions list.
pub const TOP_DELETED_LIMIT: usize = 20;

/// The calendar range an aggregate covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Scope {
    Month { year: i32, month: u32 },
    Year { year: i32 },
}

impl Scope {
    /// The month containing `date`.
    pub fn month_of(date: NaiveDate) -> Self {
        Self::Month {
            year: date.year(),
            month: date.month(),
        }
    }

    /// The year containing `date`.
    pub fn year_of(date: NaiveDate) -> Self {
        Self::Year { year: date.year() }
    }

    pub const fn year(&self) -> i32 {
        match self {
            Self::Month { year, .. } | Self::Year { year } => *year,
        }
    }

    /// First day in range, or `None` for an out-of-range year or month.
    pub fn first_day(&self) -> Option<NaiveDate> {
        match *self {
            Self::Month { year, month } => NaiveDate::from_ymd_opt(year, month, 1),
            Self::Year { year } => NaiveDate::from_ymd_opt(year, 1, 1),
        }
    }

    /// Last day in range, inclusive.
    pub fn last_day(&self) -> Option<NaiveDate> {
        let span = match self {
            Self::Month { .. } => Months::new(1),
            Self::Year { .. } => Months::new(12),
        };
        self.first_day()?.checked_add_months(span)?.pred_opt()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        match *self {
            Self::Month { year, month } => date.year() == year && date.month() == month,
            Self::Year { year } => date.year() == year,
        }
    }

    /// Every calendar day in range, in order.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let last = self.last_day();
        self.first_day()
            .into_iter()
            .flat_map(|first| first.iter_days())
            .take_while(move |day| last.is_some_and(|last| *day <= last))
    }

    /// File stem of the rendered report, e.g. `month-2025-01` or `year-2025`.
    pub fn stem(&self) -> String {
        match self {
            Self::Month { year, month } => format!("month-{year:04}-{month:02}"),
            Self::Year { year } => format!("year-{year:04}"),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Month { year, month } => write!(f, "{year:04}-{month:02}"),
            Self::Year { year } => write!(f, "{year:04}"),
        }
    }
}

/// Tunables for aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregateOptions {
    /// Weekday whose rows are flagged for highlighting.
    pub rest_day: Weekday,
}

impl Default for AggregateOptions {
    fn default() -> Self {
        Self {
            rest_day: Weekday::Sun,
        }
    }
}

/// One ranked or fixed-slot table entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tally {
    /// The raw key as stored in the frequency map.
    pub symbol: String,
    /// Display form: word boundary and line break are named.
    pub label: String,
    pub count: u64,
}

impl Tally {
    fn new(symbol: &str, count: u64) -> Self {
        Self {
            symbol: symbol.to_string(),
            label: display_symbol(symbol).to_string(),
            count,
        }
    }
}

/// Deletion rankings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletionLeaderboard {
    /// Single most-deleted symbol over all deletions. `None` without deletions.
    pub most_deleted: Option<Tally>,
    /// Up to [`TOP_DELETED_LIMIT`] symbols by count, word boundary excluded.
    pub top: Vec<Tally>,
}

impl DeletionLeaderboard {
    fn from_frequency(frequency: &BTreeMap<String, u64>) -> Self {
        let mut most_deleted: Option<(&str, u64)> = None;
        for (symbol, &count) in frequency {
            if most_deleted.is_none_or(|(_, best)| count > best) {
                most_deleted = Some((symbol.as_str(), count));
            }
        }

        let boundary = WORD_BOUNDARY.to_string();
        let mut top = ranked(frequency);
        top.retain(|tally| tally.symbol != boundary);
        top.truncate(TOP_DELETED_LIMIT);

        Self {
            most_deleted: most_deleted.map(|(symbol, count)| Tally::new(symbol, count)),
            top,
        }
    }

    /// Whether the word boundary was the most-deleted symbol.
    pub fn boundary_most_deleted(&self) -> bool {
        let boundary = WORD_BOUNDARY.to_string();
        self.most_deleted
            .as_ref()
            .is_some_and(|tally| tally.symbol == boundary)
    }
}

/// Per-day row; days without a record are zero rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayRow {
    pub date: NaiveDate,
    pub weekday: Weekday,
    /// Whether a day record exists for this date.
    pub recorded: bool,
    pub chars_typed: u64,
    pub words_typed: u64,
    pub chars_per_minute: u64,
    pub words_per_minute: u64,
    /// The day falls on the configured rest day.
    pub rest_day: bool,
}

impl DayRow {
    fn new(date: NaiveDate, record: Option<&DayRecord>, options: &AggregateOptions) -> Self {
        let (chars_typed, words_typed, minutes) = record.map_or((0, 0, 0), |r| {
            (r.totals.chars_typed, r.totals.words_typed, r.active_minutes)
        });
        Self {
            date,
            weekday: date.weekday(),
            recorded: record.is_some(),
            chars_typed,
            words_typed,
            chars_per_minute: per_minute(chars_typed, minutes),
            words_per_minute: per_minute(words_typed, minutes),
            rest_day: date.weekday() == options.rest_day,
        }
    }
}

/// Summary of every day record in a scope.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Aggregate {
    pub scope: Scope,
    pub total_chars_typed: u64,
    pub total_words_typed: u64,
    pub active_day_count: u32,
    /// Mean accuracy over active days; 0 when there are none.
    pub average_accuracy: f64,
    pub key_frequency: BTreeMap<String, u64>,
    pub deleted_char_frequency: BTreeMap<String, u64>,
    pub system_shortcuts: BTreeMap<String, u64>,
    pub vim_shortcuts: BTreeMap<String, u64>,
    pub alphabet: Vec<Tally>,
    pub symbols: Vec<Tally>,
    pub system_ranking: Vec<Tally>,
    pub vim_ranking: Vec<Tally>,
    pub deletions: DeletionLeaderboard,
    pub days: Vec<DayRow>,
}

/// Aggregates the records that fall inside `scope`.
///
/// Records outside the scope are ignored. When two records share a date the
/// later one in `records` wins.
pub fn aggregate(scope: Scope, records: &[DayRecord], options: &AggregateOptions) -> Aggregate {
    let by_date: BTreeMap<NaiveDate, &DayRecord> = records
        .iter()
        .filter(|record| scope.contains(record.date))
        .map(|record| (record.date, record))
        .collect();

    let mut key_frequency = BTreeMap::new();
    let mut deleted_char_frequency = BTreeMap::new();
    let mut system_shortcuts = BTreeMap::new();
    let mut vim_shortcuts = BTreeMap::new();
    let mut total_chars_typed = 0;
    let mut total_words_typed = 0;
    let mut active_day_count = 0;
    let mut accuracy_sum = 0.0;

    for record in by_date.values() {
        merge(&mut key_frequency, &record.key_frequency);
        merge(&mut deleted_char_frequency, &record.deleted_char_frequency);
        merge(&mut system_shortcuts, &record.shortcut_usage.system);
        merge(&mut vim_shortcuts, &record.shortcut_usage.vim);

        if record.is_active() {
            active_day_count += 1;
            total_chars_typed += record.totals.chars_typed;
            total_words_typed += record.totals.words_typed;
            accuracy_sum += record.accuracy;
        }
    }

    let average_accuracy = if active_day_count > 0 {
        accuracy_sum / f64::from(active_day_count)
    } else {
        0.0
    };

    let days = scope
        .days()
        .map(|date| DayRow::new(date, by_date.get(&date).copied(), options))
        .collect();

    tracing::debug!(
        %scope,
        records = by_date.len(),
        active_day_count,
        "aggregated day records"
    );

    Aggregate {
        scope,
        total_chars_typed,
        total_words_typed,
        active_day_count,
        average_accuracy,
        alphabet: fixed_slots(&ALPHABET, &key_frequency),
        symbols: fixed_slots(&SYMBOLS, &key_frequency),
        system_ranking: ranked(&system_shortcuts),
        vim_ranking: ranked(&vim_shortcuts),
        deletions: DeletionLeaderboard::from_frequency(&deleted_char_frequency),
        key_frequency,
        deleted_char_frequency,
        system_shortcuts,
        vim_shortcuts,
        days,
    }
}

/// Display form of a frequency key.
pub fn display_symbol(symbol: &str) -> &str {
    match symbol {
        " " => "Spacebar",
        "\n" => LINE_BREAK,
        other => other,
    }
}

fn merge(into: &mut BTreeMap<String, u64>, from: &BTreeMap<String, u64>) {
    for (key, count) in from {
        *into.entry(key.clone()).or_default() += count;
    }
}

fn fixed_slots(order: &[&str], frequency: &BTreeMap<String, u64>) -> Vec<Tally> {
    order
        .iter()
        .map(|symbol| Tally::new(symbol, frequency.get(*symbol).copied().unwrap_or(0)))
        .collect()
}

fn ranked(frequency: &BTreeMap<String, u64>) -> Vec<Tally> {
    let mut entries: Vec<Tally> = frequency
        .iter()
        .map(|(symbol, &count)| Tally::new(symbol, count))
        .collect();
    // Stable: equal counts stay in key order.
    entries.sort_by(|a, b| b.count.cmp(&a.count));
    entries
}

#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub(crate) fn per_minute(count: u64, minutes: u32) -> u64 {
    if minutes == 0 {
        return 0;
    }
    (count as f64 / f64::from(minutes)).round() as u64
}
