//! Running totals, one-minute rate samples and derived ratios.
//!
//! # Formulas
//!
//! At the end of each one-minute activity window:
//! - `wordsPerMinute = wordsTyped / max(activeMinutes, 1)`
//! - `charsPerMinute = charsTyped / max(activeMinutes, 1)`
//! - `focusIndex = activeMinutes * charsPerMinute / max(sessionMinutes, 1)`,
//!   where `sessionMinutes` is the rounded time since the day's first session.
//!
//! After every event:
//! - `accuracy = 1 - charsDeleted / charsTyped` (1 when nothing was typed).
//!   Not clamped: it goes negative when deletions outnumber typed characters.
//! - `vimRatio = vim / (vim + system + charsTyped)`
//!
//! Words are counted only when the word boundary is typed, so a trailing word
//! that is never followed by a space is not counted.

use chrono::NaiveDateTime;

use crate::key::{Action, ShortcutNamespace};
use crate::record::{DayRecord, SpeedSample, Totals, WORD_BOUNDARY, round_minutes};

/// Length of one activity sampling window.
pub const WINDOW_MS: i64 = 60_000;

/// Applies classified actions to the current day record.
#[derive(Debug, Clone)]
pub struct MetricsEngine {
    last_snapshot: NaiveDateTime,
}

impl MetricsEngine {
    /// Starts sampling windows at `now`.
    pub const fn new(now: NaiveDateTime) -> Self {
        Self { last_snapshot: now }
    }

    pub const fn last_snapshot(&self) -> NaiveDateTime {
        self.last_snapshot
    }

    /// Counts `action`, commits a rate sample if a window has elapsed, and
    /// recomputes the derived ratios.
    ///
    /// Returns `true` when a window was committed.
    pub fn apply(&mut self, record: &mut DayRecord, action: &Action, now: NaiveDateTime) -> bool {
        count(record, action);
        let sampled = self.sample(record, now);
        recompute_derived(record);
        sampled
    }

    #[allow(clippy::cast_precision_loss)]
    fn sample(&mut self, record: &mut DayRecord, now: NaiveDateTime) -> bool {
        if (now - self.last_snapshot).num_milliseconds() < WINDOW_MS {
            return false;
        }

        record.active_minutes += 1;
        record.current_focus_streak += 1;

        let minutes = f64::from(record.active_minutes.max(1));
        let words_per_minute = record.totals.words_typed as f64 / minutes;
        let chars_per_minute = record.totals.chars_typed as f64 / minutes;
        record.speed_history.push(SpeedSample {
            timestamp: now,
            words_per_minute,
            chars_per_minute,
        });

        record.focus_index = focus_index(record);

        self.last_snapshot = now;
        tracing::debug!(
            active_minutes = record.active_minutes,
            chars_per_minute,
            "committed activity window"
        );
        true
    }
}

/// Increments the counters an action contributes to.
pub fn count(record: &mut DayRecord, action: &Action) {
    match action {
        Action::TypedChar(c) => {
            record.totals.chars_typed += 1;
            if *c == WORD_BOUNDARY {
                record.totals.words_typed += 1;
            }
            *record.key_frequency.entry(c.to_string()).or_default() += 1;
        }
        Action::Deletion(symbol) => {
            record.totals.chars_deleted += 1;
            *record
                .deleted_char_frequency
                .entry(symbol.clone())
                .or_default() += 1;
        }
        Action::ShortcutInvoked {
            signature,
            namespace,
        } => {
            *record
                .shortcut_usage
                .namespace_mut(*namespace)
                .entry(signature.clone())
                .or_default() += 1;
        }
    }
}

/// Recomputes `accuracy`, `vimRatio` and `focusIndex` from the record's
/// counters and its latest rate sample.
pub fn recompute_derived(record: &mut DayRecord) {
    record.accuracy = accuracy(&record.totals);
    record.vim_ratio = vim_ratio(record);
    record.focus_index = focus_index(record);
}

/// Focus index as of the latest committed window, 0 before the first one.
///
/// Windows are the only place `activeMinutes` grows, so the latest sample
/// fully determines the value.
#[allow(clippy::cast_precision_loss)]
pub fn focus_index(record: &DayRecord) -> f64 {
    let Some(sample) = record.speed_history.last() else {
        return 0.0;
    };
    let session_minutes =
        round_minutes((sample.timestamp - record.session_start).num_milliseconds()).max(1);
    f64::from(record.active_minutes) * sample.chars_per_minute / session_minutes as f64
}

/// Share of typed characters that were not deleted.
#[allow(clippy::cast_precision_loss)]
pub fn accuracy(totals: &Totals) -> f64 {
    if totals.chars_typed == 0 {
        return 1.0;
    }
    1.0 - totals.chars_deleted as f64 / totals.chars_typed as f64
}

/// Share of modal-editing shortcuts among all counted keys.
#[allow(clippy::cast_precision_loss)]
pub fn vim_ratio(record: &DayRecord) -> f64 {
    let vim = record.shortcut_usage.total(ShortcutNamespace::Vim);
    let system = record.shortcut_usage.total(ShortcutNamespace::System);
    let total = vim + system + record.totals.chars_typed;
    if total == 0 {
        return 0.0;
    }
    vim as f64 / total as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::LINE_BREAK;
    use chrono::{Duration, NaiveDate};

    fn ts(ms: i64) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 15)
            .and_then(|d| d.and_hms_opt(9, 0, 0))
            .expect("valid test timestamp")
            + Duration::milliseconds(ms)
    }

    fn typed(c: char) -> Action {
        Action::TypedChar(c)
    }

    #[test]
    fn typing_ab_space_counts_one_word() {
        let mut record = DayRecord::new(ts(0).date(), ts(0));
        let mut metrics = MetricsEngine::new(ts(0));
        for (i, c) in "ab ".chars().enumerate() {
            metrics.apply(&mut record, &typed(c), ts(i64::try_from(i).unwrap() * 100));
        }

        assert_eq!(record.totals.chars_typed, 3);
        assert_eq!(record.totals.words_typed, 1);
        let expected: Vec<(&str, u64)> = vec![(" ", 1), ("a", 1), ("b", 1)];
        let actual: Vec<(&str, u64)> = record
            .key_frequency
            .iter()
            .map(|(k, v)| (k.as_str(), *v))
            .collect();
        assert_eq!(actual, expected);
    }

    #[test]
    fn trailing_word_is_not_counted() {
        let mut record = DayRecord::new(ts(0).date(), ts(0));
        let mut metrics = MetricsEngine::new(ts(0));
        for c in "one two".chars() {
            metrics.apply(&mut record, &typed(c), ts(0));
        }
        assert_eq!(record.totals.words_typed, 1);
    }

    #[test]
    fn deletions_do_not_change_typed_count() {
        let mut record = DayRecord::new(ts(0).date(), ts(0));
        let mut metrics = MetricsEngine::new(ts(0));
        metrics.apply(&mut record, &typed('x'), ts(0));
        metrics.apply(&mut record, &Action::Deletion("x".into()), ts(0));
        metrics.apply(&mut record, &Action::Deletion(LINE_BREAK.into()), ts(0));

        assert_eq!(record.totals.chars_typed, 1);
        assert_eq!(record.totals.chars_deleted, 2);
        assert_eq!(record.deleted_char_frequency.get(LINE_BREAK), Some(&1));
        // Not clamped.
        assert!((record.accuracy - (-1.0)).abs() < 1e-9);
    }

    #[test]
    fn accuracy_is_one_only_without_typing() {
        let mut totals = Totals::default();
        assert!((accuracy(&totals) - 1.0).abs() < f64::EPSILON);
        totals.chars_typed = 4;
        totals.chars_deleted = 1;
        assert!((accuracy(&totals) - 0.75).abs() < 1e-9);
    }

    #[test]
    fn shortcuts_feed_vim_ratio_denominator() {
        let mut record = DayRecord::new(ts(0).date(), ts(0));
        let mut metrics = MetricsEngine::new(ts(0));
        let save = Action::ShortcutInvoked {
            signature: "ctrl+s".into(),
            namespace: ShortcutNamespace::System,
        };
        metrics.apply(&mut record, &save, ts(0));
        metrics.apply(&mut record, &typed('a'), ts(0));
        assert_eq!(record.shortcut_usage.system.get("ctrl+s"), Some(&1));
        assert!(record.vim_ratio.abs() < f64::EPSILON);

        record.shortcut_usage.vim.insert("dd".into(), 2);
        recompute_derived(&mut record);
        assert!((record.vim_ratio - 0.5).abs() < 1e-9);
    }

    #[test]
    fn one_sample_per_elapsed_window() {
        let mut record = DayRecord::new(ts(0).date(), ts(0));
        let mut metrics = MetricsEngine::new(ts(0));
        let mut committed = 0;
        // An event every ten seconds for five minutes.
        for i in 1..=30 {
            if metrics.apply(&mut record, &typed('a'), ts(i * 10_000)) {
                committed += 1;
            }
        }
        assert_eq!(committed, 5);
        assert_eq!(record.speed_history.len(), 5);
        assert_eq!(record.active_minutes, 5);
        assert_eq!(record.current_focus_streak, 5);
        assert!(
            record
                .speed_history
                .windows(2)
                .all(|w| (w[1].timestamp - w[0].timestamp).num_milliseconds() >= WINDOW_MS)
        );
    }

    #[test]
    fn window_rates_and_focus_index() {
        let mut record = DayRecord::new(ts(0).date(), ts(0));
        let mut metrics = MetricsEngine::new(ts(0));
        for i in 1..=60 {
            metrics.apply(&mut record, &typed('a'), ts(i * 1_000));
        }
        let sample = record.speed_history.last().expect("one window committed");
        assert_eq!(sample.timestamp, ts(60_000));
        assert!((sample.chars_per_minute - 60.0).abs() < 1e-9);
        assert!(sample.words_per_minute.abs() < f64::EPSILON);
        assert!((record.focus_index - 60.0).abs() < 1e-9);
        assert_eq!(metrics.last_snapshot(), ts(60_000));
    }

    #[test]
    fn long_pause_commits_single_window() {
        let mut record = DayRecord::new(ts(0).date(), ts(0));
        let mut metrics = MetricsEngine::new(ts(0));
        assert!(metrics.apply(&mut record, &typed('a'), ts(10 * 60_000)));
        assert_eq!(record.speed_history.len(), 1);
        assert_eq!(record.active_minutes, 1);
    }
}
