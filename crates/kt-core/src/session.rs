//! Session and focus-streak boundaries.
//!
//! A session is a run of activity without an idle gap longer than
//! [`IDLE_THRESHOLD_MS`]. The timeout is evaluated lazily when the next event
//! arrives; there is no timer. Closing a session also commits the in-progress
//! focus streak.

use chrono::NaiveDateTime;

use crate::record::{DayRecord, Session};

/// Inactivity longer than this closes the open session.
pub const IDLE_THRESHOLD_MS: i64 = 120_000;

/// Whether the current day has an open session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    NoOpenSession,
    OpenSession,
}

/// What an observed event did to the session sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The event continued the open session.
    Continued,
    /// An idle gap closed the previous session and a new one was opened.
    Rotated { closed_minutes: i64 },
    /// A session was opened after the previous one was ended explicitly.
    Opened,
    /// A session opened while `restartPending` was set. The flag has been
    /// cleared; the caller must start a fresh day record.
    RestartRequested,
}

/// Tracks idle gaps between classified events.
#[derive(Debug, Clone)]
pub struct SessionTracker {
    /// `None` until the first event after engine start.
    last_activity: Option<NaiveDateTime>,
}

impl SessionTracker {
    pub const fn new() -> Self {
        Self {
            last_activity: None,
        }
    }

    pub const fn last_activity(&self) -> Option<NaiveDateTime> {
        self.last_activity
    }

    pub fn state(record: &DayRecord) -> SessionState {
        if record.open_session().is_some() {
            SessionState::OpenSession
        } else {
            SessionState::NoOpenSession
        }
    }

    /// Applies session boundary rules for a classified event at `now`.
    ///
    /// The first event after start never splits the open session: there is
    /// no earlier event to measure a gap against.
    pub fn observe(&mut self, record: &mut DayRecord, now: NaiveDateTime) -> Transition {
        let idle_gap = self
            .last_activity
            .map_or(0, |last| (now - last).num_milliseconds());
        self.last_activity = Some(now);

        let transition = if record.open_session().is_none() {
            record.sessions.push(Session::open(now));
            Transition::Opened
        } else if idle_gap > IDLE_THRESHOLD_MS {
            let closed_minutes = record.open_session_mut().map_or(0, |open| open.close(now));
            commit_focus_streak(record);
            record.sessions.push(Session::open(now));
            tracing::debug!(idle_gap, closed_minutes, "idle gap closed session");
            Transition::Rotated { closed_minutes }
        } else {
            Transition::Continued
        };

        if transition != Transition::Continued && record.restart_pending {
            record.restart_pending = false;
            return Transition::RestartRequested;
        }
        transition
    }

    /// Ends the focus streak on request: commits the streak and closes the
    /// open session without opening a replacement.
    ///
    /// Returns the closed session's length in minutes, if one was open.
    pub fn end_streak(&mut self, record: &mut DayRecord, now: NaiveDateTime) -> Option<i64> {
        commit_focus_streak(record);
        let closed = record.open_session_mut().map(|open| open.close(now));
        record.session_end = Some(now);
        closed
    }
}

impl Default for SessionTracker {
    fn default() -> Self {
        Self::new()
    }
}

fn commit_focus_streak(record: &mut DayRecord) {
    record.focus_streaks.push(record.current_focus_streak);
    record.current_focus_streak = 0;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn ts(ms: i64) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 15)
            .and_then(|d| d.and_hms_opt(9, 0, 0))
            .expect("valid test timestamp")
            + Duration::milliseconds(ms)
    }

    fn fresh() -> DayRecord {
        DayRecord::new(ts(0).date(), ts(0))
    }

    #[test]
    fn first_event_never_splits() {
        let mut record = fresh();
        let mut tracker = SessionTracker::new();
        let transition = tracker.observe(&mut record, ts(10 * 60_000));
        assert_eq!(transition, Transition::Continued);
        assert_eq!(record.sessions.len(), 1);
    }

    #[test]
    fn idle_gap_rotates_session() {
        let mut record = fresh();
        record.current_focus_streak = 4;
        let mut tracker = SessionTracker::new();
        tracker.observe(&mut record, ts(0));
        let transition = tracker.observe(&mut record, ts(121_000));

        assert_eq!(transition, Transition::Rotated { closed_minutes: 2 });
        assert_eq!(record.sessions.len(), 2);
        assert_eq!(record.sessions[0].end, Some(ts(121_000)));
        assert_eq!(record.sessions[0].duration_minutes, 2);
        assert!(record.sessions[1].is_open());
        assert_eq!(record.sessions[1].start, ts(121_000));
        assert_eq!(record.focus_streaks, vec![4]);
        assert_eq!(record.current_focus_streak, 0);
    }

    #[test]
    fn gap_at_threshold_continues() {
        let mut record = fresh();
        let mut tracker = SessionTracker::new();
        tracker.observe(&mut record, ts(0));
        assert_eq!(
            tracker.observe(&mut record, ts(IDLE_THRESHOLD_MS)),
            Transition::Continued
        );
        assert_eq!(tracker.last_activity(), Some(ts(IDLE_THRESHOLD_MS)));
    }

    #[test]
    fn end_streak_leaves_no_open_session() {
        let mut record = fresh();
        record.current_focus_streak = 3;
        let mut tracker = SessionTracker::new();
        tracker.observe(&mut record, ts(0));

        let closed = tracker.end_streak(&mut record, ts(5 * 60_000));
        assert_eq!(closed, Some(5));
        assert_eq!(SessionTracker::state(&record), SessionState::NoOpenSession);
        assert_eq!(record.session_end, Some(ts(5 * 60_000)));
        assert_eq!(record.focus_streaks, vec![3]);

        // The next event opens a session without committing another streak.
        let transition = tracker.observe(&mut record, ts(5 * 60_000 + 1_000));
        assert_eq!(transition, Transition::Opened);
        assert_eq!(record.sessions.len(), 2);
        assert_eq!(record.focus_streaks, vec![3]);
    }

    #[test]
    fn restart_pending_reported_on_new_session() {
        let mut record = fresh();
        record.restart_pending = true;
        let mut tracker = SessionTracker::new();

        assert_eq!(tracker.observe(&mut record, ts(0)), Transition::Continued);
        assert!(record.restart_pending);

        let transition = tracker.observe(&mut record, ts(200_000));
        assert_eq!(transition, Transition::RestartRequested);
        assert!(!record.restart_pending);
    }

    #[test]
    fn session_sequence_stays_ordered_and_bounded() {
        let mut record = fresh();
        let mut tracker = SessionTracker::new();
        let mut previous = 0;
        // Activity every minute with an idle gap every fifth event.
        for i in 0..20 {
            let now = ts(i * 60_000 + (i / 5) * 180_000);
            tracker.observe(&mut record, now);
            let covered = record.session_minutes(now);
            assert!(covered >= previous, "session minutes decreased");
            assert!(covered <= (now - ts(0)).num_minutes());
            previous = covered;
        }
        let open = record.sessions.iter().filter(|s| s.is_open()).count();
        assert_eq!(open, 1);
        assert!(record.sessions.last().is_some_and(Session::is_open));
        assert!(record.sessions.windows(2).all(|w| w[0].end <= Some(w[1].start)));
    }
}
