use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDateTime;
use kt_core::{
    Action, AggregateOptions, Clock, DayRecord, KeySignal, MetricsEngine, Recovery,
    SessionTracker, Transition, classify, recover,
};
use kt_store::{Storage, load_current};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::EngineError;
use crate::notifier::Notifier;
use crate::source::EventSource;
use crate::worker::{Job, PersistenceWorker, ensure_folders};

/// The phrase a hard reset must be confirmed with, verbatim.
pub const RESET_PHRASE: &str = "DELETE";

#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Period of the autosave timer, independent of activity.
    pub autosave_interval: Duration,
    pub aggregate: AggregateOptions,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            autosave_interval: Duration::from_secs(60),
            aggregate: AggregateOptions::default(),
        }
    }
}

/// Owns today's record and turns key signals into telemetry.
///
/// Event handling is synchronous and never fails; everything that touches
/// storage is queued on the persistence worker.
pub struct Engine {
    record: DayRecord,
    sessions: SessionTracker,
    metrics: MetricsEngine,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn Notifier>,
    worker: PersistenceWorker,
    options: EngineOptions,
    /// Set when the day rolled over on a timer. The placeholder record is
    /// reopened at the first action so its session starts with real activity.
    awaiting_activity: bool,
}

impl Engine {
    /// Recovers the current day from storage and starts the persistence
    /// worker.
    ///
    /// A stale stored day is finalized here, once. Only a failure to read the
    /// stored blob is fatal; a blob that does not parse is replaced.
    pub fn start(
        storage: Arc<dyn Storage>,
        clock: Arc<dyn Clock>,
        notifier: Arc<dyn Notifier>,
        options: EngineOptions,
    ) -> Result<Self, EngineError> {
        let now = clock.now();
        if let Err(err) = ensure_folders(storage.as_ref(), now.date()) {
            tracing::warn!(error = %err, "failed to create statistics folders");
        }

        let stored = load_current(storage.as_ref())?;
        let recovery = recover(stored.as_deref(), now);
        match &recovery {
            Recovery::Discarded { reason, .. } => {
                tracing::warn!(error = %reason, "stored current day is unreadable, starting fresh");
            }
            Recovery::Rolled { stale, .. } => {
                tracing::info!(stale = %stale.date, "finalizing stale day");
            }
            Recovery::Fresh(_) | Recovery::Resumed(_) => {}
        }
        tracing::info!(outcome = recovery.label(), date = %recovery.current().date, "recovered current day");

        let needs_write = recovery.needs_write();
        let (record, stale) = recovery.into_parts();
        let worker = PersistenceWorker::spawn(storage, Arc::clone(&notifier), options.aggregate)?;

        if let Some(stale) = stale {
            let date = stale.date;
            worker.submit(Job::WriteDay(stale));
            worker.submit(Job::Rollup(date));
        }
        if needs_write {
            worker.submit(Job::SaveCurrent(record.clone()));
        }
        worker.submit(Job::WriteDay(record.clone()));
        worker.submit(Job::Rollup(record.date));

        Ok(Self {
            record,
            sessions: SessionTracker::new(),
            metrics: MetricsEngine::new(now),
            clock,
            notifier,
            worker,
            options,
            awaiting_activity: false,
        })
    }

    pub const fn record(&self) -> &DayRecord {
        &self.record
    }

    /// Classifies and records one key signal. Returns whether it counted.
    pub fn handle_signal(&mut self, signal: &KeySignal) -> bool {
        let Some(action) = classify(signal) else {
            return false;
        };
        self.record_action(&action);
        true
    }

    /// Applies a classified action at the clock's current time.
    pub fn record_action(&mut self, action: &Action) {
        let now = self.clock.now();
        self.roll_over(now);
        self.reopen_if_idle_since_rollover(now);

        match self.sessions.observe(&mut self.record, now) {
            Transition::RestartRequested => {
                tracing::info!("restart pending, starting a new day");
                self.replace_record(DayRecord::new(now.date(), now), now);
                self.sessions.observe(&mut self.record, now);
                self.worker.submit(Job::SaveCurrent(self.record.clone()));
            }
            Transition::Rotated { closed_minutes } => {
                tracing::debug!(closed_minutes, "session rotated");
            }
            Transition::Continued | Transition::Opened => {}
        }

        self.metrics.apply(&mut self.record, action, now);
    }

    /// Persists the current record, its day outputs, and the rollups above it.
    pub fn autosave(&mut self) {
        let now = self.clock.now();
        self.roll_over(now);
        self.record.session_end = Some(now);
        self.persist();
    }

    /// Ends the focus streak and the open session, then persists.
    pub fn end_streak(&mut self) {
        let now = self.clock.now();
        self.roll_over(now);
        self.reopen_if_idle_since_rollover(now);
        let closed = self.sessions.end_streak(&mut self.record, now);
        self.persist();
        tracing::info!(?closed, "focus streak ended");
        let message = closed.map_or_else(
            || "keytally: focus streak ended".to_string(),
            |minutes| format!("keytally: focus streak ended after {minutes} min"),
        );
        self.notifier.notify(&message);
    }

    /// Deletes every stored statistic and starts over.
    ///
    /// `confirmation` must equal [`RESET_PHRASE`]; anything else aborts before
    /// any deletion is queued.
    pub fn hard_reset(&mut self, confirmation: &str) -> Result<(), EngineError> {
        if confirmation != RESET_PHRASE {
            return Err(EngineError::ResetNotConfirmed {
                expected: RESET_PHRASE,
            });
        }

        let now = self.clock.now();
        self.worker.submit(Job::Wipe { today: now.date() });
        // The session tracker survives so the next idle gap triggers the restart.
        self.record = DayRecord::new(now.date(), now);
        self.record.restart_pending = true;
        self.metrics = MetricsEngine::new(now);
        self.awaiting_activity = false;
        self.worker.submit(Job::SaveCurrent(self.record.clone()));
        tracing::info!("hard reset queued");
        self.notifier
            .notify("keytally: statistics reset, a new day starts with the next session");
        Ok(())
    }

    /// Waits until all persistence queued so far has completed.
    pub async fn flush(&self) -> Result<(), EngineError> {
        self.worker.flush().await
    }

    /// Drives the engine from `source` until it closes or `cancel` fires.
    ///
    /// Autosaves on every tick of the configured interval. On exit the source
    /// is detached, the record saved once more, and the queue drained.
    /// Returns how many signals were counted.
    pub async fn run(
        &mut self,
        source: &mut dyn EventSource,
        cancel: CancellationToken,
    ) -> Result<u64, EngineError> {
        let mut signals = source.subscribe()?;
        let mut autosave = tokio::time::interval(self.options.autosave_interval);
        autosave.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        autosave.tick().await;

        let mut counted = 0_u64;
        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    tracing::debug!("engine cancelled");
                    break;
                }
                signal = signals.recv() => match signal {
                    Some(signal) => {
                        if self.handle_signal(&signal) {
                            counted += 1;
                        }
                    }
                    None => {
                        tracing::debug!("event source closed");
                        break;
                    }
                },
                _ = autosave.tick() => self.autosave(),
            }
        }

        source.unsubscribe();
        self.autosave();
        self.flush().await?;
        tracing::info!(counted, "engine stopped");
        Ok(counted)
    }

    /// Drains the queue and stops the persistence worker.
    pub async fn shutdown(self) -> Result<(), EngineError> {
        self.flush().await
    }

    fn persist(&self) {
        self.worker.submit(Job::SaveCurrent(self.record.clone()));
        self.worker.submit(Job::WriteDay(self.record.clone()));
        self.worker.submit(Job::Rollup(self.record.date));
    }

    /// Finalizes the current record if the calendar day changed under it.
    ///
    /// The new day's record is a placeholder until the next action or streak
    /// end reopens it, so an overnight idle stretch never counts as a session.
    fn roll_over(&mut self, now: NaiveDateTime) {
        if now.date() == self.record.date {
            return;
        }
        tracing::info!(from = %self.record.date, to = %now.date(), "day changed, finalizing");
        let stale = std::mem::replace(&mut self.record, DayRecord::new(now.date(), now));
        self.sessions = SessionTracker::new();
        self.metrics = MetricsEngine::new(now);
        self.awaiting_activity = true;

        let date = stale.date;
        self.worker.submit(Job::WriteDay(stale));
        self.worker.submit(Job::Rollup(date));
        self.worker.submit(Job::SaveCurrent(self.record.clone()));
    }

    fn reopen_if_idle_since_rollover(&mut self, now: NaiveDateTime) {
        if std::mem::take(&mut self.awaiting_activity) {
            tracing::debug!(%now, "first activity of the new day");
            self.replace_record(DayRecord::new(now.date(), now), now);
        }
    }

    fn replace_record(&mut self, record: DayRecord, now: NaiveDateTime) {
        self.record = record;
        self.sessions = SessionTracker::new();
        self.metrics = MetricsEngine::new(now);
    }
}
