//! Ordered persistence.
//!
//! Every write issued by the engine goes through one worker thread that runs
//! jobs in submission order. A later save of a path therefore always lands
//! after an earlier one, and the event path never blocks on storage.

use std::sync::{Arc, Mutex, PoisonError, mpsc};
use std::thread::{self, JoinHandle};

use chrono::{Datelike, NaiveDate};
use kt_core::{AggregateOptions, DayRecord};
use kt_store::{Storage, StoreError, cascade, layout, save_current, wipe_all, write_day_outputs};
use tokio::sync::oneshot;

use crate::EngineError;
use crate::notifier::Notifier;

/// A unit of persistence work.
#[derive(Debug)]
pub(crate) enum Job {
    /// Overwrite `current.json`.
    SaveCurrent(DayRecord),
    /// Write the day's record and rendered report into its month folder.
    WriteDay(DayRecord),
    /// Recompute the month and year containing the date.
    Rollup(NaiveDate),
    /// Delete the whole statistics tree, then recreate today's folders.
    Wipe { today: NaiveDate },
    /// Completes once every job queued before it has run.
    Barrier(oneshot::Sender<()>),
}

enum Command {
    Run(Job),
    Shutdown,
}

pub(crate) struct PersistenceWorker {
    sender: mpsc::Sender<Command>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl PersistenceWorker {
    pub(crate) fn spawn(
        storage: Arc<dyn Storage>,
        notifier: Arc<dyn Notifier>,
        options: AggregateOptions,
    ) -> Result<Self, EngineError> {
        let (sender, receiver) = mpsc::channel::<Command>();
        let handle = thread::Builder::new()
            .name("keytally-persist".into())
            .spawn(move || {
                while let Ok(command) = receiver.recv() {
                    match command {
                        Command::Run(job) => {
                            run_job(storage.as_ref(), notifier.as_ref(), &options, job);
                        }
                        Command::Shutdown => break,
                    }
                }
                tracing::debug!("persistence worker stopped");
            })
            .map_err(|err| EngineError::Worker(err.to_string()))?;

        Ok(Self {
            sender,
            handle: Mutex::new(Some(handle)),
        })
    }

    /// Queues a job. Never blocks.
    pub(crate) fn submit(&self, job: Job) {
        if let Err(err) = self.sender.send(Command::Run(job)) {
            tracing::error!(?err, "persistence worker is gone, dropping job");
        }
    }

    /// Waits until every job submitted so far has run.
    pub(crate) async fn flush(&self) -> Result<(), EngineError> {
        let (done, wait) = oneshot::channel();
        self.submit(Job::Barrier(done));
        wait.await
            .map_err(|_| EngineError::Worker("worker exited before flush".into()))
    }
}

impl Drop for PersistenceWorker {
    fn drop(&mut self) {
        let mut guard = self.handle.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = guard.take() {
            if self.sender.send(Command::Shutdown).is_err() {
                tracing::error!("failed to send shutdown to persistence worker");
            }
            if let Err(err) = handle.join() {
                tracing::error!(?err, "failed to join persistence worker");
            }
        }
    }
}

fn run_job(storage: &dyn Storage, notifier: &dyn Notifier, options: &AggregateOptions, job: Job) {
    let (what, result) = match job {
        Job::SaveCurrent(record) => ("save current day", save_current(storage, &record)),
        Job::WriteDay(record) => ("write day outputs", write_day_outputs(storage, &record)),
        Job::Rollup(date) => ("roll up", cascade(storage, date, options).map(|_| ())),
        Job::Wipe { today } => ("wipe statistics", wipe(storage, notifier, today)),
        Job::Barrier(done) => {
            let _ = done.send(());
            return;
        }
    };

    if let Err(err) = result {
        tracing::warn!(error = %err, "failed to {what}");
        notifier.notify(&format!("keytally: failed to {what}: {err}"));
    }
}

fn wipe(storage: &dyn Storage, notifier: &dyn Notifier, today: NaiveDate) -> Result<(), StoreError> {
    let deleted = wipe_all(storage)?;
    ensure_folders(storage, today)?;
    tracing::info!(deleted, "statistics wiped");
    notifier.notify(&format!("keytally: deleted {deleted} statistics files"));
    Ok(())
}

/// Creates the year and month folders for `date`.
pub(crate) fn ensure_folders(storage: &dyn Storage, date: NaiveDate) -> Result<(), StoreError> {
    storage.ensure_folder(&layout::year_folder(date.year()))?;
    if let Some(month) = layout::month_folder(date.year(), date.month()) {
        storage.ensure_folder(&month)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifier::RecordingNotifier;
    use kt_store::MemoryStorage;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 15).unwrap()
    }

    fn record(chars: u64) -> DayRecord {
        let mut record = DayRecord::new(date(), date().and_hms_opt(9, 0, 0).unwrap());
        record.totals.chars_typed = chars;
        record
    }

    #[tokio::test]
    async fn jobs_run_in_submission_order() {
        let storage = MemoryStorage::new();
        let notifier = RecordingNotifier::new();
        let worker = PersistenceWorker::spawn(
            Arc::new(storage.clone()),
            Arc::new(notifier.clone()),
            AggregateOptions::default(),
        )
        .unwrap();

        for chars in 1..=50 {
            worker.submit(Job::SaveCurrent(record(chars)));
        }
        worker.flush().await.unwrap();

        let saved = DayRecord::from_json(storage.read(layout::CURRENT).unwrap().unwrap().as_slice())
            .unwrap();
        assert_eq!(saved.totals.chars_typed, 50);
        assert_eq!(storage.write_count(), 50);
        assert!(notifier.messages().is_empty());
    }

    #[tokio::test]
    async fn failures_are_notified_not_raised() {
        let storage = MemoryStorage::new();
        storage.fail_writes(true);
        let notifier = RecordingNotifier::new();
        let worker = PersistenceWorker::spawn(
            Arc::new(storage.clone()),
            Arc::new(notifier.clone()),
            AggregateOptions::default(),
        )
        .unwrap();

        worker.submit(Job::SaveCurrent(record(3)));
        worker.submit(Job::WriteDay(record(3)));
        worker.flush().await.unwrap();

        let messages = notifier.messages();
        assert_eq!(messages.len(), 2);
        assert!(messages[0].contains("save current day"));
        assert!(messages[1].contains("write day outputs"));
    }

    #[tokio::test]
    async fn wipe_recreates_today_folders() {
        let storage = MemoryStorage::new();
        storage.write("2024/year-2024.md", b"old").unwrap();
        let notifier = RecordingNotifier::new();
        let worker = PersistenceWorker::spawn(
            Arc::new(storage.clone()),
            Arc::new(notifier.clone()),
            AggregateOptions::default(),
        )
        .unwrap();

        worker.submit(Job::Wipe { today: date() });
        worker.flush().await.unwrap();

        assert!(!storage.exists("2024/year-2024.md").unwrap());
        assert!(storage.exists("2025/01-January").unwrap());
        assert_eq!(notifier.messages(), vec!["keytally: deleted 1 statistics files"]);
    }
}
