//! The keytally telemetry engine.
//!
//! An [`Engine`] owns today's day record and drives it from key signals:
//! classification, session boundaries, metrics. Persistence happens on a
//! background worker that executes writes in submission order, so the event
//! path never waits on storage and a slow write can never be overtaken by a
//! later one.

mod engine;
mod notifier;
mod source;
mod worker;

use kt_store::StoreError;
use thiserror::Error;

pub use engine::{Engine, EngineOptions, RESET_PHRASE};
pub use notifier::{LogNotifier, Notifier, RecordingNotifier};
pub use source::{ChannelSource, EventSource, JsonLinesSource, StdinSource};

/// Errors surfaced by engine operations outside the event path.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Storage failed while the engine was starting.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// A hard reset was requested without the exact confirmation phrase.
    #[error("reset not confirmed: type {expected:?} to delete all statistics")]
    ResetNotConfirmed { expected: &'static str },

    /// The event source cannot be subscribed to.
    #[error("event source unavailable: {0}")]
    Source(String),

    /// The persistence worker could not be started or has stopped.
    #[error("persistence worker unavailable: {0}")]
    Worker(String),
}
