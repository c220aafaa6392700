//! Core domain logic for keytally.
//!
//! This crate contains the pure, I/O-free parts of the typing telemetry engine:
//! - Classification: turning raw key signals into typed actions
//! - Session tracking: idle-gap session boundaries and focus streaks
//! - Metrics: running totals, one-minute rate samples, derived ratios
//! - Recovery: reconciling a persisted day with today's date
//! - Aggregation: month and year rollups with ranked tables
//! - Rendering: Markdown reports for days, months and years
//! - Simulation: a seeded, replayable typing sequence

pub mod aggregate;
mod clock;
pub mod key;
pub mod metrics;
pub mod record;
pub mod recovery;
pub mod render;
pub mod session;
pub mod simulate;

pub use aggregate::{
    Aggregate, AggregateOptions, DayRow, DeletionLeaderboard, Scope, Tally, aggregate,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use key::{Action, EditContext, KeyPhase, KeySignal, ShortcutNamespace, classify};
pub use metrics::MetricsEngine;
pub use record::{DayRecord, RecordError, Session, ShortcutUsage, SpeedSample, Totals};
pub use recovery::{Recovery, recover};
pub use render::{render_aggregate, render_day};
pub use session::{SessionTracker, Transition};
pub use simulate::{SimulatedAction, Simulation, SimulationOptions};
