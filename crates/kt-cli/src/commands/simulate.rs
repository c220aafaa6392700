//! Simulate command: replay a seeded typing session into today's record.
//!
//! The engine runs on a manual clock that starts at the current time and is
//! advanced by each replayed pause, so the replay finishes immediately.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::NaiveDateTime;
use kt_core::{Action, ManualClock, Simulation, SimulationOptions};

use crate::Config;
use crate::commands::util::{lock_stats_dir, start_engine};

pub async fn run<W: Write>(
    writer: &mut W,
    config: &Config,
    options: SimulationOptions,
    start: NaiveDateTime,
) -> Result<()> {
    let _lock = lock_stats_dir(&config.stats_dir)?;
    let clock = ManualClock::new(start);
    let mut engine = start_engine(config, Arc::new(clock.clone()))?;

    let mut simulation = Simulation::new(options);
    let mut typed = 0_u64;
    let mut elapsed_ms = 0_u64;
    for step in simulation.by_ref() {
        clock.advance_ms(i64::try_from(step.delay_ms)?);
        elapsed_ms += step.delay_ms;
        if matches!(step.action, Action::TypedChar(_)) {
            typed += 1;
        }
        engine.record_action(&step.action);
    }
    engine.end_streak();
    engine.shutdown().await?;

    tracing::info!(typed, typos = simulation.typos(), elapsed_ms, "replay finished");
    writeln!(
        writer,
        "Replayed {typed} keystrokes with {} corrected typos over {:.1}s.",
        simulation.typos(),
        Duration::from_millis(elapsed_ms).as_secs_f64()
    )?;
    Ok(())
}
