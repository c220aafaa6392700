//! Watch command: the engine fed by JSON-lines key signals.

use std::io::Write;
use std::sync::Arc;

use anyhow::{Context, Result};
use kt_core::SystemClock;
use kt_engine::{EventSource, StdinSource};
use tokio_util::sync::CancellationToken;

use crate::Config;
use crate::commands::util::{lock_stats_dir, start_engine};

/// Runs until `source` closes or Ctrl-C.
pub async fn run<W: Write>(writer: &mut W, config: &Config, source: &mut dyn EventSource) -> Result<()> {
    let _lock = lock_stats_dir(&config.stats_dir)?;
    let mut engine = start_engine(config, Arc::new(SystemClock))?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupted, saving");
            on_interrupt.cancel();
        }
    });

    let counted = engine
        .run(source, cancel)
        .await
        .context("engine stopped unexpectedly")?;
    interrupt.abort();

    let record = engine.record();
    writeln!(
        writer,
        "Recorded {counted} key actions. Today: {} characters, {} words.",
        record.totals.chars_typed, record.totals.words_typed
    )?;
    engine.shutdown().await?;
    Ok(())
}

/// Watches stdin.
pub async fn run_stdin<W: Write>(writer: &mut W, config: &Config) -> Result<()> {
    run(writer, config, &mut StdinSource::new()).await
}
