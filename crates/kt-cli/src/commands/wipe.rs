//! Wipe command: delete every statistic after an exact confirmation.

use std::io::Write;
use std::sync::Arc;

use anyhow::{Result, bail};
use kt_core::SystemClock;
use kt_engine::RESET_PHRASE;

use crate::Config;
use crate::commands::util::{lock_stats_dir, start_engine};

pub async fn run<W: Write>(writer: &mut W, config: &Config, confirmation: Option<&str>) -> Result<()> {
    // Checked before the engine starts so a mismatch leaves the tree untouched.
    if confirmation != Some(RESET_PHRASE) {
        bail!(
            "refusing to delete statistics in {}: pass --confirm {RESET_PHRASE}",
            config.stats_dir.display()
        );
    }

    let _lock = lock_stats_dir(&config.stats_dir)?;
    let mut engine = start_engine(config, Arc::new(SystemClock))?;
    engine.hard_reset(RESET_PHRASE)?;
    engine.shutdown().await?;

    writeln!(writer, "Deleted all statistics in {}.", config.stats_dir.display())?;
    Ok(())
}
