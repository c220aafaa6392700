//! Rollup command: rebuild month and year summaries from stored days.

use std::io::Write;

use anyhow::{Context, Result};
use kt_store::{FsStorage, rollup_all};

use crate::Config;
use crate::commands::util::lock_stats_dir;

pub fn run<W: Write>(writer: &mut W, config: &Config, year: Option<i32>) -> Result<()> {
    let _lock = lock_stats_dir(&config.stats_dir)?;
    let storage = FsStorage::new(&config.stats_dir);

    let written = rollup_all(&storage, year, &config.aggregate_options())
        .context("failed to roll up statistics")?;

    if written.is_empty() {
        writeln!(writer, "No day records to roll up.")?;
        return Ok(());
    }
    for aggregate in &written {
        writeln!(
            writer,
            "{}: {} characters over {} active days",
            aggregate.scope, aggregate.total_chars_typed, aggregate.active_day_count
        )?;
    }
    writeln!(writer, "Rolled up {} summaries.", written.len())?;
    Ok(())
}
