//! Purge-vim command: drop vim shortcut counts from the current day.

use std::io::Write;

use anyhow::{Context, Result};
use kt_store::{FsStorage, VimPurge, purge_vim};

use crate::Config;
use crate::commands::util::lock_stats_dir;

pub fn run<W: Write>(writer: &mut W, config: &Config) -> Result<()> {
    let _lock = lock_stats_dir(&config.stats_dir)?;
    let storage = FsStorage::new(&config.stats_dir);

    match purge_vim(&storage).context("failed to purge vim shortcuts")? {
        VimPurge::Purged(count) => writeln!(writer, "Removed {count} vim shortcut entries.")?,
        VimPurge::AlreadyEmpty => writeln!(writer, "No vim shortcuts recorded today.")?,
        VimPurge::Missing => writeln!(writer, "No current day recorded.")?,
    }
    Ok(())
}
