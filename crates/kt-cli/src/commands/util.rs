//! Shared helpers for commands that touch the statistics tree.

use std::fs::{self, File, OpenOptions};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use fs2::FileExt;
use kt_core::Clock;
use kt_engine::{Engine, LogNotifier};
use kt_store::{FsStorage, layout};

use crate::Config;

/// Exclusive hold on a statistics directory. Released on drop.
#[derive(Debug)]
pub struct WriterLock {
    _file: File,
}

/// Takes the single-writer lock on `stats_dir`, failing fast if another
/// process holds it.
pub fn lock_stats_dir(stats_dir: &Path) -> Result<WriterLock> {
    fs::create_dir_all(stats_dir)
        .with_context(|| format!("failed to create {}", stats_dir.display()))?;

    let path = stats_dir.join(layout::LOCK_FILE);
    let file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(&path)
        .with_context(|| format!("failed to open lock file {}", path.display()))?;
    file.try_lock_exclusive().with_context(|| {
        format!(
            "another keytally process is writing to {}",
            stats_dir.display()
        )
    })?;
    tracing::debug!(path = %path.display(), "acquired writer lock");

    Ok(WriterLock { _file: file })
}

/// Starts an engine on the configured statistics directory.
pub fn start_engine(config: &Config, clock: Arc<dyn Clock>) -> Result<Engine> {
    let storage = Arc::new(FsStorage::new(&config.stats_dir));
    Engine::start(
        storage,
        clock,
        Arc::new(LogNotifier),
        config.engine_options(),
    )
    .context("failed to start engine")
}
