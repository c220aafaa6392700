//! Storage layer for keytally.
//!
//! Persists day records and rendered reports into a statistics tree and
//! recomputes month and year summaries from the stored days.
//!
//! # Layout
//!
//! Paths are logical, `/`-separated and relative to the statistics root:
//!
//! ```text
//! current.json
//! 2025/
//!   year-2025.json
//!   year-2025.md
//!   01-January/
//!     month-2025-01.json
//!     month-2025-01.md
//!     days/2025-01-15.json
//!     reports/2025-01-15.md
//! ```
//!
//! # Thread Safety
//!
//! [`Storage`] implementations are `Send + Sync`. They do not order writes
//! issued from different threads; callers that need per-path ordering must
//! funnel writes through a single writer.

mod fs;
pub mod layout;
mod memory;
mod persist;
mod rollup;
mod storage;

use kt_core::RecordError;
use thiserror::Error;

pub use fs::FsStorage;
pub use memory::MemoryStorage;
pub use persist::{
    VimPurge, load_current, purge_vim, read_day, read_days, save_current, wipe_all, write_day,
    write_day_outputs,
};
pub use rollup::{Cascade, cascade, rollup_all, rollup_month, rollup_year};
pub use storage::Storage;

/// Errors from the storage layer.
#[derive(Debug, Error)]
pub enum StoreError {
    /// I/O failure at a logical path.
    #[error("io error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Aggregate serialization failed.
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// A stored day record could not be read or written.
    #[error(transparent)]
    Record(#[from] RecordError),

    /// The path escapes the statistics root or is otherwise malformed.
    #[error("invalid storage path: {0}")]
    InvalidPath(String),

    /// The backend refused the operation.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub(crate) fn io(path: &str, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_string(),
            source,
        }
    }
}
