//! CLI subcommand implementations.

pub mod end_streak;
pub mod purge_vim;
pub mod report;
pub mod rollup;
pub mod simulate;
pub mod status;
pub mod util;
pub mod watch;
pub mod wipe;
