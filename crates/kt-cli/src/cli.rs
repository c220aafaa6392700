//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use kt_core::Scope;

/// Typing telemetry for your editing sessions.
///
/// Turns key signals into daily typing statistics and rolls them up into
/// monthly and yearly reports.
#[derive(Debug, Parser)]
#[command(name = "kt", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Record key signals read as JSON lines from stdin.
    ///
    /// Stops at end of input or on Ctrl-C, saving the day before exiting.
    Watch,

    /// Show the current day's statistics.
    Status {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Print a month or year report computed from stored days.
    Report {
        /// Month to report, as YYYY-MM. Defaults to the current month.
        #[arg(long, value_parser = parse_month, conflicts_with = "year")]
        month: Option<Scope>,

        /// Year to report, as YYYY.
        #[arg(long, value_parser = parse_year)]
        year: Option<Scope>,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Recompute month and year summaries from stored days.
    Rollup {
        /// Only recompute this year.
        #[arg(long)]
        year: Option<i32>,
    },

    /// End the saved day's focus streak (stop `kt watch` first).
    ///
    /// Works on the day stored on disk. A running `kt watch` holds the
    /// statistics directory lock, so this command refuses to run alongside it
    /// and leaves the watched day untouched.
    EndStreak,

    /// Delete all statistics and start over.
    Wipe {
        /// Confirmation phrase; must be exactly DELETE.
        #[arg(long)]
        confirm: Option<String>,
    },

    /// Remove vim shortcut counts from the current day.
    PurgeVim,

    /// Replay a deterministic typing session into today's statistics.
    Simulate {
        /// Random seed for typos and pauses.
        #[arg(long)]
        seed: Option<u64>,

        /// Number of characters to type.
        #[arg(long)]
        length: Option<usize>,
    },
}

fn parse_month(value: &str) -> Result<Scope, String> {
    let invalid = || format!("expected YYYY-MM, got {value:?}");
    let (year, month) = value.split_once('-').ok_or_else(invalid)?;
    let year: i32 = year.parse().map_err(|_| invalid())?;
    let month: u32 = month.parse().map_err(|_| invalid())?;
    if !(1..=12).contains(&month) {
        return Err(format!("month must be between 01 and 12, got {month}"));
    }
    Ok(Scope::Month { year, month })
}

fn parse_year(value: &str) -> Result<Scope, String> {
    value
        .parse()
        .map(|year| Scope::Year { year })
        .map_err(|_| format!("expected YYYY, got {value:?}"))
}
