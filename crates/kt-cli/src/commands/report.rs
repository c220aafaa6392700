//! Report command: month or year summaries computed from stored days.
//!
//! Reads only; `kt rollup` is what writes summary files.

use std::io::Write;

use anyhow::{Context, Result};
use kt_core::{AggregateOptions, Scope, aggregate, render_aggregate};
use kt_store::{FsStorage, layout, read_days};

use crate::Config;

pub fn run<W: Write>(writer: &mut W, config: &Config, scope: Scope, json: bool) -> Result<()> {
    let storage = FsStorage::new(&config.stats_dir);
    let folder = layout::scope_folder(scope)
        .with_context(|| format!("no statistics folder for {scope}"))?;
    let days = read_days(&storage, &folder)
        .with_context(|| format!("failed to read days for {scope}"))?;

    if days.is_empty() {
        writeln!(writer, "No day records for {scope}.")?;
        return Ok(());
    }

    let options: AggregateOptions = config.aggregate_options();
    let aggregate = aggregate(scope, &days, &options);
    if json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&aggregate)?)?;
    } else {
        write!(writer, "{}", render_aggregate(&aggregate))?;
    }
    Ok(())
}
