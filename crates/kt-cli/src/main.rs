use std::io;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use kt_core::{Clock, Scope, SystemClock};
use tracing_subscriber::EnvFilter;

use kt_cli::commands::{end_streak, purge_vim, report, rollup, simulate, status, watch, wipe};
use kt_cli::{Cli, Commands, Config};

/// Shown when `RUST_LOG` is unset: warnings plus keytally notices.
const DEFAULT_FILTER: &str = "warn,keytally=info";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    let config = Config::load_from(cli.config.as_deref()).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    let clock = SystemClock;
    let mut stdout = io::stdout().lock();

    match cli.command {
        Some(Commands::Watch) => watch::run_stdin(&mut stdout, &config).await?,
        Some(Commands::Status { json }) => status::run(&mut stdout, &config, clock.now(), json)?,
        Some(Commands::Report { month, year, json }) => {
            let scope = year
                .or(month)
                .unwrap_or_else(|| Scope::month_of(clock.today()));
            report::run(&mut stdout, &config, scope, json)?;
        }
        Some(Commands::Rollup { year }) => rollup::run(&mut stdout, &config, year)?,
        Some(Commands::EndStreak) => end_streak::run(&mut stdout, &config, Arc::new(clock)).await?,
        Some(Commands::Wipe { confirm }) => wipe::run(&mut stdout, &config, confirm.as_deref()).await?,
        Some(Commands::PurgeVim) => purge_vim::run(&mut stdout, &config)?,
        Some(Commands::Simulate { seed, length }) => {
            let mut options = config.simulation.clone();
            if let Some(seed) = seed {
                options.seed = seed;
            }
            if let Some(length) = length {
                options.length = length;
            }
            simulate::run(&mut stdout, &config, options, clock.now()).await?;
        }
        None => {
            use clap::CommandFactory;
            Cli::command().print_help()?;
            println!();
        }
    }

    Ok(())
}
