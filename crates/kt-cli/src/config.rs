//! Configuration loading and management.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Weekday;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use kt_core::{AggregateOptions, SimulationOptions};
use kt_engine::EngineOptions;
use serde::{Deserialize, Serialize};

/// Shortest autosave period accepted.
const MIN_AUTOSAVE_MS: u64 = 1_000;

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Root of the statistics tree.
    pub stats_dir: PathBuf,
    /// Autosave period in milliseconds.
    pub autosave_interval_ms: u64,
    /// Weekday highlighted in per-day rows.
    pub rest_day: Weekday,
    /// Defaults for `kt simulate`.
    pub simulation: SimulationOptions,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        Self {
            stats_dir: data_dir,
            autosave_interval_ms: 60_000,
            rest_day: Weekday::Sun,
            simulation: SimulationOptions::default(),
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    ///
    /// Later layers win: defaults, the user config file, `config_path`, then
    /// `KT_*` environment variables (`KT_SIMULATION__SEED` for nested keys).
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        figment = figment.merge(Env::prefixed("KT_").split("__"));

        figment.extract()
    }

    pub fn autosave_interval(&self) -> Duration {
        Duration::from_millis(self.autosave_interval_ms.max(MIN_AUTOSAVE_MS))
    }

    pub const fn aggregate_options(&self) -> AggregateOptions {
        AggregateOptions {
            rest_day: self.rest_day,
        }
    }

    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            autosave_interval: self.autosave_interval(),
            aggregate: self.aggregate_options(),
        }
    }
}

/// Returns the platform-specific config directory for keytally.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("keytally"))
}

/// Returns the platform-specific data directory for keytally.
///
/// On Linux: `~/.local/share/keytally`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("keytally"))
}
