//! End-streak command.

use std::io::Write;
use std::sync::Arc;

use anyhow::Result;
use kt_core::Clock;

use crate::Config;
use crate::commands::util::{lock_stats_dir, start_engine};

pub async fn run<W: Write>(writer: &mut W, config: &Config, clock: Arc<dyn Clock>) -> Result<()> {
    let _lock = lock_stats_dir(&config.stats_dir)?;
    let mut engine = start_engine(config, clock)?;
    engine.end_streak();

    let record = engine.record();
    writeln!(
        writer,
        "Focus streak ended. {} streaks today, {} characters typed.",
        record.focus_streaks.len(),
        record.totals.chars_typed
    )?;
    engine.shutdown().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use kt_core::{DayRecord, ManualClock};

    #[tokio::test]
    async fn end_streak_writes_day_outputs() {
        let temp = tempfile::tempdir().unwrap();
        let config = Config {
            stats_dir: temp.path().to_path_buf(),
            ..Config::default()
        };
        let now = NaiveDate::from_ymd_opt(2025, 4, 2)
            .and_then(|d| d.and_hms_opt(14, 0, 0))
            .unwrap();

        let mut output = Vec::new();
        run(&mut output, &config, Arc::new(ManualClock::new(now))).await.unwrap();

        assert_eq!(
            String::from_utf8(output).unwrap(),
            "Focus streak ended. 1 streaks today, 0 characters typed.\n"
        );
        let day = std::fs::read(temp.path().join("2025/04-April/days/2025-04-02.json")).unwrap();
        let record = DayRecord::from_json(&day).unwrap();
        assert_eq!(record.focus_streaks, vec![0]);
        assert!(record.open_session().is_none());
        assert!(temp.path().join("2025/04-April/reports/2025-04-02.md").is_file());
    }
}
