//! Optional TOML configuration: pacing overrides and replacement level tables.

use std::{fs, path::Path, time::Duration};

use anyhow::{ensure, Context, Result};
use num_craze_system_level_table::{LevelTable, LevelTableConfig};
use num_craze_world::Timing;
use serde::Deserialize;

/// File looked up inside the data directory when no `--config` is given.
pub(crate) const CONFIG_FILE_NAME: &str = "num-craze.toml";

/// Parsed configuration file.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct GameConfig {
    timing: TimingConfig,
    levels: LevelTableConfig,
}

/// Millisecond overrides for [`Timing`]. Missing values keep the defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct TimingConfig {
    ready_delay_ms: Option<u64>,
    celebration_delay_ms: Option<u64>,
    level_complete_delay_ms: Option<u64>,
    setup_retry_delay_ms: Option<u64>,
    countdown_period_ms: Option<u64>,
}

impl GameConfig {
    /// Reads `explicit`, or the default file in `data_dir` when it exists.
    ///
    /// A missing default file yields the built-in configuration; a missing
    /// explicit file is an error.
    pub(crate) fn load(explicit: Option<&Path>, data_dir: &Path) -> Result<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let path = data_dir.join(CONFIG_FILE_NAME);
                if !path.exists() {
                    return Ok(Self::default());
                }
                path
            }
        };

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::parse(&contents).with_context(|| format!("invalid config {}", path.display()))
    }

    /// Parses a configuration document.
    pub(crate) fn parse(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Pacing with overrides applied.
    ///
    /// A zero countdown period is refused: the countdown could never expire.
    pub(crate) fn timing(&self) -> Result<Timing> {
        let defaults = Timing::default();
        let pick = |value: Option<u64>, default: Duration| {
            value.map_or(default, Duration::from_millis)
        };
        let timing = &self.timing;
        ensure!(
            timing.countdown_period_ms != Some(0),
            "invalid [timing]: countdown_period_ms must be greater than zero"
        );

        Ok(Timing {
            ready_delay: pick(timing.ready_delay_ms, defaults.ready_delay),
            celebration_delay: pick(timing.celebration_delay_ms, defaults.celebration_delay),
            level_complete_delay: pick(timing.level_complete_delay_ms, defaults.level_complete_delay),
            setup_retry_delay: pick(timing.setup_retry_delay_ms, defaults.setup_retry_delay),
            countdown_period: pick(timing.countdown_period_ms, defaults.countdown_period),
        })
    }

    /// Level table with replacement brackets validated.
    pub(crate) fn level_table(&self) -> Result<LevelTable> {
        LevelTable::from_config(self.levels.clone()).context("invalid [levels] table")
    }
}
