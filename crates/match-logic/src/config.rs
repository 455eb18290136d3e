//! Tester configuration

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::strategies::{Builtin, DEFAULT_SEED};

/// Rounds played when nothing else is configured
pub const DEFAULT_ROUNDS: u32 = 10_000;

/// Wall-clock budget for the whole run, in seconds
pub const DEFAULT_TIME_BUDGET_SECS: u64 = 60;

/// When the time budget is checked
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Deadline {
    /// Once, after the last round has been played
    #[default]
    AfterRun,
    /// After every round; the run stops at the first round that ends late
    EveryRound,
}

/// How a strategy is put through its paces
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TesterConfig {
    pub rounds: u32,
    pub time_budget_secs: u64,
    pub deadline: Deadline,
    /// Reference opponent the strategy plays against
    pub opponent: Builtin,
    /// Seed handed to the opponent (and to bundled strategies under test)
    pub seed: u64,
}

impl Default for TesterConfig {
    fn default() -> Self {
        Self {
            rounds: DEFAULT_ROUNDS,
            time_budget_secs: DEFAULT_TIME_BUDGET_SECS,
            deadline: Deadline::AfterRun,
            opponent: Builtin::TitForTat,
            seed: DEFAULT_SEED,
        }
    }
}

impl TesterConfig {
    /// Load from a JSON file; missing fields take their defaults
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        serde_json::from_str(&raw)
            .map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })
    }

    pub fn time_budget(&self) -> Duration {
        Duration::from_secs(self.time_budget_secs)
    }
}
