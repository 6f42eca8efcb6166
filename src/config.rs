use crate::domain::constants::{DECISION_TIMEOUT_SECS, NUM_ROUNDS, TIMED_ROUND};
use crate::domain::payoff::PayoffMatrix;
use crate::error::{ExperimentError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Session parameters. Every field falls back to the experiment's constants.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(default, deny_unknown_fields)]
pub struct ExperimentConfig {
    pub payoffs: PayoffMatrix,
    pub num_rounds: u32,
    /// Deadline of the timed round's Decision page.
    pub decision_timeout_ms: u64,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            payoffs: PayoffMatrix::default(),
            num_rounds: NUM_ROUNDS,
            decision_timeout_ms: DECISION_TIMEOUT_SECS * 1000,
        }
    }
}

impl ExperimentConfig {
    /// Reads a JSON config file and validates it.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.num_rounds < TIMED_ROUND {
            return Err(ExperimentError::config(format!(
                "num_rounds must be at least {}, got {}",
                TIMED_ROUND, self.num_rounds
            )));
        }
        if self.decision_timeout_ms == 0 {
            return Err(ExperimentError::config("decision_timeout_ms must be positive"));
        }
        self.payoffs.validate()
    }

    pub fn decision_timeout(&self) -> Duration {
        Duration::from_millis(self.decision_timeout_ms)
    }
}
