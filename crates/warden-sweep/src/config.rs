//! Configuration for the warden-sweep grant sweeper.

use serde::Deserialize;

use crate::error::SweepError;

/// Sweeper configuration.
///
/// Loaded from `warden.toml` `[sweep]` section or `WARDEN_SWEEP__`
/// environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct SweepConfig {
    /// Whether the daemon sweep loop may run.
    #[serde(default)]
    pub enabled: bool,

    /// Seconds between sweep passes.
    #[serde(default = "default_interval")]
    pub interval_secs: u64,

    /// Expired grants deleted per batch within one pass.
    #[serde(default = "default_batch_size")]
    pub batch_size: u64,
}

impl SweepConfig {
    /// Reject intervals and batch sizes that cannot drive the sweep loop.
    pub fn validate(&self) -> Result<(), SweepError> {
        if self.interval_secs < 1 {
            return Err(SweepError::Config(
                "sweep.interval_secs must be at least 1".to_string(),
            ));
        }
        if self.batch_size < 1 {
            return Err(SweepError::Config(
                "sweep.batch_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_interval() -> u64 {
    3600
}

fn default_batch_size() -> u64 {
    100
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_secs: default_interval(),
            batch_size: default_batch_size(),
        }
    }
}
