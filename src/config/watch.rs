use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::constants::DEFAULT_RESUBSCRIBE_DELAY_MS;
use crate::constants::DEFAULT_RETRY_DELAY_MS;
use crate::Error;
use crate::Result;

/// Watch loop tuning.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct WatchConfig {
    /// Delay before retrying a failed or empty poll (milliseconds)
    #[serde(default = "default_retry_delay")]
    pub retry_delay_in_ms: u64,

    /// Delay before re-establishing a dropped subscription (milliseconds)
    #[serde(default = "default_resubscribe_delay")]
    pub resubscribe_delay_in_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            retry_delay_in_ms: default_retry_delay(),
            resubscribe_delay_in_ms: default_resubscribe_delay(),
        }
    }
}

impl WatchConfig {
    pub fn validate(&self) -> Result<()> {
        if self.retry_delay_in_ms == 0 {
            return Err(Error::Config(ConfigError::Message(
                "watch.retry_delay_in_ms must be greater than zero".to_string(),
            )));
        }

        if self.resubscribe_delay_in_ms == 0 {
            return Err(Error::Config(ConfigError::Message(
                "watch.resubscribe_delay_in_ms must be greater than zero".to_string(),
            )));
        }

        Ok(())
    }
}

fn default_retry_delay() -> u64 {
    DEFAULT_RETRY_DELAY_MS
}

fn default_resubscribe_delay() -> u64 {
    DEFAULT_RESUBSCRIBE_DELAY_MS
}
