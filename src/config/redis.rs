use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Redis transport parameters.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct RedisConfig {
    /// Connection URL, e.g. `redis://127.0.0.1:6379/0`
    #[serde(default = "default_url")]
    pub url: String,

    /// Budget for establishing the initial connection (milliseconds)
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_in_ms: u64,

    /// Budget for a single command round trip (milliseconds)
    #[serde(default = "default_response_timeout")]
    pub response_timeout_in_ms: u64,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            connect_timeout_in_ms: default_connect_timeout(),
            response_timeout_in_ms: default_response_timeout(),
        }
    }
}

impl RedisConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.url.starts_with("redis://") && !self.url.starts_with("rediss://") {
            return Err(Error::Config(ConfigError::Message(format!(
                "redis.url must start with redis:// or rediss://, got {:?}",
                self.url
            ))));
        }

        if self.connect_timeout_in_ms == 0 {
            return Err(Error::Config(ConfigError::Message(
                "redis.connect_timeout_in_ms must be greater than zero".to_string(),
            )));
        }

        if self.response_timeout_in_ms == 0 {
            return Err(Error::Config(ConfigError::Message(
                "redis.response_timeout_in_ms must be greater than zero".to_string(),
            )));
        }

        Ok(())
    }
}

fn default_url() -> String {
    "redis://127.0.0.1:6379/0".to_string()
}

fn default_connect_timeout() -> u64 {
    2_000
}

fn default_response_timeout() -> u64 {
    2_000
}
