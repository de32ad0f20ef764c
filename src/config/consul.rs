use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::constants::DEFAULT_CONSUL_EVENT_NAME;
use crate::constants::DEFAULT_CONSUL_WAIT_SECS;
use crate::Error;
use crate::Result;

/// Consul transport parameters.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ConsulConfig {
    /// Agent host, without scheme
    #[serde(default = "default_address")]
    pub address: String,

    /// Agent HTTP API port
    #[serde(default = "default_port")]
    pub port: u16,

    /// User event fired on every namespace change
    #[serde(default = "default_event_name")]
    pub event_name: String,

    /// Long-poll hold time requested from the event endpoint (seconds)
    #[serde(default = "default_wait")]
    pub wait_in_secs: u64,

    /// Budget for one HTTP request, long polls included (milliseconds)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_in_ms: u64,
}

impl Default for ConsulConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            port: default_port(),
            event_name: default_event_name(),
            wait_in_secs: default_wait(),
            request_timeout_in_ms: default_request_timeout(),
        }
    }
}

impl ConsulConfig {
    pub fn validate(&self) -> Result<()> {
        if self.address.is_empty() || self.address.contains("://") {
            return Err(Error::Config(ConfigError::Message(format!(
                "consul.address must be a bare host, got {:?}",
                self.address
            ))));
        }

        if self.port == 0 {
            return Err(Error::Config(ConfigError::Message(
                "consul.port must be greater than zero".to_string(),
            )));
        }

        if self.event_name.is_empty() {
            return Err(Error::Config(ConfigError::Message(
                "consul.event_name must not be empty".to_string(),
            )));
        }

        if self.wait_in_secs == 0 {
            return Err(Error::Config(ConfigError::Message(
                "consul.wait_in_secs must be greater than zero".to_string(),
            )));
        }

        // The request timeout bounds the long poll; it has to outlast it.
        if self.request_timeout_in_ms <= self.wait_in_secs * 1_000 {
            return Err(Error::Config(ConfigError::Message(format!(
                "consul.request_timeout_in_ms ({}) must exceed wait_in_secs ({}s)",
                self.request_timeout_in_ms, self.wait_in_secs
            ))));
        }

        Ok(())
    }

    pub(crate) fn base_url(&self) -> String {
        format!("http://{}:{}", self.address, self.port)
    }
}

fn default_address() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8_500
}

fn default_event_name() -> String {
    DEFAULT_CONSUL_EVENT_NAME.to_string()
}

fn default_wait() -> u64 {
    DEFAULT_CONSUL_WAIT_SECS
}

fn default_request_timeout() -> u64 {
    90_000
}
