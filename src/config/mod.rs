//! Configuration management for the replication client.
//!
//! Provides hierarchical configuration loading with priority:
//! 1. Default values (hardcoded)
//! 2. Optional TOML config file
//! 3. Environment variables (highest priority)
//!

mod consul;
mod redis;
mod service;
mod watch;


pub use self::consul::*;
pub use self::redis::*;
pub use self::service::*;
pub use self::watch::*;

//---
use std::env;

use config::Config;
use config::Environment;
use config::File;
use serde::Deserialize;
use serde::Serialize;

use crate::Result;

/// Which backend carries writes and change notifications.
///
/// Replaces string-keyed transport selection: the builder matches on this
/// enum, nothing is resolved from text at runtime.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    Redis,
    Consul,
}

impl Default for TransportKind {
    fn default() -> Self {
        TransportKind::Redis
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Service identity and registered namespaces
    #[serde(default)]
    pub service: ServiceConfig,
    /// Backend selection (`redis` | `consul`)
    #[serde(default)]
    pub transport: TransportKind,
    /// Redis transport parameters
    #[serde(default)]
    pub redis: RedisConfig,
    /// Consul transport parameters
    #[serde(default)]
    pub consul: ConsulConfig,
    /// Watch loop tuning
    #[serde(default)]
    pub watch: WatchConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            service: ServiceConfig::default(),
            transport: TransportKind::default(),
            redis: RedisConfig::default(),
            consul: ConsulConfig::default(),
            watch: WatchConfig::default(),
        }
    }
}

impl Settings {
    /// Load configuration from multiple sources with priority:
    /// 1. Default values
    /// 2. `config/central.toml` next to the process, when present
    /// 3. An explicit config file
    /// 4. `CENTRAL__`-prefixed environment variables (highest priority)
    ///
    /// # Arguments
    /// * `config_path` - Optional path to a TOML config file; when absent
    ///   the `CENTRAL_CONFIG` environment variable is consulted instead
    ///
    /// # Returns
    /// Merged and validated configuration
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut config = Config::builder();

        // 1. Base config next to the process
        config = config.add_source(File::with_name("config/central").required(false));

        // 2. Explicit config file
        if let Some(path) = config_path {
            config = config.add_source(File::with_name(path).required(true));
        } else if let Ok(path) = env::var("CENTRAL_CONFIG") {
            config = config.add_source(File::with_name(&path));
        }

        // 3. Environment variables (highest priority)
        config = config.add_source(
            Environment::with_prefix("CENTRAL")
                .separator("__")
                .ignore_empty(true)
                .try_parsing(true),
        );

        let settings: Settings = config.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Static validation applied after deserialization and before any
    /// connection attempt.
    pub fn validate(&self) -> Result<()> {
        self.service.validate()?;
        self.redis.validate()?;
        self.consul.validate()?;
        self.watch.validate()?;
        Ok(())
    }
}
