use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::constants::DEFAULT_SERVICE_NAME;
use crate::namespace::is_valid_name;
use crate::namespace::is_valid_segment;
use crate::Error;
use crate::Result;

/// Identity of this process and the namespaces it replicates.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Service name; prefixes every remote key, channel and event tag
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Namespaces fetched at construction and refreshed by `update()`.
    /// Reads outside this list fall through to the backend on every call.
    #[serde(default)]
    pub namespaces: Vec<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            namespaces: Vec::new(),
        }
    }
}

impl ServiceConfig {
    pub fn validate(&self) -> Result<()> {
        if !is_valid_segment(&self.name) {
            return Err(Error::Config(ConfigError::Message(format!(
                "service.name must match [A-Za-z0-9_-]+, got {:?}",
                self.name
            ))));
        }

        for namespace in &self.namespaces {
            if !is_valid_name(namespace) {
                return Err(Error::Config(ConfigError::Message(format!(
                    "service.namespaces entry is not a valid namespace: {:?}",
                    namespace
                ))));
            }
        }

        Ok(())
    }
}

fn default_service_name() -> String {
    DEFAULT_SERVICE_NAME.to_string()
}
