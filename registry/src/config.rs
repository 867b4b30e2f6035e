//! Configuration for the session registry

use atom_client::ClientConfig;
use std::time::Duration;

/// Session lifetime and the configuration handed to every new client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Age at which a session is evicted, counted from creation
    pub max_age: Duration,

    /// Configuration for clients built by the default factory
    pub client: ClientConfig,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            max_age: Duration::from_secs(600), // 10 minutes
            client: ClientConfig::default(),
        }
    }
}

impl RegistryConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_age.is_zero() {
            return Err("max_age must be > 0".to_string());
        }
        self.client.validate()
    }
}
