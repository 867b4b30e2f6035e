//! Content client configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Where the portal lives and which protocol revision it speaks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Base URL every portal-relative path is joined to
    pub base_url: String,
    /// Duplex connection endpoint
    pub socket_url: String,
    /// `clientProtocol` query value sent during the handshake
    pub client_protocol: String,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.juweitong.cn/neighbour".to_string(),
            socket_url: "wss://www.juweitong.cn/neighbour/authorize/connect".to_string(),
            client_protocol: "2.1".to_string(),
        }
    }
}

/// Per-client behaviour.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Portal endpoints
    pub remote: RemoteConfig,

    /// Bound on every outbound request, and on the wait for the QR code
    /// once the handshake is underway
    pub request_timeout: Duration,

    /// Maximum likes in flight per bulk operation (None = one task per item)
    pub like_concurrency: Option<usize>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            remote: RemoteConfig::default(),
            request_timeout: Duration::from_secs(60),
            like_concurrency: None,
        }
    }
}

impl ClientConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.request_timeout.is_zero() {
            return Err("request_timeout must be > 0".to_string());
        }
        if self.like_concurrency == Some(0) {
            return Err("like_concurrency must be > 0 when set".to_string());
        }
        if self.remote.base_url.trim().is_empty() || self.remote.socket_url.trim().is_empty() {
            return Err("remote base_url and socket_url are required".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(ClientConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let config = ClientConfig {
            like_concurrency: Some(0),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
