//! API configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the HTTP API server.
///
/// # Example
///
/// ```rust
/// use atom_api::ApiConfig;
///
/// let config = ApiConfig {
///     port: 8080,
///     cookie_name: "jwt_id".to_string(),
///     ..ApiConfig::development()
/// };
/// assert!(config.enable_swagger);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Address to bind to.
    ///
    /// Default: `0.0.0.0`
    pub host: String,

    /// Port to bind the HTTP server to.
    ///
    /// Default: 8080
    pub port: u16,

    /// Enable Cross-Origin Resource Sharing (CORS).
    ///
    /// Default: true
    pub enable_cors: bool,

    /// Allowed origins for CORS requests.
    ///
    /// Use `["*"]` to allow all origins (development only).
    ///
    /// Default: `["*"]`
    pub cors_origins: Vec<String>,

    /// Name of the cookie carrying the session id.
    ///
    /// Default: `jwt_id`
    pub cookie_name: String,

    /// Enable Swagger UI documentation.
    ///
    /// When enabled, API docs are available at `/swagger-ui/`.
    ///
    /// Default: true
    pub enable_swagger: bool,

    /// Directory served for every path no route matches.
    ///
    /// Default: none
    pub static_dir: Option<PathBuf>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            enable_cors: true,
            cors_origins: vec!["*".to_string()],
            cookie_name: "jwt_id".to_string(),
            enable_swagger: true,
            static_dir: None,
        }
    }
}

impl ApiConfig {
    /// Create a new configuration for production use.
    ///
    /// CORS is restricted to `allowed_origins` and Swagger UI is disabled.
    pub fn production(allowed_origins: Vec<String>) -> Self {
        Self {
            enable_swagger: false,
            cors_origins: allowed_origins,
            ..Default::default()
        }
    }

    /// Create a new configuration for local development.
    pub fn development() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            cors_origins: vec!["*".to_string()],
            enable_swagger: true,
            ..Default::default()
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.cookie_name.is_empty()
            || !self
                .cookie_name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(format!("invalid cookie name: {:?}", self.cookie_name));
        }
        if self.host.trim().is_empty() {
            return Err("host is required".to_string());
        }
        Ok(())
    }
}
