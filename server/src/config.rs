//! Configuration system for the Atom server.
//!
//! Supports:
//! - CLI arguments (highest priority)
//! - Environment variables (`ATOM_*`)
//! - TOML config file
//! - Defaults (lowest priority)

use anyhow::{Context, Result};
use atom_api::ApiConfig;
use atom_client::{ClientConfig, RemoteConfig};
use atom_registry::RegistryConfig;
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Config file read when `--config` is not given, if present.
pub const DEFAULT_CONFIG_FILE: &str = "atom.toml";

/// Command-line arguments for the Atom server.
///
/// Every setting is optional here so that an unset flag falls through to
/// the config file.
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "atom-server")]
#[command(about = "Atom liker server - QR login and bulk liking over HTTP")]
#[command(version)]
pub struct CliArgs {
    /// HTTP port
    #[arg(long, short = 'p', env = "ATOM_PORT")]
    pub port: Option<u16>,

    /// Address to bind to
    #[arg(long, env = "ATOM_HOST")]
    pub host: Option<String>,

    /// Configuration file path
    #[arg(long, short = 'c', env = "ATOM_CONFIG")]
    pub config: Option<PathBuf>,

    /// Session lifetime in seconds
    #[arg(long, env = "ATOM_MAX_AGE")]
    pub max_age: Option<u64>,

    /// Outbound request timeout in seconds
    #[arg(long, env = "ATOM_TIMEOUT")]
    pub timeout: Option<u64>,

    /// Store backend for like history and community selection
    #[arg(long, env = "ATOM_STORE")]
    pub store: Option<StoreBackend>,

    /// Directory of the persistent store
    #[arg(long, env = "ATOM_STORE_PATH")]
    pub store_path: Option<PathBuf>,

    /// Log level applied to the Atom crates (overrides RUST_LOG)
    #[arg(long, env = "ATOM_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Log output format
    #[arg(long, env = "ATOM_LOG_FORMAT")]
    pub log_format: Option<LogFormat>,

    /// Append logs to this file instead of stdout
    #[arg(long, env = "ATOM_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// Directory served for paths no API route matches
    #[arg(long, env = "ATOM_STATIC_DIR")]
    pub static_dir: Option<PathBuf>,

    /// Maximum likes in flight per bulk operation
    #[arg(long, env = "ATOM_LIKE_CONCURRENCY")]
    pub like_concurrency: Option<usize>,
}

/// Like history / selection backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Remember nothing
    Null,
    /// Process-local, lost on restart
    Memory,
    /// Persistent sled database
    Sled,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human readable lines
    Text,
    /// One JSON object per event
    Json,
}

/// Full server configuration (merged from all sources).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// HTTP API settings
    pub http: ApiConfig,
    /// Session and client settings
    pub session: SessionConfig,
    /// Store settings
    pub store: StoreConfig,
    /// Logging settings
    pub log: LogConfig,
    /// Portal endpoints
    pub remote: RemoteConfig,
}

/// Session lifetime and outbound behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Seconds a session lives after creation
    pub max_age_secs: u64,
    /// Seconds before an outbound request is abandoned
    pub request_timeout_secs: u64,
    /// Likes in flight per bulk operation; unbounded when unset
    pub like_concurrency: Option<usize>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_age_secs: 600,
            request_timeout_secs: 60,
            like_concurrency: None,
        }
    }
}

/// Store selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Backend
    pub backend: StoreBackend,
    /// Database directory for the sled backend
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Sled,
            path: PathBuf::from("atom-data"),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Level for the Atom crates; RUST_LOG or the built-in filter when unset
    pub level: Option<String>,
    /// Output format
    pub format: LogFormat,
    /// Log file; stdout when unset
    pub file: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: None,
            format: LogFormat::Text,
            file: None,
        }
    }
}

impl ServerConfig {
    /// Load configuration from CLI args and optional config file.
    ///
    /// Priority: CLI args > Environment > Config file > Defaults. An explicit
    /// `--config` must exist; the default file is optional.
    pub fn load(args: &CliArgs) -> Result<Self> {
        let mut config = match &args.config {
            Some(path) => Self::from_file(path)?,
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.exists() {
                    Self::from_file(default)?
                } else {
                    Self::default()
                }
            }
        };

        config.apply(args);
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        toml::from_str(&contents).with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    /// Override with whatever the CLI (or its env fallbacks) set.
    fn apply(&mut self, args: &CliArgs) {
        if let Some(port) = args.port {
            self.http.port = port;
        }
        if let Some(host) = &args.host {
            self.http.host = host.clone();
        }
        if let Some(dir) = &args.static_dir {
            self.http.static_dir = Some(dir.clone());
        }
        if let Some(max_age) = args.max_age {
            self.session.max_age_secs = max_age;
        }
        if let Some(timeout) = args.timeout {
            self.session.request_timeout_secs = timeout;
        }
        if let Some(limit) = args.like_concurrency {
            self.session.like_concurrency = Some(limit);
        }
        if let Some(backend) = args.store {
            self.store.backend = backend;
        }
        if let Some(path) = &args.store_path {
            self.store.path = path.clone();
        }
        if let Some(level) = &args.log_level {
            self.log.level = Some(level.clone());
        }
        if let Some(format) = args.log_format {
            self.log.format = format;
        }
        if let Some(file) = &args.log_file {
            self.log.file = Some(file.clone());
        }
    }

    /// Validate every section
    pub fn validate(&self) -> Result<(), String> {
        self.http.validate()?;
        self.registry().validate()?;
        if self.store.backend == StoreBackend::Sled && self.store.path.as_os_str().is_empty() {
            return Err("store path is required for the sled backend".to_string());
        }
        Ok(())
    }

    /// Registry configuration, including what every client is built with
    pub fn registry(&self) -> RegistryConfig {
        RegistryConfig {
            max_age: Duration::from_secs(self.session.max_age_secs),
            client: ClientConfig {
                remote: self.remote.clone(),
                request_timeout: Duration::from_secs(self.session.request_timeout_secs),
                like_concurrency: self.session.like_concurrency,
            },
        }
    }
}
