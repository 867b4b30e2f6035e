//! Tracing subscriber setup.

use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing_subscriber::{
    fmt::writer::BoxMakeWriter, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

use crate::config::{LogConfig, LogFormat};

/// Directives used when neither a level nor RUST_LOG is given.
pub const DEFAULT_FILTER: &str =
    "atom_server=info,atom_api=info,atom_client=info,atom_registry=info,tower_http=info";

const ATOM_TARGETS: [&str; 5] = [
    "atom_server",
    "atom_api",
    "atom_client",
    "atom_registry",
    "atom_store",
];

/// Filter for `config`: an explicit level wins over RUST_LOG, which wins
/// over [`DEFAULT_FILTER`].
pub fn env_filter(config: &LogConfig) -> EnvFilter {
    match &config.level {
        Some(level) => {
            let mut directives: Vec<String> = ATOM_TARGETS
                .iter()
                .map(|target| format!("{}={}", target, level))
                .collect();
            directives.push(format!("tower_http={}", level));
            EnvFilter::new(directives.join(","))
        }
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
    }
}

/// Install the global subscriber.
pub fn init(config: &LogConfig) -> Result<()> {
    let (writer, ansi) = match &config.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {:?}", path))?;
            (BoxMakeWriter::new(Mutex::new(file)), false)
        }
        None => (BoxMakeWriter::new(std::io::stdout), true),
    };

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(ansi);
    let registry = tracing_subscriber::registry().with(env_filter(config));

    let installed = match config.format {
        LogFormat::Json => registry.with(fmt_layer.json()).try_init(),
        LogFormat::Text => registry.with(fmt_layer).try_init(),
    };
    installed.context("Failed to install tracing subscriber")
}
