//! Atom Server - QR login and bulk liking for the Atom community portal
//!
//! Wires the store backend, the session registry and the HTTP API
//! together, and stops every live session on shutdown.

use anyhow::{Context, Result};
use atom_api::{run_server_with_config, AppState};
use atom_common::{HistoryGate, SelectionStore};
use atom_registry::{DefaultClientFactory, SessionRegistry};
use atom_store::{MemoryHistory, MemorySelectionStore, NullHistory, NullSelectionStore, SledStore};
use clap::Parser;
use std::sync::Arc;
use tracing::{info, warn};

mod config;
mod logging;

use crate::config::{CliArgs, ServerConfig, StoreBackend, StoreConfig};

/// History gate and selection store behind one backend.
struct Stores {
    history: Arc<dyn HistoryGate>,
    selections: Arc<dyn SelectionStore>,
    sled: Option<SledStore>,
}

fn open_stores(config: &StoreConfig) -> Result<Stores> {
    let stores = match config.backend {
        StoreBackend::Null => Stores {
            history: Arc::new(NullHistory),
            selections: Arc::new(NullSelectionStore),
            sled: None,
        },
        StoreBackend::Memory => Stores {
            history: Arc::new(MemoryHistory::new()),
            selections: Arc::new(MemorySelectionStore::new()),
            sled: None,
        },
        StoreBackend::Sled => {
            let store = SledStore::open(&config.path)
                .with_context(|| format!("Failed to open store at {}", config.path.display()))?;
            Stores {
                history: Arc::new(store.clone()),
                selections: Arc::new(store.clone()),
                sled: Some(store),
            }
        }
    };
    Ok(stores)
}

#[cfg(unix)]
async fn terminate_signal() {
    match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
        Ok(mut signal) => {
            signal.recv().await;
            info!("Received terminate signal, shutting down");
        }
        Err(e) => {
            warn!(error = %e, "Failed to install SIGTERM handler");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate_signal() {
    std::future::pending::<()>().await;
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                warn!(error = %e, "Failed to install Ctrl+C handler");
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate_signal() => {},
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();
    let config = ServerConfig::load(&args)?;
    logging::init(&config.log)?;

    info!("Starting Atom Server v{}", env!("CARGO_PKG_VERSION"));
    info!(
        host = %config.http.host,
        port = config.http.port,
        max_age_secs = config.session.max_age_secs,
        request_timeout_secs = config.session.request_timeout_secs,
        store = ?config.store.backend,
        "Configuration loaded"
    );

    let stores = open_stores(&config.store)?;
    if stores.sled.is_some() {
        info!("Store location: {}", config.store.path.display());
    }

    let registry_config = config.registry();
    let factory = DefaultClientFactory::new(registry_config.client.clone(), stores.history);
    let registry = SessionRegistry::new(&registry_config, Arc::new(factory));
    let state = AppState::new(
        registry,
        stores.selections,
        config.http.cookie_name.clone(),
    );

    run_server_with_config(state, config.http.clone(), shutdown_signal()).await?;

    if let Some(store) = stores.sled {
        store.flush().await.context("Failed to flush store")?;
    }
    info!("Atom Server stopped");
    Ok(())
}
