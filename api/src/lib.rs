//! Atom API Crate
//!
//! HTTP API layer for the Atom liker, built on Axum.
//!
//! # Architecture
//!
//! - Session per browser, carried in a cookie and resolved through the
//!   `SessionRegistry`
//! - Trait-based routes (`route_trait::RouteHandler`) that declare their
//!   session precondition and get request ids, logging and the
//!   `{success, data, err}` envelope for free
//! - CORS, compression and tracing layers, optional Swagger UI and static
//!   asset fallback
//!
//! # Usage
//!
//! ```rust,no_run
//! use atom_api::{run_server_with_config, ApiConfig, AppState};
//! use atom_registry::{DefaultClientFactory, RegistryConfig, SessionRegistry};
//! use atom_store::{MemorySelectionStore, NullHistory};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let registry_config = RegistryConfig::default();
//!     let factory = DefaultClientFactory::new(registry_config.client.clone(), Arc::new(NullHistory));
//!     let registry = SessionRegistry::new(&registry_config, Arc::new(factory));
//!     let config = ApiConfig::development();
//!     let state = AppState::new(registry, Arc::new(MemorySelectionStore::new()), config.cookie_name.clone());
//!
//!     run_server_with_config(state, config, async {
//!         let _ = tokio::signal::ctrl_c().await;
//!     })
//!     .await
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

mod config;
mod envelope;
mod error;
mod middleware;
mod router;
pub mod route_trait;
pub mod routes;
mod state;

pub use config::ApiConfig;
pub use envelope::Envelope;
pub use error::{ApiError, ApiResult};
pub use router::build_router;
pub use state::{AppState, Session};

use std::future::Future;

/// Run the HTTP API server until `shutdown` resolves.
///
/// Once the listener has drained, every live session is stopped so no QR
/// login outlives the server.
///
/// # Errors
///
/// Returns an error if the configuration is invalid, the address cannot be
/// bound or the server fails while serving.
pub async fn run_server_with_config<F>(
    state: AppState,
    config: ApiConfig,
    shutdown: F,
) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    use anyhow::Context;

    config
        .validate()
        .map_err(|e| anyhow::anyhow!("invalid API configuration: {}", e))?;

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    tracing::info!("Atom API server listening on http://{}", addr);
    if config.enable_swagger {
        tracing::info!("Swagger UI:    http://{}/swagger-ui/", addr);
        tracing::info!("OpenAPI Spec:  http://{}/api-doc/openapi.json", addr);
    }

    let registry = state.registry.clone();
    let app = build_router(state, &config);
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await;

    tracing::info!(sessions = registry.len(), "Stopping live sessions");
    registry.stop_all().await;

    served.context("server error")?;
    Ok(())
}
