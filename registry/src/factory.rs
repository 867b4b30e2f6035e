//! Client construction seam

use atom_client::{ClientConfig, ClientResult, ContentClient};
use atom_common::HistoryGate;
use std::sync::Arc;

/// Builds a fresh client for a new session.
pub trait ClientFactory: Send + Sync {
    /// Build an unauthenticated client with its own outbound identity
    fn create(&self) -> ClientResult<ContentClient>;
}

impl<F> ClientFactory for F
where
    F: Fn() -> ClientResult<ContentClient> + Send + Sync,
{
    fn create(&self) -> ClientResult<ContentClient> {
        self()
    }
}

/// Factory for real portal clients sharing one like history.
pub struct DefaultClientFactory {
    config: ClientConfig,
    history: Arc<dyn HistoryGate>,
}

impl DefaultClientFactory {
    /// Create a factory handing `config` and `history` to every client
    pub fn new(config: ClientConfig, history: Arc<dyn HistoryGate>) -> Self {
        Self { config, history }
    }
}

impl ClientFactory for DefaultClientFactory {
    fn create(&self) -> ClientResult<ContentClient> {
        ContentClient::with_defaults(self.config.clone(), Arc::clone(&self.history))
    }
}
