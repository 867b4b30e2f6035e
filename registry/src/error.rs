//! Error types for registry operations

use atom_client::ClientError;
use thiserror::Error;

/// Result type for registry operations
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Errors raised while installing a session.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// No unused session id could be minted
    #[error("failed to mint a session id after {attempts} attempts")]
    SessionIdUnavailable {
        /// Ids tried before giving up
        attempts: usize,
    },

    /// The factory could not build a client
    #[error("failed to create content client: {0}")]
    ClientInit(#[from] ClientError),
}
