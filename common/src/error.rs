//! Error types for store backends.

use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors a `HistoryGate` or `SelectionStore` backend can report.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The backing database rejected the operation
    #[error("Store backend error: {0}")]
    Backend(String),

    /// A stored value could not be decoded
    #[error("Corrupted record: {0}")]
    Corrupted(String),

    /// The store is closed or otherwise not reachable
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}
