//! Store interfaces consumed by the content client and the API layer.

use async_trait::async_trait;
use std::collections::HashSet;

use crate::error::StoreResult;

/// Records which (community member id, item id) pairs were already liked.
///
/// Only per-call atomicity is assumed. Concurrent calls for distinct keys
/// must be safe; nothing is transactional across calls.
#[async_trait]
pub trait HistoryGate: Send + Sync {
    /// Whether the pair has a record
    async fn has(&self, member_id: &str, item_id: &str) -> StoreResult<bool>;

    /// Record the pair. Recording an existing pair is not an error.
    async fn add(&self, member_id: &str, item_id: &str) -> StoreResult<()>;
}

/// Per-user set of selected community member ids.
#[async_trait]
pub trait SelectionStore: Send + Sync {
    /// All member ids the user has selected
    async fn find_selected(&self, user_id: &str) -> StoreResult<HashSet<String>>;

    /// Select a community. Returns `true` if the record was inserted,
    /// `false` if it already existed.
    async fn add_selected(&self, user_id: &str, member_id: &str) -> StoreResult<bool>;

    /// Deselect a community. Removing a missing record is a no-op.
    async fn remove_selected(&self, user_id: &str, member_id: &str) -> StoreResult<()>;
}
