//! Stores that remember nothing.

use async_trait::async_trait;
use atom_common::{HistoryGate, SelectionStore, StoreResult};
use std::collections::HashSet;

/// History gate without memory: nothing is ever recorded.
///
/// Deduplication then relies solely on the portal's own "already liked"
/// marker on the detail page.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullHistory;

#[async_trait]
impl HistoryGate for NullHistory {
    async fn has(&self, _member_id: &str, _item_id: &str) -> StoreResult<bool> {
        Ok(false)
    }

    async fn add(&self, _member_id: &str, _item_id: &str) -> StoreResult<()> {
        Ok(())
    }
}

/// Selection store without memory.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSelectionStore;

#[async_trait]
impl SelectionStore for NullSelectionStore {
    async fn find_selected(&self, _user_id: &str) -> StoreResult<HashSet<String>> {
        Ok(HashSet::new())
    }

    async fn add_selected(&self, _user_id: &str, _member_id: &str) -> StoreResult<bool> {
        Ok(false)
    }

    async fn remove_selected(&self, _user_id: &str, _member_id: &str) -> StoreResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_null_history_never_has() {
        let history = NullHistory;
        history.add("m1", "a").await.unwrap();
        assert!(!history.has("m1", "a").await.unwrap());
    }

    #[tokio::test]
    async fn test_null_selection_is_empty() {
        let store = NullSelectionStore;
        assert!(!store.add_selected("u", "m1").await.unwrap());
        assert!(store.find_selected("u").await.unwrap().is_empty());
    }
}
