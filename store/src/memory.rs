//! In-memory stores backed by `DashMap`.

use async_trait::async_trait;
use atom_common::{HistoryGate, LikedItem, SelectionStore, StoreResult};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::collections::HashSet;

/// Process-local like history.
#[derive(Debug, Default)]
pub struct MemoryHistory {
    records: DashMap<LikedItem, DateTime<Utc>>,
}

impl MemoryHistory {
    /// Create an empty history
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of recorded pairs
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no pair has been recorded
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// When the pair was recorded, if it was
    pub fn recorded_at(&self, member_id: &str, item_id: &str) -> Option<DateTime<Utc>> {
        self.records
            .get(&LikedItem::new(member_id, item_id))
            .map(|entry| *entry.value())
    }
}

#[async_trait]
impl HistoryGate for MemoryHistory {
    async fn has(&self, member_id: &str, item_id: &str) -> StoreResult<bool> {
        Ok(self.records.contains_key(&LikedItem::new(member_id, item_id)))
    }

    async fn add(&self, member_id: &str, item_id: &str) -> StoreResult<()> {
        // First write wins; re-recording keeps the original timestamp.
        self.records
            .entry(LikedItem::new(member_id, item_id))
            .or_insert_with(Utc::now);
        Ok(())
    }
}

/// Process-local community selection, keyed by user id.
#[derive(Debug, Default)]
pub struct MemorySelectionStore {
    selected: DashMap<String, HashSet<String>>,
}

impl MemorySelectionStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SelectionStore for MemorySelectionStore {
    async fn find_selected(&self, user_id: &str) -> StoreResult<HashSet<String>> {
        Ok(self
            .selected
            .get(user_id)
            .map(|set| set.value().clone())
            .unwrap_or_default())
    }

    async fn add_selected(&self, user_id: &str, member_id: &str) -> StoreResult<bool> {
        Ok(self
            .selected
            .entry(user_id.to_string())
            .or_default()
            .insert(member_id.to_string()))
    }

    async fn remove_selected(&self, user_id: &str, member_id: &str) -> StoreResult<()> {
        if let Some(mut set) = self.selected.get_mut(user_id) {
            set.remove(member_id);
        }
        Ok(())
    }
}
