//! Persistent store on sled.
//!
//! Layout:
//! - tree `liked_items`: `member_id \0 item_id` -> RFC 3339 timestamp
//! - tree `selected_communities`: `user_id \0 member_id` -> empty

use async_trait::async_trait;
use atom_common::{HistoryGate, SelectionStore, StoreError, StoreResult};
use chrono::Utc;
use sled::{Db, Tree};
use std::collections::HashSet;
use std::path::Path;

const KEY_SEPARATOR: u8 = 0;

/// sled-backed implementation of both store interfaces.
///
/// Cheap to clone; clones share the same database handle.
#[derive(Clone)]
pub struct SledStore {
    db: Db,
    liked: Tree,
    selected: Tree,
}

impl SledStore {
    const LIKED_TREE: &'static str = "liked_items";
    const SELECTED_TREE: &'static str = "selected_communities";

    /// Open or create the database at `path`
    pub fn open(path: &Path) -> StoreResult<Self> {
        let db = sled::open(path).map_err(|e| {
            StoreError::Unavailable(format!("Failed to open {}: {}", path.display(), e))
        })?;
        Self::from_db(db)
    }

    /// Temporary database, removed when dropped
    pub fn temporary() -> StoreResult<Self> {
        let db = sled::Config::new()
            .temporary(true)
            .open()
            .map_err(|e| StoreError::Unavailable(format!("Failed to open temporary db: {}", e)))?;
        Self::from_db(db)
    }

    fn from_db(db: Db) -> StoreResult<Self> {
        let liked = db
            .open_tree(Self::LIKED_TREE)
            .map_err(|e| StoreError::Backend(format!("Failed to open liked tree: {}", e)))?;
        let selected = db
            .open_tree(Self::SELECTED_TREE)
            .map_err(|e| StoreError::Backend(format!("Failed to open selection tree: {}", e)))?;
        Ok(Self { db, liked, selected })
    }

    /// Flush pending writes to disk
    pub async fn flush(&self) -> StoreResult<()> {
        self.db
            .flush_async()
            .await
            .map_err(|e| StoreError::Backend(format!("Failed to flush: {}", e)))?;
        Ok(())
    }
}

fn compound_key(first: &str, second: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(first.len() + second.len() + 1);
    key.extend_from_slice(first.as_bytes());
    key.push(KEY_SEPARATOR);
    key.extend_from_slice(second.as_bytes());
    key
}

fn prefix(first: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(first.len() + 1);
    key.extend_from_slice(first.as_bytes());
    key.push(KEY_SEPARATOR);
    key
}

#[async_trait]
impl HistoryGate for SledStore {
    async fn has(&self, member_id: &str, item_id: &str) -> StoreResult<bool> {
        self.liked
            .contains_key(compound_key(member_id, item_id))
            .map_err(|e| StoreError::Backend(format!("Failed to read liked item: {}", e)))
    }

    async fn add(&self, member_id: &str, item_id: &str) -> StoreResult<()> {
        let stamp = Utc::now().to_rfc3339();
        // compare_and_swap from None keeps the first timestamp; a conflict
        // just means the pair is already recorded.
        let outcome = self
            .liked
            .compare_and_swap(
                compound_key(member_id, item_id),
                None as Option<&[u8]>,
                Some(stamp.as_bytes()),
            )
            .map_err(|e| StoreError::Backend(format!("Failed to record liked item: {}", e)))?;
        if outcome.is_err() {
            tracing::debug!(member_id, item_id, "Liked item already recorded");
        }
        Ok(())
    }
}

#[async_trait]
impl SelectionStore for SledStore {
    async fn find_selected(&self, user_id: &str) -> StoreResult<HashSet<String>> {
        let prefix = prefix(user_id);
        let mut selected = HashSet::new();
        for entry in self.selected.scan_prefix(&prefix) {
            let (key, _) = entry
                .map_err(|e| StoreError::Backend(format!("Failed to scan selection: {}", e)))?;
            let member = std::str::from_utf8(&key[prefix.len()..])
                .map_err(|e| StoreError::Corrupted(format!("Invalid member id key: {}", e)))?;
            selected.insert(member.to_string());
        }
        Ok(selected)
    }

    async fn add_selected(&self, user_id: &str, member_id: &str) -> StoreResult<bool> {
        let previous = self
            .selected
            .insert(compound_key(user_id, member_id), &[] as &[u8])
            .map_err(|e| StoreError::Backend(format!("Failed to select community: {}", e)))?;
        Ok(previous.is_none())
    }

    async fn remove_selected(&self, user_id: &str, member_id: &str) -> StoreResult<()> {
        self.selected
            .remove(compound_key(user_id, member_id))
            .map_err(|e| StoreError::Backend(format!("Failed to deselect community: {}", e)))?;
        Ok(())
    }
}
