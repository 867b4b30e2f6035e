//! Bulk like engine.
//!
//! Lists up to `count` items of a category, drops the ones the history gate
//! already knows, then likes the rest concurrently. Every per-item failure is
//! isolated to that item.

use atom_common::{Category, HistoryGate};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::category::{CategoryRules, LIKE_PARAM, LIKE_PATH};
use crate::client::ContentClient;
use crate::error::ClientResult;
use crate::markup::{ItemRef, MarkupParser};
use crate::transport::Transport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LikeOutcome {
    Liked,
    AlreadyLiked,
}

async fn like_item(
    transport: &dyn Transport,
    parser: &dyn MarkupParser,
    rules: &CategoryRules,
    item: &ItemRef,
) -> ClientResult<LikeOutcome> {
    let page = transport
        .get(rules.detail_path, &[(rules.detail_param, item.view_id.as_str())])
        .await?;

    // The confirm control shows the category label only while unliked.
    if parser.confirm_label(&page).as_deref() != Some(rules.confirm_label) {
        return Ok(LikeOutcome::AlreadyLiked);
    }

    transport
        .get(LIKE_PATH, &[(LIKE_PARAM, item.like_id.as_str())])
        .await?;
    Ok(LikeOutcome::Liked)
}

fn dedup(items: Vec<ItemRef>) -> Vec<ItemRef> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.like_id.clone()))
        .collect()
}

impl ContentClient {
    /// Like up to `count` of the latest items in `category` and return how
    /// many were liked by this call.
    ///
    /// Only `NotLoggedIn` is an error. A failed listing yields `Ok(0)`, and
    /// items that fail individually are left out of the count.
    pub async fn like(&self, category: Category, count: usize) -> ClientResult<usize> {
        self.ensure_logged_in()?;
        if count == 0 {
            return Ok(0);
        }

        let rules = CategoryRules::of(category);
        let items = match self.fetch_listing(rules, count).await {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!(category = %category, error = %e, "Failed to fetch listing");
                return Ok(0);
            }
        };

        let member_id = self.current_member_id();
        let fresh = self.filter_unliked(&member_id, items).await;
        if fresh.is_empty() {
            tracing::debug!(category = %category, "Nothing new to like");
            return Ok(0);
        }

        let liked = Arc::new(AtomicUsize::new(0));
        let limiter = self
            .config
            .like_concurrency
            .map(|permits| Arc::new(Semaphore::new(permits.max(1))));
        let mut tasks = JoinSet::new();

        for item in fresh {
            let transport = Arc::clone(&self.deps.transport);
            let parser = Arc::clone(&self.deps.parser);
            let history = Arc::clone(&self.deps.history);
            let liked = Arc::clone(&liked);
            let limiter = limiter.clone();
            let member_id = member_id.clone();

            tasks.spawn(async move {
                let _permit = match limiter {
                    Some(limiter) => limiter.acquire_owned().await.ok(),
                    None => None,
                };

                match like_item(transport.as_ref(), parser.as_ref(), rules, &item).await {
                    Ok(LikeOutcome::Liked) => {
                        record(history.as_ref(), &member_id, &item.like_id).await;
                        liked.fetch_add(1, Ordering::SeqCst);
                        tracing::debug!(category = %category, item = %item.like_id, "Liked");
                    }
                    Ok(LikeOutcome::AlreadyLiked) => {
                        // Recorded so later runs skip the detail fetch.
                        record(history.as_ref(), &member_id, &item.like_id).await;
                        tracing::debug!(category = %category, item = %item.like_id, "Already liked");
                    }
                    Err(e) => {
                        tracing::warn!(category = %category, item = %item.like_id, error = %e, "Failed to like item");
                    }
                }
            });
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                tracing::error!(category = %category, error = %e, "Like task panicked");
            }
        }

        let count = liked.load(Ordering::SeqCst);
        tracing::info!(category = %category, liked = count, "Bulk like finished");
        Ok(count)
    }

    async fn fetch_listing(&self, rules: &CategoryRules, count: usize) -> ClientResult<Vec<ItemRef>> {
        let count_param = count.to_string();
        let mut query: Vec<(&str, &str)> = rules.listing_params.to_vec();
        query.push(("begin", "0"));
        query.push(("count", count_param.as_str()));

        let body = self.deps.transport.get(rules.listing_path, &query).await?;
        let mut items = dedup(self.deps.parser.listing_items(&body)?);
        items.truncate(count);
        Ok(items)
    }

    /// Items the history gate has no record of. A gate failure drops the
    /// item rather than risk processing it twice.
    async fn filter_unliked(&self, member_id: &str, items: Vec<ItemRef>) -> Vec<ItemRef> {
        let mut fresh = Vec::with_capacity(items.len());
        for item in items {
            match self.deps.history.has(member_id, &item.like_id).await {
                Ok(false) => fresh.push(item),
                Ok(true) => {}
                Err(e) => {
                    tracing::warn!(item = %item.like_id, error = %e, "History check failed, skipping item");
                }
            }
        }
        fresh
    }
}

async fn record(history: &dyn HistoryGate, member_id: &str, item_id: &str) {
    if let Err(e) = history.add(member_id, item_id).await {
        tracing::warn!(item = %item_id, error = %e, "Failed to record liked item");
    }
}
