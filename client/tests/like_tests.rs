//! Bulk liking against the scripted portal

use async_trait::async_trait;
use atom_client::testing::{pages, scripted_deps, wait_for_state, FakePortal, ScriptedConnector};
use atom_client::{ClientConfig, ClientError, ContentClient};
use atom_common::{Category, HistoryGate, LoginState, StoreError, StoreResult};
use atom_store::MemoryHistory;
use std::sync::Arc;
use std::time::Duration;

const NOTICE_LISTING: &str = "/community/notice_list_more";
const NOTICE_DETAIL: &str = "/community/title_view";
const LIKE: &str = "/community/title_like";

async fn logged_in_with(
    portal: &Arc<FakePortal>,
    history: Arc<dyn HistoryGate>,
    config: ClientConfig,
) -> Arc<ContentClient> {
    portal.script_login(&[("Green Garden", "m1")], "Green Garden");
    let connector = ScriptedConnector::new();
    let (feed, _probe) = connector.prepare();
    feed.init();

    let deps = scripted_deps(Arc::clone(portal), connector, history).unwrap();
    let client = Arc::new(ContentClient::new(config, deps));
    client.start_login(None).await.unwrap();
    feed.bind_user();
    assert!(wait_for_state(&client, LoginState::LoggedIn, Duration::from_secs(5)).await);
    client
}

fn unliked_notices(portal: &FakePortal, ids: &[&str]) {
    portal.respond(NOTICE_LISTING, pages::listing(ids));
    portal.respond(NOTICE_DETAIL, pages::detail("点赞"));
    portal.respond(LIKE, "ok");
}

#[tokio::test]
async fn test_like_is_idempotent_across_calls() {
    let portal = FakePortal::new();
    let history = Arc::new(MemoryHistory::new());
    let client = logged_in_with(&portal, history.clone(), ClientConfig::default()).await;
    unliked_notices(&portal, &["A", "B", "C"]);

    assert_eq!(client.like(Category::Notices, 10).await.unwrap(), 3);
    assert_eq!(history.len(), 3);
    assert!(history.recorded_at("m1", "B").is_some());

    assert_eq!(client.like(Category::Notices, 10).await.unwrap(), 0);
    // Recorded items are not fetched again.
    assert_eq!(portal.count(NOTICE_DETAIL), 3);
    assert_eq!(portal.count(LIKE), 3);
}

#[tokio::test]
async fn test_like_sends_listing_window() {
    let portal = FakePortal::new();
    let client = logged_in_with(&portal, Arc::new(MemoryHistory::new()), ClientConfig::default()).await;
    unliked_notices(&portal, &["A"]);

    client.like(Category::Notices, 7).await.unwrap();

    assert_eq!(portal.count_with(NOTICE_LISTING, "count", "7"), 1);
    assert_eq!(portal.count_with(NOTICE_LISTING, "begin", "0"), 1);
}

#[tokio::test]
async fn test_like_truncates_to_count() {
    let portal = FakePortal::new();
    let client = logged_in_with(&portal, Arc::new(MemoryHistory::new()), ClientConfig::default()).await;
    unliked_notices(&portal, &["A", "B", "C", "D"]);

    assert_eq!(client.like(Category::Notices, 2).await.unwrap(), 2);
    assert_eq!(portal.count(LIKE), 2);
}

#[tokio::test]
async fn test_one_failing_item_does_not_affect_others() {
    let portal = FakePortal::new();
    let history = Arc::new(MemoryHistory::new());
    let client = logged_in_with(&portal, history.clone(), ClientConfig::default()).await;
    unliked_notices(&portal, &["A", "B", "C", "D"]);
    portal.fail("/community/title_like?title=C", 500);

    assert_eq!(client.like(Category::Notices, 10).await.unwrap(), 3);
    assert!(history.recorded_at("m1", "C").is_none());
    assert_eq!(history.len(), 3);
}

#[tokio::test]
async fn test_failing_detail_is_not_recorded() {
    let portal = FakePortal::new();
    let history = Arc::new(MemoryHistory::new());
    let client = logged_in_with(&portal, history.clone(), ClientConfig::default()).await;
    unliked_notices(&portal, &["A", "B"]);
    portal.fail("/community/title_view?title=A", 502);

    assert_eq!(client.like(Category::Notices, 10).await.unwrap(), 1);
    assert!(history.recorded_at("m1", "A").is_none());
    assert_eq!(portal.count_with(LIKE, "title", "A"), 0);
}

#[tokio::test]
async fn test_already_liked_item_is_recorded_but_not_counted() {
    let portal = FakePortal::new();
    let history = Arc::new(MemoryHistory::new());
    let client = logged_in_with(&portal, history.clone(), ClientConfig::default()).await;
    unliked_notices(&portal, &["A", "B"]);
    portal.respond("/community/title_view?title=B", pages::detail("已赞"));

    assert_eq!(client.like(Category::Notices, 10).await.unwrap(), 1);
    assert!(history.recorded_at("m1", "B").is_some());
    assert_eq!(portal.count_with(LIKE, "title", "B"), 0);
}

#[tokio::test]
async fn test_proposals_confirm_with_their_own_label() {
    let portal = FakePortal::new();
    let client = logged_in_with(&portal, Arc::new(MemoryHistory::new()), ClientConfig::default()).await;
    portal.respond("/community/proposal_list_more", pages::listing(&["P1", "P2"]));
    portal.respond("/community/proposal_view", pages::detail("赞成"));
    portal.respond("/community/proposal_view?caseId=P2", pages::detail("点赞"));
    portal.respond(LIKE, "ok");

    assert_eq!(client.like(Category::Proposals, 5).await.unwrap(), 1);
    assert_eq!(portal.count_with(LIKE, "title", "P1"), 1);
    assert_eq!(portal.count_with("/community/proposal_view", "caseId", "P1"), 1);
}

#[tokio::test]
async fn test_listing_failure_yields_zero() {
    let portal = FakePortal::new();
    let client = logged_in_with(&portal, Arc::new(MemoryHistory::new()), ClientConfig::default()).await;
    portal.fail(NOTICE_LISTING, 500);

    assert_eq!(client.like(Category::Notices, 10).await.unwrap(), 0);
    assert_eq!(portal.count(NOTICE_DETAIL), 0);
}

#[tokio::test]
async fn test_like_requires_login() {
    let portal = FakePortal::new();
    let deps = scripted_deps(
        Arc::clone(&portal),
        ScriptedConnector::new(),
        Arc::new(MemoryHistory::new()),
    )
    .unwrap();
    let client = ContentClient::new(ClientConfig::default(), deps);

    assert_eq!(
        client.like(Category::Moments, 5).await.unwrap_err(),
        ClientError::NotLoggedIn
    );
    assert!(portal.requests().is_empty());
}

#[tokio::test]
async fn test_bounded_concurrency_likes_everything() {
    let portal = FakePortal::new();
    let config = ClientConfig {
        like_concurrency: Some(2),
        ..Default::default()
    };
    let client = logged_in_with(&portal, Arc::new(MemoryHistory::new()), config).await;
    let ids: Vec<String> = (0..12).map(|i| format!("N{}", i)).collect();
    let ids: Vec<&str> = ids.iter().map(String::as_str).collect();
    unliked_notices(&portal, &ids);

    assert_eq!(client.like(Category::Notices, 12).await.unwrap(), 12);
}

/// History whose lookups fail for one item.
struct FlakyHistory {
    inner: MemoryHistory,
    broken: &'static str,
}

#[async_trait]
impl HistoryGate for FlakyHistory {
    async fn has(&self, member_id: &str, item_id: &str) -> StoreResult<bool> {
        if item_id == self.broken {
            return Err(StoreError::Unavailable("lookup failed".to_string()));
        }
        self.inner.has(member_id, item_id).await
    }

    async fn add(&self, member_id: &str, item_id: &str) -> StoreResult<()> {
        self.inner.add(member_id, item_id).await
    }
}

#[tokio::test]
async fn test_history_lookup_failure_skips_item() {
    let portal = FakePortal::new();
    let history = Arc::new(FlakyHistory {
        inner: MemoryHistory::new(),
        broken: "B",
    });
    let client = logged_in_with(&portal, history, ClientConfig::default()).await;
    unliked_notices(&portal, &["A", "B", "C"]);

    assert_eq!(client.like(Category::Notices, 10).await.unwrap(), 2);
    assert_eq!(portal.count_with(NOTICE_DETAIL, "title", "B"), 0);
}

/// History that accepts lookups but cannot record.
struct ReadOnlyHistory;

#[async_trait]
impl HistoryGate for ReadOnlyHistory {
    async fn has(&self, _member_id: &str, _item_id: &str) -> StoreResult<bool> {
        Ok(false)
    }

    async fn add(&self, _member_id: &str, _item_id: &str) -> StoreResult<()> {
        Err(StoreError::Backend("read only".to_string()))
    }
}

#[tokio::test]
async fn test_record_failure_still_counts_like() {
    let portal = FakePortal::new();
    let client = logged_in_with(&portal, Arc::new(ReadOnlyHistory), ClientConfig::default()).await;
    unliked_notices(&portal, &["A", "B"]);

    assert_eq!(client.like(Category::Notices, 10).await.unwrap(), 2);
}
