//! QR login and community selection against the scripted portal

use async_trait::async_trait;
use atom_client::testing::{scripted_deps, wait_for_state, FakePortal, ScriptedConnector};
use atom_client::{
    ClientConfig, ClientDeps, ClientError, ClientResult, ContentClient, DuplexConnection,
    DuplexConnector, Frame, RegexMarkupParser, RemoteConfig, WebSocketConnector,
};
use atom_common::{Community, LoginState};
use atom_store::MemoryHistory;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

const WAIT: Duration = Duration::from_secs(5);

fn client_over(portal: &Arc<FakePortal>, connector: &Arc<ScriptedConnector>) -> Arc<ContentClient> {
    let deps = scripted_deps(
        Arc::clone(portal),
        Arc::clone(connector),
        Arc::new(MemoryHistory::new()),
    )
    .unwrap();
    Arc::new(ContentClient::new(ClientConfig::default(), deps))
}

fn two_communities(portal: &FakePortal) {
    portal.script_login(&[("Green Garden", "m1"), ("River Park", "m2")], "River Park");
}

#[tokio::test]
async fn test_start_login_returns_qr_target() {
    let portal = FakePortal::new();
    two_communities(&portal);
    let connector = ScriptedConnector::new();
    let (feed, probe) = connector.prepare();
    feed.init();

    let client = client_over(&portal, &connector);
    let qr = client.start_login(None).await.unwrap();

    assert_eq!(qr, "https://qr.example/login");
    assert_eq!(client.state(), LoginState::ScanningQrCode);
    assert_eq!(probe.sent(), vec!["qr".to_string()]);
    assert!(!probe.is_closed());

    let urls = connector.urls();
    assert_eq!(urls.len(), 1);
    assert!(urls[0].contains("connectionToken=token-1"));
    assert!(urls[0].contains("transport=webSockets"));
    assert_eq!(portal.count_with("/home/qr_login_more_v1", "id", "conn-1"), 1);
}

#[tokio::test]
async fn test_bind_user_completes_login() {
    let portal = FakePortal::new();
    two_communities(&portal);
    let connector = ScriptedConnector::new();
    let (feed, probe) = connector.prepare();
    feed.init();

    let hook_calls = Arc::new(AtomicUsize::new(0));
    let hook_counter = Arc::clone(&hook_calls);
    let client = client_over(&portal, &connector);
    client
        .start_login(Some(Box::new(move || {
            hook_counter.fetch_add(1, Ordering::SeqCst);
        })))
        .await
        .unwrap();

    feed.bind_user();
    assert!(wait_for_state(&client, LoginState::LoggedIn, WAIT).await);

    assert_eq!(
        client.communities(),
        vec![Community::new("Green Garden", "m1"), Community::new("River Park", "m2")]
    );
    assert_eq!(client.current_member_id(), "m2");
    assert_eq!(client.identity().as_deref(), Some("wx-user"));
    assert_eq!(hook_calls.load(Ordering::SeqCst), 1);
    assert_eq!(portal.count_with("/home/qr_login_do", "id", "conn-1"), 1);

    // The task closes its connection once done.
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(probe.is_closed());
}

#[tokio::test]
async fn test_pending_memberships_are_filtered() {
    let portal = FakePortal::new();
    two_communities(&portal);
    portal.respond(
        "/api/register/member/bind",
        atom_client::testing::pages::memberships(
            &[("Green Garden", "m1", "已通过"), ("River Park", "m2", "待审核")],
            "",
        ),
    );
    let connector = ScriptedConnector::new();
    let (feed, _probe) = connector.prepare();
    feed.init();

    let client = client_over(&portal, &connector);
    client.start_login(None).await.unwrap();
    feed.bind_user();
    assert!(wait_for_state(&client, LoginState::LoggedIn, WAIT).await);

    assert_eq!(client.communities(), vec![Community::new("Green Garden", "m1")]);
    // Active community is not an accepted membership.
    assert!(client.current_community().is_none());
    assert_eq!(client.current_member_id(), "");
    assert!(client.identity().is_none());
}

#[tokio::test]
async fn test_second_start_while_scanning_is_rejected_without_network() {
    let portal = FakePortal::new();
    two_communities(&portal);
    let connector = ScriptedConnector::new();
    let (feed, _probe) = connector.prepare();
    feed.init();

    let client = client_over(&portal, &connector);
    client.start_login(None).await.unwrap();
    let before = portal.requests().len();

    let err = client.start_login(None).await.unwrap_err();

    assert_eq!(err, ClientError::AlreadyInProgress);
    assert_eq!(portal.requests().len(), before);
    assert_eq!(connector.urls().len(), 1);
}

#[tokio::test]
async fn test_stop_login_closes_connection_before_returning() {
    let portal = FakePortal::new();
    two_communities(&portal);
    let connector = ScriptedConnector::new();
    let (feed, probe) = connector.prepare();
    feed.init();
    feed.keepalive();

    let client = client_over(&portal, &connector);
    client.start_login(None).await.unwrap();

    client.stop_login().await;

    assert!(probe.is_closed());
    assert_eq!(client.state(), LoginState::TornDown);

    // A scan confirmed after the stop changes nothing.
    feed.bind_user();
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(client.state(), LoginState::TornDown);
    assert_eq!(portal.count("/home/qr_login_do"), 0);
}

#[tokio::test]
async fn test_stop_login_is_noop_unless_scanning() {
    let portal = FakePortal::new();
    let connector = ScriptedConnector::new();
    let client = client_over(&portal, &connector);

    client.stop_login().await;

    assert_eq!(client.state(), LoginState::LoggedOut);
    assert!(portal.requests().is_empty());
}

#[tokio::test]
async fn test_failed_bind_returns_to_logged_out() {
    let portal = FakePortal::new();
    two_communities(&portal);
    portal.fail("/home/qr_login_do", 500);
    let connector = ScriptedConnector::new();
    let (feed, probe) = connector.prepare();
    feed.init();

    let client = client_over(&portal, &connector);
    client.start_login(None).await.unwrap();
    feed.bind_user();

    assert!(wait_for_state(&client, LoginState::LoggedOut, WAIT).await);
    assert!(client.communities().is_empty());
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(probe.is_closed());
}

#[tokio::test]
async fn test_read_error_before_init_fails_start() {
    let portal = FakePortal::new();
    two_communities(&portal);
    let connector = ScriptedConnector::new();
    let (feed, probe) = connector.prepare();
    feed.error("reset by peer");

    let client = client_over(&portal, &connector);
    let err = client.start_login(None).await.unwrap_err();

    assert!(matches!(err, ClientError::Connection(_)));
    assert!(err.is_transport());
    assert_eq!(client.state(), LoginState::LoggedOut);
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(probe.is_closed());
}

#[tokio::test]
async fn test_bind_before_init_aborts_login() {
    let portal = FakePortal::new();
    two_communities(&portal);
    portal.fail("/home/qr_login_do", 500);
    let connector = ScriptedConnector::new();
    let (feed, _probe) = connector.prepare();
    feed.bind_user();

    let client = client_over(&portal, &connector);
    let err = client.start_login(None).await.unwrap_err();

    assert_eq!(err, ClientError::LoginAborted);
    assert_ne!(client.state(), LoginState::ScanningQrCode);
}

#[tokio::test]
async fn test_companion_start_failure_closes_connection() {
    let portal = FakePortal::new();
    two_communities(&portal);
    portal.fail("/authorize/start", 503);
    let connector = ScriptedConnector::new();
    let (_feed, probe) = connector.prepare();

    let client = client_over(&portal, &connector);
    let err = client.start_login(None).await.unwrap_err();

    assert!(matches!(err, ClientError::Status { status: 503, .. }));
    assert!(probe.is_closed());
    assert_eq!(client.state(), LoginState::LoggedOut);
}

#[tokio::test]
async fn test_negotiation_failure_opens_no_connection() {
    let portal = FakePortal::new();
    let connector = ScriptedConnector::new();
    let client = client_over(&portal, &connector);

    let err = client.start_login(None).await.unwrap_err();

    assert!(matches!(err, ClientError::Status { status: 404, .. }));
    assert!(connector.urls().is_empty());
}

#[tokio::test]
async fn test_teardown_refuses_new_logins() {
    let portal = FakePortal::new();
    two_communities(&portal);
    let connector = ScriptedConnector::new();
    let client = client_over(&portal, &connector);

    client.teardown().await;

    assert_eq!(client.state(), LoginState::TornDown);
    assert_eq!(client.start_login(None).await.unwrap_err(), ClientError::Closed);
    assert!(portal.requests().is_empty());
}

#[tokio::test]
async fn test_teardown_stops_pending_scan() {
    let portal = FakePortal::new();
    two_communities(&portal);
    let connector = ScriptedConnector::new();
    let (feed, probe) = connector.prepare();
    feed.init();

    let client = client_over(&portal, &connector);
    client.start_login(None).await.unwrap();
    client.teardown().await;

    assert!(probe.is_closed());
    assert_eq!(client.state(), LoginState::TornDown);
}

async fn logged_in(portal: &Arc<FakePortal>) -> Arc<ContentClient> {
    let connector = ScriptedConnector::new();
    let (feed, _probe) = connector.prepare();
    feed.init();
    let client = client_over(portal, &connector);
    client.start_login(None).await.unwrap();
    feed.bind_user();
    assert!(wait_for_state(&client, LoginState::LoggedIn, WAIT).await);
    client
}

#[tokio::test]
async fn test_select_community_switches_remote_session() {
    let portal = FakePortal::new();
    two_communities(&portal);
    let client = logged_in(&portal).await;

    let community = client.select_community("m1").await.unwrap();

    assert_eq!(community, Community::new("Green Garden", "m1"));
    assert_eq!(client.current_member_id(), "m1");
    assert_eq!(portal.count("/api/member/switch/m1"), 1);
}

#[tokio::test]
async fn test_select_unknown_community_is_rejected_locally() {
    let portal = FakePortal::new();
    two_communities(&portal);
    let client = logged_in(&portal).await;
    let before = portal.requests().len();

    let err = client.select_community("m9").await.unwrap_err();

    assert_eq!(err, ClientError::InvalidCommunityId("m9".to_string()));
    assert_eq!(client.current_member_id(), "m2");
    assert_eq!(portal.requests().len(), before);
}

#[tokio::test]
async fn test_failed_switch_keeps_selection() {
    let portal = FakePortal::new();
    two_communities(&portal);
    portal.fail("/api/member/switch/m1", 502);
    let client = logged_in(&portal).await;

    let err = client.select_community("m1").await.unwrap_err();

    assert!(err.is_transport());
    assert_eq!(client.current_member_id(), "m2");
}

#[tokio::test]
async fn test_select_community_requires_login() {
    let portal = FakePortal::new();
    let connector = ScriptedConnector::new();
    let client = client_over(&portal, &connector);

    assert_eq!(
        client.select_community("m1").await.unwrap_err(),
        ClientError::NotLoggedIn
    );
}

#[tokio::test]
async fn test_membership_refresh_failure_still_logs_in() {
    let portal = FakePortal::new();
    two_communities(&portal);
    portal.fail("/api/register/member/bind", 500);
    let connector = ScriptedConnector::new();
    let (feed, _probe) = connector.prepare();
    feed.init();

    let hook_calls = Arc::new(AtomicUsize::new(0));
    let hook_counter = Arc::clone(&hook_calls);
    let client = client_over(&portal, &connector);
    client
        .start_login(Some(Box::new(move || {
            hook_counter.fetch_add(1, Ordering::SeqCst);
        })))
        .await
        .unwrap();
    feed.bind_user();

    assert!(wait_for_state(&client, LoginState::LoggedIn, WAIT).await);
    assert!(client.communities().is_empty());
    assert!(client.identity().is_none());
    assert!(client.current_community().is_none());
    assert_eq!(hook_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_membership_refresh_failure_keeps_previous_list() {
    let portal = FakePortal::new();
    two_communities(&portal);
    let first = ScriptedConnector::new();
    let (feed, _probe) = first.prepare();
    feed.init();
    let (second_feed, _second_probe) = first.prepare();
    second_feed.init();

    let client = client_over(&portal, &first);
    client.start_login(None).await.unwrap();
    feed.bind_user();
    assert!(wait_for_state(&client, LoginState::LoggedIn, WAIT).await);

    portal.fail("/api/register/member/bind", 502);
    client.start_login(None).await.unwrap();
    assert_eq!(client.state(), LoginState::ScanningQrCode);
    second_feed.bind_user();
    assert!(wait_for_state(&client, LoginState::LoggedIn, WAIT).await);

    assert_eq!(
        client.communities(),
        vec![Community::new("Green Garden", "m1"), Community::new("River Park", "m2")]
    );
    assert_eq!(client.identity().as_deref(), Some("wx-user"));
    assert_eq!(client.current_member_id(), "m2");
}

#[tokio::test]
async fn test_landing_page_failure_leaves_current_unset() {
    let portal = FakePortal::new();
    two_communities(&portal);
    portal.fail("/home/home", 500);
    let connector = ScriptedConnector::new();
    let (feed, _probe) = connector.prepare();
    feed.init();

    let hook_calls = Arc::new(AtomicUsize::new(0));
    let hook_counter = Arc::clone(&hook_calls);
    let client = client_over(&portal, &connector);
    client
        .start_login(Some(Box::new(move || {
            hook_counter.fetch_add(1, Ordering::SeqCst);
        })))
        .await
        .unwrap();
    feed.bind_user();

    assert!(wait_for_state(&client, LoginState::LoggedIn, WAIT).await);
    assert_eq!(client.communities().len(), 2);
    assert!(client.current_community().is_none());
    assert_eq!(client.current_member_id(), "");
    assert_eq!(hook_calls.load(Ordering::SeqCst), 1);
}

fn client_with_connector(
    portal: &Arc<FakePortal>,
    connector: Arc<dyn DuplexConnector>,
    config: ClientConfig,
) -> Arc<ContentClient> {
    let deps = ClientDeps {
        transport: Arc::clone(portal) as _,
        connector,
        parser: Arc::new(RegexMarkupParser::new().unwrap()),
        history: Arc::new(MemoryHistory::new()),
    };
    Arc::new(ContentClient::new(config, deps))
}

#[tokio::test]
async fn test_silent_socket_upgrade_times_out() {
    // Accepts TCP but never answers the upgrade.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            held.push(stream);
        }
    });

    let portal = FakePortal::new();
    two_communities(&portal);
    let config = ClientConfig {
        remote: RemoteConfig {
            socket_url: format!("ws://{}/authorize/connect", addr),
            ..Default::default()
        },
        request_timeout: Duration::from_millis(300),
        ..Default::default()
    };
    let client = client_with_connector(&portal, Arc::new(WebSocketConnector), config);

    let result = tokio::time::timeout(Duration::from_secs(5), client.start_login(None))
        .await
        .expect("start_login must give up within the request timeout");

    assert_eq!(result.unwrap_err(), ClientError::Timeout("login socket".to_string()));
    assert_eq!(client.state(), LoginState::LoggedOut);
    assert_eq!(portal.count("/authorize/start"), 0);
}

/// Connection whose close never completes.
struct StuckConnection;

#[async_trait]
impl DuplexConnection for StuckConnection {
    async fn send_text(&mut self, _text: &str) -> ClientResult<()> {
        Ok(())
    }

    async fn read_frame(&mut self) -> ClientResult<Frame> {
        std::future::pending().await
    }

    async fn close(&mut self) -> ClientResult<()> {
        std::future::pending().await
    }
}

struct StuckConnector;

#[async_trait]
impl DuplexConnector for StuckConnector {
    async fn connect(&self, _url: &str) -> ClientResult<Box<dyn DuplexConnection>> {
        Ok(Box::new(StuckConnection))
    }
}

#[tokio::test]
async fn test_companion_failure_with_stuck_close_still_returns() {
    let portal = FakePortal::new();
    two_communities(&portal);
    portal.fail("/authorize/start", 503);
    let config = ClientConfig {
        request_timeout: Duration::from_millis(300),
        ..Default::default()
    };
    let client = client_with_connector(&portal, Arc::new(StuckConnector), config);

    let result = tokio::time::timeout(Duration::from_secs(5), client.start_login(None))
        .await
        .expect("start_login must not wait on a stuck close");

    assert!(matches!(result, Err(ClientError::Status { status: 503, .. })));
    assert_eq!(client.state(), LoginState::LoggedOut);
}
