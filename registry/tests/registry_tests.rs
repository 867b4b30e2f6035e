//! Integration tests for the session registry

use atom_client::testing::{scripted_deps, FakePortal, ScriptedConnector};
use atom_client::{ClientConfig, ClientError, ClientResult, ContentClient};
use atom_common::LoginState;
use atom_registry::{ClientFactory, RegistryConfig, RegistryError, SessionRegistry};
use atom_store::NullHistory;
use std::sync::Arc;
use std::time::Duration;

const MAX_AGE: Duration = Duration::from_secs(600);

fn scripted_factory(
    portal: Arc<FakePortal>,
    connector: Arc<ScriptedConnector>,
) -> Arc<dyn ClientFactory> {
    Arc::new(move || -> ClientResult<ContentClient> {
        let deps = scripted_deps(
            Arc::clone(&portal),
            Arc::clone(&connector),
            Arc::new(NullHistory),
        )?;
        Ok(ContentClient::new(ClientConfig::default(), deps))
    })
}

fn registry() -> (SessionRegistry, Arc<FakePortal>, Arc<ScriptedConnector>) {
    let portal = FakePortal::new();
    portal.script_login(&[("Green Garden", "m1")], "Green Garden");
    let connector = ScriptedConnector::new();
    let config = RegistryConfig {
        max_age: MAX_AGE,
        ..Default::default()
    };
    let factory = scripted_factory(Arc::clone(&portal), Arc::clone(&connector));
    (SessionRegistry::new(&config, factory), portal, connector)
}

#[tokio::test]
async fn test_create_mints_uuid_session() {
    let (registry, _portal, _connector) = registry();

    let (id, client) = registry.create_or_replace(None).await.unwrap();

    assert!(uuid::Uuid::parse_str(&id).is_ok());
    let found = registry.get(&id).unwrap();
    assert!(Arc::ptr_eq(&found, &client));
    assert_eq!(client.state(), LoginState::LoggedOut);
    assert_eq!(registry.len(), 1);
}

#[tokio::test]
async fn test_unknown_session_is_absent() {
    let (registry, _portal, _connector) = registry();
    assert!(registry.get("missing").is_none());
    assert!(registry.is_empty());
}

#[tokio::test]
async fn test_replace_keeps_id_and_tears_down_previous_client() {
    let (registry, _portal, _connector) = registry();
    let (id, first) = registry.create_or_replace(None).await.unwrap();

    let (same_id, second) = registry.create_or_replace(Some(id.clone())).await.unwrap();

    assert_eq!(same_id, id);
    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(first.state(), LoginState::TornDown);
    assert_eq!(second.state(), LoginState::LoggedOut);
    assert!(Arc::ptr_eq(&registry.get(&id).unwrap(), &second));
    assert_eq!(registry.len(), 1);
}

#[tokio::test]
async fn test_replace_waits_for_pending_login_to_close() {
    let (registry, _portal, connector) = registry();
    let (feed, probe) = connector.prepare();
    feed.init();

    let (id, first) = registry.create_or_replace(None).await.unwrap();
    first.start_login(None).await.unwrap();
    assert_eq!(first.state(), LoginState::ScanningQrCode);

    registry.create_or_replace(Some(id)).await.unwrap();

    assert!(probe.is_closed());
    assert_eq!(first.state(), LoginState::TornDown);
    assert_eq!(first.start_login(None).await.unwrap_err(), ClientError::Closed);
}

#[tokio::test(start_paused = true)]
async fn test_session_evicted_after_max_age() {
    let (registry, _portal, connector) = registry();
    let (feed, probe) = connector.prepare();
    feed.init();

    let (id, client) = registry.create_or_replace(None).await.unwrap();
    client.start_login(None).await.unwrap();

    tokio::time::sleep(MAX_AGE - Duration::from_secs(1)).await;
    assert!(registry.get(&id).is_some());

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert!(registry.get(&id).is_none());
    assert!(probe.is_closed());
    assert_eq!(client.state(), LoginState::TornDown);
}

#[tokio::test(start_paused = true)]
async fn test_replacement_gets_its_own_full_lifetime() {
    let (registry, _portal, _connector) = registry();
    let (id, _first) = registry.create_or_replace(None).await.unwrap();

    tokio::time::sleep(Duration::from_secs(300)).await;
    let (_, second) = registry.create_or_replace(Some(id.clone())).await.unwrap();

    // Past the first entry's deadline, within the second's.
    tokio::time::sleep(Duration::from_secs(400)).await;
    assert!(Arc::ptr_eq(&registry.get(&id).unwrap(), &second));

    tokio::time::sleep(Duration::from_secs(201)).await;
    assert!(registry.get(&id).is_none());
    assert_eq!(second.state(), LoginState::TornDown);
}

#[tokio::test]
async fn test_stop_all_drains_and_tears_down() {
    let (registry, _portal, connector) = registry();
    let (feed, probe) = connector.prepare();
    feed.init();

    let (_, scanning) = registry.create_or_replace(None).await.unwrap();
    scanning.start_login(None).await.unwrap();
    let (_, idle) = registry.create_or_replace(None).await.unwrap();

    registry.stop_all().await;

    assert!(registry.is_empty());
    assert!(probe.is_closed());
    assert_eq!(scanning.state(), LoginState::TornDown);
    assert_eq!(idle.state(), LoginState::TornDown);
}

#[tokio::test]
async fn test_factory_failure_installs_nothing() {
    let config = RegistryConfig::default();
    let factory: Arc<dyn ClientFactory> = Arc::new(|| -> ClientResult<ContentClient> {
        Err(ClientError::Markup("broken rules".to_string()))
    });
    let registry = SessionRegistry::new(&config, factory);

    let err = registry.create_or_replace(None).await.unwrap_err();

    assert!(matches!(err, RegistryError::ClientInit(_)));
    assert!(registry.is_empty());
}
