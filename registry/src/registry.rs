//! Session table with absolute expiry

use atom_client::ContentClient;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::AbortHandle;
use uuid::Uuid;

use crate::config::RegistryConfig;
use crate::error::{RegistryError, RegistryResult};
use crate::factory::ClientFactory;

const MINT_ATTEMPTS: usize = 3;

struct SessionEntry {
    client: Arc<ContentClient>,
    created_at: DateTime<Utc>,
    timer: AbortHandle,
}

impl SessionEntry {
    fn age_secs(&self) -> i64 {
        (Utc::now() - self.created_at).num_seconds()
    }
}

struct RegistryInner {
    max_age: Duration,
    factory: Arc<dyn ClientFactory>,
    sessions: Mutex<HashMap<String, SessionEntry>>,
}

/// Session id to content client map.
///
/// The table lock is held only for map operations, never across a network
/// call or a teardown wait.
#[derive(Clone)]
pub struct SessionRegistry {
    inner: Arc<RegistryInner>,
}

impl SessionRegistry {
    /// Create a registry building clients with `factory`
    pub fn new(config: &RegistryConfig, factory: Arc<dyn ClientFactory>) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                max_age: config.max_age,
                factory,
                sessions: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Client for `id`, if the session is live
    pub fn get(&self, id: &str) -> Option<Arc<ContentClient>> {
        self.inner
            .sessions
            .lock()
            .get(id)
            .map(|entry| Arc::clone(&entry.client))
    }

    /// Number of live sessions
    pub fn len(&self) -> usize {
        self.inner.sessions.lock().len()
    }

    /// Whether no session is live
    pub fn is_empty(&self) -> bool {
        self.inner.sessions.lock().is_empty()
    }

    fn mint_id(&self) -> RegistryResult<String> {
        for _ in 0..MINT_ATTEMPTS {
            let id = Uuid::new_v4().to_string();
            if !self.inner.sessions.lock().contains_key(&id) {
                return Ok(id);
            }
        }
        Err(RegistryError::SessionIdUnavailable {
            attempts: MINT_ATTEMPTS,
        })
    }

    /// Install a fresh client under `id`, or under a newly minted id when
    /// none is given.
    ///
    /// Any client already registered under the id is torn down first, and
    /// so is one installed concurrently while that teardown ran.
    pub async fn create_or_replace(
        &self,
        id: Option<String>,
    ) -> RegistryResult<(String, Arc<ContentClient>)> {
        let id = match id {
            Some(id) => id,
            None => self.mint_id()?,
        };
        let client = Arc::new(self.inner.factory.create()?);

        loop {
            let replaced = {
                let mut sessions = self.inner.sessions.lock();
                match sessions.remove(&id) {
                    Some(entry) => entry,
                    None => {
                        let timer = self.arm_eviction(&id, &client);
                        sessions.insert(
                            id.clone(),
                            SessionEntry {
                                client: Arc::clone(&client),
                                created_at: Utc::now(),
                                timer,
                            },
                        );
                        break;
                    }
                }
            };

            replaced.timer.abort();
            tracing::info!(session_id = %id, age_secs = replaced.age_secs(), "Replacing session");
            replaced.client.teardown().await;
        }

        tracing::info!(session_id = %id, "Session created");
        Ok((id, client))
    }

    fn arm_eviction(&self, id: &str, client: &Arc<ContentClient>) -> AbortHandle {
        let inner = Arc::downgrade(&self.inner);
        let id = id.to_string();
        let client = Arc::clone(client);
        let max_age = self.inner.max_age;
        tokio::spawn(evict_after(inner, id, client, max_age)).abort_handle()
    }

    /// Remove every session and tear all clients down. Used at shutdown.
    pub async fn stop_all(&self) {
        let drained: Vec<(String, SessionEntry)> = self.inner.sessions.lock().drain().collect();
        if drained.is_empty() {
            return;
        }

        tracing::info!(sessions = drained.len(), "Stopping all sessions");
        let teardowns = drained.into_iter().map(|(id, entry)| async move {
            entry.timer.abort();
            entry.client.teardown().await;
            tracing::debug!(session_id = %id, "Session stopped");
        });
        futures::future::join_all(teardowns).await;
    }
}

async fn evict_after(
    inner: Weak<RegistryInner>,
    id: String,
    client: Arc<ContentClient>,
    max_age: Duration,
) {
    tokio::time::sleep(max_age).await;
    let Some(inner) = inner.upgrade() else {
        return;
    };

    // A replacement may own the id by now; only the client this timer was
    // armed for is evicted.
    let evicted = {
        let mut sessions = inner.sessions.lock();
        match sessions.get(&id) {
            Some(entry) if Arc::ptr_eq(&entry.client, &client) => sessions.remove(&id),
            _ => None,
        }
    };

    if let Some(entry) = evicted {
        tracing::info!(session_id = %id, age_secs = entry.age_secs(), "Session expired");
        entry.client.teardown().await;
    }
}
