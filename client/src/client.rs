//! Content client: one outbound identity, the QR login state machine and
//! community selection.
//!
//! # Login flow
//!
//! 1. negotiate a connection token and id
//! 2. open the duplex connection, then activate it with a companion request
//! 3. a background task sends `qr` and reads frames until `Init` (QR code
//!    ready) and `BindUser` (scan confirmed)
//!
//! `start_login` returns once the QR target is known. The background task
//! always closes the connection and publishes a finished signal, which is
//! what `stop_login` waits on.

use atom_common::{Community, HistoryGate, LoginState};
use parking_lot::{Mutex, RwLock};
use serde::Deserialize;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use tokio::sync::{oneshot, watch};
use tokio_util::sync::CancellationToken;

use crate::config::ClientConfig;
use crate::connection::{DuplexConnection, DuplexConnector, WebSocketConnector};
use crate::error::{ClientError, ClientResult};
use crate::markup::{MarkupParser, RegexMarkupParser};
use crate::transport::{get_json, HttpTransport, Transport};

const NEGOTIATE_PATH: &str = "/authorize/negotiate";
const START_PATH: &str = "/authorize/start";
const QR_PATH: &str = "/home/qr_login_more_v1";
const BIND_PATH: &str = "/home/qr_login_do";
const MEMBERSHIP_PATH: &str = "/api/register/member/bind";
const HOME_PATH: &str = "/home/home";
const SWITCH_PATH: &str = "/api/member/switch/";

const QR_TRIGGER: &str = "qr";
const ACCEPTED_STATUS: &str = "已通过";

/// Invoked once when a login completes. Must not block.
pub type LoginHook = Box<dyn FnOnce() + Send + 'static>;

/// Collaborators a client talks through.
#[derive(Clone)]
pub struct ClientDeps {
    /// Request/response channel carrying this client's cookies
    pub transport: Arc<dyn Transport>,
    /// Opens the login socket
    pub connector: Arc<dyn DuplexConnector>,
    /// Page scraping rules
    pub parser: Arc<dyn MarkupParser>,
    /// Like deduplication
    pub history: Arc<dyn HistoryGate>,
}

/// What a successful login learned about the user.
///
/// Replaced as a whole before the client reports `LoggedIn`, so readers
/// never observe a half-refreshed profile.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Profile {
    /// Accepted memberships
    pub communities: Vec<Community>,
    /// Remote identity, when the portal reports one
    pub identity: Option<String>,
    /// Index into `communities` of the active community
    pub current: Option<usize>,
}

impl Profile {
    /// The active community, if resolved
    pub fn current_community(&self) -> Option<&Community> {
        self.current.and_then(|index| self.communities.get(index))
    }

    /// Index of the membership with `member_id`
    pub fn position(&self, member_id: &str) -> Option<usize> {
        self.communities
            .iter()
            .position(|community| community.member_id == member_id)
    }
}

#[derive(Clone)]
struct LoginTask {
    cancel: CancellationToken,
    done: watch::Receiver<bool>,
}

impl LoginTask {
    async fn finished(mut self) {
        // A dropped sender also means the task is gone.
        let _ = self.done.wait_for(|done| *done).await;
    }
}

#[derive(Default)]
struct LoginSlot {
    task: Option<LoginTask>,
    closed: bool,
}

#[derive(Debug, Deserialize)]
struct Negotiation {
    #[serde(rename = "ConnectionToken")]
    connection_token: String,
    #[serde(rename = "ConnectionId")]
    connection_id: String,
}

#[derive(Debug, Deserialize)]
struct Bindings {
    #[serde(default)]
    binds: Vec<Binding>,
    #[serde(default)]
    wxid: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Binding {
    #[serde(default)]
    community_name: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    member: String,
}

pub(crate) fn now_millis() -> String {
    chrono::Utc::now().timestamp_millis().to_string()
}

/// Per-session client for the community portal.
pub struct ContentClient {
    pub(crate) config: ClientConfig,
    pub(crate) deps: ClientDeps,
    state: AtomicU8,
    profile: RwLock<Profile>,
    login: Mutex<LoginSlot>,
    start_lock: tokio::sync::Mutex<()>,
}

impl std::fmt::Debug for ContentClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ContentClient {
    /// Create a client over explicit collaborators
    pub fn new(config: ClientConfig, deps: ClientDeps) -> Self {
        Self {
            config,
            deps,
            state: AtomicU8::new(LoginState::LoggedOut as u8),
            profile: RwLock::new(Profile::default()),
            login: Mutex::new(LoginSlot::default()),
            start_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Create a client with a fresh HTTP identity, a WebSocket connector and
    /// the regex markup rules
    pub fn with_defaults(config: ClientConfig, history: Arc<dyn HistoryGate>) -> ClientResult<Self> {
        let transport = HttpTransport::new(config.remote.base_url.clone(), config.request_timeout)?;
        let deps = ClientDeps {
            transport: Arc::new(transport),
            connector: Arc::new(WebSocketConnector),
            parser: Arc::new(RegexMarkupParser::new()?),
            history,
        };
        Ok(Self::new(config, deps))
    }

    /// Current lifecycle state
    pub fn state(&self) -> LoginState {
        LoginState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// Whether the client is bound to a remote identity
    pub fn is_logged_in(&self) -> bool {
        self.state() == LoginState::LoggedIn
    }

    /// Snapshot of memberships, identity and current selection
    pub fn profile(&self) -> Profile {
        self.profile.read().clone()
    }

    /// Accepted memberships
    pub fn communities(&self) -> Vec<Community> {
        self.profile.read().communities.clone()
    }

    /// Remote identity reported at login
    pub fn identity(&self) -> Option<String> {
        self.profile.read().identity.clone()
    }

    /// The active community, if resolved
    pub fn current_community(&self) -> Option<Community> {
        self.profile.read().current_community().cloned()
    }

    /// Member id of the active community, empty when none is selected
    pub fn current_member_id(&self) -> String {
        self.current_community()
            .map(|community| community.member_id)
            .unwrap_or_default()
    }

    fn set_state(&self, state: LoginState) {
        self.state.store(state as u8, Ordering::SeqCst);
    }

    fn transition(&self, from: LoginState, to: LoginState) -> bool {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    pub(crate) fn ensure_logged_in(&self) -> ClientResult<()> {
        if self.is_logged_in() {
            Ok(())
        } else {
            Err(ClientError::NotLoggedIn)
        }
    }

    /// Begin a QR login and return the QR code target.
    ///
    /// Fails with `AlreadyInProgress`, without touching the network, while a
    /// scan is pending. `on_login` runs once if the user confirms the scan.
    pub async fn start_login(self: &Arc<Self>, on_login: Option<LoginHook>) -> ClientResult<String> {
        let _starting = self.start_lock.lock().await;
        match self.state() {
            LoginState::ScanningQrCode => return Err(ClientError::AlreadyInProgress),
            LoginState::TornDown => return Err(ClientError::Closed),
            LoginState::LoggedOut | LoginState::LoggedIn => {}
        }
        let closed = self.login.lock().closed;
        if closed {
            return Err(ClientError::Closed);
        }

        let negotiation = self.negotiate().await?;
        let mut conn = self.open_connection(&negotiation.connection_token).await?;

        let (done_tx, done_rx) = watch::channel(false);
        let (init_tx, init_rx) = oneshot::channel();
        let task = LoginTask {
            cancel: CancellationToken::new(),
            done: done_rx,
        };

        let registered = {
            let mut slot = self.login.lock();
            if slot.closed {
                false
            } else {
                slot.task = Some(task.clone());
                true
            }
        };
        if !registered {
            self.close_connection(&mut *conn).await;
            return Err(ClientError::Closed);
        }

        tokio::spawn(Arc::clone(self).run_login(
            conn,
            negotiation.connection_id,
            task.cancel.clone(),
            init_tx,
            done_tx,
            on_login,
        ));

        match tokio::time::timeout(self.config.request_timeout, init_rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(ClientError::LoginAborted),
            Err(_) => {
                tracing::warn!("QR code was not issued in time, abandoning login");
                task.cancel.cancel();
                task.finished().await;
                Err(ClientError::Timeout("QR code".to_string()))
            }
        }
    }

    async fn negotiate(&self) -> ClientResult<Negotiation> {
        let stamp = now_millis();
        let negotiation: Negotiation = get_json(
            self.deps.transport.as_ref(),
            NEGOTIATE_PATH,
            &[
                ("clientProtocol", self.config.remote.client_protocol.as_str()),
                ("_", stamp.as_str()),
            ],
        )
        .await?;
        tracing::debug!(connection_id = %negotiation.connection_id, "Negotiated login connection");
        Ok(negotiation)
    }

    async fn open_connection(&self, token: &str) -> ClientResult<Box<dyn DuplexConnection>> {
        let protocol = self.config.remote.client_protocol.as_str();
        let tid = rand::random_range(0..=10u32).to_string();
        let url = reqwest::Url::parse_with_params(
            &self.config.remote.socket_url,
            &[
                ("clientProtocol", protocol),
                ("transport", "webSockets"),
                ("connectionToken", token),
                ("tid", tid.as_str()),
            ],
        )
        .map_err(|e| ClientError::Connection(format!("Invalid socket url: {}", e)))?;

        let mut conn = tokio::time::timeout(
            self.config.request_timeout,
            self.deps.connector.connect(url.as_str()),
        )
        .await
        .map_err(|_| ClientError::Timeout("login socket".to_string()))??;

        let stamp = now_millis();
        let started = self
            .deps
            .transport
            .get(
                START_PATH,
                &[
                    ("clientProtocol", protocol),
                    ("transport", "webSockets"),
                    ("connectionToken", token),
                    ("_", stamp.as_str()),
                ],
            )
            .await;
        if let Err(e) = started {
            self.close_connection(&mut *conn).await;
            return Err(e);
        }
        Ok(conn)
    }

    /// Close `conn`, giving up after the request timeout.
    async fn close_connection(&self, conn: &mut dyn DuplexConnection) {
        match tokio::time::timeout(self.config.request_timeout, conn.close()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::debug!(error = %e, "Failed to close login socket"),
            Err(_) => tracing::warn!("Login socket did not close in time"),
        }
    }

    async fn run_login(
        self: Arc<Self>,
        mut conn: Box<dyn DuplexConnection>,
        connection_id: String,
        cancel: CancellationToken,
        init_tx: oneshot::Sender<ClientResult<String>>,
        done_tx: watch::Sender<bool>,
        on_login: Option<LoginHook>,
    ) {
        let mut init_tx = Some(init_tx);
        match conn.send_text(QR_TRIGGER).await {
            Ok(()) => {
                self.drive_handshake(&mut *conn, &connection_id, &cancel, &mut init_tx, on_login)
                    .await
            }
            Err(e) => {
                if let Some(tx) = init_tx.take() {
                    let _ = tx.send(Err(e));
                }
            }
        }

        self.close_connection(&mut *conn).await;
        done_tx.send_replace(true);
        tracing::debug!(state = %self.state(), "Login task finished");
    }

    async fn drive_handshake(
        &self,
        conn: &mut dyn DuplexConnection,
        connection_id: &str,
        cancel: &CancellationToken,
        init_tx: &mut Option<oneshot::Sender<ClientResult<String>>>,
        on_login: Option<LoginHook>,
    ) {
        loop {
            let frame = tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!("Login cancelled");
                    self.transition(LoginState::ScanningQrCode, LoginState::TornDown);
                    return;
                }
                frame = conn.read_frame() => frame,
            };

            let frame = match frame {
                Ok(frame) => frame,
                Err(e) => {
                    match init_tx.take() {
                        Some(tx) => {
                            let _ = tx.send(Err(e));
                        }
                        None => tracing::debug!(error = %e, "Login socket closed while scanning"),
                    }
                    return;
                }
            };

            // Only the first message of a frame matters.
            let Some(message) = frame.messages.into_iter().next() else {
                continue;
            };

            if message.init {
                let Some(tx) = init_tx.take() else {
                    tracing::debug!("Ignoring repeated init message");
                    continue;
                };
                match self.fetch_qr_target(connection_id).await {
                    Ok(target) => {
                        self.set_state(LoginState::ScanningQrCode);
                        tracing::info!("QR code issued, waiting for scan");
                        let _ = tx.send(Ok(target));
                    }
                    Err(e) => {
                        let _ = tx.send(Err(e));
                        return;
                    }
                }
            } else if message.bind_user {
                self.complete_bind(connection_id, on_login).await;
                return;
            }
        }
    }

    async fn fetch_qr_target(&self, connection_id: &str) -> ClientResult<String> {
        let body = self
            .deps
            .transport
            .get(QR_PATH, &[("id", connection_id)])
            .await?;
        self.deps.parser.qr_target(&body)
    }

    async fn complete_bind(&self, connection_id: &str, on_login: Option<LoginHook>) {
        if let Err(e) = self
            .deps
            .transport
            .get(BIND_PATH, &[("id", connection_id)])
            .await
        {
            tracing::warn!(error = %e, "Binding failed");
            self.set_state(LoginState::LoggedOut);
            return;
        }

        let profile = self.refresh_profile().await;
        tracing::info!(
            communities = profile.communities.len(),
            current = ?profile.current,
            "Logged in"
        );
        *self.profile.write() = profile;
        self.set_state(LoginState::LoggedIn);

        if let Some(hook) = on_login {
            hook();
        }
    }

    /// Memberships and current community as the portal now reports them.
    /// Failures are soft: memberships fall back to the previous values and
    /// the current community to unset.
    async fn refresh_profile(&self) -> Profile {
        let previous = self.profile();
        let (communities, identity) = match self.fetch_memberships().await {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to refresh communities, keeping previous list");
                (previous.communities, previous.identity)
            }
        };

        let current = match self.fetch_active_community().await {
            Ok(Some(name)) => {
                let index = communities.iter().position(|c| c.name == name);
                if index.is_none() {
                    tracing::warn!(name = %name, "Active community is not an accepted membership");
                }
                index
            }
            Ok(None) => {
                tracing::warn!("Active community not found on landing page");
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to fetch landing page");
                None
            }
        };

        Profile {
            communities,
            identity,
            current,
        }
    }

    async fn fetch_memberships(&self) -> ClientResult<(Vec<Community>, Option<String>)> {
        let seed = now_millis();
        let bindings: Bindings = get_json(
            self.deps.transport.as_ref(),
            MEMBERSHIP_PATH,
            &[("seed", seed.as_str()), ("wxid", "")],
        )
        .await?;

        let communities = bindings
            .binds
            .into_iter()
            .filter(|bind| bind.status == ACCEPTED_STATUS)
            .map(|bind| Community::new(bind.community_name, bind.member))
            .collect();
        let identity = bindings.wxid.filter(|id| !id.is_empty());
        Ok((communities, identity))
    }

    async fn fetch_active_community(&self) -> ClientResult<Option<String>> {
        let body = self.deps.transport.get(HOME_PATH, &[]).await?;
        Ok(self.deps.parser.active_community(&body))
    }

    /// Switch the portal session to the community with `member_id`.
    ///
    /// The local selection moves only after the portal accepted the switch.
    pub async fn select_community(&self, member_id: &str) -> ClientResult<Community> {
        self.ensure_logged_in()?;
        let community = {
            let profile = self.profile.read();
            profile
                .position(member_id)
                .map(|index| profile.communities[index].clone())
                .ok_or_else(|| ClientError::InvalidCommunityId(member_id.to_string()))?
        };

        let seed = now_millis();
        let path = format!("{}{}", SWITCH_PATH, member_id);
        self.deps
            .transport
            .get(&path, &[("seed", seed.as_str())])
            .await?;

        let mut profile = self.profile.write();
        profile.current = profile.position(member_id);
        tracing::info!(community = %community.name, "Switched community");
        Ok(community)
    }

    /// Abort a pending scan and wait until the login task has closed its
    /// connection. A no-op unless the client is scanning.
    pub async fn stop_login(&self) {
        if self.state() != LoginState::ScanningQrCode {
            return;
        }
        let task = self.login.lock().task.clone();
        if let Some(task) = task {
            task.cancel.cancel();
            task.finished().await;
        }
        self.transition(LoginState::ScanningQrCode, LoginState::TornDown);
    }

    /// Retire the client for good: refuse new logins, abort any running
    /// login task whatever its stage, and wait for it to finish.
    pub async fn teardown(&self) {
        let task = {
            let mut slot = self.login.lock();
            slot.closed = true;
            slot.task.clone()
        };
        if let Some(task) = task {
            task.cancel.cancel();
            task.finished().await;
        }
        self.set_state(LoginState::TornDown);
    }
}
