//! Scripted portal for tests: a routing `Transport`, a frame-fed
//! `DuplexConnector` and page builders the regex parser understands.

use async_trait::async_trait;
use atom_common::{HistoryGate, LoginState};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::client::{ClientDeps, ContentClient};
use crate::connection::{DuplexConnection, DuplexConnector, Frame, FrameMessage};
use crate::error::{ClientError, ClientResult};
use crate::markup::RegexMarkupParser;
use crate::transport::Transport;

/// Connection id handed out by `pages::negotiation`
pub const CONNECTION_ID: &str = "conn-1";

/// Canned page bodies.
pub mod pages {
    use super::CONNECTION_ID;

    /// Negotiation response
    pub fn negotiation() -> String {
        format!(
            r#"{{"ConnectionToken":"token-1","ConnectionId":"{}"}}"#,
            CONNECTION_ID
        )
    }

    /// QR response naming `target`
    pub fn qr(target: &str) -> String {
        format!(r#""{}""#, target)
    }

    /// Membership list; `(name, member_id, status)`
    pub fn memberships(binds: &[(&str, &str, &str)], wxid: &str) -> String {
        let binds: Vec<String> = binds
            .iter()
            .map(|(name, member, status)| {
                format!(
                    r#"{{"community_name":"{}","member":"{}","status":"{}"}}"#,
                    name, member, status
                )
            })
            .collect();
        format!(r#"{{"binds":[{}],"wxid":"{}"}}"#, binds.join(","), wxid)
    }

    /// Landing page naming the active community
    pub fn home(active: &str) -> String {
        format!(
            r#"<div id="changeMember" class="switch"><span>{}</span></div>"#,
            active
        )
    }

    /// Listing fragment linking to `ids`
    pub fn listing(ids: &[&str]) -> String {
        ids.iter()
            .map(|id| {
                format!(
                    r#"<li><a href="javascript:go('/community/title_view?title={}')">{}</a></li>"#,
                    id, id
                )
            })
            .collect()
    }

    /// Detail page whose confirm control reads `label`
    pub fn detail(label: &str) -> String {
        format!(r#"<div><span id="cmdLike">{}</span></div>"#, label)
    }
}

/// A recorded request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Portal-relative path
    pub path: String,
    /// Query pairs in request order
    pub query: Vec<(String, String)>,
}

/// Routing transport.
///
/// A request is answered by the first route matching `path?key=value` for
/// one of its query pairs, else by the route for `path`. Unrouted requests
/// fail with HTTP 404.
#[derive(Default)]
pub struct FakePortal {
    routes: Mutex<HashMap<String, ClientResult<String>>>,
    requests: Mutex<Vec<Request>>,
}

impl FakePortal {
    /// Empty portal
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Answer `route` with `body`
    pub fn respond(&self, route: &str, body: impl Into<String>) {
        self.routes.lock().insert(route.to_string(), Ok(body.into()));
    }

    /// Answer `route` with a non-success status
    pub fn fail(&self, route: &str, status: u16) {
        self.routes.lock().insert(
            route.to_string(),
            Err(ClientError::Status {
                path: route.to_string(),
                status,
            }),
        );
    }

    /// Every request seen so far
    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().clone()
    }

    /// Number of requests to `path`
    pub fn count(&self, path: &str) -> usize {
        self.requests.lock().iter().filter(|r| r.path == path).count()
    }

    /// Number of requests to `path` carrying `key=value`
    pub fn count_with(&self, path: &str, key: &str, value: &str) -> usize {
        self.requests
            .lock()
            .iter()
            .filter(|r| r.path == path && r.query.iter().any(|(k, v)| k == key && v == value))
            .count()
    }

    /// Route the QR login: negotiation, companion start, QR fragment, bind,
    /// memberships, the landing page and a switch per community.
    pub fn script_login(&self, communities: &[(&str, &str)], active: &str) {
        let binds: Vec<(&str, &str, &str)> = communities
            .iter()
            .map(|(name, member)| (*name, *member, "已通过"))
            .collect();
        self.respond("/authorize/negotiate", pages::negotiation());
        self.respond("/authorize/start", r#"{"Response":"started"}"#);
        self.respond("/home/qr_login_more_v1", pages::qr("https://qr.example/login"));
        self.respond("/home/qr_login_do", "ok");
        self.respond("/api/register/member/bind", pages::memberships(&binds, "wx-user"));
        self.respond("/home/home", pages::home(active));
        for (_, member) in communities {
            self.respond(&format!("/api/member/switch/{}", member), "ok");
        }
    }
}

#[async_trait]
impl Transport for FakePortal {
    async fn get(&self, path: &str, query: &[(&str, &str)]) -> ClientResult<String> {
        self.requests.lock().push(Request {
            path: path.to_string(),
            query: query
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        });

        let routes = self.routes.lock();
        let keyed = query
            .iter()
            .find_map(|(k, v)| routes.get(&format!("{}?{}={}", path, k, v)));
        match keyed.or_else(|| routes.get(path)) {
            Some(answer) => answer.clone(),
            None => Err(ClientError::Status {
                path: path.to_string(),
                status: 404,
            }),
        }
    }
}

/// Pushes frames into a scripted connection.
#[derive(Clone)]
pub struct FrameFeed {
    tx: mpsc::UnboundedSender<ClientResult<Frame>>,
}

impl FrameFeed {
    fn push(&self, frame: ClientResult<Frame>) {
        // The connection may already be gone; tests only care when it is not.
        let _ = self.tx.send(frame);
    }

    /// QR code ready
    pub fn init(&self) {
        self.push(Ok(Frame {
            messages: vec![FrameMessage::init()],
        }));
    }

    /// Scan confirmed
    pub fn bind_user(&self) {
        self.push(Ok(Frame {
            messages: vec![FrameMessage::bind_user()],
        }));
    }

    /// Frame with no messages
    pub fn keepalive(&self) {
        self.push(Ok(Frame::default()));
    }

    /// Read failure
    pub fn error(&self, message: &str) {
        self.push(Err(ClientError::Connection(message.to_string())));
    }
}

/// Observes a scripted connection from the outside.
#[derive(Clone, Default)]
pub struct ConnectionProbe {
    closed: Arc<AtomicBool>,
    sent: Arc<Mutex<Vec<String>>>,
}

impl ConnectionProbe {
    /// Whether `close` was called
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Text frames sent by the client
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().clone()
    }
}

struct ScriptedConnection {
    frames: mpsc::UnboundedReceiver<ClientResult<Frame>>,
    probe: ConnectionProbe,
}

#[async_trait]
impl DuplexConnection for ScriptedConnection {
    async fn send_text(&mut self, text: &str) -> ClientResult<()> {
        self.probe.sent.lock().push(text.to_string());
        Ok(())
    }

    async fn read_frame(&mut self) -> ClientResult<Frame> {
        match self.frames.recv().await {
            Some(frame) => frame,
            None => Err(ClientError::Connection("feed dropped".to_string())),
        }
    }

    async fn close(&mut self) -> ClientResult<()> {
        self.probe.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Connector handing out prepared connections in order.
#[derive(Default)]
pub struct ScriptedConnector {
    pending: Mutex<VecDeque<ScriptedConnection>>,
    urls: Mutex<Vec<String>>,
}

impl ScriptedConnector {
    /// Connector with nothing prepared
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Prepare the next connection
    pub fn prepare(&self) -> (FrameFeed, ConnectionProbe) {
        let (tx, rx) = mpsc::unbounded_channel();
        let probe = ConnectionProbe::default();
        self.pending.lock().push_back(ScriptedConnection {
            frames: rx,
            probe: probe.clone(),
        });
        (FrameFeed { tx }, probe)
    }

    /// URLs connected to so far
    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().clone()
    }
}

#[async_trait]
impl DuplexConnector for ScriptedConnector {
    async fn connect(&self, url: &str) -> ClientResult<Box<dyn DuplexConnection>> {
        self.urls.lock().push(url.to_string());
        let next = self.pending.lock().pop_front();
        match next {
            Some(conn) => Ok(Box::new(conn)),
            None => Err(ClientError::Connection("connection refused".to_string())),
        }
    }
}

/// Collaborators over the scripted portal and the regex parser
pub fn scripted_deps(
    portal: Arc<FakePortal>,
    connector: Arc<ScriptedConnector>,
    history: Arc<dyn HistoryGate>,
) -> ClientResult<ClientDeps> {
    Ok(ClientDeps {
        transport: portal,
        connector,
        parser: Arc::new(RegexMarkupParser::new()?),
        history,
    })
}

/// Poll until `client` reaches `state` or `within` elapses.
pub async fn wait_for_state(client: &ContentClient, state: LoginState, within: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + within;
    while tokio::time::Instant::now() < deadline {
        if client.state() == state {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    client.state() == state
}
