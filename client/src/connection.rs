//! Duplex connection used during the QR handshake.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::net::TcpStream;
use tokio_tungstenite::{
    connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream,
};

use crate::error::{ClientError, ClientResult};

/// One frame from the login socket: `{"M": [ ... ]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Frame {
    /// Messages carried by the frame; only the first is meaningful
    #[serde(rename = "M", default)]
    pub messages: Vec<FrameMessage>,
}

/// A single handshake message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct FrameMessage {
    /// The QR code is ready to be fetched
    #[serde(default)]
    pub init: bool,
    /// The user scanned and confirmed
    #[serde(rename = "bindUser", default)]
    pub bind_user: bool,
    /// Message id
    #[serde(default)]
    pub id: String,
    /// Message payload
    #[serde(default)]
    pub value: String,
}

impl FrameMessage {
    /// Init message
    pub fn init() -> Self {
        Self {
            init: true,
            ..Default::default()
        }
    }

    /// BindUser message
    pub fn bind_user() -> Self {
        Self {
            bind_user: true,
            ..Default::default()
        }
    }
}

/// An open duplex connection.
///
/// `read_frame` must be cancel safe: dropping its future must not lose a
/// frame that was not yet returned.
#[async_trait]
pub trait DuplexConnection: Send {
    /// Send a text frame
    async fn send_text(&mut self, text: &str) -> ClientResult<()>;

    /// Wait for the next structured frame. Any failure, including a close
    /// from the peer, is an error.
    async fn read_frame(&mut self) -> ClientResult<Frame>;

    /// Close the connection. Closing twice is not an error.
    async fn close(&mut self) -> ClientResult<()>;
}

/// Opens duplex connections.
#[async_trait]
pub trait DuplexConnector: Send + Sync {
    /// Connect to `url`, which already carries the handshake parameters
    async fn connect(&self, url: &str) -> ClientResult<Box<dyn DuplexConnection>>;
}

/// WebSocket connector over tokio-tungstenite.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketConnector;

#[async_trait]
impl DuplexConnector for WebSocketConnector {
    async fn connect(&self, url: &str) -> ClientResult<Box<dyn DuplexConnection>> {
        let (stream, _response) = connect_async(url)
            .await
            .map_err(|e| ClientError::Connection(format!("Failed to connect: {}", e)))?;
        tracing::debug!("Login socket connected");
        Ok(Box::new(WebSocketConnection {
            stream,
            closed: false,
        }))
    }
}

struct WebSocketConnection {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    closed: bool,
}

fn decode_frame(bytes: &[u8]) -> ClientResult<Frame> {
    serde_json::from_slice(bytes)
        .map_err(|e| ClientError::Connection(format!("Malformed frame: {}", e)))
}

#[async_trait]
impl DuplexConnection for WebSocketConnection {
    async fn send_text(&mut self, text: &str) -> ClientResult<()> {
        self.stream
            .send(Message::text(text))
            .await
            .map_err(|e| ClientError::Connection(format!("Failed to send: {}", e)))
    }

    async fn read_frame(&mut self) -> ClientResult<Frame> {
        loop {
            let message = match self.stream.next().await {
                Some(Ok(message)) => message,
                Some(Err(e)) => {
                    return Err(ClientError::Connection(format!("Failed to read: {}", e)))
                }
                None => return Err(ClientError::Connection("connection closed".to_string())),
            };

            match message {
                Message::Text(text) => return decode_frame(text.as_bytes()),
                Message::Binary(data) => return decode_frame(&data),
                Message::Ping(_) => {
                    // tungstenite queues the pong; flushing sends it.
                    if let Err(e) = self.stream.flush().await {
                        return Err(ClientError::Connection(format!("Failed to pong: {}", e)));
                    }
                }
                Message::Pong(_) | Message::Frame(_) => {}
                Message::Close(_) => {
                    return Err(ClientError::Connection("closed by peer".to_string()))
                }
            }
        }
    }

    async fn close(&mut self) -> ClientResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.stream
            .close(None)
            .await
            .map_err(|e| ClientError::Connection(format!("Failed to close: {}", e)))
    }
}
