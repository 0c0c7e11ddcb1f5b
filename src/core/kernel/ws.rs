use crate::core::errors::BlofinError;
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};
use tracing::{instrument, warn};

type WsStream = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

/// WebSocket transport trait - pure byte/frame transport
///
/// This is the seam between the session state machine and the network:
/// production code uses [`TungsteniteWs`], tests inject a scripted
/// transport to simulate disconnects and server frames.
#[async_trait]
pub trait WsTransport: Send {
    /// (Re)connect to the configured URL
    async fn connect(&mut self) -> Result<(), BlofinError>;

    /// Send a raw message
    async fn send(&mut self, msg: Message) -> Result<(), BlofinError>;

    /// Receive the next raw message; `None` means the connection closed
    async fn next(&mut self) -> Option<Result<Message, BlofinError>>;

    /// Close the connection
    async fn close(&mut self) -> Result<(), BlofinError>;

    /// Check if the connection is alive
    fn is_connected(&self) -> bool;
}

/// Tungstenite-based WebSocket transport
pub struct TungsteniteWs {
    url: String,
    write: Option<futures_util::stream::SplitSink<WsStream, Message>>,
    read: Option<futures_util::stream::SplitStream<WsStream>>,
    connected: bool,
    connect_timeout: Duration,
}

impl TungsteniteWs {
    /// Create a new WebSocket transport for the given URL
    pub fn new(url: String) -> Self {
        Self {
            url,
            write: None,
            read: None,
            connected: false,
            connect_timeout: Duration::from_secs(10),
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

#[async_trait]
impl WsTransport for TungsteniteWs {
    #[instrument(skip(self), fields(url = %self.url))]
    async fn connect(&mut self) -> Result<(), BlofinError> {
        self.write = None;
        self.read = None;

        let connecting = tokio::time::timeout(self.connect_timeout, connect_async(&self.url));

        let (ws_stream, _) = connecting
            .await
            .map_err(|_| BlofinError::Connection("WebSocket connection timeout".to_string()))?
            .map_err(|e| {
                BlofinError::Connection(format!("WebSocket connection failed: {e}"))
            })?;

        let (write, read) = ws_stream.split();
        self.write = Some(write);
        self.read = Some(read);
        self.connected = true;

        Ok(())
    }

    async fn send(&mut self, msg: Message) -> Result<(), BlofinError> {
        let write = self.write.as_mut().ok_or_else(|| {
            BlofinError::Connection("WebSocket not connected".to_string())
        })?;

        write.send(msg).await.map_err(|e| {
            self.connected = false;
            BlofinError::Connection(format!("failed to send WebSocket message: {e}"))
        })
    }

    async fn next(&mut self) -> Option<Result<Message, BlofinError>> {
        loop {
            let read = self.read.as_mut()?;

            match read.next().await {
                Some(Ok(message)) => match message {
                    Message::Close(_) => {
                        self.connected = false;
                        return None;
                    }
                    // Protocol-level pings are answered at transport level;
                    // the app-level "ping"/"pong" heartbeat is text and
                    // passes through to the session.
                    Message::Ping(data) => {
                        if let Err(e) = self.send(Message::Pong(data)).await {
                            warn!("failed to send pong response: {e}");
                        }
                    }
                    Message::Pong(_) => {}
                    other => return Some(Ok(other)),
                },
                Some(Err(e)) => {
                    self.connected = false;
                    return Some(Err(BlofinError::Connection(format!(
                        "WebSocket error: {e}"
                    ))));
                }
                None => {
                    self.connected = false;
                    return None;
                }
            }
        }
    }

    async fn close(&mut self) -> Result<(), BlofinError> {
        if let Some(write) = self.write.as_mut() {
            let _ = write.send(Message::Close(None)).await;
        }
        self.connected = false;
        self.write = None;
        self.read = None;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}
