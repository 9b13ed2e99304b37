//! Engine.IO transports: WebSocket and HTTP long-polling.
//!
//! Both speak the same text packets from the `packets` crate. A transport
//! is opened with the Engine.IO handshake already consumed; everything after
//! that is `send`/`recv` of whole packets.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use packets::{EnginePacket, Handshake, PacketError};
use reqwest::StatusCode;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),
    #[error("websocket failed: {0}")]
    WebSocket(Box<tokio_tungstenite::tungstenite::Error>),
    #[error("polling request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("polling request returned {0}")]
    Status(StatusCode),
    #[error("protocol error: {0}")]
    Packet(#[from] PacketError),
    #[error("server did not send an open handshake")]
    MissingHandshake,
    #[error("connection refused: {0}")]
    Refused(String),
    #[error("transport closed")]
    Closed,
    #[error("timed out waiting for server")]
    Timeout,
}

impl From<tokio_tungstenite::tungstenite::Error> for TransportError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::WebSocket(Box::new(e))
    }
}

/// Socket.IO endpoint URLs derived from the backend origin.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoints {
    pub websocket: String,
    pub polling: String,
}

impl Endpoints {
    /// # Errors
    ///
    /// Returns [`TransportError::InvalidBaseUrl`] unless `base_url` is
    /// `http://` or `https://`.
    pub fn new(base_url: &str) -> Result<Self, TransportError> {
        let trimmed = base_url.trim().trim_end_matches('/');
        let query = format!("socket.io/?EIO={}", packets::ENGINE_PROTOCOL);
        let websocket = if let Some(rest) = trimmed.strip_prefix("http://") {
            format!("ws://{rest}/{query}&transport=websocket")
        } else if let Some(rest) = trimmed.strip_prefix("https://") {
            format!("wss://{rest}/{query}&transport=websocket")
        } else {
            return Err(TransportError::InvalidBaseUrl(base_url.to_owned()));
        };
        Ok(Self { websocket, polling: format!("{trimmed}/{query}&transport=polling") })
    }
}

#[async_trait]
pub trait Transport: Send {
    fn name(&self) -> &'static str;

    async fn send(&mut self, batch: Vec<EnginePacket>) -> Result<(), TransportError>;

    /// Next batch of inbound packets; one for WebSocket, a whole payload for
    /// polling.
    async fn recv(&mut self) -> Result<Vec<EnginePacket>, TransportError>;

    /// Best-effort close; errors are ignored.
    async fn close(&mut self);
}

fn expect_open(packet: Option<EnginePacket>) -> Result<Handshake, TransportError> {
    match packet {
        Some(EnginePacket::Open(handshake)) => Ok(handshake),
        _ => Err(TransportError::MissingHandshake),
    }
}

// =============================================================================
// WEBSOCKET
// =============================================================================

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub struct WebSocketTransport {
    stream: WsStream,
}

impl WebSocketTransport {
    /// Connect and consume the Engine.IO open packet.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] on handshake failure or timeout.
    pub async fn open(endpoints: &Endpoints, deadline: Duration) -> Result<(Self, Handshake), TransportError> {
        let (stream, _) = tokio::time::timeout(deadline, connect_async(endpoints.websocket.as_str()))
            .await
            .map_err(|_| TransportError::Timeout)??;
        let mut transport = Self { stream };
        let first = tokio::time::timeout(deadline, transport.recv())
            .await
            .map_err(|_| TransportError::Timeout)??;
        let handshake = expect_open(first.into_iter().next())?;
        Ok((transport, handshake))
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    fn name(&self) -> &'static str {
        "websocket"
    }

    async fn send(&mut self, batch: Vec<EnginePacket>) -> Result<(), TransportError> {
        for packet in &batch {
            self.stream
                .send(Message::Text(packets::encode_engine(packet).into()))
                .await?;
        }
        Ok(())
    }

    async fn recv(&mut self) -> Result<Vec<EnginePacket>, TransportError> {
        loop {
            let Some(msg) = self.stream.next().await else {
                return Err(TransportError::Closed);
            };
            match msg? {
                Message::Text(text) => return Ok(vec![packets::decode_engine(text.as_str())?]),
                Message::Close(_) => return Err(TransportError::Closed),
                _ => {}
            }
        }
    }

    async fn close(&mut self) {
        let _ = self.stream.close(None).await;
    }
}

// =============================================================================
// LONG-POLLING
// =============================================================================

pub struct PollingTransport {
    http: reqwest::Client,
    url: String,
    poll_timeout: Duration,
}

impl PollingTransport {
    /// Perform the polling handshake and bind to the returned session id.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] on request failure, a non-success status or
    /// a payload that does not start with an open packet.
    pub async fn open(http: &reqwest::Client, endpoints: &Endpoints) -> Result<(Self, Handshake), TransportError> {
        let response = http.get(&endpoints.polling).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status(status));
        }
        let payload = response.text().await?;
        let first = packets::split_payload(&payload)
            .next()
            .map(packets::decode_engine)
            .transpose()?;
        let handshake = expect_open(first)?;

        let transport = Self {
            http: http.clone(),
            url: format!("{}&sid={}", endpoints.polling, handshake.sid),
            poll_timeout: Duration::from_millis(handshake.ping_interval + handshake.ping_timeout),
        };
        Ok((transport, handshake))
    }
}

#[async_trait]
impl Transport for PollingTransport {
    fn name(&self) -> &'static str {
        "polling"
    }

    async fn send(&mut self, batch: Vec<EnginePacket>) -> Result<(), TransportError> {
        let encoded: Vec<String> = batch.iter().map(packets::encode_engine).collect();
        let response = self
            .http
            .post(&self.url)
            .header(reqwest::header::CONTENT_TYPE, "text/plain;charset=UTF-8")
            .body(packets::join_payload(&encoded))
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status(status));
        }
        Ok(())
    }

    async fn recv(&mut self) -> Result<Vec<EnginePacket>, TransportError> {
        let response = self.http.get(&self.url).timeout(self.poll_timeout).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status(status));
        }
        let payload = response.text().await?;
        let decoded = packets::split_payload(&payload)
            .map(packets::decode_engine)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(decoded)
    }

    async fn close(&mut self) {
        let _ = self.send(vec![EnginePacket::Close]).await;
    }
}
