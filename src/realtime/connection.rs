//! Live event channel lifecycle.
//!
//! DESIGN
//! ======
//! `ConnectionManager::open` spawns one task per channel and hands back a
//! [`ConnectionHandle`]. The task owns the transport outright; callers only
//! see a status `watch` and a `broadcast` of decoded [`PushEvent`]s, so the
//! channel never touches domain state directly.
//!
//! Each attempt tries WebSocket first and falls back to long-polling, then
//! sends the Socket.IO CONNECT with `{"token": ..}` as auth. The attempt
//! succeeds on the server's CONNECT ack. After a failure the task waits the
//! fixed reconnect delay. The first connect gets `attempts` retries; a
//! dropped link gets `attempts` reconnections. Once those have failed the
//! status becomes `Error` and the task stops.
//!
//! The task also stops (status `Disconnected`) when the handle is closed or
//! dropped, or when the session it was opened under stops being
//! authenticated.

#[cfg(test)]
#[path = "connection_test.rs"]
mod connection_test;

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use packets::{EnginePacket, SocketPacket};
use serde::Serialize;
use serde_json::json;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use super::event::PushEvent;
use super::policy::should_connect;
use super::transport::{Endpoints, PollingTransport, Transport, TransportError, WebSocketTransport};
use crate::config::{Mode, ReconnectPolicy, SyncConfig};
use crate::session::{SessionState, SessionView};

const EVENT_BUFFER: usize = 64;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    /// Reconnection attempts exhausted.
    Error,
}

pub struct ConnectionManager {
    mode: Mode,
    reconnect: ReconnectPolicy,
    connect_timeout: Duration,
    http: reqwest::Client,
    session: Option<SessionView>,
}

impl ConnectionManager {
    /// # Errors
    ///
    /// Returns [`TransportError::Http`] if the polling client cannot be built.
    pub fn new(config: &SyncConfig) -> Result<Self, TransportError> {
        let connect_timeout = Duration::from_secs(config.http.connect_secs);
        let http = reqwest::Client::builder().connect_timeout(connect_timeout).build()?;
        Ok(Self { mode: config.mode, reconnect: config.reconnect, connect_timeout, http, session: None })
    }

    /// Close channels opened by this manager once `session` leaves the
    /// authenticated state.
    #[must_use]
    pub fn with_session(mut self, session: SessionView) -> Self {
        self.session = Some(session);
        self
    }

    /// Open a channel unless the environment policy suppresses it.
    ///
    /// Must be called inside a Tokio runtime.
    #[must_use]
    pub fn open(&self, token: &str, base_url: &str) -> Option<ConnectionHandle> {
        if !should_connect(self.mode, base_url) {
            tracing::info!(base_url, mode = ?self.mode, "live channel suppressed for loopback backend");
            return None;
        }
        let endpoints = match Endpoints::new(base_url) {
            Ok(endpoints) => endpoints,
            Err(e) => {
                tracing::warn!(error = %e, "live channel not opened");
                return None;
            }
        };

        let (status_tx, status_rx) = watch::channel(ConnectionStatus::Disconnected);
        let status_tx = Arc::new(status_tx);
        let (events_tx, _) = broadcast::channel(EVENT_BUFFER);
        let (stop_tx, stop_rx) = watch::channel(false);

        let worker = Worker {
            endpoints,
            token: token.to_owned(),
            http: self.http.clone(),
            reconnect: self.reconnect,
            connect_timeout: self.connect_timeout,
            status: Arc::clone(&status_tx),
            events: events_tx.clone(),
        };
        let signals = Signals { stop: stop_rx, session: self.session.as_ref().map(SessionView::subscribe) };
        let task = tokio::spawn(worker.run(signals));

        Some(ConnectionHandle { status_tx, status_rx, events: events_tx, stop: stop_tx, task: Some(task) })
    }
}

/// Owner handle for one live channel. Dropping it stops the channel.
pub struct ConnectionHandle {
    status_tx: Arc<watch::Sender<ConnectionStatus>>,
    status_rx: watch::Receiver<ConnectionStatus>,
    events: broadcast::Sender<PushEvent>,
    stop: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl ConnectionHandle {
    #[must_use]
    pub fn status(&self) -> ConnectionStatus {
        *self.status_rx.borrow()
    }

    #[must_use]
    pub fn watch_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.status_rx.clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<PushEvent> {
        self.events.subscribe()
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.task.is_none()
    }

    /// Stop the channel and release the transport. Idempotent.
    pub async fn close(&mut self) {
        let Some(task) = self.task.take() else {
            return;
        };
        self.stop.send_replace(true);
        if let Err(e) = task.await {
            tracing::warn!(error = %e, "connection task ended abnormally");
        }
        self.status_tx.send_replace(ConnectionStatus::Disconnected);
        tracing::debug!("live channel closed");
    }
}

impl Drop for ConnectionHandle {
    fn drop(&mut self) {
        self.stop.send_replace(true);
    }
}

/// Why a connected session ended.
enum Ended {
    Stopped,
    Dropped(TransportError),
}

struct Link {
    transport: Box<dyn Transport>,
    heartbeat: Duration,
    /// Packets that arrived in the same batch as the connect ack.
    backlog: VecDeque<EnginePacket>,
}

struct Worker {
    endpoints: Endpoints,
    token: String,
    http: reqwest::Client,
    reconnect: ReconnectPolicy,
    connect_timeout: Duration,
    status: Arc<watch::Sender<ConnectionStatus>>,
    events: broadcast::Sender<PushEvent>,
}

/// Reasons for the worker to stop, kept apart from the worker so they can be
/// awaited while the worker is borrowed.
struct Signals {
    stop: watch::Receiver<bool>,
    session: Option<watch::Receiver<SessionState>>,
}

impl Signals {
    fn should_stop(&mut self) -> bool {
        *self.stop.borrow_and_update()
            || self.session.as_mut().is_some_and(|rx| !rx.borrow_and_update().is_authenticated())
    }

    /// Resolve once a stop was requested, the handle was dropped, or the
    /// session stopped being authenticated.
    async fn wait(&mut self) {
        let stop = &mut self.stop;
        let stopped = async {
            loop {
                if *stop.borrow_and_update() {
                    return;
                }
                if stop.changed().await.is_err() {
                    return;
                }
            }
        };
        let session = &mut self.session;
        let signed_out = async {
            let Some(session) = session else {
                return std::future::pending::<()>().await;
            };
            loop {
                if !session.borrow_and_update().is_authenticated() {
                    return;
                }
                if session.changed().await.is_err() {
                    return;
                }
            }
        };
        tokio::select! {
            () = stopped => {}
            () = signed_out => {}
        }
    }
}

impl Worker {
    async fn run(self, mut signals: Signals) {
        // Tries left: the first connect plus `attempts` retries, then
        // `attempts` reconnections after each drop.
        let mut remaining = self.reconnect.attempts.saturating_add(1);
        let mut failures: u32 = 0;

        loop {
            if signals.should_stop() {
                break;
            }
            self.status.send_replace(ConnectionStatus::Connecting);

            let attempt = tokio::select! {
                () = signals.wait() => break,
                attempt = self.establish() => attempt,
            };

            match attempt {
                Ok(link) => {
                    failures = 0;
                    remaining = self.reconnect.attempts;
                    self.status.send_replace(ConnectionStatus::Connected);
                    tracing::info!(url = %self.endpoints.websocket, "live channel connected");
                    match self.pump(link, &mut signals).await {
                        Ended::Stopped => break,
                        Ended::Dropped(e) => {
                            self.status.send_replace(ConnectionStatus::Disconnected);
                            tracing::warn!(error = %e, "live channel dropped");
                        }
                    }
                }
                Err(e) => {
                    failures += 1;
                    remaining = remaining.saturating_sub(1);
                    tracing::warn!(error = %e, attempt = failures, "live channel connect failed");
                }
            }

            if remaining == 0 {
                self.status.send_replace(ConnectionStatus::Error);
                tracing::error!(attempts = failures, "live channel gave up reconnecting");
                return;
            }

            tokio::select! {
                () = signals.wait() => break,
                () = tokio::time::sleep(self.reconnect.delay) => {}
            }
        }

        self.status.send_replace(ConnectionStatus::Disconnected);
    }

    async fn establish(&self) -> Result<Link, TransportError> {
        let (mut transport, handshake): (Box<dyn Transport>, _) =
            match WebSocketTransport::open(&self.endpoints, self.connect_timeout).await {
                Ok((ws, handshake)) => (Box::new(ws) as Box<dyn Transport>, handshake),
                Err(e) => {
                    tracing::debug!(error = %e, "websocket unavailable; falling back to polling");
                    let (polling, handshake) = PollingTransport::open(&self.http, &self.endpoints).await?;
                    (Box::new(polling) as Box<dyn Transport>, handshake)
                }
            };
        let heartbeat = Duration::from_millis(handshake.ping_interval + handshake.ping_timeout);
        tracing::debug!(transport = transport.name(), sid = %handshake.sid, "engine handshake complete");

        let connect = SocketPacket::connect(Some(json!({ "token": self.token })));
        transport
            .send(vec![EnginePacket::Message(packets::encode_socket(&connect))])
            .await?;

        loop {
            let batch = tokio::time::timeout(heartbeat, transport.recv())
                .await
                .map_err(|_| TransportError::Timeout)??;
            let mut batch: VecDeque<EnginePacket> = batch.into();
            while let Some(packet) = batch.pop_front() {
                match packet {
                    EnginePacket::Ping(probe) => transport.send(vec![EnginePacket::Pong(probe)]).await?,
                    EnginePacket::Close => return Err(TransportError::Closed),
                    EnginePacket::Message(text) => match packets::decode_socket(&text)? {
                        SocketPacket::Connect { .. } => {
                            return Ok(Link { transport, heartbeat, backlog: batch });
                        }
                        refused @ SocketPacket::ConnectError { .. } => {
                            let reason = refused.error_message().unwrap_or("connect_error").to_owned();
                            transport.close().await;
                            return Err(TransportError::Refused(reason));
                        }
                        _ => {}
                    },
                    _ => {}
                }
            }
        }
    }

    async fn pump(&self, link: Link, signals: &mut Signals) -> Ended {
        let Link { mut transport, heartbeat, mut backlog } = link;

        loop {
            while let Some(packet) = backlog.pop_front() {
                if let Err(e) = self.handle(transport.as_mut(), packet).await {
                    transport.close().await;
                    return Ended::Dropped(e);
                }
            }

            tokio::select! {
                () = signals.wait() => {
                    let disconnect = SocketPacket::Disconnect { namespace: packets::DEFAULT_NAMESPACE.to_owned() };
                    let _ = transport
                        .send(vec![EnginePacket::Message(packets::encode_socket(&disconnect))])
                        .await;
                    transport.close().await;
                    return Ended::Stopped;
                }
                batch = tokio::time::timeout(heartbeat, transport.recv()) => match batch {
                    Ok(Ok(batch)) => backlog.extend(batch),
                    Ok(Err(e)) => {
                        transport.close().await;
                        return Ended::Dropped(e);
                    }
                    Err(_) => {
                        transport.close().await;
                        return Ended::Dropped(TransportError::Timeout);
                    }
                },
            }
        }
    }

    async fn handle(&self, transport: &mut dyn Transport, packet: EnginePacket) -> Result<(), TransportError> {
        match packet {
            EnginePacket::Ping(probe) => transport.send(vec![EnginePacket::Pong(probe)]).await,
            EnginePacket::Close => Err(TransportError::Closed),
            EnginePacket::Message(text) => match packets::decode_socket(&text) {
                Ok(SocketPacket::Event { name, args, .. }) => {
                    self.publish(&name, &args);
                    Ok(())
                }
                Ok(SocketPacket::Disconnect { .. }) => Err(TransportError::Closed),
                Ok(refused @ SocketPacket::ConnectError { .. }) => Err(TransportError::Refused(
                    refused.error_message().unwrap_or("connect_error").to_owned(),
                )),
                Ok(_) => Ok(()),
                Err(e) => {
                    tracing::warn!(error = %e, "ignoring undecodable socket packet");
                    Ok(())
                }
            },
            _ => Ok(()),
        }
    }

    fn publish(&self, name: &str, args: &[serde_json::Value]) {
        match PushEvent::decode(name, args) {
            Ok(Some(event)) => {
                tracing::debug!(event = event.name(), "push event");
                // No subscribers is not an error.
                let _ = self.events.send(event);
            }
            Ok(None) => tracing::debug!(event = name, "ignoring unknown push event"),
            Err(e) => tracing::warn!(error = %e, "dropping malformed push event"),
        }
    }
}
