//! Engine.IO v4 / Socket.IO v5 text packet codec for the live event channel.
//!
//! This crate owns the wire representation shared by the websocket and
//! long-polling transports. Payloads stay flexible (`serde_json::Value`);
//! typed event decoding happens in the consuming crate.
//!
//! LAYERING
//! ========
//! An Engine.IO packet is a one-digit type followed by an optional payload.
//! Engine `message` packets (type `4`) carry a Socket.IO packet whose text is
//! `<type>[/<namespace>,][<ack id>][<json>]`. Binary attachments are not
//! supported; the backend only emits JSON events.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Record separator between packets in a long-polling payload.
pub const PAYLOAD_SEPARATOR: char = '\u{1e}';

/// Engine.IO protocol revision spoken by this codec.
pub const ENGINE_PROTOCOL: u8 = 4;

/// Default Socket.IO namespace.
pub const DEFAULT_NAMESPACE: &str = "/";

/// Error returned by the decode functions.
#[derive(Debug, thiserror::Error)]
pub enum PacketError {
    /// The packet text was empty.
    #[error("empty packet")]
    Empty,
    /// The leading type digit is not a known packet type.
    #[error("unknown {layer} packet type: {found:?}")]
    UnknownType { layer: &'static str, found: char },
    /// The JSON portion of the packet failed to parse.
    #[error("invalid packet payload: {0}")]
    Json(#[from] serde_json::Error),
    /// The packet is structurally valid but not something this codec handles.
    #[error("unsupported packet: {0}")]
    Unsupported(&'static str),
    /// An EVENT packet did not carry a `[name, ...args]` array.
    #[error("malformed event packet")]
    MalformedEvent,
}

// =============================================================================
// ENGINE.IO
// =============================================================================

/// Handshake body carried by the Engine.IO `open` packet.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Handshake {
    /// Engine session id; required on every polling request.
    pub sid: String,
    /// Transports the server would accept an upgrade to.
    #[serde(default)]
    pub upgrades: Vec<String>,
    /// Milliseconds between server pings.
    #[serde(default = "default_ping_interval")]
    pub ping_interval: u64,
    /// Milliseconds the server waits for a pong.
    #[serde(default = "default_ping_timeout")]
    pub ping_timeout: u64,
    /// Largest payload the server accepts, in bytes.
    #[serde(default)]
    pub max_payload: u64,
}

fn default_ping_interval() -> u64 {
    25_000
}

fn default_ping_timeout() -> u64 {
    20_000
}

/// One Engine.IO packet.
#[derive(Clone, Debug, PartialEq)]
pub enum EnginePacket {
    Open(Handshake),
    Close,
    Ping(Option<String>),
    Pong(Option<String>),
    Message(String),
    Upgrade,
    Noop,
}

impl EnginePacket {
    fn type_digit(&self) -> char {
        match self {
            Self::Open(_) => '0',
            Self::Close => '1',
            Self::Ping(_) => '2',
            Self::Pong(_) => '3',
            Self::Message(_) => '4',
            Self::Upgrade => '5',
            Self::Noop => '6',
        }
    }
}

/// Encode an Engine.IO packet as text.
#[must_use]
pub fn encode_engine(packet: &EnginePacket) -> String {
    let mut out = String::new();
    out.push(packet.type_digit());
    match packet {
        EnginePacket::Open(handshake) => {
            out.push_str(&serde_json::to_string(handshake).unwrap_or_default());
        }
        EnginePacket::Ping(Some(probe)) | EnginePacket::Pong(Some(probe)) => out.push_str(probe),
        EnginePacket::Message(body) => out.push_str(body),
        _ => {}
    }
    out
}

/// Decode one Engine.IO text packet.
///
/// # Errors
///
/// Returns [`PacketError::Empty`] for empty input, [`PacketError::UnknownType`]
/// for an unrecognised type digit and [`PacketError::Json`] for a malformed
/// handshake body.
pub fn decode_engine(text: &str) -> Result<EnginePacket, PacketError> {
    let mut chars = text.chars();
    let kind = chars.next().ok_or(PacketError::Empty)?;
    let rest = chars.as_str();
    let optional = || (!rest.is_empty()).then(|| rest.to_owned());

    match kind {
        '0' => Ok(EnginePacket::Open(serde_json::from_str(rest)?)),
        '1' => Ok(EnginePacket::Close),
        '2' => Ok(EnginePacket::Ping(optional())),
        '3' => Ok(EnginePacket::Pong(optional())),
        '4' => Ok(EnginePacket::Message(rest.to_owned())),
        '5' => Ok(EnginePacket::Upgrade),
        '6' => Ok(EnginePacket::Noop),
        'b' => Err(PacketError::Unsupported("binary engine message")),
        found => Err(PacketError::UnknownType { layer: "engine", found }),
    }
}

/// Split a long-polling payload into individual packet texts.
pub fn split_payload(payload: &str) -> impl Iterator<Item = &str> {
    payload.split(PAYLOAD_SEPARATOR).filter(|part| !part.is_empty())
}

/// Join encoded packets into one long-polling payload.
#[must_use]
pub fn join_payload(packets: &[String]) -> String {
    packets.join(&PAYLOAD_SEPARATOR.to_string())
}

// =============================================================================
// SOCKET.IO
// =============================================================================

/// One Socket.IO packet (the body of an Engine.IO `message`).
#[derive(Clone, Debug, PartialEq)]
pub enum SocketPacket {
    /// Namespace connect request (client) or acknowledgment (server).
    Connect { namespace: String, data: Option<Value> },
    Disconnect { namespace: String },
    /// Named event with positional arguments.
    Event { namespace: String, id: Option<u64>, name: String, args: Vec<Value> },
    Ack { namespace: String, id: u64, args: Vec<Value> },
    /// Server refused the namespace connect.
    ConnectError { namespace: String, data: Value },
}

impl SocketPacket {
    /// Client connect request for the default namespace with an auth payload.
    #[must_use]
    pub fn connect(auth: Option<Value>) -> Self {
        Self::Connect { namespace: DEFAULT_NAMESPACE.to_owned(), data: auth }
    }

    #[must_use]
    pub fn namespace(&self) -> &str {
        match self {
            Self::Connect { namespace, .. }
            | Self::Disconnect { namespace }
            | Self::Event { namespace, .. }
            | Self::Ack { namespace, .. }
            | Self::ConnectError { namespace, .. } => namespace,
        }
    }

    /// Human-readable reason carried by a `ConnectError`.
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::ConnectError { data, .. } => data
                .get("message")
                .and_then(Value::as_str)
                .or_else(|| data.as_str()),
            _ => None,
        }
    }
}

/// Encode a Socket.IO packet as the text of an Engine.IO message.
#[must_use]
pub fn encode_socket(packet: &SocketPacket) -> String {
    let (digit, id, body) = match packet {
        SocketPacket::Connect { data, .. } => ('0', None, data.as_ref().map(Value::to_string)),
        SocketPacket::Disconnect { .. } => ('1', None, None),
        SocketPacket::Event { id, name, args, .. } => {
            let mut items = Vec::with_capacity(args.len() + 1);
            items.push(Value::String(name.clone()));
            items.extend(args.iter().cloned());
            ('2', *id, Some(Value::Array(items).to_string()))
        }
        SocketPacket::Ack { id, args, .. } => ('3', Some(*id), Some(Value::Array(args.clone()).to_string())),
        SocketPacket::ConnectError { data, .. } => ('4', None, Some(data.to_string())),
    };

    let mut out = String::new();
    out.push(digit);
    let namespace = packet.namespace();
    if namespace != DEFAULT_NAMESPACE {
        out.push_str(namespace);
        out.push(',');
    }
    if let Some(id) = id {
        out.push_str(&id.to_string());
    }
    if let Some(body) = body {
        out.push_str(&body);
    }
    out
}

/// Decode the text of an Engine.IO message into a Socket.IO packet.
///
/// # Errors
///
/// Returns [`PacketError::UnknownType`] for unknown type digits,
/// [`PacketError::Unsupported`] for binary packets,
/// [`PacketError::MalformedEvent`] for events without a string name, and
/// [`PacketError::Json`] for malformed JSON bodies.
pub fn decode_socket(text: &str) -> Result<SocketPacket, PacketError> {
    let mut chars = text.chars();
    let kind = chars.next().ok_or(PacketError::Empty)?;
    let mut rest = chars.as_str();

    if matches!(kind, '5' | '6') {
        return Err(PacketError::Unsupported("binary socket packet"));
    }

    let namespace = if rest.starts_with('/') {
        let (ns, tail) = rest.split_once(',').unwrap_or((rest, ""));
        rest = tail;
        ns.to_owned()
    } else {
        DEFAULT_NAMESPACE.to_owned()
    };

    let digits = rest.chars().take_while(char::is_ascii_digit).count();
    let id = (digits > 0).then(|| rest[..digits].parse::<u64>().ok()).flatten();
    rest = &rest[digits..];

    let body = if rest.is_empty() { None } else { Some(serde_json::from_str::<Value>(rest)?) };

    match kind {
        '0' => Ok(SocketPacket::Connect { namespace, data: body }),
        '1' => Ok(SocketPacket::Disconnect { namespace }),
        '2' => {
            let Some(Value::Array(mut items)) = body else {
                return Err(PacketError::MalformedEvent);
            };
            if items.is_empty() {
                return Err(PacketError::MalformedEvent);
            }
            let Value::String(name) = items.remove(0) else {
                return Err(PacketError::MalformedEvent);
            };
            Ok(SocketPacket::Event { namespace, id, name, args: items })
        }
        '3' => {
            let args = match body {
                Some(Value::Array(items)) => items,
                Some(other) => vec![other],
                None => Vec::new(),
            };
            Ok(SocketPacket::Ack { namespace, id: id.unwrap_or_default(), args })
        }
        '4' => Ok(SocketPacket::ConnectError { namespace, data: body.unwrap_or(Value::Null) }),
        found => Err(PacketError::UnknownType { layer: "socket", found }),
    }
}

#[cfg(test)]
#[path = "lib_test.rs"]
mod tests;
