//! Live event channel to the backend's Socket.IO endpoint.

pub mod connection;
pub mod event;
pub mod policy;
pub mod transport;

pub use connection::{ConnectionHandle, ConnectionManager, ConnectionStatus};
pub use event::PushEvent;
pub use transport::TransportError;
