//! Transport abstraction layer for Framepump.
//!
//! Provides the [`Connector`] and [`Connection`] traits that abstract over
//! how a client reaches its server (WebSocket today, WebTransport later),
//! so the layers above only ever see "frames of bytes in, frames of bytes
//! out".
//!
//! # Feature Flags
//!
//! - `websocket` (default) — WebSocket connector via `tokio-tungstenite`

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use websocket::{WebSocketConnection, WebSocketConnector};

use std::fmt;
use std::future::Future;

/// Opaque identifier for a connection, distinct across reconnects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Establishes outbound connections to a server.
///
/// A connector is reusable: the receive loop calls `connect` again after a
/// dropped connection, and each call yields a fresh [`Connection`] with its
/// own id.
pub trait Connector: Send + Sync + 'static {
    /// The connection type produced by this connector.
    type Connection: Connection;
    /// The error type for connect operations.
    type Error: std::error::Error + Send + Sync;

    /// Opens a new connection to the given URL.
    fn connect(
        &self,
        url: &str,
    ) -> impl Future<Output = Result<Self::Connection, Self::Error>> + Send;
}

/// A single established connection that can send and receive byte frames.
pub trait Connection: Send + Sync + 'static {
    /// The error type for connection operations.
    type Error: std::error::Error + Send + Sync;

    /// Sends one frame to the remote peer.
    fn send(&self, data: &[u8]) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Receives the next frame from the remote peer.
    ///
    /// Returns `Ok(None)` when the connection is cleanly closed.
    fn recv(&self) -> impl Future<Output = Result<Option<Vec<u8>>, Self::Error>> + Send;

    /// Closes the connection.
    fn close(&self) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Returns the unique identifier for this connection.
    fn id(&self) -> ConnectionId;
}
