//! # Framepump
//!
//! Client-side message pump for web games: receive serialized messages on a
//! background task, route them into typed per-tag queues, and deliver them
//! to subscribers from the game's own frame loop — in order, without
//! blocking either side.
//!
//! ```text
//! ┌─────────────┐  bytes   ┌─────────┐  Envelope  ┌───────────────┐
//! │  WebSocket  │ ───────▶ │  codec  │ ─────────▶ │ MessageRouter │
//! │ (pump task) │          └─────────┘            └───────┬───────┘
//! └─────────────┘                                         │ typed queues
//!                                                         ▼
//!                       frame loop ──▶ dispatcher.tick() ──▶ subscribers
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use framepump::prelude::*;
//! use serde::Deserialize;
//!
//! #[derive(Debug, Deserialize)]
//! struct ChatMessage { from: String, text: String }
//!
//! # async fn run() -> Result<(), framepump::FramepumpError> {
//! let mut registry = Registry::new();
//! registry.register::<ChatMessage>("ChatMessage")?;
//! let (router, mut dispatcher) = registry.build();
//!
//! dispatcher.subscribe::<ChatMessage, _>("ChatMessage", |msg| {
//!     println!("[{}] {}", msg.from, msg.text);
//! })?;
//!
//! let client = Client::connect(
//!     ClientConfig::new("ws://127.0.0.1:9000"),
//!     router,
//! ).await?;
//!
//! let mut clock = FrameClock::with_rate(60);
//! while client.is_running() {
//!     clock.wait_for_frame().await;
//!     dispatcher.tick();
//! }
//! # Ok(()) }
//! ```

mod client;
mod clock;
mod error;

pub use client::{Client, ClientConfig, ReconnectConfig};
pub use clock::{FrameClock, FrameInfo};
pub use error::FramepumpError;

// Re-export the sub-crate surface so applications depend on one crate.
pub use framepump_dispatch::{
    DispatchConfig, DispatchError, DispatchMetrics, Dispatcher, MessageRouter,
    Registry, RegistryError, RouteError, SubscriptionId, TickReport,
};
pub use framepump_protocol::{Envelope, FrameCodec, JsonCodec, MessageTag, ProtocolError};
pub use framepump_transport::{Connection, ConnectionId, Connector, TransportError};
#[cfg(feature = "websocket")]
pub use framepump_transport::{WebSocketConnection, WebSocketConnector};

/// The traits and types most applications need, in one import.
pub mod prelude {
    pub use crate::{
        Client, ClientConfig, DispatchConfig, Dispatcher, FrameClock, FramepumpError,
        MessageRouter, MessageTag, ReconnectConfig, Registry,
    };
}
