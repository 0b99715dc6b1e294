//! Wire protocol for Framepump.
//!
//! This crate defines what an incoming frame *is* before the application
//! ever sees a typed message:
//!
//! - **Types** ([`MessageTag`], [`Envelope`]) — a tag naming a message
//!   schema, and the parsed-but-untyped payload that travels with it.
//! - **Codec** ([`FrameCodec`] trait, [`JsonCodec`]) — how raw frame bytes
//!   become envelopes, and how typed outbound messages become frames.
//! - **Errors** ([`ProtocolError`]) — what can go wrong during
//!   encoding/decoding.
//!
//! # Architecture
//!
//! The protocol layer sits between transport (raw bytes) and dispatch
//! (typed queues). It knows nothing about sockets, queues, or subscribers —
//! it only turns bytes into tagged envelopes and back.
//!
//! ```text
//! Transport (bytes) → Protocol (Envelope) → Dispatch (typed queues)
//! ```

mod codec;
mod error;
mod types;

pub use codec::{FrameCodec, JsonCodec};
pub use error::ProtocolError;
pub use types::{Envelope, MessageTag};
