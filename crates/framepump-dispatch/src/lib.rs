//! Typed message reception and per-frame dispatch for Framepump.
//!
//! This crate bridges the network side (envelopes arriving on background
//! threads or tasks) to the application side (a single-threaded per-frame
//! update loop), without blocking either:
//!
//! 1. **Typed receive queues** — one unbounded FIFO per message tag.
//!    Envelopes are converted into the concrete message type *on enqueue*;
//!    a value that fails conversion never enters a queue.
//! 2. **Registry / router** — [`Registry`] is built once at session setup
//!    (one `register::<T>(tag)` per known message type) and split into a
//!    shareable [`MessageRouter`] for producers and a host-owned
//!    [`Dispatcher`] for the consumer.
//! 3. **Dispatch loop** — [`Dispatcher::tick`], called once per host frame,
//!    visits every queue in registration order and delivers buffered
//!    messages to subscribers, at most a configured number per queue per
//!    tick.
//!
//! # Architecture
//!
//! ```text
//!  receive task(s)                          host frame loop
//!  ──────────────                           ───────────────
//!  router.route(envelope)                   dispatcher.tick()
//!        │ convert on enqueue                     │ at most N per queue
//!        ▼                                        ▼
//!  ┌───────────────┐    unbounded FIFO    ┌───────────────┐
//!  │ QueueProducer │ ───────────────────▶ │ ReceiveQueue  │──▶ subscribers
//!  └───────────────┘   (one per tag)      └───────────────┘
//! ```
//!
//! Producers never block and never see subscribers; subscribers only ever
//! run on the thread that calls `tick`. The set of tags is fixed after
//! [`Registry::build`] — queue contents and subscriber lists stay mutable
//! for the session's lifetime.

mod dispatcher;
mod error;
mod queue;
mod registry;
mod router;

pub use dispatcher::{DispatchConfig, DispatchMetrics, Dispatcher, TickReport};
pub use error::{DispatchError, RegistryError, RouteError};
pub use queue::SubscriptionId;
pub use registry::Registry;
pub use router::MessageRouter;
