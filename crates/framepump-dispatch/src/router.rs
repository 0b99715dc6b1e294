//! Producer-side routing: tag lookup and enqueue.

use std::collections::HashMap;
use std::sync::Arc;

use framepump_protocol::{Envelope, MessageTag};

use crate::error::RouteError;
use crate::queue::EnvelopeSink;

/// Routes decoded envelopes into their typed receive queues.
///
/// This is the handle the receive task (or any producer thread) holds. It
/// is cheap to clone — all clones share the same immutable tag map — and
/// every operation is non-blocking: `route` either converts-and-enqueues
/// or returns an error, it never waits on the consumer.
///
/// The router never deserializes anything itself; it only looks up the tag
/// and forwards the envelope to the queue that owns the conversion rule.
#[derive(Clone)]
pub struct MessageRouter {
    sinks: Arc<HashMap<MessageTag, Box<dyn EnvelopeSink>>>,
}

impl MessageRouter {
    pub(crate) fn new(sinks: HashMap<MessageTag, Box<dyn EnvelopeSink>>) -> Self {
        Self {
            sinks: Arc::new(sinks),
        }
    }

    /// Routes one envelope to the queue registered for its tag.
    ///
    /// # Errors
    ///
    /// - [`RouteError::UnknownTag`] — no queue for this tag; the envelope
    ///   is dropped and nothing is mutated.
    /// - [`RouteError::Deserialize`] — the payload does not match the
    ///   registered schema; the target queue is unchanged.
    /// - [`RouteError::Disconnected`] — the consumer side was dropped.
    pub fn route(&self, envelope: Envelope) -> Result<(), RouteError> {
        let Some(sink) = self.sinks.get(envelope.tag.as_str()) else {
            return Err(RouteError::UnknownTag { tag: envelope.tag });
        };
        sink.enqueue_raw(envelope)
    }

    /// Whether a queue is registered for `tag`.
    pub fn is_registered(&self, tag: &str) -> bool {
        self.sinks.contains_key(tag)
    }

    /// Number of registered message types.
    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    /// Whether the router has no registered message types.
    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl std::fmt::Debug for MessageRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageRouter")
            .field("tags", &self.sinks.len())
            .finish()
    }
}
