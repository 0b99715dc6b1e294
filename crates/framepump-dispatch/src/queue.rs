//! Typed receive queues: one ordered, unbounded buffer per message tag.
//!
//! A queue is created as a linked pair: a [`QueueProducer`] that converts
//! envelopes on enqueue, and a [`ReceiveQueue`] that drains and delivers to
//! subscribers. The two halves share an unbounded crossbeam channel, which
//! gives the multi-producer / single-consumer semantics for free:
//! producers clone nothing, lock nothing, and never block; the consumer
//! drains with a non-blocking `try_recv`.
//!
//! Both halves are exposed to the registry behind non-generic traits
//! ([`EnvelopeSink`], [`ErasedQueue`]) so queues of different element types
//! live in one collection. The element type stays internal to each pair.

use std::any::Any;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};

use crossbeam_channel::{Receiver, Sender, unbounded};
use framepump_protocol::{Envelope, MessageTag};
use serde::de::DeserializeOwned;

use crate::error::RouteError;

/// Handle returned by `Dispatcher::subscribe`, used to unsubscribe later.
///
/// Ids are unique within one dispatcher and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub(crate) fn new(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// A subscriber callback. Only ever invoked from the dispatch thread.
pub(crate) type Callback<T> = Box<dyn FnMut(&T) + Send>;

/// Creates the linked producer/consumer pair for one message type.
pub(crate) fn queue_pair<T>(tag: MessageTag) -> (QueueProducer<T>, ReceiveQueue<T>)
where
    T: DeserializeOwned + Send + 'static,
{
    let (tx, rx) = unbounded();
    (
        QueueProducer {
            tag: tag.clone(),
            tx,
        },
        ReceiveQueue {
            tag,
            rx,
            subscribers: Vec::new(),
        },
    )
}

// ---------------------------------------------------------------------------
// Producer half
// ---------------------------------------------------------------------------

/// Producer-side interface the router stores queues behind.
///
/// Non-generic so the router can hold every queue in one map without
/// knowing element types. Implementations must be callable from any number
/// of producer threads concurrently.
pub(crate) trait EnvelopeSink: Send + Sync {
    /// Converts the envelope with this queue's fixed rule and, on success,
    /// appends the value to the buffer tail. On failure the queue is
    /// unchanged and the error identifies the rejected envelope.
    fn enqueue_raw(&self, envelope: Envelope) -> Result<(), RouteError>;
}

/// The enqueue half of a typed receive queue.
///
/// The conversion rule is fixed at construction: the envelope payload is
/// deserialized into `T`. There is no runtime type discovery — the tag
/// decided the rule when the queue was registered.
pub(crate) struct QueueProducer<T> {
    tag: MessageTag,
    tx: Sender<T>,
}

impl<T> EnvelopeSink for QueueProducer<T>
where
    T: DeserializeOwned + Send + 'static,
{
    fn enqueue_raw(&self, envelope: Envelope) -> Result<(), RouteError> {
        let message: T =
            serde_json::from_value(envelope.payload).map_err(|source| {
                RouteError::Deserialize {
                    tag: self.tag.clone(),
                    source,
                }
            })?;
        // Unbounded channel: send never blocks. It only fails once the
        // consumer half is gone, i.e. the session is tearing down.
        self.tx.send(message).map_err(|_| RouteError::Disconnected {
            tag: self.tag.clone(),
        })
    }
}

// ---------------------------------------------------------------------------
// Consumer half
// ---------------------------------------------------------------------------

/// What one `deliver_if_available` call did.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Delivery {
    /// Whether a message was drained and handed to subscribers.
    pub(crate) delivered: bool,
    /// How many subscriber callbacks panicked while handling it.
    pub(crate) subscriber_panics: usize,
}

/// Consumer-side interface the dispatcher stores queues behind.
///
/// `as_any_mut` is the escape hatch back to the typed queue for
/// `subscribe`/`drain_one`; everything the tick loop needs is non-generic.
pub(crate) trait ErasedQueue: Send {
    /// The tag this queue was registered under.
    fn tag(&self) -> &MessageTag;

    /// Drains at most one message and, if one was buffered, invokes every
    /// subscriber with it. Empty queue → no-op.
    fn deliver_if_available(&mut self) -> Delivery;

    /// Number of buffered messages.
    fn pending(&self) -> usize;

    /// Removes the subscription with this id, if it belongs to this queue.
    fn unsubscribe(&mut self, id: SubscriptionId) -> bool;

    /// Downcast hook for the typed dispatcher operations.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// The drain-and-deliver half of a typed receive queue.
pub(crate) struct ReceiveQueue<T> {
    tag: MessageTag,
    rx: Receiver<T>,
    /// Ordered list of subscribers; invocation order is subscription order.
    subscribers: Vec<(SubscriptionId, Callback<T>)>,
}

impl<T: Send + 'static> ReceiveQueue<T> {
    /// Removes and returns the head of the buffer, if any. Non-blocking;
    /// a disconnected producer side just reads as empty.
    pub(crate) fn drain_one(&mut self) -> Option<T> {
        self.rx.try_recv().ok()
    }

    pub(crate) fn subscribe(&mut self, id: SubscriptionId, callback: Callback<T>) {
        self.subscribers.push((id, callback));
    }
}

impl<T: Send + 'static> ErasedQueue for ReceiveQueue<T> {
    fn tag(&self) -> &MessageTag {
        &self.tag
    }

    fn deliver_if_available(&mut self) -> Delivery {
        let Ok(message) = self.rx.try_recv() else {
            return Delivery::default();
        };

        // Each callback is isolated: one panicking subscriber must not
        // starve the others of this message or abort the tick.
        let mut subscriber_panics = 0;
        for (id, callback) in &mut self.subscribers {
            if catch_unwind(AssertUnwindSafe(|| callback(&message))).is_err() {
                subscriber_panics += 1;
                tracing::error!(
                    tag = %self.tag,
                    subscription = %id,
                    "subscriber panicked during delivery"
                );
            }
        }

        Delivery {
            delivered: true,
            subscriber_panics,
        }
    }

    fn pending(&self) -> usize {
        self.rx.len()
    }

    fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sub_id, _)| *sub_id != id);
        self.subscribers.len() != before
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
