//! Error types for the dispatch layer.
//!
//! Producer-side errors ([`RouteError`]) are returned synchronously to
//! whoever called `route` — typically the receive task, which logs them.
//! They never reach subscribers and none of them is fatal to the session.

use framepump_protocol::MessageTag;

/// Errors surfaced to the producer side by `MessageRouter::route`.
#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    /// The envelope's tag has no registered queue. The envelope is dropped;
    /// no queue and no registry state is mutated.
    #[error("no queue registered for message tag {tag}")]
    UnknownTag {
        /// The unregistered tag.
        tag: MessageTag,
    },

    /// The envelope's payload does not match the schema registered for its
    /// tag. The target queue is left unchanged — conversion failure is
    /// atomic, there is no partial enqueue.
    #[error("failed to deserialize {tag} payload: {source}")]
    Deserialize {
        /// Tag of the rejected envelope.
        tag: MessageTag,
        /// The underlying serde error, naming the offending field.
        #[source]
        source: serde_json::Error,
    },

    /// The consumer half of the queue has been dropped (session teardown).
    /// Enqueues racing teardown land here instead of panicking; callers
    /// log and drop the message.
    #[error("receive queue for {tag} is disconnected")]
    Disconnected {
        /// Tag of the dropped message.
        tag: MessageTag,
    },
}

/// Errors from session-setup registration.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// Each tag maps to exactly one queue for the registry's lifetime;
    /// registering the same tag twice is a setup bug.
    #[error("message tag {tag} is already registered")]
    DuplicateTag {
        /// The tag that was registered twice.
        tag: MessageTag,
    },
}

/// Errors from typed consumer-side operations on the dispatcher
/// (`subscribe`, `drain_one`).
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// No queue is registered under this tag.
    #[error("no queue registered for message tag {tag}")]
    UnknownTag {
        /// The unknown tag.
        tag: MessageTag,
    },

    /// A queue exists for this tag, but it holds a different element type
    /// than the one requested.
    #[error("queue for {tag} holds a different message type")]
    TypeMismatch {
        /// The tag whose queue was accessed with the wrong type.
        tag: MessageTag,
    },
}
