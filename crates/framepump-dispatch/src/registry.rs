//! Session-setup registration of message types.

use std::collections::HashMap;

use framepump_protocol::MessageTag;
use serde::de::DeserializeOwned;

use crate::dispatcher::{DispatchConfig, Dispatcher};
use crate::error::RegistryError;
use crate::queue::{EnvelopeSink, ErasedQueue, queue_pair};
use crate::router::MessageRouter;

/// Builds the queue set for one session.
///
/// Register every message type the connection can receive, then call
/// [`build`](Self::build) to split the registry into its two runtime
/// halves: a [`MessageRouter`] for the producer side and a [`Dispatcher`]
/// for the host's frame loop. After `build` the set of tags is frozen —
/// there is no way to add or remove a queue from a live session, which is
/// what makes the router safe to share without locks.
///
/// # Example
///
/// ```rust
/// use framepump_dispatch::Registry;
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct ChatMessage { text: String }
///
/// let mut registry = Registry::new();
/// registry.register::<ChatMessage>("ChatMessage")?;
/// let (router, dispatcher) = registry.build();
/// # Ok::<(), framepump_dispatch::RegistryError>(())
/// ```
pub struct Registry {
    sinks: HashMap<MessageTag, Box<dyn EnvelopeSink>>,
    /// Queues in registration order — this order is the tick order.
    queues: Vec<Box<dyn ErasedQueue>>,
    config: DispatchConfig,
}

impl Registry {
    /// Creates an empty registry with the default dispatch configuration.
    pub fn new() -> Self {
        Self {
            sinks: HashMap::new(),
            queues: Vec::new(),
            config: DispatchConfig::default(),
        }
    }

    /// Overrides the dispatch configuration for the built dispatcher.
    pub fn dispatch_config(mut self, config: DispatchConfig) -> Self {
        self.config = config;
        self
    }

    /// Registers a receive queue for `tag` with element type `T`.
    ///
    /// The conversion rule is fixed here: envelopes routed to `tag` are
    /// deserialized into `T`, and only successfully converted values ever
    /// enter the queue.
    ///
    /// # Errors
    /// Returns [`RegistryError::DuplicateTag`] if `tag` already has a
    /// queue.
    pub fn register<T>(&mut self, tag: impl Into<MessageTag>) -> Result<(), RegistryError>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let tag = tag.into();
        if self.sinks.contains_key(&tag) {
            return Err(RegistryError::DuplicateTag { tag });
        }

        let (producer, queue) = queue_pair::<T>(tag.clone());
        self.sinks.insert(tag, Box::new(producer));
        self.queues.push(Box::new(queue));
        Ok(())
    }

    /// Number of registered message types.
    pub fn len(&self) -> usize {
        self.queues.len()
    }

    /// Whether nothing has been registered yet.
    pub fn is_empty(&self) -> bool {
        self.queues.is_empty()
    }

    /// Splits the registry into its producer and consumer halves.
    pub fn build(self) -> (MessageRouter, Dispatcher) {
        tracing::debug!(tags = self.queues.len(), "dispatch registry built");
        (
            MessageRouter::new(self.sinks),
            Dispatcher::new(self.queues, self.config),
        )
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
