//! The per-frame dispatch loop and its configuration.

use std::collections::HashMap;

use framepump_protocol::MessageTag;

use crate::error::DispatchError;
use crate::queue::{Callback, ErasedQueue, ReceiveQueue, SubscriptionId};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for the dispatch loop.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Maximum messages delivered per queue per tick. Default: 1.
    ///
    /// The default bounds a tick's subscriber work by the number of
    /// registered message types rather than by backlog size; a burst
    /// drains over successive ticks in FIFO order. Raise this for
    /// high-volume types that must not lag frames behind the wire.
    pub messages_per_tick: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            messages_per_tick: 1,
        }
    }
}

impl DispatchConfig {
    /// Fixes out-of-range values so the config is safe to use.
    ///
    /// Called automatically when the dispatcher is built:
    /// `messages_per_tick` of 0 would stall every queue forever, so it is
    /// raised to 1.
    pub fn validated(mut self) -> Self {
        if self.messages_per_tick == 0 {
            tracing::warn!("messages_per_tick of 0 would never deliver — raising to 1");
            self.messages_per_tick = 1;
        }
        self
    }
}

// ---------------------------------------------------------------------------
// Reports and metrics
// ---------------------------------------------------------------------------

/// What one [`Dispatcher::tick`] call did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Messages delivered to subscribers this tick, across all queues.
    pub delivered: usize,
    /// Subscriber callbacks that panicked this tick (each was isolated
    /// and logged; delivery continued).
    pub subscriber_panics: usize,
}

/// Counters accumulated over the dispatcher's lifetime.
#[derive(Debug, Clone, Default)]
pub struct DispatchMetrics {
    /// Total ticks executed.
    pub total_ticks: u64,
    /// Total messages delivered to subscribers.
    pub total_delivered: u64,
    /// Total isolated subscriber panics.
    pub total_subscriber_panics: u64,
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

/// The consumer half of the queue registry: owns every receive queue and
/// drives delivery from the host's frame loop.
///
/// Exactly one thread owns the dispatcher, and that ownership *is* the
/// single-consumer guarantee — all consumer-side operations take
/// `&mut self`, so no synchronization exists and none is needed.
/// Subscriber callbacks run only inside [`tick`](Self::tick), on the
/// calling thread.
///
/// The dispatcher performs no I/O and never blocks. If `tick` is never
/// called, routed messages accumulate (bounded only by memory) but are
/// never lost or reordered.
pub struct Dispatcher {
    /// Queues in registration order; `tick` visits them in this order.
    queues: Vec<Box<dyn ErasedQueue>>,
    /// Tag → index into `queues`, for the typed operations.
    by_tag: HashMap<MessageTag, usize>,
    config: DispatchConfig,
    metrics: DispatchMetrics,
    next_subscription: u64,
}

impl Dispatcher {
    pub(crate) fn new(queues: Vec<Box<dyn ErasedQueue>>, config: DispatchConfig) -> Self {
        let by_tag = queues
            .iter()
            .enumerate()
            .map(|(index, queue)| (queue.tag().clone(), index))
            .collect();
        Self {
            queues,
            by_tag,
            config: config.validated(),
            metrics: DispatchMetrics::default(),
            next_subscription: 0,
        }
    }

    /// Runs one dispatch pass. Call once per host frame.
    ///
    /// Visits every queue in registration order and delivers at most
    /// [`DispatchConfig::messages_per_tick`] buffered messages per queue,
    /// invoking each queue's subscribers synchronously, in subscription
    /// order, with one message at a time.
    pub fn tick(&mut self) -> TickReport {
        let budget = self.config.messages_per_tick;
        let mut report = TickReport::default();

        for queue in &mut self.queues {
            for _ in 0..budget {
                let delivery = queue.deliver_if_available();
                if !delivery.delivered {
                    break;
                }
                report.delivered += 1;
                report.subscriber_panics += delivery.subscriber_panics;
            }
        }

        self.metrics.total_ticks += 1;
        self.metrics.total_delivered += report.delivered as u64;
        self.metrics.total_subscriber_panics += report.subscriber_panics as u64;

        if report.delivered > 0 {
            tracing::trace!(delivered = report.delivered, "dispatch tick");
        }
        report
    }

    /// Attaches a callback to the queue registered for `tag`.
    ///
    /// The callback runs on the dispatch thread, inside `tick`, once per
    /// delivered message. Subscribers on one queue are invoked in
    /// subscription order.
    ///
    /// # Errors
    /// [`DispatchError::UnknownTag`] if no queue exists for `tag`;
    /// [`DispatchError::TypeMismatch`] if the queue's element type is not
    /// `T`.
    pub fn subscribe<T, F>(&mut self, tag: &str, callback: F) -> Result<SubscriptionId, DispatchError>
    where
        T: Send + 'static,
        F: FnMut(&T) + Send + 'static,
    {
        let id = SubscriptionId::new(self.next_subscription);
        self.next_subscription += 1;

        let queue = self.typed_queue_mut::<T>(tag)?;
        queue.subscribe(id, Box::new(callback) as Callback<T>);
        Ok(id)
    }

    /// Removes a subscription. Returns `false` for ids that were never
    /// issued or were already removed.
    ///
    /// Cannot race an in-progress delivery: delivery happens inside
    /// [`tick`](Self::tick), which holds `&mut self`, so no callback can
    /// reach this method reentrantly.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.queues.iter_mut().any(|queue| queue.unsubscribe(id))
    }

    /// Removes and returns the head of `tag`'s queue without involving
    /// subscribers. Useful for poll-style consumption of a type nothing
    /// subscribes to.
    ///
    /// # Errors
    /// Same conditions as [`subscribe`](Self::subscribe).
    pub fn drain_one<T: Send + 'static>(&mut self, tag: &str) -> Result<Option<T>, DispatchError> {
        Ok(self.typed_queue_mut::<T>(tag)?.drain_one())
    }

    /// Buffered message count for `tag`, or `None` for an unknown tag.
    pub fn pending(&self, tag: &str) -> Option<usize> {
        self.by_tag
            .get(tag)
            .map(|&index| self.queues[index].pending())
    }

    /// Registered tags, in registration (and therefore tick) order.
    pub fn tags(&self) -> impl Iterator<Item = &MessageTag> {
        self.queues.iter().map(|queue| queue.tag())
    }

    /// Lifetime counters for this dispatcher.
    pub fn metrics(&self) -> &DispatchMetrics {
        &self.metrics
    }

    /// The active configuration.
    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    fn typed_queue_mut<T: Send + 'static>(
        &mut self,
        tag: &str,
    ) -> Result<&mut ReceiveQueue<T>, DispatchError> {
        let index = *self.by_tag.get(tag).ok_or_else(|| DispatchError::UnknownTag {
            tag: MessageTag::from(tag),
        })?;
        self.queues[index]
            .as_any_mut()
            .downcast_mut::<ReceiveQueue<T>>()
            .ok_or_else(|| DispatchError::TypeMismatch {
                tag: MessageTag::from(tag),
            })
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("tags", &self.queues.len())
            .field("config", &self.config)
            .field("metrics", &self.metrics)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use framepump_protocol::Envelope;
    use serde::Deserialize;
    use serde_json::json;

    use crate::{MessageRouter, Registry};

    use super::*;

    #[derive(Debug, Deserialize)]
    struct Chat {
        text: String,
    }

    #[derive(Debug, Deserialize)]
    struct Tick {
        #[allow(dead_code)]
        n: u32,
    }

    fn chat_session() -> (MessageRouter, Dispatcher) {
        let mut registry = Registry::new();
        registry.register::<Chat>("Chat").unwrap();
        registry.build()
    }

    fn route_chat(router: &MessageRouter, text: &str) {
        router
            .route(Envelope::new("Chat", json!({ "text": text })))
            .unwrap();
    }

    #[test]
    fn test_tick_delivers_at_most_one_message_per_queue() {
        let (router, mut dispatcher) = chat_session();
        let received = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&received);
        dispatcher
            .subscribe::<Chat, _>("Chat", move |msg| sink.lock().unwrap().push(msg.text.clone()))
            .unwrap();

        for text in ["a", "b", "c"] {
            route_chat(&router, text);
        }

        let report = dispatcher.tick();
        assert_eq!(report.delivered, 1);
        assert_eq!(dispatcher.pending("Chat"), Some(2));

        dispatcher.tick();
        dispatcher.tick();
        assert_eq!(*received.lock().unwrap(), vec!["a", "b", "c"]);
        assert_eq!(dispatcher.pending("Chat"), Some(0));
    }

    #[test]
    fn test_tick_empty_queues_delivers_nothing() {
        let (_router, mut dispatcher) = chat_session();
        let report = dispatcher.tick();
        assert_eq!(report, TickReport::default());
        assert_eq!(dispatcher.metrics().total_ticks, 1);
    }

    #[test]
    fn test_tick_respects_messages_per_tick_budget() {
        let mut registry = Registry::new();
        registry.register::<Chat>("Chat").unwrap();
        let (router, mut dispatcher) = registry
            .dispatch_config(DispatchConfig {
                messages_per_tick: 2,
            })
            .build();

        for text in ["a", "b", "c"] {
            route_chat(&router, text);
        }

        assert_eq!(dispatcher.tick().delivered, 2);
        assert_eq!(dispatcher.tick().delivered, 1);
    }

    #[test]
    fn test_tick_visits_queues_in_registration_order() {
        let mut registry = Registry::new();
        registry.register::<Chat>("Chat").unwrap();
        registry.register::<Tick>("Tick").unwrap();
        let (router, mut dispatcher) = registry.build();

        let order = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&order);
        dispatcher
            .subscribe::<Chat, _>("Chat", move |_| sink.lock().unwrap().push("Chat"))
            .unwrap();
        let sink = Arc::clone(&order);
        dispatcher
            .subscribe::<Tick, _>("Tick", move |_| sink.lock().unwrap().push("Tick"))
            .unwrap();

        // Route in the opposite order to prove tick order is registration
        // order, not arrival order across queues.
        router.route(Envelope::new("Tick", json!({ "n": 1 }))).unwrap();
        route_chat(&router, "hi");

        dispatcher.tick();
        assert_eq!(*order.lock().unwrap(), vec!["Chat", "Tick"]);
    }

    #[test]
    fn test_subscribe_unknown_tag_returns_error() {
        let (_router, mut dispatcher) = chat_session();
        let err = dispatcher
            .subscribe::<Chat, _>("Nope", |_msg| {})
            .unwrap_err();
        assert!(matches!(err, DispatchError::UnknownTag { .. }));
    }

    #[test]
    fn test_subscribe_wrong_type_returns_type_mismatch() {
        let (_router, mut dispatcher) = chat_session();
        let err = dispatcher
            .subscribe::<Tick, _>("Chat", |_msg| {})
            .unwrap_err();
        assert!(matches!(err, DispatchError::TypeMismatch { .. }));
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let (router, mut dispatcher) = chat_session();
        let count = Arc::new(AtomicUsize::new(0));

        let sink = Arc::clone(&count);
        let id = dispatcher
            .subscribe::<Chat, _>("Chat", move |_msg| {
                sink.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();

        route_chat(&router, "before");
        dispatcher.tick();
        assert_eq!(count.load(Ordering::SeqCst), 1);

        assert!(dispatcher.unsubscribe(id));
        assert!(!dispatcher.unsubscribe(id));

        route_chat(&router, "after");
        dispatcher.tick();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_drain_one_bypasses_subscribers() {
        let (router, mut dispatcher) = chat_session();
        route_chat(&router, "polled");

        let msg = dispatcher.drain_one::<Chat>("Chat").unwrap().unwrap();
        assert_eq!(msg.text, "polled");
        assert!(dispatcher.drain_one::<Chat>("Chat").unwrap().is_none());
    }

    #[test]
    fn test_zero_budget_config_is_raised_to_one() {
        let mut registry = Registry::new();
        registry.register::<Chat>("Chat").unwrap();
        let (router, mut dispatcher) = registry
            .dispatch_config(DispatchConfig {
                messages_per_tick: 0,
            })
            .build();

        assert_eq!(dispatcher.config().messages_per_tick, 1);
        route_chat(&router, "still delivered");
        assert_eq!(dispatcher.tick().delivered, 1);
    }

    #[test]
    fn test_metrics_accumulate_across_ticks() {
        let (router, mut dispatcher) = chat_session();
        route_chat(&router, "a");
        route_chat(&router, "b");

        dispatcher.tick();
        dispatcher.tick();
        dispatcher.tick();

        let metrics = dispatcher.metrics();
        assert_eq!(metrics.total_ticks, 3);
        assert_eq!(metrics.total_delivered, 2);
        assert_eq!(metrics.total_subscriber_panics, 0);
    }
}
