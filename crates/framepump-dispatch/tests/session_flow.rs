//! End-to-end flows through registry, router, and dispatcher, including
//! the multi-producer case the queues exist for.

use std::sync::{Arc, Mutex};
use std::thread;

use framepump_dispatch::{DispatchError, Registry, RouteError};
use framepump_protocol::Envelope;
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Clone, Deserialize, PartialEq)]
struct ChatMessage {
    text: String,
}

#[derive(Debug, Deserialize)]
struct Packet {
    producer: usize,
    seq: u32,
}

#[test]
fn test_route_then_tick_delivers_typed_message_to_subscriber() {
    let mut registry = Registry::new();
    registry.register::<ChatMessage>("ChatMessage").unwrap();
    let (router, mut dispatcher) = registry.build();

    let received = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&received);
    dispatcher
        .subscribe::<ChatMessage, _>("ChatMessage", move |msg| {
            sink.lock().unwrap().push(msg.clone());
        })
        .unwrap();

    router
        .route(Envelope::new("ChatMessage", json!({ "text": "hi" })))
        .unwrap();
    assert_eq!(dispatcher.pending("ChatMessage"), Some(1));

    dispatcher.tick();

    assert_eq!(
        *received.lock().unwrap(),
        vec![ChatMessage {
            text: "hi".to_string()
        }]
    );
    assert_eq!(dispatcher.pending("ChatMessage"), Some(0));
}

#[test]
fn test_malformed_envelope_is_rejected_without_buffering() {
    let mut registry = Registry::new();
    registry.register::<ChatMessage>("ChatMessage").unwrap();
    let (router, dispatcher) = registry.build();

    // Required `text` field missing.
    let err = router
        .route(Envelope::new("ChatMessage", json!({ "sender": "eve" })))
        .unwrap_err();

    match err {
        RouteError::Deserialize { tag, source } => {
            assert_eq!(tag.as_str(), "ChatMessage");
            // The serde detail names what was wrong with the envelope.
            assert!(source.to_string().contains("text"));
        }
        other => panic!("expected Deserialize error, got {other}"),
    }
    assert_eq!(dispatcher.pending("ChatMessage"), Some(0));
}

#[test]
fn test_backlog_drains_one_message_per_tick_in_order() {
    let mut registry = Registry::new();
    registry.register::<ChatMessage>("ChatMessage").unwrap();
    let (router, mut dispatcher) = registry.build();

    let received = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&received);
    dispatcher
        .subscribe::<ChatMessage, _>("ChatMessage", move |msg| {
            sink.lock().unwrap().push(msg.text.clone());
        })
        .unwrap();

    for text in ["one", "two", "three"] {
        router
            .route(Envelope::new("ChatMessage", json!({ "text": text })))
            .unwrap();
    }

    assert_eq!(dispatcher.tick().delivered, 1);
    assert_eq!(dispatcher.pending("ChatMessage"), Some(2));

    dispatcher.tick();
    dispatcher.tick();
    assert_eq!(*received.lock().unwrap(), vec!["one", "two", "three"]);
}

#[test]
fn test_unregistered_tag_is_dropped_without_side_effects() {
    let mut registry = Registry::new();
    registry.register::<ChatMessage>("ChatMessage").unwrap();
    let (router, mut dispatcher) = registry.build();

    let err = router
        .route(Envelope::new("Unknown", json!({ "text": "??" })))
        .unwrap_err();

    assert!(matches!(err, RouteError::UnknownTag { ref tag } if tag.as_str() == "Unknown"));
    // No queue appeared for the unknown tag, and the known one is empty.
    assert!(matches!(
        dispatcher.drain_one::<ChatMessage>("Unknown"),
        Err(DispatchError::UnknownTag { .. })
    ));
    assert_eq!(dispatcher.pending("ChatMessage"), Some(0));
    assert_eq!(dispatcher.tick().delivered, 0);
}

#[test]
fn test_concurrent_producers_deliver_every_message_exactly_once() {
    const PRODUCERS: usize = 2;
    const PER_PRODUCER: u32 = 50;

    let mut registry = Registry::new();
    registry.register::<Packet>("Packet").unwrap();
    let (router, mut dispatcher) = registry.build();

    let handles: Vec<_> = (0..PRODUCERS)
        .map(|producer| {
            let router = router.clone();
            thread::spawn(move || {
                for seq in 0..PER_PRODUCER {
                    router
                        .route(Envelope::new(
                            "Packet",
                            json!({ "producer": producer, "seq": seq }),
                        ))
                        .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let received = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&received);
    dispatcher
        .subscribe::<Packet, _>("Packet", move |packet| {
            sink.lock().unwrap().push((packet.producer, packet.seq));
        })
        .unwrap();

    // One message per tick: the whole backlog takes exactly as many ticks
    // as there are buffered messages.
    let total = (PRODUCERS as u32 * PER_PRODUCER) as usize;
    for _ in 0..total {
        assert_eq!(dispatcher.tick().delivered, 1);
    }
    assert_eq!(dispatcher.tick().delivered, 0);

    let received = received.lock().unwrap();
    assert_eq!(received.len(), total);

    // Exactly once: no duplicates across the interleaving.
    let unique: std::collections::HashSet<_> = received.iter().collect();
    assert_eq!(unique.len(), total);

    // Each producer's own submissions kept their relative order.
    for producer in 0..PRODUCERS {
        let seqs: Vec<u32> = received
            .iter()
            .filter(|(p, _)| *p == producer)
            .map(|(_, seq)| *seq)
            .collect();
        assert_eq!(seqs, (0..PER_PRODUCER).collect::<Vec<_>>());
    }
}
