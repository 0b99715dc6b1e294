//! Minimal chat client: subscribes to two message types, connects, and
//! drives the dispatcher from a 60 Hz frame loop.
//!
//! Run against any server speaking `{"type": ..., "data": ...}` frames:
//!
//! ```text
//! cargo run -p chat-client -- ws://127.0.0.1:9000
//! ```

use framepump::prelude::*;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Message types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ChatMessage {
    from: String,
    text: String,
}

#[derive(Debug, Deserialize)]
struct PlayerJoined {
    name: String,
}

#[derive(Debug, Serialize)]
struct SendChat {
    text: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "ws://127.0.0.1:9000".to_string());

    // One queue per message type the server can send us.
    let mut registry = Registry::new();
    registry.register::<ChatMessage>("ChatMessage")?;
    registry.register::<PlayerJoined>("PlayerJoined")?;
    let (router, mut dispatcher) = registry.build();

    dispatcher.subscribe::<ChatMessage, _>("ChatMessage", |msg| {
        println!("[{}] {}", msg.from, msg.text);
    })?;
    dispatcher.subscribe::<PlayerJoined, _>("PlayerJoined", |msg| {
        println!("* {} joined", msg.name);
    })?;

    let client = Client::connect(ClientConfig::new(url.as_str()), router).await?;
    tracing::info!(%url, "connected — say hi");

    client.send(
        "SendChat",
        &SendChat {
            text: "hello from framepump".to_string(),
        },
    )?;

    // The frame loop a game engine would normally provide.
    let mut clock = FrameClock::with_rate(60);
    while client.is_running() {
        clock.wait_for_frame().await;
        dispatcher.tick();
    }

    tracing::info!("session ended");
    Ok(())
}
