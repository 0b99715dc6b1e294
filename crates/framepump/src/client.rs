//! The client: connection lifecycle and the receive-decode-route pump.
//!
//! [`Client::connect`] establishes the first connection, then moves it into
//! a background pump task. The pump owns all network I/O:
//!
//! 1. Receive a frame → decode into an [`Envelope`](framepump_protocol::Envelope)
//!    → route into the typed queues. Per-frame failures are logged and the
//!    connection carries on — a malformed frame never kills the session.
//! 2. Forward outbound frames queued by [`Client::send`].
//! 3. On a dropped connection, reconnect with exponential backoff plus
//!    random jitter (so a fleet of clients doesn't stampede the server),
//!    resetting the backoff after each successful connect.
//!
//! The dispatcher half stays with the caller; the pump only ever touches
//! the [`MessageRouter`], so subscriber callbacks can never run on the
//! network task.

use std::time::Duration;

use framepump_dispatch::{MessageRouter, RouteError};
use framepump_protocol::{FrameCodec, JsonCodec, MessageTag};
use framepump_transport::{Connection, Connector, TransportError};
#[cfg(feature = "websocket")]
use framepump_transport::WebSocketConnector;
use rand::Rng;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::FramepumpError;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Reconnection policy for a dropped connection.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Whether to reconnect at all. When `false`, the pump task ends the
    /// first time the connection does.
    pub enabled: bool,
    /// Delay before the first reconnect attempt. Doubles after each
    /// failed attempt.
    pub initial_delay: Duration,
    /// Upper bound for the doubling backoff.
    pub max_delay: Duration,
    /// Random jitter (0–max ms) added to every backoff delay to
    /// desynchronize clients that lost the same server.
    pub jitter_ms: u64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(15),
            jitter_ms: 250,
        }
    }
}

impl ReconnectConfig {
    /// Fixes out-of-range values so the config is safe to use.
    ///
    /// A zero initial delay would hot-loop against a dead server, so it is
    /// raised to 50 ms; `max_delay` is raised to at least `initial_delay`.
    pub fn validated(mut self) -> Self {
        if self.initial_delay.is_zero() {
            tracing::warn!("reconnect initial_delay of 0 would spin — raising to 50ms");
            self.initial_delay = Duration::from_millis(50);
        }
        if self.max_delay < self.initial_delay {
            self.max_delay = self.initial_delay;
        }
        self
    }
}

/// Configuration for a client session.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server URL, e.g. `ws://127.0.0.1:9000`.
    pub url: String,
    /// Reconnection policy.
    pub reconnect: ReconnectConfig,
}

impl ClientConfig {
    /// Creates a config for `url` with the default reconnect policy.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            reconnect: ReconnectConfig::default(),
        }
    }

    fn validated(mut self) -> Self {
        self.reconnect = self.reconnect.validated();
        self
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// A connected client session.
///
/// Owns the background pump task. Dropping the client (or calling
/// [`shutdown`](Self::shutdown)) aborts the pump; buffered-but-undelivered
/// messages stay in the dispatcher's queues, and any producer enqueue that
/// races the teardown surfaces as a logged [`RouteError::Disconnected`],
/// never a panic.
pub struct Client<C: FrameCodec = JsonCodec> {
    codec: C,
    outbound_tx: mpsc::UnboundedSender<Vec<u8>>,
    pump: JoinHandle<()>,
}

#[cfg(feature = "websocket")]
impl Client<JsonCodec> {
    /// Connects over WebSocket with the JSON codec.
    ///
    /// # Errors
    /// Returns a transport error if the *initial* connection cannot be
    /// established. Later drops are handled by the reconnect policy
    /// instead of surfacing here.
    pub async fn connect(
        config: ClientConfig,
        router: MessageRouter,
    ) -> Result<Self, FramepumpError> {
        Self::connect_with(WebSocketConnector, JsonCodec, config, router).await
    }
}

impl<C: FrameCodec + Clone> Client<C> {
    /// Connects with an explicit connector and codec.
    pub async fn connect_with<K>(
        connector: K,
        codec: C,
        config: ClientConfig,
        router: MessageRouter,
    ) -> Result<Self, FramepumpError>
    where
        K: Connector<Error = TransportError>,
        K::Connection: Connection<Error = TransportError>,
    {
        let config = config.validated();
        let conn = connector.connect(&config.url).await?;
        tracing::info!(id = %conn.id(), url = %config.url, "client connected");

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let pump = tokio::spawn(run_pump(
            connector,
            codec.clone(),
            config,
            router,
            conn,
            outbound_rx,
        ));

        Ok(Self {
            codec,
            outbound_tx,
            pump,
        })
    }

    /// Queues one typed message for sending.
    ///
    /// Encoding happens here, on the caller's thread; the pump task only
    /// moves bytes. Messages queued while the connection is down are sent
    /// after the next successful reconnect.
    ///
    /// # Errors
    /// [`ProtocolError::Encode`](framepump_protocol::ProtocolError) if the
    /// message cannot be serialized; a transport error if the pump task
    /// has already stopped.
    pub fn send<T: Serialize>(
        &self,
        tag: impl Into<MessageTag>,
        message: &T,
    ) -> Result<(), FramepumpError> {
        let bytes = self.codec.encode_frame(&tag.into(), message)?;
        self.outbound_tx.send(bytes).map_err(|_| {
            FramepumpError::Transport(TransportError::ConnectionClosed(
                "pump task stopped".to_string(),
            ))
        })
    }

    /// Whether the pump task is still alive. `false` after `shutdown`, or
    /// once a non-reconnecting session loses its connection.
    pub fn is_running(&self) -> bool {
        !self.pump.is_finished()
    }

    /// Stops the pump task and drops the session.
    pub fn shutdown(self) {
        // Drop does the actual work.
    }
}

impl<C: FrameCodec> Drop for Client<C> {
    fn drop(&mut self) {
        self.pump.abort();
    }
}

// ---------------------------------------------------------------------------
// Pump task
// ---------------------------------------------------------------------------

/// Runs connections until the session ends: pump one connection, then
/// reconnect (per policy) and pump the next.
async fn run_pump<K, C>(
    connector: K,
    codec: C,
    config: ClientConfig,
    router: MessageRouter,
    mut conn: K::Connection,
    mut outbound_rx: mpsc::UnboundedReceiver<Vec<u8>>,
) where
    K: Connector<Error = TransportError>,
    K::Connection: Connection<Error = TransportError>,
    C: FrameCodec,
{
    loop {
        pump_connection(&codec, &router, &conn, &mut outbound_rx).await;

        if !config.reconnect.enabled {
            tracing::info!("connection ended and reconnect is disabled — pump stopping");
            return;
        }
        conn = reconnect(&connector, &config).await;
    }
}

/// Drives one connection until it closes or fails.
async fn pump_connection<C, N>(
    codec: &C,
    router: &MessageRouter,
    conn: &N,
    outbound_rx: &mut mpsc::UnboundedReceiver<Vec<u8>>,
) where
    C: FrameCodec,
    N: Connection<Error = TransportError>,
{
    loop {
        tokio::select! {
            frame = conn.recv() => match frame {
                Ok(Some(data)) => handle_frame(codec, router, &data),
                Ok(None) => {
                    tracing::info!(id = %conn.id(), "connection closed cleanly");
                    return;
                }
                Err(e) => {
                    tracing::warn!(id = %conn.id(), error = %e, "recv error");
                    return;
                }
            },
            Some(bytes) = outbound_rx.recv() => {
                if let Err(e) = conn.send(&bytes).await {
                    tracing::warn!(
                        id = %conn.id(),
                        error = %e,
                        "send failed — dropping outbound frame"
                    );
                }
            }
        }
    }
}

/// Decodes and routes one inbound frame. Failures are logged, not fatal:
/// the producer path reports errors to *us*, and we are the side that logs.
fn handle_frame<C: FrameCodec>(codec: &C, router: &MessageRouter, data: &[u8]) {
    let envelope = match codec.decode_envelope(data) {
        Ok(envelope) => envelope,
        Err(e) => {
            tracing::debug!(error = %e, "failed to decode frame");
            return;
        }
    };

    if let Err(e) = router.route(envelope) {
        match &e {
            RouteError::UnknownTag { tag } => {
                tracing::debug!(%tag, "no queue registered for message — dropping");
            }
            _ => tracing::warn!(error = %e, "failed to route message"),
        }
    }
}

/// Retries the connection with doubling, jittered backoff until it sticks.
async fn reconnect<K>(connector: &K, config: &ClientConfig) -> K::Connection
where
    K: Connector<Error = TransportError>,
{
    let policy = &config.reconnect;
    let mut delay = policy.initial_delay;

    loop {
        let jitter = Duration::from_millis(rand::rng().random_range(0..=policy.jitter_ms));
        tokio::time::sleep(delay + jitter).await;

        match connector.connect(&config.url).await {
            Ok(conn) => {
                tracing::info!(id = %conn.id(), url = %config.url, "reconnected");
                return conn;
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    retry_in_ms = delay.as_millis() as u64,
                    "reconnect failed"
                );
                delay = (delay * 2).min(policy.max_delay);
            }
        }
    }
}
