//! Error types for the protocol layer.

/// Errors that can occur while encoding or decoding frames.
///
/// All of these are per-frame and non-fatal: a malformed frame is reported
/// to whoever fed it to the codec and the connection carries on.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Frame bytes could not be parsed into an envelope.
    ///
    /// Common causes: truncated frames, malformed JSON, a missing or
    /// non-string `type` field.
    #[error("decode failed: {0}")]
    Decode(#[source] serde_json::Error),

    /// An outbound message could not be serialized into a frame.
    #[error("encode failed: {0}")]
    Encode(#[source] serde_json::Error),

    /// The frame parsed but is invalid at the protocol level — e.g. an
    /// empty message tag, which no queue could ever be registered for.
    #[error("invalid frame: {0}")]
    InvalidFrame(String),
}
