//! Frame codec trait and the JSON implementation.
//!
//! A codec owns the boundary between raw frame bytes and [`Envelope`]s.
//! The rest of the stack never parses transport bytes itself — it asks
//! whatever implements [`FrameCodec`]. Swapping the wire format (say, a
//! binary codec for production) touches nothing outside this module.

use serde::Serialize;

use crate::{Envelope, MessageTag, ProtocolError};

/// Converts between frame bytes and envelopes.
///
/// `Send + Sync + 'static` because the codec is shared with the background
/// receive task and must not borrow temporary data.
pub trait FrameCodec: Send + Sync + 'static {
    /// Parses one raw frame into a tagged envelope.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Decode`] for malformed bytes and
    /// [`ProtocolError::InvalidFrame`] for frames that parse but violate
    /// protocol rules (empty tag).
    fn decode_envelope(&self, data: &[u8]) -> Result<Envelope, ProtocolError>;

    /// Serializes an outbound message into one frame.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Encode`] if the value cannot be represented
    /// in this format.
    fn encode_frame<T: Serialize>(
        &self,
        tag: &MessageTag,
        value: &T,
    ) -> Result<Vec<u8>, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`FrameCodec`] speaking `{"type": ..., "data": ...}` JSON frames.
///
/// Human-readable, trivially inspected in browser DevTools or logs —
/// the right default while the protocol is still moving.
///
/// ## Example
///
/// ```rust
/// use framepump_protocol::{FrameCodec, JsonCodec, MessageTag};
///
/// let codec = JsonCodec;
/// let bytes = codec
///     .encode_frame(&MessageTag::new("Ping"), &serde_json::json!({ "n": 1 }))
///     .unwrap();
/// let envelope = codec.decode_envelope(&bytes).unwrap();
/// assert_eq!(envelope.tag.as_str(), "Ping");
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl FrameCodec for JsonCodec {
    fn decode_envelope(&self, data: &[u8]) -> Result<Envelope, ProtocolError> {
        let envelope: Envelope =
            serde_json::from_slice(data).map_err(ProtocolError::Decode)?;
        if envelope.tag.as_str().is_empty() {
            return Err(ProtocolError::InvalidFrame(
                "empty message tag".to_string(),
            ));
        }
        Ok(envelope)
    }

    fn encode_frame<T: Serialize>(
        &self,
        tag: &MessageTag,
        value: &T,
    ) -> Result<Vec<u8>, ProtocolError> {
        let payload = serde_json::to_value(value).map_err(ProtocolError::Encode)?;
        let envelope = Envelope {
            tag: tag.clone(),
            payload,
        };
        serde_json::to_vec(&envelope).map_err(ProtocolError::Encode)
    }
}
