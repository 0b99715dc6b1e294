//! Core protocol types: message tags and envelopes.
//!
//! An incoming frame decodes into an [`Envelope`] — a [`MessageTag`] naming
//! the concrete schema, plus the payload as a generic JSON value. Nothing at
//! this layer knows the concrete message types; turning the payload into a
//! typed value is the dispatch layer's job, one queue per tag.

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// MessageTag
// ---------------------------------------------------------------------------

/// The identifier naming a message's concrete schema, used for routing.
///
/// Tags are stable for the lifetime of a connection: `"ChatMessage"` names
/// the same schema from handshake to disconnect. The newtype keeps tag
/// strings from being confused with other strings in routing signatures.
///
/// `#[serde(transparent)]` makes the tag serialize as a plain JSON string,
/// which is exactly how it appears in the wire format's `"type"` field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageTag(String);

impl MessageTag {
    /// Creates a tag from any string-like value.
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    /// The tag as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lets `HashMap<MessageTag, _>` be queried with a plain `&str`, so the
/// routing hot path never allocates a tag just to do a lookup.
impl Borrow<str> for MessageTag {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for MessageTag {
    fn from(tag: &str) -> Self {
        Self(tag.to_string())
    }
}

impl From<String> for MessageTag {
    fn from(tag: String) -> Self {
        Self(tag)
    }
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// A decoded frame: a tag plus its not-yet-typed payload.
///
/// The payload is a parsed JSON document, immutable once created. The
/// envelope is what the decoder hands to the router; the queue registered
/// for `tag` owns the conversion into the concrete message type.
///
/// On the wire an envelope is:
///
/// ```json
/// { "type": "ChatMessage", "data": { "from": "ada", "text": "hi" } }
/// ```
///
/// A frame with no `data` field decodes with a `Null` payload, which lets
/// payload-less messages (e.g. a bare notification) stay one-line JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Which message schema the payload claims to be.
    #[serde(rename = "type")]
    pub tag: MessageTag,

    /// The generic payload. `serde(default)` → missing `data` becomes `Null`.
    #[serde(rename = "data", default)]
    pub payload: serde_json::Value,
}

impl Envelope {
    /// Creates an envelope from a tag and an already-parsed payload.
    pub fn new(tag: impl Into<MessageTag>, payload: serde_json::Value) -> Self {
        Self {
            tag: tag.into(),
            payload,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_tag_serializes_as_plain_string() {
        let json = serde_json::to_string(&MessageTag::new("ChatMessage")).unwrap();
        assert_eq!(json, "\"ChatMessage\"");
    }

    #[test]
    fn test_message_tag_display_is_bare_name() {
        assert_eq!(MessageTag::new("PlayerJoined").to_string(), "PlayerJoined");
    }

    #[test]
    fn test_message_tag_map_lookup_by_str() {
        // Borrow<str> lets the router index its tag map with a &str.
        use std::collections::HashMap;
        let mut map = HashMap::new();
        map.insert(MessageTag::new("ChatMessage"), 1);
        assert_eq!(map.get("ChatMessage"), Some(&1));
        assert_eq!(map.get("Unknown"), None);
    }

    #[test]
    fn test_envelope_wire_shape() {
        let envelope = Envelope::new("ChatMessage", serde_json::json!({ "text": "hi" }));
        let json: serde_json::Value = serde_json::to_value(&envelope).unwrap();

        assert_eq!(json["type"], "ChatMessage");
        assert_eq!(json["data"]["text"], "hi");
    }

    #[test]
    fn test_envelope_missing_data_defaults_to_null() {
        let envelope: Envelope = serde_json::from_str(r#"{ "type": "Ping" }"#).unwrap();
        assert_eq!(envelope.tag.as_str(), "Ping");
        assert!(envelope.payload.is_null());
    }

    #[test]
    fn test_envelope_round_trip() {
        let envelope = Envelope::new("Spawn", serde_json::json!({ "x": 1, "y": 2 }));
        let bytes = serde_json::to_vec(&envelope).unwrap();
        let decoded: Envelope = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(envelope, decoded);
    }
}
