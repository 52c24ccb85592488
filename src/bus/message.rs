//! Wire envelope carried across the broker.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// A serialized message on its way through an exchange.
///
/// The payload is opaque bytes produced by a [`Codec`](super::Codec) (or the
/// built-in bitcode helpers below); `type_name` identifies the event or
/// request type for routing and dispatch. When the envelope itself is
/// JSON-serialized the payload travels base64-encoded.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Unique identifier for this message (the event id, for events).
    pub id: String,
    /// Message type (e.g., "OrderPlacedEvent").
    pub type_name: String,
    /// Serialized payload.
    #[serde(with = "payload_serde")]
    pub payload: Vec<u8>,
    /// Optional metadata (headers, correlation IDs, etc.)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Vec<(String, String)>>,
}

mod payload_serde {
    use base64::{engine::general_purpose::STANDARD, Engine};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(payload: &Vec<u8>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        STANDARD.encode(payload).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s: String = String::deserialize(deserializer)?;
        STANDARD.decode(&s).map_err(serde::de::Error::custom)
    }
}

impl Message {
    /// Create a message with an already-serialized payload.
    pub fn new(id: impl Into<String>, type_name: impl Into<String>, payload: Vec<u8>) -> Self {
        Message {
            id: id.into(),
            type_name: type_name.into(),
            payload,
            metadata: None,
        }
    }

    /// Create a message with a bitcode-serialized payload.
    pub fn encode<T: Serialize>(
        id: impl Into<String>,
        type_name: impl Into<String>,
        payload: &T,
    ) -> Result<Self, bitcode::Error> {
        let bytes = bitcode::serialize(payload)?;
        Ok(Self::new(id, type_name, bytes))
    }

    /// Decode the payload from bitcode binary format.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, bitcode::Error> {
        bitcode::deserialize(&self.payload)
    }

    /// Create a message with a string payload.
    pub fn with_string_payload(
        id: impl Into<String>,
        type_name: impl Into<String>,
        payload: impl Into<String>,
    ) -> Self {
        Self::new(id, type_name, payload.into().into_bytes())
    }

    /// Add a metadata entry to the message.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata
            .get_or_insert_with(Vec::new)
            .push((key.into(), value.into()));
        self
    }

    /// Look up a metadata value by key.
    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata
            .as_ref()?
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Get the payload as a string (if valid UTF-8).
    pub fn payload_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.payload).ok()
    }
}
