//! Serialization boundary - injected encoder/decoder pair for event payloads.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::Serialize;

/// Error when encoding or decoding an event payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CodecError {
    pub message: String,
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "codec error: {}", self.message)
    }
}

impl std::error::Error for CodecError {}

/// Encoder/decoder pair used by the event bus.
///
/// Events cross the process boundary as bytes; the bus depends on an injected
/// codec rather than hard-coding an encoding. The encoding must be stable
/// across restarts so consumers can decode messages published by earlier
/// process generations.
pub trait Codec: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, CodecError>;

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, CodecError>;
}

/// JSON codec (serde_json).
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn name(&self) -> &'static str {
        "json"
    }

    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, CodecError> {
        serde_json::to_vec(value).map_err(|e| CodecError {
            message: e.to_string(),
        })
    }

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, CodecError> {
        serde_json::from_slice(bytes).map_err(|e| CodecError {
            message: e.to_string(),
        })
    }
}

/// Compact binary codec (bitcode).
#[derive(Clone, Copy, Debug, Default)]
pub struct BitcodeCodec;

impl Codec for BitcodeCodec {
    fn name(&self) -> &'static str {
        "bitcode"
    }

    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, CodecError> {
        bitcode::serialize(value).map_err(|e| CodecError {
            message: e.to_string(),
        })
    }

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, CodecError> {
        bitcode::deserialize(bytes).map_err(|e| CodecError {
            message: e.to_string(),
        })
    }
}
