//! Error types for publish and subscription operations.

use std::error::Error;
use std::fmt;

use super::codec::CodecError;
use super::topology::TopologyError;

/// Error type for publish and consume operations.
#[derive(Debug)]
pub enum PublishError {
    /// Exchange or routing resolution failed.
    Topology(TopologyError),
    /// Serialization of the event failed.
    SerializationFailed(String),
    /// Connection to the broker failed.
    ConnectionFailed(String),
    /// The broker rejected the message.
    Rejected(String),
    /// Timeout waiting for broker acknowledgment.
    Timeout,
    /// Other error.
    Other(Box<dyn Error + Send + Sync>),
}

impl fmt::Display for PublishError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PublishError::Topology(e) => write!(f, "topology error: {}", e),
            PublishError::SerializationFailed(msg) => write!(f, "serialization failed: {}", msg),
            PublishError::ConnectionFailed(msg) => write!(f, "connection failed: {}", msg),
            PublishError::Rejected(msg) => write!(f, "message rejected: {}", msg),
            PublishError::Timeout => write!(f, "publish timeout"),
            PublishError::Other(e) => write!(f, "publish error: {}", e),
        }
    }
}

impl Error for PublishError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            PublishError::Topology(e) => Some(e),
            PublishError::Other(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

impl From<TopologyError> for PublishError {
    fn from(err: TopologyError) -> Self {
        PublishError::Topology(err)
    }
}

impl From<CodecError> for PublishError {
    fn from(err: CodecError) -> Self {
        PublishError::SerializationFailed(err.message)
    }
}

/// Error type for subscribe and unsubscribe operations.
#[derive(Debug)]
pub enum SubscribeError {
    /// Exchange or routing resolution failed.
    Topology(TopologyError),
    /// A consumer is already registered for this (event, handler) pair.
    AlreadySubscribed { queue: String },
    /// No consumer is registered for this (event, handler) pair.
    NotSubscribed { queue: String },
    /// An operation referenced a queue that was never declared.
    UnknownQueue(String),
    /// Connection to the broker failed.
    ConnectionFailed(String),
    /// The subscription registry lock was poisoned.
    RegistryPoisoned,
}

impl fmt::Display for SubscribeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubscribeError::Topology(e) => write!(f, "topology error: {}", e),
            SubscribeError::AlreadySubscribed { queue } => {
                write!(f, "already subscribed on queue: {}", queue)
            }
            SubscribeError::NotSubscribed { queue } => {
                write!(f, "not subscribed on queue: {}", queue)
            }
            SubscribeError::UnknownQueue(name) => write!(f, "unknown queue: {}", name),
            SubscribeError::ConnectionFailed(msg) => write!(f, "connection failed: {}", msg),
            SubscribeError::RegistryPoisoned => {
                write!(f, "subscription registry lock poisoned")
            }
        }
    }
}

impl Error for SubscribeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            SubscribeError::Topology(e) => Some(e),
            _ => None,
        }
    }
}

impl From<TopologyError> for SubscribeError {
    fn from(err: TopologyError) -> Self {
        SubscribeError::Topology(err)
    }
}
