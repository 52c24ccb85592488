//! Broker boundary - the connection/session surface the bus depends on.
//!
//! The bus never talks to a broker directly; it drives an injected
//! [`Transport`] whose connection lifecycle (credentials, retry-on-connect)
//! is owned by the hosting application. [`InMemoryBroker`](super::InMemoryBroker)
//! is the included implementation; AMQP-style brokers live in external crates.

use std::time::Duration;

use super::error::{PublishError, SubscribeError};
use super::message::Message;
use super::topology::{ExchangeConfig, TopologyError};

/// A message handed to a consumer, tagged for ack/reject.
#[derive(Clone, Debug, PartialEq)]
pub struct Delivery {
    pub tag: u64,
    pub message: Message,
}

/// Broker operations used by the event bus.
pub trait Transport: Send + Sync + 'static {
    type Consumer: Consumer;

    /// Declare an exchange. Identical redeclaration is a no-op; conflicting
    /// parameters fail with `TopologyError::Conflict`.
    fn declare_exchange(&self, config: &ExchangeConfig) -> Result<(), TopologyError>;

    /// Declare a queue. Redeclaration of an existing queue is a no-op.
    fn declare_queue(&self, queue: &str, durable: bool) -> Result<(), SubscribeError>;

    /// Bind a queue to an exchange under a routing key. Duplicate bindings
    /// collapse to one.
    fn bind_queue(&self, queue: &str, exchange: &str, routing_key: &str)
        -> Result<(), SubscribeError>;

    /// Remove a queue binding. Removing an absent binding is a no-op.
    fn unbind_queue(
        &self,
        queue: &str,
        exchange: &str,
        routing_key: &str,
    ) -> Result<(), SubscribeError>;

    /// Publish a message to an exchange under a routing key.
    ///
    /// Must be safe under concurrent calls from multiple threads;
    /// implementations whose underlying session is not thread-safe serialize
    /// access internally. `timeout` bounds the wait for broker acceptance;
    /// an unresponsive broker surfaces `PublishError::Timeout` rather than
    /// blocking the caller indefinitely.
    fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        message: Message,
        timeout: Duration,
    ) -> Result<(), PublishError>;

    /// Start consuming from a queue.
    ///
    /// Every call returns an independent consumer handle with its own
    /// delivery cursor - one channel per consumer, never shared.
    fn consume(&self, queue: &str) -> Result<Self::Consumer, SubscribeError>;
}

/// A single consumer's view of one queue.
///
/// Deliveries arrive in broker-enqueue order. Each delivery must be either
/// acknowledged (removed from the queue) or rejected; rejecting without
/// requeue drops the message to the broker's dead-letter handling.
pub trait Consumer: Send + 'static {
    /// Wait up to `timeout` for the next delivery.
    fn poll(&mut self, timeout: Duration) -> Result<Option<Delivery>, PublishError>;

    /// Acknowledge a delivery, removing it from the queue.
    fn ack(&mut self, tag: u64) -> Result<(), PublishError>;

    /// Reject a delivery. With `requeue` the message returns to the front of
    /// the queue; without, it is dropped or dead-lettered.
    fn reject(&mut self, tag: u64, requeue: bool) -> Result<(), PublishError>;
}
