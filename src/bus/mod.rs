//! Event Bus - topic-based publish/subscribe over a broker topology.
//!
//! This module provides the durable messaging half of the crate: events are
//! serialized, published to an exchange under a routing key, and delivered to
//! the queues bound for each subscribed handler type.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     EventBus (per process)                  │
//! │  publish(event)  ──► exchange + routing key via Topology    │
//! │  subscribe(E, H) ──► durable queue + consumer thread        │
//! └─────────────────────────────┬───────────────────────────────┘
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Transport trait                        │
//! │  declare / bind / publish / consume                         │
//! └──────────┬──────────────────────┬───────────────────────────┘
//!            ▼                      ▼
//! ┌──────────────────┐    ┌─────────────────────┐
//! │  InMemoryBroker  │    │  AMQP, Kafka, ...   │
//! │    (included)    │    │     (external)      │
//! └──────────────────┘    └─────────────────────┘
//! ```
//!
//! Each subscription owns a dedicated consumer thread and an independent
//! transport consumer handle; deliveries within one queue arrive in
//! broker-enqueue order, with no ordering across queues. A handled message
//! is acknowledged; a failed one is rejected without requeue, so a poison
//! message lands in dead-letter handling instead of looping forever.

mod codec;
mod consumer;
mod error;
mod event_bus;
mod in_memory;
mod message;
mod topology;
mod transport;

pub use codec::{BitcodeCodec, Codec, CodecError, JsonCodec};
pub use consumer::ConsumerStats;
pub use error::{PublishError, SubscribeError};
pub use event_bus::{EventBus, EventHandler};
pub use in_memory::{DeadLetter, InMemoryBroker, InMemoryConsumer};
pub use message::Message;
pub use topology::{
    default_routing_key, queue_name, ExchangeConfig, ExchangeKind, Topology, TopologyBuilder,
    TopologyError,
};
pub use transport::{Consumer, Delivery, Transport};
