//! Event bus - typed publish/subscribe over a broker transport.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::event::EventMessage;
use crate::BoxError;

use super::codec::{Codec, JsonCodec};
use super::consumer::{ConsumerStats, ConsumerThread};
use super::error::{PublishError, SubscribeError};
use super::message::Message;
use super::topology::{Topology, TopologyError};
use super::transport::Transport;

/// Handler for one event type.
///
/// A fresh handler instance is built per delivery (via the factory given to
/// `subscribe`), so no state leaks between messages. `NAME` is part of the
/// durable queue name and must stay stable across restarts.
pub trait EventHandler<E>: Send + Sync + 'static {
    const NAME: &'static str;

    fn handle(&self, event: E) -> Result<(), BoxError>;
}

struct Subscription {
    queue: String,
    exchange: String,
    routing_key: String,
    thread: ConsumerThread,
}

/// Publishes serialized events to the resolved exchange/routing key and runs
/// one consumer thread per subscription.
///
/// Publishing is fire-and-forget: it waits (at most) for the broker to accept
/// the message, never for a consumer. Consumers run decoupled from all
/// publishers, each on its own thread with its own transport consumer handle.
///
/// ## Example
///
/// ```ignore
/// let topology = Topology::builder()
///     .exchange(ExchangeConfig::topic("shop"))?
///     .build();
/// let bus = EventBus::connect(InMemoryBroker::new(), topology)?;
///
/// bus.subscribe::<OrderPlacedEvent, _, _>(|| ReserveStock::default())?;
/// bus.publish(&OrderPlacedEvent::new("o-1"))?;
/// ```
pub struct EventBus<T: Transport, C: Codec = JsonCodec> {
    transport: T,
    topology: Topology,
    codec: Arc<C>,
    publish_timeout: Duration,
    poll_interval: Duration,
    subscriptions: Mutex<HashMap<(String, String), Subscription>>,
}

impl<T: Transport, C: Codec> std::fmt::Debug for EventBus<T, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus").finish_non_exhaustive()
    }
}

impl<T: Transport> EventBus<T, JsonCodec> {
    /// Create a bus over an established transport, declaring every exchange
    /// in the topology on the broker.
    pub fn connect(transport: T, topology: Topology) -> Result<Self, TopologyError> {
        for config in topology.exchanges() {
            transport.declare_exchange(config)?;
        }
        Ok(EventBus {
            transport,
            topology,
            codec: Arc::new(JsonCodec),
            publish_timeout: Duration::from_secs(5),
            poll_interval: Duration::from_millis(10),
            subscriptions: Mutex::new(HashMap::new()),
        })
    }
}

impl<T: Transport, C: Codec> EventBus<T, C> {
    /// Replace the payload codec. Do this before subscribing - existing
    /// consumers keep the codec they were started with.
    pub fn with_codec<C2: Codec>(self, codec: C2) -> EventBus<T, C2> {
        EventBus {
            transport: self.transport,
            topology: self.topology,
            codec: Arc::new(codec),
            publish_timeout: self.publish_timeout,
            poll_interval: self.poll_interval,
            subscriptions: self.subscriptions,
        }
    }

    /// Bound the wait for broker acceptance of a publish.
    pub fn with_publish_timeout(mut self, timeout: Duration) -> Self {
        self.publish_timeout = timeout;
        self
    }

    /// Set how long each consumer poll waits before re-checking for stop.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// Serialize an event and publish it to the resolved exchange under the
    /// resolved routing key.
    ///
    /// Fire-and-forget: returns once the broker accepts the message (bounded
    /// by the publish timeout). A broker-unreachable condition surfaces as an
    /// error; the bus performs no automatic retry - retry policy belongs to
    /// the caller.
    pub fn publish<E>(&self, event: &E) -> Result<(), PublishError>
    where
        E: EventMessage + Serialize,
    {
        let exchange = self.topology.exchange_for(E::TYPE_NAME)?;
        let routing_key = self.topology.routing_key(E::TYPE_NAME);
        let payload = self.codec.encode(event)?;
        let message = Message::new(event.event_id().to_string(), E::TYPE_NAME, payload);
        self.transport
            .publish(&exchange, &routing_key, message, self.publish_timeout)
    }

    /// Publish a batch of events of one type, stopping at the first failure.
    pub fn publish_batch<E>(&self, events: &[E]) -> Result<(), PublishError>
    where
        E: EventMessage + Serialize,
    {
        for event in events {
            self.publish(event)?;
        }
        Ok(())
    }

    /// Register a handler type for an event type and start its consumer.
    ///
    /// Declares the durable queue named for the (event, handler) pair, binds
    /// it to the resolved exchange under the resolved routing key, and spawns
    /// the consumer thread. Each delivery is decoded and dispatched to a
    /// fresh handler from `factory`; success acknowledges the message, any
    /// failure (decode or handler) rejects it without requeue.
    pub fn subscribe<E, H, F>(&self, factory: F) -> Result<(), SubscribeError>
    where
        E: EventMessage + DeserializeOwned,
        H: EventHandler<E>,
        F: Fn() -> H + Send + 'static,
    {
        let exchange = self.topology.exchange_for(E::TYPE_NAME)?;
        let routing_key = self.topology.routing_key(E::TYPE_NAME);
        let queue = self.topology.queue_name(E::TYPE_NAME, H::NAME);
        let key = (E::TYPE_NAME.to_string(), H::NAME.to_string());

        let mut subscriptions = self
            .subscriptions
            .lock()
            .map_err(|_| SubscribeError::RegistryPoisoned)?;
        if subscriptions.contains_key(&key) {
            return Err(SubscribeError::AlreadySubscribed { queue });
        }

        self.transport.declare_queue(&queue, true)?;
        self.transport.bind_queue(&queue, &exchange, &routing_key)?;
        let consumer = self.transport.consume(&queue)?;

        let codec = Arc::clone(&self.codec);
        let thread = ConsumerThread::spawn(consumer, self.poll_interval, move |message| {
            let event: E = codec
                .decode(&message.payload)
                .map_err(|err| Box::new(err) as BoxError)?;
            factory().handle(event)
        });

        subscriptions.insert(
            key,
            Subscription {
                queue,
                exchange,
                routing_key,
                thread,
            },
        );
        Ok(())
    }

    /// Stop the consumer for an (event, handler) pair and remove its binding.
    ///
    /// The consumer thread is joined before the binding is removed; returns
    /// its final statistics.
    pub fn unsubscribe<E, H>(&self) -> Result<ConsumerStats, SubscribeError>
    where
        E: EventMessage,
        H: EventHandler<E>,
    {
        let key = (E::TYPE_NAME.to_string(), H::NAME.to_string());
        let subscription = {
            let mut subscriptions = self
                .subscriptions
                .lock()
                .map_err(|_| SubscribeError::RegistryPoisoned)?;
            subscriptions
                .remove(&key)
                .ok_or_else(|| SubscribeError::NotSubscribed {
                    queue: self.topology.queue_name(E::TYPE_NAME, H::NAME),
                })?
        };

        let stats = subscription.thread.stop();
        self.transport.unbind_queue(
            &subscription.queue,
            &subscription.exchange,
            &subscription.routing_key,
        )?;
        Ok(stats)
    }

    /// Names of the handler types currently subscribed to an event type.
    pub fn handlers_for(&self, event_type_name: &str) -> Vec<String> {
        match self.subscriptions.lock() {
            Ok(subscriptions) => subscriptions
                .keys()
                .filter(|(event, _)| event == event_type_name)
                .map(|(_, handler)| handler.clone())
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    pub fn active_subscriptions(&self) -> usize {
        self.subscriptions
            .lock()
            .map(|subscriptions| subscriptions.len())
            .unwrap_or(0)
    }

    /// Stop every consumer, keeping queues and bindings in place so durable
    /// queues resume on the next process generation. Returns per-queue stats.
    pub fn shutdown(&self) -> Vec<(String, ConsumerStats)> {
        let drained: Vec<(String, Subscription)> = match self.subscriptions.lock() {
            Ok(mut subscriptions) => subscriptions
                .drain()
                .map(|((_, _), subscription)| (subscription.queue.clone(), subscription))
                .collect(),
            Err(_) => Vec::new(),
        };

        for (_, subscription) in &drained {
            subscription.thread.signal_stop();
        }

        drained
            .into_iter()
            .map(|(queue, subscription)| (queue, subscription.thread.stop()))
            .collect()
    }
}
