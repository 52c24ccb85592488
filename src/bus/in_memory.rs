//! In-memory broker for testing and single-process scenarios.
//!
//! Implements the full [`Transport`] surface - exchanges, bindings, queues
//! with ready/unacked message sets, and reject-without-requeue feeding an
//! inspectable dead-letter buffer - without external dependencies. Useful
//! for:
//! - Unit and integration testing without a running broker
//! - Single-process applications
//! - Development and prototyping

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use super::error::{PublishError, SubscribeError};
use super::message::Message;
use super::topology::{ExchangeConfig, ExchangeKind, TopologyError};
use super::transport::{Consumer, Delivery, Transport};

/// A message rejected without requeue, captured for inspection.
#[derive(Clone, Debug)]
pub struct DeadLetter {
    pub queue: String,
    pub message: Message,
}

struct Binding {
    exchange: String,
    queue: String,
    routing_key: String,
}

#[derive(Default)]
struct QueueState {
    durable: bool,
    ready: VecDeque<(u64, Message)>,
    unacked: HashMap<u64, Message>,
}

struct BrokerState {
    connected: bool,
    exchanges: HashMap<String, ExchangeConfig>,
    bindings: Vec<Binding>,
    queues: HashMap<String, QueueState>,
    next_tag: u64,
    dead_letters: Vec<DeadLetter>,
}

impl Default for BrokerState {
    fn default() -> Self {
        BrokerState {
            connected: true,
            exchanges: HashMap::new(),
            bindings: Vec::new(),
            queues: HashMap::new(),
            next_tag: 0,
            dead_letters: Vec::new(),
        }
    }
}

/// In-memory broker with exchange/queue topology.
///
/// Thread-safe and cheap to clone - clones share the same broker state, so a
/// test can hold one handle for publishing and another for inspection while
/// consumers run on their own threads.
///
/// ## Example
///
/// ```
/// use dispatched_rust::bus::{ExchangeConfig, InMemoryBroker, Message, Transport};
/// use std::time::Duration;
///
/// let broker = InMemoryBroker::new();
/// broker.declare_exchange(&ExchangeConfig::topic("events")).unwrap();
/// broker.declare_queue("orderplaced.audit", true).unwrap();
/// broker.bind_queue("orderplaced.audit", "events", "orderplaced").unwrap();
///
/// broker
///     .publish(
///         "events",
///         "orderplaced",
///         Message::with_string_payload("evt-1", "OrderPlacedEvent", "{}"),
///         Duration::from_millis(100),
///     )
///     .unwrap();
/// assert_eq!(broker.queue_depth("orderplaced.audit"), 1);
/// ```
#[derive(Clone, Default)]
pub struct InMemoryBroker {
    state: Arc<Mutex<BrokerState>>,
}

impl InMemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate losing the broker connection: publishes and polls fail with
    /// `ConnectionFailed` until `reconnect` is called.
    pub fn disconnect(&self) {
        self.state.lock().unwrap().connected = false;
    }

    pub fn reconnect(&self) {
        self.state.lock().unwrap().connected = true;
    }

    /// Messages rejected without requeue, in rejection order.
    pub fn dead_letters(&self) -> Vec<DeadLetter> {
        self.state.lock().unwrap().dead_letters.clone()
    }

    /// Number of ready (undelivered) messages in a queue.
    pub fn queue_depth(&self, queue: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .queues
            .get(queue)
            .map(|q| q.ready.len())
            .unwrap_or(0)
    }

    /// Look up a declared exchange by name.
    pub fn exchange(&self, name: &str) -> Option<ExchangeConfig> {
        self.state.lock().unwrap().exchanges.get(name).cloned()
    }

    /// Whether a queue exists and was declared durable.
    pub fn queue_is_durable(&self, queue: &str) -> Option<bool> {
        self.state
            .lock()
            .unwrap()
            .queues
            .get(queue)
            .map(|q| q.durable)
    }

    /// Whether a (queue, exchange, routing key) binding exists.
    pub fn is_bound(&self, queue: &str, exchange: &str, routing_key: &str) -> bool {
        self.state.lock().unwrap().bindings.iter().any(|b| {
            b.queue == queue && b.exchange == exchange && b.routing_key == routing_key
        })
    }

    /// Drop all broker state (useful for test cleanup).
    pub fn clear(&self) {
        let mut state = self.state.lock().unwrap();
        *state = BrokerState::default();
    }
}

impl Transport for InMemoryBroker {
    type Consumer = InMemoryConsumer;

    fn declare_exchange(&self, config: &ExchangeConfig) -> Result<(), TopologyError> {
        let mut state = self.state.lock().unwrap();
        match state.exchanges.get(&config.name) {
            Some(existing) if existing == config => Ok(()),
            Some(_) => Err(TopologyError::Conflict {
                name: config.name.clone(),
            }),
            None => {
                state.exchanges.insert(config.name.clone(), config.clone());
                Ok(())
            }
        }
    }

    fn declare_queue(&self, queue: &str, durable: bool) -> Result<(), SubscribeError> {
        let mut state = self.state.lock().unwrap();
        state
            .queues
            .entry(queue.to_string())
            .or_insert_with(|| QueueState {
                durable,
                ..QueueState::default()
            });
        Ok(())
    }

    fn bind_queue(
        &self,
        queue: &str,
        exchange: &str,
        routing_key: &str,
    ) -> Result<(), SubscribeError> {
        let mut state = self.state.lock().unwrap();
        if !state.exchanges.contains_key(exchange) {
            return Err(SubscribeError::Topology(TopologyError::UnknownExchange {
                name: exchange.to_string(),
            }));
        }
        if !state.queues.contains_key(queue) {
            return Err(SubscribeError::UnknownQueue(queue.to_string()));
        }
        let exists = state.bindings.iter().any(|b| {
            b.queue == queue && b.exchange == exchange && b.routing_key == routing_key
        });
        if !exists {
            state.bindings.push(Binding {
                exchange: exchange.to_string(),
                queue: queue.to_string(),
                routing_key: routing_key.to_string(),
            });
        }
        Ok(())
    }

    fn unbind_queue(
        &self,
        queue: &str,
        exchange: &str,
        routing_key: &str,
    ) -> Result<(), SubscribeError> {
        let mut state = self.state.lock().unwrap();
        state.bindings.retain(|b| {
            !(b.queue == queue && b.exchange == exchange && b.routing_key == routing_key)
        });
        Ok(())
    }

    fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        message: Message,
        _timeout: Duration,
    ) -> Result<(), PublishError> {
        let mut state = self.state.lock().unwrap();
        if !state.connected {
            return Err(PublishError::ConnectionFailed(
                "broker disconnected".to_string(),
            ));
        }

        let kind = match state.exchanges.get(exchange) {
            Some(config) => config.kind,
            None => {
                return Err(PublishError::Rejected(format!(
                    "unknown exchange: {}",
                    exchange
                )))
            }
        };

        let matched: Vec<String> = state
            .bindings
            .iter()
            .filter(|b| b.exchange == exchange)
            .filter(|b| match kind {
                ExchangeKind::Fanout => true,
                ExchangeKind::Topic | ExchangeKind::Direct => b.routing_key == routing_key,
            })
            .map(|b| b.queue.clone())
            .collect();

        // A publish that matches no binding is accepted and dropped.
        for queue_name in matched {
            state.next_tag += 1;
            let tag = state.next_tag;
            if let Some(queue) = state.queues.get_mut(&queue_name) {
                queue.ready.push_back((tag, message.clone()));
            }
        }
        Ok(())
    }

    fn consume(&self, queue: &str) -> Result<Self::Consumer, SubscribeError> {
        let state = self.state.lock().unwrap();
        if !state.queues.contains_key(queue) {
            return Err(SubscribeError::UnknownQueue(queue.to_string()));
        }
        Ok(InMemoryConsumer {
            state: Arc::clone(&self.state),
            queue: queue.to_string(),
        })
    }
}

/// One consumer's cursor over an in-memory queue.
pub struct InMemoryConsumer {
    state: Arc<Mutex<BrokerState>>,
    queue: String,
}

impl Consumer for InMemoryConsumer {
    fn poll(&mut self, timeout: Duration) -> Result<Option<Delivery>, PublishError> {
        let deadline = Instant::now() + timeout;

        loop {
            {
                let mut state = self.state.lock().unwrap();
                if !state.connected {
                    return Err(PublishError::ConnectionFailed(
                        "broker disconnected".to_string(),
                    ));
                }
                if let Some(queue) = state.queues.get_mut(&self.queue) {
                    if let Some((tag, message)) = queue.ready.pop_front() {
                        queue.unacked.insert(tag, message.clone());
                        return Ok(Some(Delivery { tag, message }));
                    }
                }
            }

            if Instant::now() >= deadline {
                return Ok(None);
            }

            // Small sleep to avoid busy-waiting
            thread::sleep(Duration::from_millis(1));
        }
    }

    fn ack(&mut self, tag: u64) -> Result<(), PublishError> {
        let mut state = self.state.lock().unwrap();
        if let Some(queue) = state.queues.get_mut(&self.queue) {
            queue.unacked.remove(&tag);
        }
        Ok(())
    }

    fn reject(&mut self, tag: u64, requeue: bool) -> Result<(), PublishError> {
        let mut state = self.state.lock().unwrap();
        let taken = state
            .queues
            .get_mut(&self.queue)
            .and_then(|queue| queue.unacked.remove(&tag));

        if let Some(message) = taken {
            if requeue {
                if let Some(queue) = state.queues.get_mut(&self.queue) {
                    queue.ready.push_front((tag, message));
                }
            } else {
                state.dead_letters.push(DeadLetter {
                    queue: self.queue.clone(),
                    message,
                });
            }
        }
        Ok(())
    }
}
