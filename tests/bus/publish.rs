//! Publish paths - fan-out to bound queues, failure surfacing, batches.

use std::time::Duration;

use dispatched_rust::bus::{
    Codec, Consumer, EventBus, InMemoryBroker, JsonCodec, PublishError, Topology, TopologyError,
    Transport,
};
use dispatched_rust::EventMessage;

use crate::support::{shop_bus, OrderPlacedEvent};

// ============================================================================
// Test 1: The wire message carries the event id and a decodable payload
// ============================================================================

#[test]
fn published_message_carries_event_id_and_payload() {
    let broker = InMemoryBroker::new();
    let bus = shop_bus(&broker);

    broker.declare_queue("probe", true).unwrap();
    broker.bind_queue("probe", "shop", "orderplaced").unwrap();

    let event = OrderPlacedEvent::new("o-1", 1250);
    bus.publish(&event).unwrap();

    let mut consumer = broker.consume("probe").unwrap();
    let delivery = consumer.poll(Duration::from_millis(100)).unwrap().unwrap();

    assert_eq!(delivery.message.id, event.event_id().to_string());
    assert_eq!(delivery.message.type_name, "OrderPlacedEvent");

    let decoded: OrderPlacedEvent = JsonCodec.decode(&delivery.message.payload).unwrap();
    assert_eq!(decoded.event_id(), event.event_id());
    assert_eq!(decoded.order_id, "o-1");
    assert_eq!(decoded.total_cents, 1250);
}

// ============================================================================
// Test 2: One publish lands once in every bound queue
// ============================================================================

#[test]
fn publish_fans_out_to_each_bound_queue() {
    let broker = InMemoryBroker::new();
    let bus = shop_bus(&broker);

    for queue in ["audit", "billing"] {
        broker.declare_queue(queue, true).unwrap();
        broker.bind_queue(queue, "shop", "orderplaced").unwrap();
    }

    bus.publish(&OrderPlacedEvent::new("o-1", 100)).unwrap();

    assert_eq!(broker.queue_depth("audit"), 1);
    assert_eq!(broker.queue_depth("billing"), 1);
}

// ============================================================================
// Test 3: A broker-unreachable condition surfaces as a publish failure
// ============================================================================

#[test]
fn disconnected_broker_fails_publish() {
    let broker = InMemoryBroker::new();
    let bus = shop_bus(&broker);

    broker.disconnect();
    let err = bus.publish(&OrderPlacedEvent::new("o-1", 100)).unwrap_err();
    assert!(matches!(err, PublishError::ConnectionFailed(_)));

    // No automatic retry happened behind the caller's back.
    broker.reconnect();
    broker.declare_queue("probe", true).unwrap();
    broker.bind_queue("probe", "shop", "orderplaced").unwrap();
    assert_eq!(broker.queue_depth("probe"), 0);
}

// ============================================================================
// Test 4: Publishing with no exchange configured fails resolution
// ============================================================================

#[test]
fn publish_without_exchange_fails() {
    let broker = InMemoryBroker::new();
    let bus = EventBus::connect(broker, Topology::builder().build()).unwrap();

    let err = bus.publish(&OrderPlacedEvent::new("o-1", 100)).unwrap_err();
    assert!(matches!(
        err,
        PublishError::Topology(TopologyError::NoExchangeConfigured { .. })
    ));
}

// ============================================================================
// Test 5: Batch publish stops at the first failure
// ============================================================================

#[test]
fn publish_batch_delivers_all() {
    let broker = InMemoryBroker::new();
    let bus = shop_bus(&broker);

    broker.declare_queue("probe", true).unwrap();
    broker.bind_queue("probe", "shop", "orderplaced").unwrap();

    let events = vec![
        OrderPlacedEvent::new("o-1", 100),
        OrderPlacedEvent::new("o-2", 200),
        OrderPlacedEvent::new("o-3", 300),
    ];
    bus.publish_batch(&events).unwrap();
    assert_eq!(broker.queue_depth("probe"), 3);
}
