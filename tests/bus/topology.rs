//! Topology declaration and routing resolution against the broker.

use std::time::Duration;

use dispatched_rust::bus::{
    EventBus, ExchangeConfig, InMemoryBroker, Topology, TopologyError, Transport,
};

use crate::support::{shop_bus, OrderPlacedEvent};

// ============================================================================
// Test 1: Connecting declares the configured exchanges on the broker
// ============================================================================

#[test]
fn connect_declares_exchanges() {
    let broker = InMemoryBroker::new();
    let _bus = shop_bus(&broker);

    let exchange = broker.exchange("shop").unwrap();
    assert!(exchange.durable);
    assert!(!exchange.auto_delete);
}

// ============================================================================
// Test 2: Identical redeclaration across connects is a no-op
// ============================================================================

#[test]
fn identical_redeclaration_is_idempotent() {
    let broker = InMemoryBroker::new();
    let _first = shop_bus(&broker);
    let _second = shop_bus(&broker);

    assert!(broker.exchange("shop").is_some());
}

// ============================================================================
// Test 3: Conflicting redeclaration fails the connect
// ============================================================================

#[test]
fn conflicting_redeclaration_fails() {
    let broker = InMemoryBroker::new();
    let _first = shop_bus(&broker);

    let conflicting = Topology::builder()
        .exchange(ExchangeConfig::topic("shop").with_durable(false))
        .unwrap()
        .build();
    let err = EventBus::connect(broker.clone(), conflicting).unwrap_err();
    assert_eq!(
        err,
        TopologyError::Conflict {
            name: "shop".into()
        }
    );
}

// ============================================================================
// Test 4: Default routing - single exchange, Event suffix stripped
// ============================================================================

#[test]
fn default_routing_resolves_single_exchange_and_stripped_key() {
    let broker = InMemoryBroker::new();
    let bus = shop_bus(&broker);

    // Bind a probe queue at the conventional routing key.
    broker.declare_queue("probe", true).unwrap();
    broker.bind_queue("probe", "shop", "orderplaced").unwrap();

    bus.publish(&OrderPlacedEvent::new("o-1", 100)).unwrap();
    assert_eq!(broker.queue_depth("probe"), 1);
}

// ============================================================================
// Test 5: A routing-key resolver overrides the convention
// ============================================================================

#[test]
fn routing_key_resolver_overrides_default() {
    let broker = InMemoryBroker::new();
    let topology = Topology::builder()
        .exchange(ExchangeConfig::topic("shop"))
        .unwrap()
        .with_routing_key_resolver(|type_name| format!("v2.{}", type_name.to_lowercase()))
        .build();
    let bus = EventBus::connect(broker.clone(), topology).unwrap();

    broker.declare_queue("probe", true).unwrap();
    broker
        .bind_queue("probe", "shop", "v2.orderplacedevent")
        .unwrap();

    bus.publish(&OrderPlacedEvent::new("o-1", 100)).unwrap();
    assert_eq!(broker.queue_depth("probe"), 1);

    // Nothing landed under the conventional key.
    broker.declare_queue("conventional", true).unwrap();
    broker
        .bind_queue("conventional", "shop", "orderplaced")
        .unwrap();
    bus.publish(&OrderPlacedEvent::new("o-2", 100)).unwrap();
    assert_eq!(broker.queue_depth("conventional"), 0);
    assert_eq!(broker.queue_depth("probe"), 2);
}

// ============================================================================
// Test 6: A publish that matches no binding is accepted and dropped
// ============================================================================

#[test]
fn unroutable_publish_is_accepted_and_dropped() {
    let broker = InMemoryBroker::new();
    let bus = shop_bus(&broker).with_publish_timeout(Duration::from_millis(50));

    bus.publish(&OrderPlacedEvent::new("o-1", 100)).unwrap();
    assert!(broker.dead_letters().is_empty());
}
