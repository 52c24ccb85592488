//! Background consumers - delivery, failure isolation, unsubscribe, shutdown.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use dispatched_rust::bus::{InMemoryBroker, SubscribeError, Transport};
use dispatched_rust::EventMessage;

use crate::support::{
    new_seen, seen_ids, shop_bus, NotifyWarehouse, OrderPlacedEvent, RecordOrder,
    RejectUnluckyTotals,
};

fn settle() {
    thread::sleep(Duration::from_millis(300));
}

// ============================================================================
// Test 1: One publish is delivered exactly once to each subscribed handler
// ============================================================================

#[test]
fn round_trip_delivers_to_each_handler_type() {
    let broker = InMemoryBroker::new();
    let bus = shop_bus(&broker);

    let orders = new_seen();
    let warehouse = new_seen();
    {
        let orders = orders.clone();
        bus.subscribe(move || RecordOrder::new(orders.clone())).unwrap();
    }
    {
        let warehouse = warehouse.clone();
        bus.subscribe(move || NotifyWarehouse::new(warehouse.clone()))
            .unwrap();
    }

    let handlers = bus.handlers_for("OrderPlacedEvent");
    assert_eq!(handlers.len(), 2);
    assert!(handlers.iter().any(|name| name == "RecordOrder"));
    assert!(handlers.iter().any(|name| name == "NotifyWarehouse"));

    let event = OrderPlacedEvent::new("o-1", 100);
    bus.publish(&event).unwrap();
    settle();

    let expected = vec![event.event_id().to_string()];
    assert_eq!(seen_ids(&orders), expected);
    assert_eq!(seen_ids(&warehouse), expected);
}

// ============================================================================
// Test 2: A poison message is rejected without requeue; the loop continues
// ============================================================================

#[test]
fn poison_message_is_isolated() {
    let broker = InMemoryBroker::new();
    let bus = shop_bus(&broker);

    let seen = new_seen();
    {
        let seen = seen.clone();
        bus.subscribe(move || RejectUnluckyTotals::new(seen.clone()))
            .unwrap();
    }

    let poison = OrderPlacedEvent::new("o-poison", 13);
    let healthy = OrderPlacedEvent::new("o-healthy", 100);
    bus.publish(&poison).unwrap();
    bus.publish(&healthy).unwrap();
    settle();

    // Only the healthy message was handled; the poison one went to the
    // dead-letter buffer and was never redelivered.
    assert_eq!(seen_ids(&seen), vec![healthy.event_id().to_string()]);
    let dead = broker.dead_letters();
    assert_eq!(dead.len(), 1);
    assert_eq!(dead[0].message.id, poison.event_id().to_string());
    assert_eq!(
        broker.queue_depth("orderplaced.rejectunluckytotals"),
        0
    );

    let stats = bus
        .unsubscribe::<OrderPlacedEvent, RejectUnluckyTotals>()
        .unwrap();
    assert_eq!(stats.handled, 1);
    assert_eq!(stats.rejected, 1);
}

// ============================================================================
// Test 3: A fresh handler instance is built per delivery
// ============================================================================

#[test]
fn fresh_handler_per_delivery() {
    let broker = InMemoryBroker::new();
    let bus = shop_bus(&broker);

    let seen = new_seen();
    let built = Arc::new(AtomicUsize::new(0));
    {
        let seen = seen.clone();
        let built = built.clone();
        bus.subscribe(move || {
            built.fetch_add(1, Ordering::SeqCst);
            RecordOrder::new(seen.clone())
        })
        .unwrap();
    }

    bus.publish(&OrderPlacedEvent::new("o-1", 100)).unwrap();
    bus.publish(&OrderPlacedEvent::new("o-2", 200)).unwrap();
    settle();

    assert_eq!(seen_ids(&seen).len(), 2);
    assert_eq!(built.load(Ordering::SeqCst), 2);
}

// ============================================================================
// Test 4: An undecodable payload is rejected, not retried
// ============================================================================

#[test]
fn undecodable_payload_is_rejected() {
    let broker = InMemoryBroker::new();
    let bus = shop_bus(&broker);

    let seen = new_seen();
    {
        let seen = seen.clone();
        bus.subscribe(move || RecordOrder::new(seen.clone())).unwrap();
    }

    // Inject garbage straight through the transport.
    broker
        .publish(
            "shop",
            "orderplaced",
            dispatched_rust::bus::Message::with_string_payload(
                "evt-garbage",
                "OrderPlacedEvent",
                "not json",
            ),
            Duration::from_millis(100),
        )
        .unwrap();
    bus.publish(&OrderPlacedEvent::new("o-1", 100)).unwrap();
    settle();

    assert_eq!(seen_ids(&seen).len(), 1);
    let dead = broker.dead_letters();
    assert_eq!(dead.len(), 1);
    assert_eq!(dead[0].message.id, "evt-garbage");
}

// ============================================================================
// Test 5: Deliveries within one queue arrive in enqueue order
// ============================================================================

#[test]
fn per_queue_ordering_is_preserved() {
    let broker = InMemoryBroker::new();
    let bus = shop_bus(&broker);

    let seen = new_seen();
    {
        let seen = seen.clone();
        bus.subscribe(move || RecordOrder::new(seen.clone())).unwrap();
    }

    let events: Vec<OrderPlacedEvent> = (0..5)
        .map(|i| OrderPlacedEvent::new(format!("o-{}", i), i * 100))
        .collect();
    for event in &events {
        bus.publish(event).unwrap();
    }
    settle();

    let expected: Vec<String> = events
        .iter()
        .map(|event| event.event_id().to_string())
        .collect();
    assert_eq!(seen_ids(&seen), expected);
}

// ============================================================================
// Test 6: Unsubscribe stops the consumer and removes the binding
// ============================================================================

#[test]
fn unsubscribe_stops_consumer_and_unbinds() {
    let broker = InMemoryBroker::new();
    let bus = shop_bus(&broker);

    let seen = new_seen();
    {
        let seen = seen.clone();
        bus.subscribe(move || RecordOrder::new(seen.clone())).unwrap();
    }
    assert!(broker.is_bound("orderplaced.recordorder", "shop", "orderplaced"));

    bus.publish(&OrderPlacedEvent::new("o-1", 100)).unwrap();
    settle();

    let stats = bus.unsubscribe::<OrderPlacedEvent, RecordOrder>().unwrap();
    assert_eq!(stats.handled, 1);
    assert!(!broker.is_bound("orderplaced.recordorder", "shop", "orderplaced"));
    assert_eq!(bus.active_subscriptions(), 0);

    // Later publishes no longer reach the queue or the handler.
    bus.publish(&OrderPlacedEvent::new("o-2", 200)).unwrap();
    settle();
    assert_eq!(seen_ids(&seen).len(), 1);
    assert_eq!(broker.queue_depth("orderplaced.recordorder"), 0);
}

// ============================================================================
// Test 7: Double subscribe and stray unsubscribe are errors
// ============================================================================

#[test]
fn subscription_registry_rejects_duplicates() {
    let broker = InMemoryBroker::new();
    let bus = shop_bus(&broker);

    let seen = new_seen();
    {
        let seen = seen.clone();
        bus.subscribe(move || RecordOrder::new(seen.clone())).unwrap();
    }
    {
        let seen = seen.clone();
        let err = bus
            .subscribe(move || RecordOrder::new(seen.clone()))
            .unwrap_err();
        assert!(matches!(err, SubscribeError::AlreadySubscribed { .. }));
    }

    bus.unsubscribe::<OrderPlacedEvent, RecordOrder>().unwrap();
    let err = bus
        .unsubscribe::<OrderPlacedEvent, RecordOrder>()
        .unwrap_err();
    assert!(matches!(err, SubscribeError::NotSubscribed { .. }));
}

// ============================================================================
// Test 8: Shutdown stops every consumer and reports stats per queue
// ============================================================================

#[test]
fn shutdown_stops_all_consumers() {
    let broker = InMemoryBroker::new();
    let bus = shop_bus(&broker);

    let orders = new_seen();
    let warehouse = new_seen();
    {
        let orders = orders.clone();
        bus.subscribe(move || RecordOrder::new(orders.clone())).unwrap();
    }
    {
        let warehouse = warehouse.clone();
        bus.subscribe(move || NotifyWarehouse::new(warehouse.clone()))
            .unwrap();
    }

    bus.publish(&OrderPlacedEvent::new("o-1", 100)).unwrap();
    settle();

    let mut stats = bus.shutdown();
    stats.sort_by(|a, b| a.0.cmp(&b.0));
    assert_eq!(stats.len(), 2);
    assert_eq!(stats[0].0, "orderplaced.notifywarehouse");
    assert_eq!(stats[1].0, "orderplaced.recordorder");
    assert_eq!(stats[0].1.handled, 1);
    assert_eq!(stats[1].1.handled, 1);
    assert_eq!(bus.active_subscriptions(), 0);

    // Durable queues and bindings stay for the next process generation.
    assert!(broker.is_bound("orderplaced.recordorder", "shop", "orderplaced"));
    assert_eq!(broker.queue_is_durable("orderplaced.recordorder"), Some(true));
}
