//! Pipeline behavior ordering and short-circuiting.

use dispatched_rust::{Behavior, Mediator, Next, SendError};

use crate::support::{entries, new_log, Ping, Pong, RecordingPingHandler, ShortCircuit, Trace};

// ============================================================================
// Test 1: Behaviors execute in registration order, unwinding in reverse
// ============================================================================

#[test]
fn behaviors_run_in_registration_order() {
    let log = new_log();
    let mediator = Mediator::builder()
        .handler(RecordingPingHandler { log: log.clone() })
        .behavior(Trace {
            label: "a",
            log: log.clone(),
        })
        .behavior(Trace {
            label: "b",
            log: log.clone(),
        })
        .build();

    let pong = mediator.send(Ping { value: 1 }).unwrap();
    assert_eq!(pong.value, 2);

    assert_eq!(
        entries(&log),
        vec!["a:in", "b:in", "handler", "b:out", "a:out"]
    );
}

// ============================================================================
// Test 2: Each behavior runs at most once per send
// ============================================================================

#[test]
fn behaviors_run_at_most_once_per_send() {
    let log = new_log();
    let mediator = Mediator::builder()
        .handler(RecordingPingHandler { log: log.clone() })
        .behavior(Trace {
            label: "a",
            log: log.clone(),
        })
        .build();

    mediator.send(Ping { value: 1 }).unwrap();
    mediator.send(Ping { value: 2 }).unwrap();

    let log = entries(&log);
    assert_eq!(log.iter().filter(|e| *e == "a:in").count(), 2);
    assert_eq!(log.iter().filter(|e| *e == "handler").count(), 2);
}

// ============================================================================
// Test 3: A short-circuiting behavior stops later stages and the handler
// ============================================================================

#[test]
fn short_circuit_skips_later_behaviors_and_handler() {
    let log = new_log();
    let mediator = Mediator::builder()
        .handler(RecordingPingHandler { log: log.clone() })
        .behavior(Trace {
            label: "a",
            log: log.clone(),
        })
        .behavior(ShortCircuit { log: log.clone() })
        .behavior(Trace {
            label: "b",
            log: log.clone(),
        })
        .build();

    let pong = mediator.send(Ping { value: 1 }).unwrap();
    assert_eq!(pong.value, 999);

    // "b" and the handler never ran.
    assert_eq!(entries(&log), vec!["a:in", "short", "a:out"]);
}

// ============================================================================
// Test 4: A failing behavior propagates its error without reaching the handler
// ============================================================================

struct FailFast;

impl Behavior<Ping> for FailFast {
    fn handle(&self, _request: &Ping, _next: Next<'_, Ping>) -> Result<Pong, SendError> {
        Err(SendError::Handler("behavior refused".into()))
    }
}

#[test]
fn failing_behavior_propagates() {
    let log = new_log();
    let mediator = Mediator::builder()
        .handler(RecordingPingHandler { log: log.clone() })
        .behavior(FailFast)
        .build();

    let err = mediator.send(Ping { value: 1 }).unwrap_err();
    assert!(matches!(err, SendError::Handler(_)));
    assert!(entries(&log).is_empty());
}
