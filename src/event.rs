use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Contract for an event published on the bus.
///
/// Every event carries a globally unique identifier and a UTC occurrence
/// timestamp. `TYPE_NAME` identifies the event type on the wire and drives
/// routing-key and queue-name derivation. Events have no identity beyond the
/// event id - delivery is at-least-once and handlers must tolerate duplicates.
///
/// Usually implemented via `#[derive(EventMessage)]` on a struct embedding an
/// [`EventInfo`] field named `info`.
pub trait EventMessage: Send + Sync + 'static {
    const TYPE_NAME: &'static str;

    fn event_id(&self) -> Uuid;

    fn occurred_at(&self) -> DateTime<Utc>;
}

/// The two mandatory event attributes, as an embeddable pair.
///
/// `EventInfo::new()` stamps a fresh v4 id and the current UTC time; events
/// constructed at publish time get both for free via `Default`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct EventInfo {
    pub event_id: Uuid,
    pub occurred_at: DateTime<Utc>,
}

impl EventInfo {
    pub fn new() -> Self {
        EventInfo {
            event_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
        }
    }
}

impl Default for EventInfo {
    fn default() -> Self {
        Self::new()
    }
}
