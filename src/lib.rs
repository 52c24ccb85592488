mod event;
mod request;

pub mod bus;
pub mod mediator;

pub use event::{EventInfo, EventMessage};
pub use mediator::{
    Behavior, FieldError, HandlerSource, Mediator, MediatorBuilder, Next, SendError,
    ValidationBehavior, ValidationFailure, Validator,
};
pub use request::{Request, RequestHandler};

/// Boxed error type carried by failed handlers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

// Re-export the EventMessage derive from the dispatched_rust_macros crate,
// plus the identity/time types its expansion references.
pub use chrono::{DateTime, Utc};
pub use dispatched_rust_macros::EventMessage;
pub use uuid::Uuid;
