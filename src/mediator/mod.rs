//! Mediator - in-process request/response dispatch.
//!
//! Routes a typed request to exactly one handler through an ordered pipeline
//! of behaviors.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Mediator                             │
//! │  send(request) ──► resolve handler + behaviors by TypeId    │
//! └──────────────────────────┬──────────────────────────────────┘
//!                            ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  behavior 1 ──► behavior 2 ──► ... ──► handler              │
//! │      ▲              ▲                     │                 │
//! │      └──────────────┴── unwind in reverse ┘                 │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Behaviors may short-circuit by not calling their continuation; the
//! canonical example is [`ValidationBehavior`], which stops the chain with
//! aggregated field errors before the handler runs.
//!
//! The registry is built once by [`MediatorBuilder`] and sealed; after
//! `build()` it is read-only and safe for concurrent dispatch.

mod error;
mod mediator;
mod pipeline;
mod registry;
mod source;
mod validation;

pub use error::SendError;
pub use mediator::{Mediator, MediatorBuilder};
pub use pipeline::{Behavior, Next};
pub use source::HandlerSource;
pub use validation::{FieldError, ValidationBehavior, ValidationFailure, Validator};
