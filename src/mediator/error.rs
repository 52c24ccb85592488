//! Error types for mediator dispatch.

use std::error::Error;
use std::fmt;

use crate::BoxError;

use super::validation::ValidationFailure;

/// Error type for `Mediator::send` and `Mediator::send_message`.
#[derive(Debug)]
pub enum SendError {
    /// Malformed or missing input (wire-envelope dispatch).
    InvalidRequest(String),
    /// No handler, or more than one handler, registered for the request type.
    HandlerNotFound {
        request_type: String,
        registered: usize,
    },
    /// A validation behavior rejected the request.
    Validation(ValidationFailure),
    /// A handler or behavior failed; the source error is preserved.
    Handler(BoxError),
}

impl fmt::Display for SendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SendError::InvalidRequest(msg) => write!(f, "invalid request: {}", msg),
            SendError::HandlerNotFound {
                request_type,
                registered: 0,
            } => write!(f, "no handler registered for request type: {}", request_type),
            SendError::HandlerNotFound {
                request_type,
                registered,
            } => write!(
                f,
                "{} handlers registered for request type {} (exactly one required)",
                registered, request_type
            ),
            SendError::Validation(failure) => write!(f, "{}", failure),
            SendError::Handler(e) => write!(f, "handler error: {}", e),
        }
    }
}

impl Error for SendError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            SendError::Validation(failure) => Some(failure),
            SendError::Handler(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

impl From<ValidationFailure> for SendError {
    fn from(failure: ValidationFailure) -> Self {
        SendError::Validation(failure)
    }
}
