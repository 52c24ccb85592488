//! Validation behavior - the reference pipeline stage.
//!
//! Collects the validators registered for a request type, aggregates every
//! field-level failure across all of them, and short-circuits the pipeline
//! with `SendError::Validation` when the aggregate is non-empty.

use std::error::Error;
use std::fmt;

use crate::request::Request;

use super::error::SendError;
use super::pipeline::{Behavior, Next};

/// A single field-level validation failure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        FieldError {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// The aggregated failures of a rejected request, in validator order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationFailure {
    pub errors: Vec<FieldError>,
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "validation failed")?;
        for error in &self.errors {
            write!(f, "; {}", error)?;
        }
        Ok(())
    }
}

impl Error for ValidationFailure {}

/// Produces zero or more field errors for a request.
///
/// Also implemented by any `Fn(&Req) -> Vec<FieldError>` closure.
pub trait Validator<Req>: Send + Sync + 'static {
    fn validate(&self, request: &Req) -> Vec<FieldError>;
}

impl<Req, F> Validator<Req> for F
where
    F: Fn(&Req) -> Vec<FieldError> + Send + Sync + 'static,
{
    fn validate(&self, request: &Req) -> Vec<FieldError> {
        self(request)
    }
}

/// Pipeline stage running every registered validator before the handler.
///
/// With no validators it calls `next` immediately. Otherwise all validators
/// run and their failures are aggregated; a non-empty aggregate stops the
/// chain and the handler never executes.
pub struct ValidationBehavior<Req> {
    validators: Vec<Box<dyn Validator<Req>>>,
}

impl<Req: Request> ValidationBehavior<Req> {
    pub fn new() -> Self {
        ValidationBehavior {
            validators: Vec::new(),
        }
    }

    /// Add a validator. Failures aggregate in registration order.
    pub fn validator(mut self, validator: impl Validator<Req>) -> Self {
        self.validators.push(Box::new(validator));
        self
    }
}

impl<Req: Request> Default for ValidationBehavior<Req> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Req: Request> Behavior<Req> for ValidationBehavior<Req> {
    fn handle(&self, request: &Req, next: Next<'_, Req>) -> Result<Req::Response, SendError> {
        if self.validators.is_empty() {
            return next.run(request);
        }

        let mut errors = Vec::new();
        for validator in &self.validators {
            errors.extend(validator.validate(request));
        }

        if errors.is_empty() {
            next.run(request)
        } else {
            Err(SendError::Validation(ValidationFailure { errors }))
        }
    }
}
