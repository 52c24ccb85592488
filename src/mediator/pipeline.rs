//! Pipeline composition - ordered behaviors wrapping a terminal handler call.

use std::sync::Arc;

use crate::request::{Request, RequestHandler};

use super::error::SendError;

/// A cross-cutting stage wrapping a handler invocation.
///
/// Behaviors run in registration order on the way in and unwind in reverse
/// order on the way out. A behavior proceeds by calling `next.run(request)`;
/// returning without calling it short-circuits the chain, and the behavior's
/// own result is returned instead. Control flow is an explicit `Result`;
/// a stop is a returned value, never an unwind.
pub trait Behavior<Req: Request>: Send + Sync + 'static {
    fn handle(&self, request: &Req, next: Next<'_, Req>) -> Result<Req::Response, SendError>;
}

/// Continuation to the rest of the pipeline.
///
/// `run` consumes the continuation, so each stage can be invoked at most once
/// per dispatch. With no behaviors remaining, `run` is exactly the terminal
/// handler call.
pub struct Next<'a, Req: Request> {
    behaviors: &'a [Arc<dyn Behavior<Req>>],
    handler: &'a dyn RequestHandler<Req>,
}

impl<'a, Req: Request> Next<'a, Req> {
    pub(crate) fn new(
        behaviors: &'a [Arc<dyn Behavior<Req>>],
        handler: &'a dyn RequestHandler<Req>,
    ) -> Self {
        Next { behaviors, handler }
    }

    /// Run the remainder of the chain: the next behavior if one remains,
    /// otherwise the handler itself.
    pub fn run(self, request: &Req) -> Result<Req::Response, SendError> {
        match self.behaviors.split_first() {
            Some((current, rest)) => current.handle(
                request,
                Next {
                    behaviors: rest,
                    handler: self.handler,
                },
            ),
            None => self.handler.handle(request).map_err(SendError::Handler),
        }
    }
}
