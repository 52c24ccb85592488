use crate::BoxError;

/// Marker trait for a request expecting a response.
///
/// The runtime type of the request value decides which handler and pipeline
/// apply; the associated `Response` type is what `Mediator::send` returns.
pub trait Request: Send + 'static {
    type Response: Send + 'static;
}

/// Handler for a single request type.
///
/// Exactly one handler must be registered per request type for dispatch to
/// succeed. Handler failures propagate to the caller unchanged (boxed, with
/// the source preserved) - the mediator performs no swallowing or retry.
pub trait RequestHandler<Req: Request>: Send + Sync + 'static {
    fn handle(&self, request: &Req) -> Result<Req::Response, BoxError>;
}

impl<Req, F> RequestHandler<Req> for F
where
    Req: Request,
    F: Fn(&Req) -> Result<Req::Response, BoxError> + Send + Sync + 'static,
{
    fn handle(&self, request: &Req) -> Result<Req::Response, BoxError> {
        self(request)
    }
}
