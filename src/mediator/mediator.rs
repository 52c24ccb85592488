//! Mediator - resolves the handler and pipeline for a request and executes
//! the composed chain.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::bus::Message;
use crate::request::{Request, RequestHandler};

use super::error::SendError;
use super::pipeline::Behavior;
use super::registry::{
    DecodeFn, EncodeFn, ErasedRouteBuilder, HandlerRegistry, RouteBuilder, WireRoute,
};
use super::source::HandlerSource;

/// Routes typed requests to exactly one handler through the behavior pipeline
/// registered for the request type.
///
/// A mediator is stateless per call and cheap to clone - clones share the
/// sealed registry. `send` executes synchronously in the caller's thread and
/// does not retain the request past the call.
///
/// ## Example
///
/// ```ignore
/// let mediator = Mediator::builder()
///     .handler(CreateOrderHandler::new(repo))
///     .behavior::<CreateOrder, _>(
///         ValidationBehavior::new().validator(customer_required),
///     )
///     .build();
///
/// let receipt = mediator.send(CreateOrder { customer: "ada".into(), total_cents: 100 })?;
/// ```
#[derive(Clone)]
pub struct Mediator {
    registry: Arc<HandlerRegistry>,
}

impl Mediator {
    pub fn builder() -> MediatorBuilder {
        MediatorBuilder::new()
    }

    /// Dispatch a typed request and return the handler's typed response.
    ///
    /// Fails with `HandlerNotFound` when zero or more than one handler is
    /// registered for the request type; resolution happens before any part of
    /// the pipeline executes. Behavior and handler failures propagate
    /// unchanged - the mediator performs no swallowing or retry.
    pub fn send<Req: Request>(&self, request: Req) -> Result<Req::Response, SendError> {
        let dispatch = self
            .registry
            .resolve_one(TypeId::of::<Req>(), std::any::type_name::<Req>())?;
        let response = dispatch(&request)?;
        match response.downcast::<Req::Response>() {
            Ok(response) => Ok(*response),
            Err(_) => Err(SendError::InvalidRequest(
                "dispatched response did not match the declared response type".to_string(),
            )),
        }
    }

    /// Dispatch a wire envelope by type name to a route registered with
    /// [`MediatorBuilder::route`], answering with a reply envelope.
    ///
    /// An empty type name or an undecodable payload is `InvalidRequest`; an
    /// unregistered type name is `HandlerNotFound`. The reply echoes the
    /// request id and carries the `<route>.reply` type name.
    pub fn send_message(&self, message: &Message) -> Result<Message, SendError> {
        if message.type_name.is_empty() {
            return Err(SendError::InvalidRequest(
                "message has no type name".to_string(),
            ));
        }

        let entry = self.registry.resolve_named(&message.type_name)?;
        let wire = match &entry.wire {
            Some(wire) => wire,
            None => {
                return Err(SendError::HandlerNotFound {
                    request_type: message.type_name.clone(),
                    registered: 0,
                })
            }
        };

        let request = (wire.decode)(message)?;
        let dispatch = entry.dispatch_fn()?;
        let request_ref: &dyn Any = &*request;
        let response = dispatch(request_ref)?;
        let response_ref: &dyn Any = &*response;
        (wire.encode)(&message.id, response_ref)
    }
}

/// Collects handler, behavior, and wire-route registrations, then seals them
/// into an immutable registry.
///
/// Registration happens once at startup; after `build()` no further
/// registration is possible.
pub struct MediatorBuilder {
    routes: HashMap<TypeId, Box<dyn ErasedRouteBuilder>>,
}

impl MediatorBuilder {
    pub fn new() -> Self {
        MediatorBuilder {
            routes: HashMap::new(),
        }
    }

    /// Register the handler for a request type.
    ///
    /// Exactly one handler must end up registered per type; duplicates are
    /// reported as ambiguous at dispatch.
    pub fn handler<Req, H>(mut self, handler: H) -> Self
    where
        Req: Request,
        H: RequestHandler<Req>,
    {
        self.route_builder::<Req>().push_handler(Arc::new(handler));
        self
    }

    /// Append a pipeline behavior for a request type. Behaviors execute in
    /// registration order.
    pub fn behavior<Req, B>(mut self, behavior: B) -> Self
    where
        Req: Request,
        B: Behavior<Req>,
    {
        self.route_builder::<Req>().push_behavior(Arc::new(behavior));
        self
    }

    /// Register a named wire route for a request type, enabling
    /// [`Mediator::send_message`] dispatch of `Message` envelopes.
    pub fn route<Req>(mut self, name: impl Into<String>) -> Self
    where
        Req: Request + DeserializeOwned,
        Req::Response: Serialize,
    {
        let name = name.into();
        let reply_type = format!("{}.reply", name);

        let decode: DecodeFn = Box::new(move |message: &Message| {
            let request: Req = message.decode().map_err(|err| {
                SendError::InvalidRequest(format!("request payload decode failed: {}", err))
            })?;
            Ok(Box::new(request) as Box<dyn Any + Send>)
        });

        let encode: EncodeFn = Box::new(move |reply_to: &str, response: &dyn Any| {
            let response = response.downcast_ref::<Req::Response>().ok_or_else(|| {
                SendError::InvalidRequest(
                    "response value does not match the route's response type".to_string(),
                )
            })?;
            Message::encode(reply_to, reply_type.clone(), response)
                .map_err(|err| SendError::Handler(err.to_string().into()))
        });

        self.route_builder::<Req>()
            .set_wire(name, WireRoute { decode, encode });
        self
    }

    /// Apply a registration module supplied by the composition root.
    pub fn source(self, source: &dyn HandlerSource) -> Self {
        source.register(self)
    }

    /// Seal the registry and produce the mediator. No registration is
    /// possible afterwards.
    pub fn build(self) -> Mediator {
        Mediator {
            registry: Arc::new(HandlerRegistry::build(self.routes)),
        }
    }

    fn route_builder<Req: Request>(&mut self) -> &mut RouteBuilder<Req> {
        self.routes
            .entry(TypeId::of::<Req>())
            .or_insert_with(|| Box::new(RouteBuilder::<Req>::new()))
            .as_any_mut()
            .downcast_mut::<RouteBuilder<Req>>()
            .expect("route builder is keyed by its request TypeId")
    }
}

impl Default for MediatorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
