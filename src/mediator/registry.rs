//! Handler registry - build-once route map keyed by request type.
//!
//! Typed registrations are erased into dispatch closures when the builder
//! seals the registry; the closures are monomorphized per request type, so
//! dispatch needs no runtime type introspection beyond a `TypeId` lookup.
//! The sealed map is never mutated, which makes concurrent reads safe by
//! construction.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use crate::bus::Message;
use crate::request::{Request, RequestHandler};

use super::error::SendError;
use super::pipeline::{Behavior, Next};

pub(crate) type DispatchFn =
    Box<dyn Fn(&dyn Any) -> Result<Box<dyn Any + Send>, SendError> + Send + Sync>;
pub(crate) type DecodeFn =
    Box<dyn Fn(&Message) -> Result<Box<dyn Any + Send>, SendError> + Send + Sync>;
pub(crate) type EncodeFn =
    Box<dyn Fn(&str, &dyn Any) -> Result<Message, SendError> + Send + Sync>;

/// Envelope adapters for a named wire route.
pub(crate) struct WireRoute {
    pub(crate) decode: DecodeFn,
    pub(crate) encode: EncodeFn,
}

pub(crate) enum RouteDispatch {
    Single(DispatchFn),
    /// Zero or multiple handlers were registered; dispatch reports both as
    /// `HandlerNotFound` with the count.
    Unresolved { registered: usize },
}

pub(crate) struct RouteEntry {
    pub(crate) request_type: &'static str,
    pub(crate) dispatch: RouteDispatch,
    pub(crate) wire: Option<WireRoute>,
}

impl RouteEntry {
    pub(crate) fn dispatch_fn(&self) -> Result<&DispatchFn, SendError> {
        match &self.dispatch {
            RouteDispatch::Single(dispatch) => Ok(dispatch),
            RouteDispatch::Unresolved { registered } => Err(SendError::HandlerNotFound {
                request_type: self.request_type.to_string(),
                registered: *registered,
            }),
        }
    }
}

/// Sealed route map. Built once by `MediatorBuilder::build`; read-only after.
pub(crate) struct HandlerRegistry {
    routes: HashMap<TypeId, RouteEntry>,
    named: HashMap<String, TypeId>,
}

impl HandlerRegistry {
    pub(crate) fn build(builders: HashMap<TypeId, Box<dyn ErasedRouteBuilder>>) -> Self {
        let mut routes = HashMap::new();
        let mut named = HashMap::new();
        for (type_id, erased) in builders {
            let (entry, name) = erased.finish();
            if let Some(name) = name {
                named.insert(name, type_id);
            }
            routes.insert(type_id, entry);
        }
        HandlerRegistry { routes, named }
    }

    /// Resolve the single dispatch function for a request type, failing when
    /// zero or more than one handler is registered.
    pub(crate) fn resolve_one(
        &self,
        type_id: TypeId,
        request_type: &str,
    ) -> Result<&DispatchFn, SendError> {
        match self.routes.get(&type_id) {
            Some(entry) => entry.dispatch_fn(),
            None => Err(SendError::HandlerNotFound {
                request_type: request_type.to_string(),
                registered: 0,
            }),
        }
    }

    /// Resolve a wire route by its registered name.
    pub(crate) fn resolve_named(&self, name: &str) -> Result<&RouteEntry, SendError> {
        self.named
            .get(name)
            .and_then(|type_id| self.routes.get(type_id))
            .ok_or_else(|| SendError::HandlerNotFound {
                request_type: name.to_string(),
                registered: 0,
            })
    }
}

/// Per-request-type accumulation before the registry is sealed.
pub(crate) struct RouteBuilder<Req: Request> {
    handlers: Vec<Arc<dyn RequestHandler<Req>>>,
    behaviors: Vec<Arc<dyn Behavior<Req>>>,
    wire: Option<(String, WireRoute)>,
}

impl<Req: Request> RouteBuilder<Req> {
    pub(crate) fn new() -> Self {
        RouteBuilder {
            handlers: Vec::new(),
            behaviors: Vec::new(),
            wire: None,
        }
    }

    pub(crate) fn push_handler(&mut self, handler: Arc<dyn RequestHandler<Req>>) {
        self.handlers.push(handler);
    }

    pub(crate) fn push_behavior(&mut self, behavior: Arc<dyn Behavior<Req>>) {
        self.behaviors.push(behavior);
    }

    pub(crate) fn set_wire(&mut self, name: String, wire: WireRoute) {
        self.wire = Some((name, wire));
    }
}

/// Type-erased view of `RouteBuilder` so the builder can hold every request
/// type in one map and seal them uniformly.
pub(crate) trait ErasedRouteBuilder: Send + Sync {
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn finish(self: Box<Self>) -> (RouteEntry, Option<String>);
}

impl<Req: Request> ErasedRouteBuilder for RouteBuilder<Req> {
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn finish(self: Box<Self>) -> (RouteEntry, Option<String>) {
        let route = *self;
        let mut handlers = route.handlers;

        let dispatch = if handlers.len() == 1 {
            let handler = handlers.remove(0);
            let behaviors: Arc<[Arc<dyn Behavior<Req>>]> = route.behaviors.into();
            RouteDispatch::Single(Box::new(move |any| {
                let request = any.downcast_ref::<Req>().ok_or_else(|| {
                    SendError::InvalidRequest(
                        "request value does not match its registered type".to_string(),
                    )
                })?;
                Next::new(&behaviors, handler.as_ref())
                    .run(request)
                    .map(|response| Box::new(response) as Box<dyn Any + Send>)
            }))
        } else {
            RouteDispatch::Unresolved {
                registered: handlers.len(),
            }
        };

        let (name, wire) = match route.wire {
            Some((name, wire)) => (Some(name), Some(wire)),
            None => (None, None),
        };

        (
            RouteEntry {
                request_type: std::any::type_name::<Req>(),
                dispatch,
                wire,
            },
            name,
        )
    }
}
