//! Handler source - registration modules supplied by the composition root.

use super::mediator::MediatorBuilder;

/// A module of handler/behavior registrations.
///
/// The hosting application supplies a closed set of sources at startup; each
/// source registers the handlers it contributes. This is the only interface
/// the dispatch core consumes from the application's composition root.
///
/// ## Example
///
/// ```ignore
/// struct OrderModule;
///
/// impl HandlerSource for OrderModule {
///     fn register(&self, builder: MediatorBuilder) -> MediatorBuilder {
///         builder
///             .handler(CreateOrderHandler::default())
///             .handler(CancelOrderHandler::default())
///     }
/// }
///
/// let mediator = Mediator::builder().source(&OrderModule).build();
/// ```
pub trait HandlerSource {
    fn register(&self, builder: MediatorBuilder) -> MediatorBuilder;
}
