//! Mediator integration tests.
//!
//! Demonstrates typed request/response dispatch:
//! - Register handlers and behaviors, seal the registry, send requests
//! - Pipeline ordering and short-circuiting
//! - Validation aggregation
//! - Wire-envelope dispatch by type name


mod pipeline;
