//! Server module for building HTTP servers with auto-registered list routes
//!
//! This module provides a `ServerBuilder` that registers, for every resource
//! with a storage service:
//! - a paginated list route and a detail route
//! - a title fetcher used to resolve references from other resources

pub mod builder;
pub mod exposure;
pub mod host;
pub mod resource_registry;

pub use builder::ServerBuilder;
pub use exposure::RestExposure;
pub use host::ServerHost;
pub use resource_registry::ResourceRegistry;
