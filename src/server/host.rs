//! Server host for transport-agnostic API exposure
//!
//! A `ServerHost` holds everything needed to answer list requests: the
//! configuration, one pipeline per resource, the shared reference directory and
//! the identity provider. Exposures (currently REST) consume it.

use crate::config::TallyConfig;
use crate::core::auth::SessionProvider;
use crate::core::reference::ReferenceDirectory;
use crate::server::resource_registry::ResourceRegistry;
use std::sync::Arc;

/// Host context containing all server state
pub struct ServerHost {
    pub config: Arc<TallyConfig>,

    /// One list endpoint per registered resource
    pub registry: ResourceRegistry,

    /// Title fetchers shared by every pipeline
    pub references: Arc<ReferenceDirectory>,

    /// Resolves the caller's session from request headers
    pub sessions: Arc<dyn SessionProvider>,
}

impl ServerHost {
    pub fn new(
        config: TallyConfig,
        registry: ResourceRegistry,
        references: Arc<ReferenceDirectory>,
        sessions: Arc<dyn SessionProvider>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            registry,
            references,
            sessions,
        }
    }

    /// Plural names of every served resource
    pub fn resources(&self) -> Vec<&str> {
        self.registry.resources()
    }

    /// Check if host has anything to serve
    pub fn is_ready(&self) -> bool {
        !self.registry.is_empty()
    }
}
