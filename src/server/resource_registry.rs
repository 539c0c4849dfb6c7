//! Resource registry holding one list endpoint per plural name

use crate::core::pipeline::ListEndpoint;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Registry for all listable resources of the application
///
/// Keys are plural names, which are also the route segments.
#[derive(Default, Clone)]
pub struct ResourceRegistry {
    endpoints: BTreeMap<String, Arc<dyn ListEndpoint>>,
}

impl ResourceRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an endpoint under its descriptor's plural name.
    ///
    /// Registering the same plural twice replaces the earlier endpoint.
    pub fn register(&mut self, endpoint: Arc<dyn ListEndpoint>) {
        let plural = endpoint.descriptor().plural.clone();
        if self.endpoints.insert(plural.clone(), endpoint).is_some() {
            tracing::warn!(resource = %plural, "resource registered twice, keeping the last one");
        }
    }

    pub fn get(&self, plural: &str) -> Option<&Arc<dyn ListEndpoint>> {
        self.endpoints.get(plural)
    }

    /// Registered plural names, sorted
    pub fn resources(&self) -> Vec<&str> {
        self.endpoints.keys().map(|s| s.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<dyn ListEndpoint>)> {
        self.endpoints.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}
