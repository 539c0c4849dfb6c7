//! ServerBuilder for fluent API to build HTTP servers

use super::exposure::RestExposure;
use super::host::ServerHost;
use super::resource_registry::ResourceRegistry;
use crate::config::TallyConfig;
use crate::core::auth::{NoSessionProvider, SessionProvider};
use crate::core::descriptor::ResourceDescriptor;
use crate::core::entity::Data;
use crate::core::pipeline::{ListEndpoint, ListPipeline, PipelineSettings};
use crate::core::reference::{DataServiceFetcher, ReferenceDirectory};
use crate::core::service::DataService;
use anyhow::{Result, anyhow};
use axum::Router;
use serde::Serialize;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

type EndpointFactory = Box<
    dyn FnOnce(
            Arc<ResourceDescriptor>,
            Arc<ReferenceDirectory>,
            Arc<PipelineSettings>,
        ) -> Arc<dyn ListEndpoint>
        + Send,
>;

/// A storage service waiting for its descriptor and the shared reference directory
struct PendingResource {
    plural: &'static str,
    factory: EndpointFactory,
}

/// Builder for creating HTTP servers with auto-registered list routes
///
/// # Example
///
/// ```ignore
/// let app = ServerBuilder::new(TallyConfig::default_config())
///     .with_session_provider(HeaderSessionProvider)
///     .register_resource::<Branch, _>(InMemoryDataService::new())
///     .register_resource::<Sale, _>(InMemoryDataService::new())
///     .build()?;
/// ```
pub struct ServerBuilder {
    config: TallyConfig,
    session_provider: Arc<dyn SessionProvider>,
    references: ReferenceDirectory,
    pending: Vec<PendingResource>,
    custom_routes: Vec<Router>,
}

impl ServerBuilder {
    /// Create a new ServerBuilder from a configuration
    pub fn new(config: TallyConfig) -> Self {
        Self {
            config,
            session_provider: Arc::new(NoSessionProvider),
            references: ReferenceDirectory::new(),
            pending: Vec::new(),
            custom_routes: Vec::new(),
        }
    }

    /// Set the identity provider. Defaults to [`NoSessionProvider`].
    pub fn with_session_provider(mut self, provider: impl SessionProvider + 'static) -> Self {
        self.session_provider = Arc::new(provider);
        self
    }

    /// Add custom routes to the server
    ///
    /// Use this for endpoints outside the list pipeline, such as sign-in
    /// flows or report exports.
    pub fn with_custom_routes(mut self, routes: Router) -> Self {
        self.custom_routes.push(routes);
        self
    }

    /// Register the storage service of a resource
    pub fn register_resource<T, S>(self, service: S) -> Self
    where
        T: Data + Serialize,
        S: DataService<T> + 'static,
    {
        self.register_shared::<T>(Arc::new(service))
    }

    /// Register a storage service that is also used elsewhere
    ///
    /// This will:
    /// 1. Make the resource's display titles available to other resources
    /// 2. Defer pipeline creation until every resource is known
    pub fn register_shared<T>(mut self, service: Arc<dyn DataService<T>>) -> Self
    where
        T: Data + Serialize,
    {
        let plural = T::resource_name();
        self.references
            .register(plural, Arc::new(DataServiceFetcher::new(service.clone())));

        self.pending.push(PendingResource {
            plural,
            factory: Box::new(
                move |descriptor: Arc<ResourceDescriptor>,
                      references: Arc<ReferenceDirectory>,
                      settings: Arc<PipelineSettings>| {
                    Arc::new(ListPipeline::new(descriptor, service, references, settings))
                        as Arc<dyn ListEndpoint>
                },
            ),
        });
        self
    }

    /// Build the transport-agnostic host
    ///
    /// Fails when the configuration is invalid or a registered resource has
    /// no descriptor.
    pub fn build_host(self) -> Result<ServerHost> {
        self.config.validate()?;

        let references = Arc::new(self.references);
        let settings = Arc::new(self.config.pipeline_settings());

        let mut registry = ResourceRegistry::new();
        for pending in self.pending {
            let descriptor = self
                .config
                .resource(pending.plural)
                .cloned()
                .ok_or_else(|| anyhow!("No descriptor configured for resource '{}'", pending.plural))?;
            let endpoint = (pending.factory)(Arc::new(descriptor), references.clone(), settings.clone());
            registry.register(endpoint);
        }

        for descriptor in &self.config.resources {
            if registry.get(&descriptor.plural).is_none() {
                tracing::debug!(resource = %descriptor.plural, "configured resource has no storage, not served");
            }
            for (_, referenced) in descriptor.referenced_keys() {
                if !references.contains(referenced) {
                    tracing::debug!(
                        resource = %descriptor.plural,
                        references = referenced,
                        "referenced resource has no storage, titles will use the placeholder"
                    );
                }
            }
        }

        Ok(ServerHost::new(
            self.config,
            registry,
            references,
            self.session_provider,
        ))
    }

    /// Build the final REST router with request tracing and CORS
    pub fn build(mut self) -> Result<Router> {
        let custom_routes = std::mem::take(&mut self.custom_routes);
        let host = Arc::new(self.build_host()?);
        let router = RestExposure::build_router(host, custom_routes)?;

        Ok(router.layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        ))
    }

    /// Serve the application with graceful shutdown
    ///
    /// This will:
    /// - Bind to the provided address
    /// - Start serving requests
    /// - Handle SIGTERM and SIGINT (Ctrl+C) for graceful shutdown
    pub async fn serve(self, addr: &str) -> Result<()> {
        let app = self.build()?;
        let listener = TcpListener::bind(addr).await?;

        tracing::info!("Server listening on {}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => tracing::error!(error = %e, "failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, stopping server");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{Branch, Sale};
    use crate::storage::InMemoryDataService;

    #[test]
    fn test_build_host_registers_resources() {
        let host = ServerBuilder::new(TallyConfig::default_config())
            .register_resource::<Branch, _>(InMemoryDataService::new())
            .register_resource::<Sale, _>(InMemoryDataService::new())
            .build_host()
            .unwrap();

        assert_eq!(host.resources(), vec!["branches", "sales"]);
        assert!(host.references.contains("branches"));
        assert!(!host.references.contains("customers"));
        assert!(host.is_ready());
    }

    #[test]
    fn test_build_host_requires_descriptor() {
        let config = TallyConfig {
            builtin_resources: false,
            ..TallyConfig::default()
        };
        let result = ServerBuilder::new(config)
            .register_resource::<Branch, _>(InMemoryDataService::new())
            .build_host();

        let err = result.err().unwrap().to_string();
        assert!(err.contains("branches"), "got: {err}");
    }

    #[test]
    fn test_build_host_rejects_invalid_config() {
        let mut config = TallyConfig::default_config();
        config.pagination.max_page_size = 0;
        assert!(ServerBuilder::new(config).build_host().is_err());
    }

    #[tokio::test]
    async fn test_build_router() {
        let router = ServerBuilder::new(TallyConfig::default_config())
            .register_resource::<Branch, _>(InMemoryDataService::new())
            .build();
        assert!(router.is_ok());
    }
}
