//! REST API exposure
//!
//! Consumes a `ServerHost` and produces an Axum `Router` with, per resource:
//!
//! - `GET /{plural}`: paginated, filtered list wrapped in the envelope
//! - `GET /{plural}/{id}`: a single document, same role gate and shaping
//!
//! plus `/health` and `/healthz`. Every response of a resource route, success
//! or failure, is an [`Envelope`].

use super::super::host::ServerHost;
use crate::core::auth::{Session, SessionProvider};
use crate::core::envelope::{Envelope, ListData};
use crate::core::pipeline::ListEndpoint;
use crate::core::query::ListParams;
use anyhow::Result;
use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::{Json, Router, routing::get};
use serde_json::{Value, json};
use std::sync::Arc;

/// State shared by the routes of one resource
#[derive(Clone)]
pub struct ResourceState {
    pub endpoint: Arc<dyn ListEndpoint>,
    pub sessions: Arc<dyn SessionProvider>,
}

/// REST API exposure implementation
pub struct RestExposure;

impl RestExposure {
    /// Build the REST router from a host
    ///
    /// Returns a router with:
    /// - Health check routes
    /// - List and detail routes for every registered resource
    /// - Custom routes
    /// - An envelope-shaped 404 fallback
    pub fn build_router(host: Arc<ServerHost>, custom_routes: Vec<Router>) -> Result<Router> {
        let mut app = Self::health_routes();

        for (plural, endpoint) in host.registry.iter() {
            let state = ResourceState {
                endpoint: endpoint.clone(),
                sessions: host.sessions.clone(),
            };
            app = app.merge(Self::resource_routes(plural, state));
            tracing::debug!(resource = plural, "registered list routes");
        }

        for custom_router in custom_routes {
            app = app.merge(custom_router);
        }

        Ok(app.fallback(not_found))
    }

    /// List and detail routes for one resource
    pub fn resource_routes(plural: &str, state: ResourceState) -> Router {
        Router::new()
            .route(&format!("/{}", plural), get(list_resource))
            .route(&format!("/{}/{{id}}", plural), get(get_resource))
            .with_state(state)
    }

    fn health_routes() -> Router {
        Router::new()
            .route("/health", get(Self::health_check))
            .route("/healthz", get(Self::health_check))
    }

    async fn health_check() -> Json<Value> {
        Json(json!({
            "status": "ok",
            "service": "tally"
        }))
    }
}

/// Resolve the caller's session. A provider failure is treated as anonymous.
async fn session_of(sessions: &dyn SessionProvider, headers: &HeaderMap) -> Option<Session> {
    match sessions.session(headers).await {
        Ok(session) => session,
        Err(e) => {
            tracing::warn!(error = %e, "could not establish session");
            None
        }
    }
}

/// `GET /{plural}`
///
/// The query string is read as raw pairs so that malformed values reach the
/// normalizer (and its defaults) instead of failing extraction.
pub async fn list_resource(
    State(state): State<ResourceState>,
    headers: HeaderMap,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Response {
    let session = session_of(state.sessions.as_ref(), &headers).await;
    let pairs: Vec<(&str, &str)> = pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
    let params = ListParams::from_pairs(&pairs);

    match state.endpoint.list(session.as_ref(), &params).await {
        Ok(data) => Json(Envelope::<ListData>::ok(data)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// `GET /{plural}/{id}`
pub async fn get_resource(
    State(state): State<ResourceState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    let session = session_of(state.sessions.as_ref(), &headers).await;

    match state.endpoint.get(session.as_ref(), &id).await {
        Ok(doc) => Json(Envelope::ok(doc)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Fallback for unknown paths, in the envelope shape
pub async fn not_found() -> Response {
    (
        axum::http::StatusCode::NOT_FOUND,
        Json(Envelope::<Value>::failure("Resource not found", None)),
    )
        .into_response()
}
