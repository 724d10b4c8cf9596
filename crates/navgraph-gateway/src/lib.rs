//! navgraph HTTP/JSON gateway.
//!
//! Exposes every entity set under `GET /{entitySet}` with OData-style
//! `$filter` and `$select` query parameters, answering with a JSON array of
//! the matching entities.

pub mod config;
pub mod error;
pub mod json;
pub mod routes;

pub use config::{Args, GatewayConfig};
pub use error::AppError;

use std::sync::Arc;

use axum::Router;
use navgraph_core::{EngineConfig, QueryEngine};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across all routes.
#[derive(Clone)]
pub struct AppState {
    /// Query engine with its metadata and driver caches.
    pub engine: Arc<QueryEngine>,
    /// Engine configuration the engine was built from.
    pub engine_config: Arc<EngineConfig>,
    /// Gateway configuration.
    pub config: GatewayConfig,
}

impl AppState {
    /// Create new application state.
    pub fn new(engine: QueryEngine, engine_config: EngineConfig, config: GatewayConfig) -> Self {
        Self {
            engine: Arc::new(engine),
            engine_config: Arc::new(engine_config),
            config,
        }
    }
}

/// Create the router with all routes.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(routes::health::routes())
        .merge(routes::query::routes())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
