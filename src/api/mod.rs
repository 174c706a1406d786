//! REST API for dashboards
//!
//! ## Endpoints
//!
//! - `GET  /api/v1/health` - Health check (no auth)
//! - `GET  /api/v1/nodes` - Nodes with a running agent
//! - `DELETE /api/v1/nodes/{address}` - Shut down and forget a node's agent
//! - `POST /api/v1/nodes/{address}/init` - Initialise an agent
//! - `PUT  /api/v1/nodes/{address}/enabled` - Toggle periodic sampling
//! - `POST /api/v1/nodes/{address}/stop` - Cancel the sampling timer
//! - `GET  /api/v1/nodes/{address}/statistics` - Sample history
//! - `GET  /api/v1/nodes/{address}/counters` - Latest counter snapshot
//! - `POST /api/v1/nodes/{address}/counters` - Report counters (one-way)
//! - `GET  /api/v1/nodes/{address}/properties` - Extended properties

pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod types;

pub use error::{ApiError, ApiResult};
pub use state::ApiState;

use std::net::SocketAddr;

use axum::{
    Router,
    routing::{delete, get, post, put},
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::ApiSettings;

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Bind address (e.g., "0.0.0.0:8080")
    pub bind_addr: SocketAddr,

    /// Optional bearer token
    pub auth_token: Option<String>,

    /// Enable CORS for browser dashboards
    pub enable_cors: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            auth_token: None,
            enable_cors: true,
        }
    }
}

impl From<ApiSettings> for ApiConfig {
    fn from(settings: ApiSettings) -> Self {
        Self {
            bind_addr: settings.bind,
            auth_token: settings.token,
            enable_cors: settings.cors,
        }
    }
}

/// Build the API router
pub fn router(config: &ApiConfig, state: ApiState) -> Router {
    let mut app = Router::new()
        .route("/api/v1/health", get(routes::health::health_check))
        .route("/api/v1/nodes", get(routes::nodes::list_nodes))
        .route("/api/v1/nodes/:address", delete(routes::nodes::remove_node))
        .route("/api/v1/nodes/:address/init", post(routes::nodes::init_node))
        .route(
            "/api/v1/nodes/:address/enabled",
            put(routes::nodes::set_enabled),
        )
        .route(
            "/api/v1/nodes/:address/stop",
            post(routes::nodes::stop_sampling),
        )
        .route(
            "/api/v1/nodes/:address/statistics",
            get(routes::nodes::get_statistics),
        )
        .route(
            "/api/v1/nodes/:address/counters",
            get(routes::nodes::get_counters).post(routes::nodes::report_counters),
        )
        .route(
            "/api/v1/nodes/:address/properties",
            get(routes::nodes::get_properties),
        )
        .with_state(state);

    // auth sits inside CORS so preflight requests never need a token
    if let Some(token) = config.auth_token.clone() {
        app = app.layer(axum::middleware::from_fn_with_state(
            token,
            middleware::auth::require_bearer_token,
        ));
    }

    if config.enable_cors {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
        app = app.layer(cors);
    }

    app.layer(TraceLayer::new_for_http())
}

/// Spawn the API server in a background task
///
/// Returns the server's local address.
pub async fn spawn_api_server(config: ApiConfig, state: ApiState) -> anyhow::Result<SocketAddr> {
    info!("starting API server on {}", config.bind_addr);

    let app = router(&config, state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    let addr = listener.local_addr()?;

    info!("API server listening on {}", addr);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("API server error: {}", e);
        }
    });

    Ok(addr)
}
