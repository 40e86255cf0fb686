//! HTTP API gateway for UniPath.
//!
//! Exposes the counselling chat endpoint and the dashboard's profile,
//! discovery, shortlist and task endpoints, plus a health check.
//!
//! Built on Axum.

pub mod api;

use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::{Router, response::Json, routing::get};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{info, warn};

use unipath_agent::CounselAgent;
use unipath_config::AppConfig;
use unipath_core::event::EventBus;
use unipath_core::store::CounselStore;

/// Request bodies above this size are rejected.
pub const BODY_LIMIT_BYTES: usize = 1024 * 1024;

/// Shared application state for the gateway.
pub struct GatewayState {
    pub agent: Arc<CounselAgent>,
    pub store: Arc<dyn CounselStore>,
    pub event_bus: Arc<EventBus>,
}

pub type SharedState = Arc<GatewayState>;

/// Build the full router.
///
/// Layers applied:
/// - CORS (any origin unless `gateway.cors_origins` lists some)
/// - Request body size limit (1 MB)
/// - HTTP trace logging
pub fn build_router(state: SharedState, cors_origins: &[String]) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .nest("/api", api::api_router(state))
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .layer(cors_layer(cors_origins))
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let methods = [
        axum::http::Method::GET,
        axum::http::Method::POST,
        axum::http::Method::PUT,
    ];
    let headers = [axum::http::header::CONTENT_TYPE];

    if origins.is_empty() {
        return CorsLayer::new()
            .allow_origin(AllowOrigin::any())
            .allow_methods(methods)
            .allow_headers(headers);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(methods)
        .allow_headers(headers)
        .max_age(std::time::Duration::from_secs(3600))
}

/// Start the gateway HTTP server on the configured address.
///
/// The agent is built once from `config` and shared by every request.
pub async fn start(
    config: AppConfig,
    store: Arc<dyn CounselStore>,
) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let event_bus = Arc::new(EventBus::default());
    let agent = Arc::new(CounselAgent::from_config(
        &config,
        store.clone(),
        event_bus.clone(),
    )?);

    info!(
        provider = agent.provider_name(),
        model = agent.model(),
        store = store.name(),
        "Counselling agent ready"
    );

    let state = Arc::new(GatewayState {
        agent,
        store,
        event_bus,
    });
    let app = build_router(state, &config.gateway.cors_origins);

    info!(addr = %addr, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// --- Handlers ---

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}
