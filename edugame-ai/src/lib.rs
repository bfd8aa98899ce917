//! edugame-ai library interface
//!
//! Exposes the router and components for the binary and integration tests.

pub mod api;
pub mod backends;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

pub use crate::error::{ApiResult, ServiceError, ServiceResult};

use axum::extract::DefaultBodyLimit;
use axum::Router;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::ServiceConfig;
use crate::services::ModelRegistry;

/// Prefix the web client uses for every route
pub const API_PREFIX: &str = "/api/ai";

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Lazily initialised model handles
    pub registry: Arc<ModelRegistry>,
    /// Resolved runtime configuration
    pub config: Arc<ServiceConfig>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(registry: Arc<ModelRegistry>, config: Arc<ServiceConfig>) -> Self {
        Self {
            registry,
            config,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;

    let body_limit = state.config.body_limit();

    Router::new()
        .route("/", get(api::banner))
        .merge(api::api_routes())
        .nest(API_PREFIX, api::api_routes())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
