//! Health and banner endpoints

use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;

use crate::models::{BannerResponse, HealthResponse, SystemInfo};
use crate::AppState;

/// Module name reported by the health endpoint
pub const MODULE_NAME: &str = "edugame-ai";

const SERVICE_NAME: &str = "EduGame AI Services";

fn cpu_count() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// GET /health
///
/// Reports "degraded" while any model's last initialisation attempt failed.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let uptime = Utc::now().signed_duration_since(state.startup_time);
    let uptime_seconds = uptime.num_seconds().max(0) as u64;

    let failures = state.registry.failures();
    let last_error = if failures.is_empty() {
        None
    } else {
        Some(
            failures
                .iter()
                .map(|(model, reason)| format!("{}: {}", model, reason))
                .collect::<Vec<_>>()
                .join("; "),
        )
    };

    Json(HealthResponse {
        status: if last_error.is_none() { "healthy" } else { "degraded" },
        module: MODULE_NAME,
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds,
        timestamp: Utc::now().to_rfc3339(),
        models_loaded: state.registry.loaded(),
        system: SystemInfo {
            cpu_count: cpu_count(),
        },
        last_error,
    })
}

/// GET /
pub async fn banner(State(state): State<AppState>) -> Json<BannerResponse> {
    Json(BannerResponse {
        service: SERVICE_NAME,
        version: env!("CARGO_PKG_VERSION"),
        status: "running",
        models_loaded: state.registry.loaded(),
    })
}

/// Build health check routes
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
