//! HTTP API handlers for edugame-ai
//!
//! Every route is served at the root and again under `/api/ai`.

pub mod analyze;
pub mod chat;
pub mod emotion;
pub mod health;
pub mod transcribe;
pub mod upload;

pub use analyze::analyze_routes;
pub use chat::chat_routes;
pub use emotion::emotion_routes;
pub use health::{banner, health_routes};
pub use transcribe::transcribe_routes;

use crate::AppState;
use axum::Router;

/// All API routes, without the banner
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(chat_routes())
        .merge(transcribe_routes())
        .merge(emotion_routes())
        .merge(analyze_routes())
        .merge(health_routes())
}
