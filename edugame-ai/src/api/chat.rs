//! Conversational agent endpoints
//!
//! POST /chat, POST /feedback

use axum::{extract::State, routing::post, Json, Router};
use edugame_common::{ChatReply, FeedbackResult};
use tracing::info;

use crate::error::{ApiResult, ServiceError};
use crate::models::{ChatRequest, FeedbackRequest};
use crate::AppState;

/// POST /chat
///
/// Generation failures are reported inside the reply (apology text,
/// confidence 0.0); only a missing model fails the request.
pub async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> ApiResult<Json<ChatReply>> {
    if request.message.trim().is_empty() {
        return Err(ServiceError::InvalidInput("message is empty".to_string()));
    }

    let context = request.learner.user_context(&request.user_id);
    info!(user_id = %context.user_id, language = %context.language, "Chat request");

    let agent = state.registry.agent().await?;
    let reply = agent
        .chat(&request.message, &context, request.context.as_ref())
        .await;
    Ok(Json(reply))
}

/// POST /feedback
pub async fn feedback(
    State(state): State<AppState>,
    Json(request): Json<FeedbackRequest>,
) -> ApiResult<Json<FeedbackResult>> {
    let context = request.learner.user_context(&request.user_id);
    info!(
        user_id = %context.user_id,
        game_type = %request.game_session.game_type,
        "Feedback request"
    );

    let agent = state.registry.agent().await?;
    let feedback = agent.generate_feedback(&request.game_session, &context).await;
    Ok(Json(feedback))
}

pub fn chat_routes() -> Router<AppState> {
    Router::new()
        .route("/chat", post(chat))
        .route("/feedback", post(feedback))
}
