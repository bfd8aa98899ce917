//! Emotion endpoints
//!
//! POST /emotion/audio, POST /emotion/text

use axum::{
    extract::{Multipart, State},
    routing::post,
    Json, Router,
};
use edugame_common::EmotionResult;

use super::upload::read_upload_form;
use crate::error::{ApiResult, ServiceError};
use crate::models::EmotionTextRequest;
use crate::AppState;

/// POST /emotion/audio
///
/// Classifier failures come back as the neutral result with an `error`
/// note, not as an HTTP error.
pub async fn emotion_audio(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<EmotionResult>> {
    let audio = read_upload_form(
        &mut multipart,
        state.config.temp_dir.as_deref(),
        state.config.max_upload_bytes,
    )
    .await?
    .require_audio()?;

    let classifier = state.registry.audio_classifier().await?;
    Ok(Json(classifier.analyze(audio.path()).await))
}

/// POST /emotion/text
pub async fn emotion_text(
    State(state): State<AppState>,
    Json(request): Json<EmotionTextRequest>,
) -> ApiResult<Json<EmotionResult>> {
    if request.text.trim().is_empty() {
        return Err(ServiceError::InvalidInput("text is empty".to_string()));
    }

    let classifier = state.registry.text_classifier().await?;
    Ok(Json(classifier.analyze(&request.text).await))
}

pub fn emotion_routes() -> Router<AppState> {
    Router::new()
        .route("/emotion/audio", post(emotion_audio))
        .route("/emotion/text", post(emotion_text))
}
