//! Speech endpoints
//!
//! POST /transcribe, POST /transcribe/timestamps, POST /detect-language

use axum::{
    extract::{Multipart, State},
    routing::post,
    Json, Router,
};
use edugame_common::{TimedTranscription, TranscriptionResult, TranscriptionTask};
use tracing::info;

use super::upload::read_upload_form;
use crate::error::ApiResult;
use crate::services::LanguageDetection;
use crate::AppState;

/// POST /transcribe
///
/// Multipart `audio_file`, optional `language`; any `translate_to` value
/// switches the task to translation into English.
pub async fn transcribe(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<TranscriptionResult>> {
    let form = read_upload_form(
        &mut multipart,
        state.config.temp_dir.as_deref(),
        state.config.max_upload_bytes,
    )
    .await?;
    let language = form.text("language");
    let task = if form.text("translate_to").is_some() {
        TranscriptionTask::Translate
    } else {
        TranscriptionTask::Transcribe
    };
    let audio = form.require_audio()?;

    info!(
        content_type = %audio.content_type,
        bytes = audio.size,
        task = %task,
        "Transcription request"
    );

    let transcriber = state.registry.transcriber().await?;
    let result = transcriber
        .transcribe(audio.path(), language.as_deref(), task)
        .await?;
    Ok(Json(result))
}

/// POST /transcribe/timestamps
pub async fn transcribe_timestamps(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<TimedTranscription>> {
    let form = read_upload_form(
        &mut multipart,
        state.config.temp_dir.as_deref(),
        state.config.max_upload_bytes,
    )
    .await?;
    let language = form.text("language");
    let audio = form.require_audio()?;

    let transcriber = state.registry.transcriber().await?;
    let result = transcriber
        .transcribe_with_timestamps(audio.path(), language.as_deref())
        .await?;
    Ok(Json(result))
}

/// POST /detect-language
pub async fn detect_language(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<LanguageDetection>> {
    let audio = read_upload_form(
        &mut multipart,
        state.config.temp_dir.as_deref(),
        state.config.max_upload_bytes,
    )
    .await?
    .require_audio()?;

    let transcriber = state.registry.transcriber().await?;
    Ok(Json(transcriber.detect_language(audio.path()).await?))
}

pub fn transcribe_routes() -> Router<AppState> {
    Router::new()
        .route("/transcribe", post(transcribe))
        .route("/transcribe/timestamps", post(transcribe_timestamps))
        .route("/detect-language", post(detect_language))
}
