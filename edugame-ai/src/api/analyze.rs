//! Complete analysis pipeline
//!
//! POST /analyze-complete: transcription (when audio is present), then
//! multimodal emotion fusion, then a chat reply to the text. The
//! transcript stands in for the text when none was supplied.

use axum::{
    extract::{Multipart, State},
    routing::post,
    Json, Router,
};
use edugame_common::{TranscriptionResult, TranscriptionTask, UserContext};
use tracing::{info, warn};
use uuid::Uuid;

use super::upload::read_upload_form;
use crate::error::{ApiResult, ServiceError};
use crate::models::AnalyzeCompleteResponse;
use crate::AppState;

/// POST /analyze-complete
///
/// Multipart `user_id`, optional `audio_file` and `text`. A failed
/// transcription is reported in `transcription.error` and the other stages
/// still run; a model that cannot be loaded fails the request.
pub async fn analyze_complete(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<AnalyzeCompleteResponse>> {
    let form = read_upload_form(
        &mut multipart,
        state.config.temp_dir.as_deref(),
        state.config.max_upload_bytes,
    )
    .await?;

    let user_id = form
        .text("user_id")
        .ok_or_else(|| ServiceError::InvalidInput("missing 'user_id' field".to_string()))?;
    let mut text = form.text("text");
    let audio = form.audio;
    let request_id = Uuid::new_v4();

    info!(
        %request_id,
        user_id = %user_id,
        has_audio = audio.is_some(),
        has_text = text.is_some(),
        "Complete analysis request"
    );

    let mut response = AnalyzeCompleteResponse {
        user_id: user_id.clone(),
        transcription: None,
        emotion_analysis: None,
        ai_response: None,
    };

    if let Some(upload) = &audio {
        let transcriber = state.registry.transcriber().await?;
        let transcription = match transcriber
            .transcribe(upload.path(), None, TranscriptionTask::Transcribe)
            .await
        {
            Ok(result) => result,
            Err(ServiceError::InferenceFailure(message)) => {
                warn!(%request_id, error = %message, "Transcription failed, continuing without it");
                TranscriptionResult::failed(None, message)
            }
            Err(e) => return Err(e),
        };
        if text.is_none() && !transcription.transcription.trim().is_empty() {
            text = Some(transcription.transcription.trim().to_string());
        }
        response.transcription = Some(transcription);
    }

    if audio.is_some() || text.is_some() {
        let audio_result = match &audio {
            Some(upload) => Some(
                state
                    .registry
                    .audio_classifier()
                    .await?
                    .analyze(upload.path())
                    .await,
            ),
            None => None,
        };
        let text_result = match &text {
            Some(text) => Some(state.registry.text_classifier().await?.analyze(text).await),
            None => None,
        };
        response.emotion_analysis = Some(
            state
                .registry
                .fusion_policy()
                .fuse(audio_result, text_result),
        );
    }

    if let Some(text) = &text {
        let agent = state.registry.agent().await?;
        let context = UserContext::new(user_id.as_str());
        response.ai_response = Some(agent.chat(text, &context, None).await);
    }

    info!(%request_id, "Complete analysis finished");
    Ok(Json(response))
}

pub fn analyze_routes() -> Router<AppState> {
    Router::new().route("/analyze-complete", post(analyze_complete))
}
