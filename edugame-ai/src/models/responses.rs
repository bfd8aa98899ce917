//! JSON response bodies not already defined in edugame-common

use crate::services::ModelsLoaded;
use edugame_common::{ChatReply, FusionResult, TranscriptionResult};
use serde::Serialize;

/// POST /analyze-complete
#[derive(Debug, Clone, Serialize)]
pub struct AnalyzeCompleteResponse {
    pub user_id: String,
    pub transcription: Option<TranscriptionResult>,
    pub emotion_analysis: Option<FusionResult>,
    pub ai_response: Option<ChatReply>,
}

/// GET /
#[derive(Debug, Clone, Serialize)]
pub struct BannerResponse {
    pub service: &'static str,
    pub version: &'static str,
    pub status: &'static str,
    pub models_loaded: ModelsLoaded,
}

/// GET /health
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// "healthy", or "degraded" when a model failed its last initialisation
    pub status: &'static str,
    pub module: &'static str,
    pub version: &'static str,
    pub uptime_seconds: u64,
    /// RFC 3339
    pub timestamp: String,
    pub models_loaded: ModelsLoaded,
    pub system: SystemInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SystemInfo {
    pub cpu_count: usize,
}
