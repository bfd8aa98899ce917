//! Speech transcription result types

use serde::{Deserialize, Serialize};
use std::fmt;

/// What the speech model should produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptionTask {
    /// Text in the spoken language
    #[default]
    Transcribe,
    /// English translation of the speech
    Translate,
}

impl fmt::Display for TranscriptionTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TranscriptionTask::Transcribe => "transcribe",
            TranscriptionTask::Translate => "translate",
        })
    }
}

/// One fixed-size window of a chunked transcription
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptChunk {
    /// Window start in seconds
    pub start: f64,
    /// Window end in seconds (clamped to the audio duration)
    pub end: f64,
    pub text: String,
}

/// A timed segment of a transcript
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedSegment {
    pub text: String,
    pub start: f64,
    pub end: f64,
    pub confidence: f64,
}

/// Result of transcribing one audio input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptionResult {
    pub transcription: String,
    pub detected_language: String,
    /// Mean of (1 - no-speech probability) over segments
    pub confidence: f64,
    /// Audio duration in seconds (2 decimals)
    pub duration: f64,
    /// Present only for chunked transcriptions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunks: Option<Vec<TranscriptChunk>>,
    /// Set when this stands in for a failed transcription
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TranscriptionResult {
    /// Empty result reported in place of a failed transcription
    pub fn failed(language: Option<&str>, error: impl Into<String>) -> Self {
        Self {
            transcription: String::new(),
            detected_language: language.unwrap_or("unknown").to_string(),
            confidence: 0.0,
            duration: 0.0,
            chunks: None,
            error: Some(error.into()),
        }
    }
}

/// Transcript with segment timing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedTranscription {
    pub transcription: String,
    pub segments: Vec<TimedSegment>,
    pub detected_language: String,
    pub duration: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_result_is_empty_with_error_note() {
        let failed = TranscriptionResult::failed(None, "backend down");
        assert_eq!(failed.transcription, "");
        assert_eq!(failed.detected_language, "unknown");
        assert_eq!(failed.confidence, 0.0);
        assert_eq!(failed.error.as_deref(), Some("backend down"));

        let json = serde_json::to_value(&failed).unwrap();
        assert_eq!(json["error"], "backend down");
        assert!(json.get("chunks").is_none());
    }

    #[test]
    fn successful_result_omits_error() {
        let result = TranscriptionResult {
            error: None,
            ..TranscriptionResult::failed(Some("es"), "")
        };
        let json = serde_json::to_value(&result).unwrap();
        assert!(json.get("error").is_none());
        assert_eq!(json["detected_language"], "es");
    }
}
