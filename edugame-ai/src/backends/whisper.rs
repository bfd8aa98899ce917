//! OpenAI-compatible speech recognition backend
//!
//! Uploads the audio as multipart to `/audio/transcriptions` (or
//! `/audio/translations` for the translate task) with
//! `response_format=verbose_json`, which returns per-segment
//! `no_speech_prob` values used for confidence scoring.

use super::{
    api_error, base_url, http_client, BackendError, RawSegment, RawTranscript, SpeechModel,
    TranscribeOptions,
};
use async_trait::async_trait;
use edugame_common::TranscriptionTask;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::path::Path;

pub const DEFAULT_OPENAI_ENDPOINT: &str = "https://api.openai.com/v1";
pub const DEFAULT_SPEECH_MODEL: &str = "whisper-large-v3";
pub const DEFAULT_OPENAI_KEY_ENV: &str = "OPENAI_API_KEY";

#[derive(Debug, Deserialize)]
struct VerboseTranscript {
    text: String,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    segments: Vec<VerboseSegment>,
}

#[derive(Debug, Deserialize)]
struct VerboseSegment {
    text: String,
    start: f64,
    end: f64,
    #[serde(default)]
    no_speech_prob: Option<f64>,
}

impl From<VerboseTranscript> for RawTranscript {
    fn from(wire: VerboseTranscript) -> Self {
        RawTranscript {
            text: wire.text.trim().to_string(),
            language: wire.language.as_deref().map(language_code),
            segments: wire
                .segments
                .into_iter()
                .map(|s| RawSegment {
                    text: s.text.trim().to_string(),
                    start: s.start,
                    end: s.end,
                    no_speech_prob: s.no_speech_prob,
                })
                .collect(),
        }
    }
}

/// Normalise the language reported by the server to an ISO 639-1 code
///
/// Hosted servers report full English names ("spanish") while local
/// whisper servers report codes ("es"); codes pass through unchanged.
fn language_code(reported: &str) -> String {
    let lower = reported.trim().to_ascii_lowercase();
    let code = match lower.as_str() {
        "english" => "en",
        "spanish" => "es",
        "french" => "fr",
        "german" => "de",
        "italian" => "it",
        "portuguese" => "pt",
        "arabic" => "ar",
        "ukrainian" => "uk",
        "russian" => "ru",
        "persian" => "fa",
        "turkish" => "tr",
        "chinese" => "zh",
        "romanian" => "ro",
        "catalan" => "ca",
        _ => return lower,
    };
    code.to_string()
}

/// Speech recognition on an OpenAI-compatible server
pub struct HttpSpeechModel {
    http_client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl HttpSpeechModel {
    pub fn new(
        endpoint: &str,
        model: &str,
        api_key: Option<String>,
        timeout_secs: u64,
    ) -> Result<Self, BackendError> {
        if model.trim().is_empty() {
            return Err(BackendError::Config("model id must not be empty".to_string()));
        }

        Ok(Self {
            http_client: http_client(timeout_secs)?,
            base_url: base_url(endpoint)?,
            model: model.to_string(),
            api_key,
        })
    }

    fn url_for(&self, task: TranscriptionTask) -> String {
        match task {
            TranscriptionTask::Transcribe => format!("{}/audio/transcriptions", self.base_url),
            TranscriptionTask::Translate => format!("{}/audio/translations", self.base_url),
        }
    }
}

#[async_trait]
impl SpeechModel for HttpSpeechModel {
    fn name(&self) -> &str {
        &self.model
    }

    async fn transcribe(
        &self,
        audio: &Path,
        options: &TranscribeOptions,
    ) -> Result<RawTranscript, BackendError> {
        let bytes = tokio::fs::read(audio).await?;
        let file_name = audio
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("audio.wav")
            .to_string();

        let mut form = Form::new()
            .part("file", Part::bytes(bytes).file_name(file_name))
            .text("model", self.model.clone())
            .text("response_format", "verbose_json");

        // The translations endpoint always targets English and takes no language
        if options.task == TranscriptionTask::Transcribe {
            if let Some(language) = &options.language {
                form = form.text("language", language.clone());
            }
        }

        let mut request = self
            .http_client
            .post(self.url_for(options.task))
            .multipart(form);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        tracing::debug!(
            model = %self.model,
            task = %options.task,
            language = options.language.as_deref().unwrap_or("auto"),
            "Sending transcription request"
        );

        let response = request
            .send()
            .await
            .map_err(|e| BackendError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let transcript: VerboseTranscript = response
            .json()
            .await
            .map_err(|e| BackendError::Parse(e.to_string()))?;

        Ok(transcript.into())
    }
}
