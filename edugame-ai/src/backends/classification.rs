//! Hosted classification backends
//!
//! Both emotion classifiers speak the Hugging Face Inference API dialect:
//! `POST {endpoint}/models/{model}` with either the raw audio bytes or
//! `{"inputs": "<text>"}` as body, answered by a list of `{label, score}`.
//! Text classification wraps that list in another list (one per input), so
//! both shapes are accepted.

use super::{
    api_error, base_url, http_client, AudioEmotionModel, BackendError, LabelScore,
    TextEmotionModel,
};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::path::Path;

pub const DEFAULT_HF_ENDPOINT: &str = "https://api-inference.huggingface.co";
pub const DEFAULT_AUDIO_EMOTION_MODEL: &str =
    "ehcalabres/wav2vec2-lg-xlsr-en-speech-emotion-recognition";
pub const DEFAULT_TEXT_EMOTION_MODEL: &str = "bhadresh-savani/distilbert-base-uncased-emotion";
pub const DEFAULT_HF_KEY_ENV: &str = "HF_API_TOKEN";

/// Upper bound on labels requested from text classifiers
const TEXT_TOP_K: usize = 32;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ClassificationResponse {
    Flat(Vec<LabelScore>),
    Nested(Vec<Vec<LabelScore>>),
}

impl ClassificationResponse {
    fn into_scores(self) -> Vec<LabelScore> {
        match self {
            ClassificationResponse::Flat(scores) => scores,
            ClassificationResponse::Nested(batches) => batches.into_iter().next().unwrap_or_default(),
        }
    }
}

/// Shared request plumbing for one hosted model
struct InferenceClient {
    http_client: reqwest::Client,
    url: String,
    model: String,
    api_key: Option<String>,
}

impl InferenceClient {
    fn new(
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
            url: format!("{}/models/{}", base_url(endpoint)?, model),
            model: model.to_string(),
            api_key,
        })
    }

    fn request(&self) -> reqwest::RequestBuilder {
        let request = self.http_client.post(&self.url);
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Vec<LabelScore>, BackendError> {
        let response = request
            .send()
            .await
            .map_err(|e| BackendError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let parsed: ClassificationResponse = response
            .json()
            .await
            .map_err(|e| BackendError::Parse(e.to_string()))?;

        let scores = parsed.into_scores();
        tracing::debug!(model = %self.model, labels = scores.len(), "Classification response");
        Ok(scores)
    }
}

/// Content type for an audio file, from its extension
fn audio_content_type(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .as_deref()
    {
        Some("wav") => "audio/wav",
        Some("mp3") => "audio/mpeg",
        Some("m4a") | Some("mp4") => "audio/mp4",
        Some("ogg") => "audio/ogg",
        Some("webm") => "audio/webm",
        Some("flac") => "audio/flac",
        _ => "application/octet-stream",
    }
}

/// Audio emotion classifier on a hosted inference endpoint
pub struct HttpAudioEmotionModel {
    client: InferenceClient,
}

impl HttpAudioEmotionModel {
    pub fn new(
        endpoint: &str,
        model: &str,
        api_key: Option<String>,
        timeout_secs: u64,
    ) -> Result<Self, BackendError> {
        Ok(Self {
            client: InferenceClient::new(endpoint, model, api_key, timeout_secs)?,
        })
    }
}

#[async_trait]
impl AudioEmotionModel for HttpAudioEmotionModel {
    fn name(&self) -> &str {
        &self.client.model
    }

    async fn classify(&self, audio: &Path) -> Result<Vec<LabelScore>, BackendError> {
        let bytes = tokio::fs::read(audio).await?;
        let request = self
            .client
            .request()
            .header(reqwest::header::CONTENT_TYPE, audio_content_type(audio))
            .body(bytes);
        self.client.send(request).await
    }
}

/// Text emotion classifier on a hosted inference endpoint
pub struct HttpTextEmotionModel {
    client: InferenceClient,
}

impl HttpTextEmotionModel {
    pub fn new(
        endpoint: &str,
        model: &str,
        api_key: Option<String>,
        timeout_secs: u64,
    ) -> Result<Self, BackendError> {
        Ok(Self {
            client: InferenceClient::new(endpoint, model, api_key, timeout_secs)?,
        })
    }
}

#[async_trait]
impl TextEmotionModel for HttpTextEmotionModel {
    fn name(&self) -> &str {
        &self.client.model
    }

    async fn classify(&self, text: &str) -> Result<Vec<LabelScore>, BackendError> {
        let body = json!({
            "inputs": text,
            "parameters": { "top_k": TEXT_TOP_K },
            "options": { "wait_for_model": true },
        });
        self.client.send(self.client.request().json(&body)).await
    }
}
