//! Model backends
//!
//! Every wrapped model sits behind one of four traits. The service logic only
//! ever sees these traits; which implementation serves them (remote inference
//! server or in-process stub) is decided by [`factory::BackendFactory`] from
//! configuration.
//!
//! # Backends
//! 1. Audio emotion classification - raw audio → label scores
//! 2. Text emotion classification - text → label scores
//! 3. Speech recognition - audio → transcript with segments
//! 4. Language model - chat messages + tools → completion

pub mod chat;
pub mod classification;
pub mod factory;
pub mod stub;
pub mod whisper;

use async_trait::async_trait;
use edugame_common::TranscriptionTask;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use thiserror::Error;

/// Models managed by the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    AudioEmotion,
    TextEmotion,
    Speech,
    LanguageModel,
}

impl ModelKind {
    pub const ALL: [ModelKind; 4] = [
        ModelKind::AudioEmotion,
        ModelKind::TextEmotion,
        ModelKind::Speech,
        ModelKind::LanguageModel,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelKind::AudioEmotion => "audio_emotion",
            ModelKind::TextEmotion => "text_emotion",
            ModelKind::Speech => "speech",
            ModelKind::LanguageModel => "language_model",
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Backend errors
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

// ============================================================================
// Classification
// ============================================================================

/// One label with its probability
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelScore {
    pub label: String,
    pub score: f64,
}

impl LabelScore {
    pub fn new(label: impl Into<String>, score: f64) -> Self {
        Self {
            label: label.into(),
            score,
        }
    }
}

/// Audio emotion classifier backend
#[async_trait]
pub trait AudioEmotionModel: Send + Sync {
    /// Backend name for logs
    fn name(&self) -> &str;

    /// Score every emotion label for the audio file
    async fn classify(&self, audio: &Path) -> Result<Vec<LabelScore>, BackendError>;
}

/// Text emotion classifier backend
#[async_trait]
pub trait TextEmotionModel: Send + Sync {
    fn name(&self) -> &str;

    /// Score every emotion label for the text
    async fn classify(&self, text: &str) -> Result<Vec<LabelScore>, BackendError>;
}

// ============================================================================
// Speech
// ============================================================================

/// Options passed through to the speech model
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TranscribeOptions {
    /// Language code; `None` lets the model detect it
    pub language: Option<String>,
    pub task: TranscriptionTask,
}

/// Segment as reported by the speech model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSegment {
    pub text: String,
    pub start: f64,
    pub end: f64,
    /// Probability that the segment contains no speech
    #[serde(default)]
    pub no_speech_prob: Option<f64>,
}

/// Transcript as reported by the speech model
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTranscript {
    pub text: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub segments: Vec<RawSegment>,
}

/// Speech recognition backend
#[async_trait]
pub trait SpeechModel: Send + Sync {
    fn name(&self) -> &str;

    async fn transcribe(
        &self,
        audio: &Path,
        options: &TranscribeOptions,
    ) -> Result<RawTranscript, BackendError>;
}

// ============================================================================
// Language model
// ============================================================================

/// Chat message author
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// Tool invocation requested by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    /// JSON-encoded arguments
    pub arguments: String,
}

/// One message of a conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    fn text(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: Some(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::text(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::text(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::text(Role::Assistant, content)
    }

    /// Assistant turn that only requests tool calls
    pub fn assistant_tool_calls(tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: Role::Assistant,
            content: None,
            tool_calls,
            tool_call_id: None,
        }
    }

    /// Result of executing a tool call
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: Some(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: Some(tool_call_id.into()),
        }
    }
}

/// Tool offered to the model
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    /// JSON schema of the arguments object
    pub parameters: serde_json::Value,
}

/// Model output for one completion request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Completion {
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCall>,
}

impl Completion {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            tool_calls: Vec::new(),
        }
    }

    pub fn tool_calls(tool_calls: Vec<ToolCall>) -> Self {
        Self {
            content: None,
            tool_calls,
        }
    }
}

/// Text-generation backend
#[async_trait]
pub trait LanguageModel: Send + Sync {
    fn name(&self) -> &str;

    /// Generate the next assistant turn
    ///
    /// An empty `tools` slice means the model must answer in text.
    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolSpec],
    ) -> Result<Completion, BackendError>;
}

/// Build the shared HTTP client used by the remote backends
pub(crate) fn http_client(timeout_secs: u64) -> Result<reqwest::Client, BackendError> {
    reqwest::Client::builder()
        .user_agent(concat!("edugame-ai/", env!("CARGO_PKG_VERSION")))
        .timeout(std::time::Duration::from_secs(timeout_secs.max(1)))
        .build()
        .map_err(|e| BackendError::Network(e.to_string()))
}

/// Validate and normalise a base URL (no trailing slash)
pub(crate) fn base_url(raw: &str) -> Result<String, BackendError> {
    let trimmed = raw.trim().trim_end_matches('/');
    let parsed = reqwest::Url::parse(trimmed)
        .map_err(|e| BackendError::Config(format!("invalid endpoint '{}': {}", raw, e)))?;
    match parsed.scheme() {
        "http" | "https" => Ok(trimmed.to_string()),
        other => Err(BackendError::Config(format!(
            "unsupported endpoint scheme '{}' in '{}'",
            other, raw
        ))),
    }
}

/// Turn a non-success response into an API error with its body text
pub(crate) async fn api_error(response: reqwest::Response) -> BackendError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    BackendError::Api(status, body)
}
