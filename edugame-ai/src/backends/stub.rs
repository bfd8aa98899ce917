//! In-process stub backends
//!
//! Canned responses for local development without inference servers
//! (`backend = "stub"` in the config) and for tests. Every stub counts its
//! calls and can be switched into a failing mode.

use super::factory::ModelFactory;
use super::{
    AudioEmotionModel, BackendError, ChatMessage, Completion, LabelScore, LanguageModel,
    ModelKind, RawSegment, RawTranscript, SpeechModel, TextEmotionModel, ToolSpec,
    TranscribeOptions,
};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

fn stub_failure(name: &str) -> BackendError {
    BackendError::Api(500, format!("{} configured to fail", name))
}

// ============================================================================
// Classifiers
// ============================================================================

/// Audio emotion stub returning a fixed distribution
pub struct StubAudioModel {
    scores: Vec<LabelScore>,
    fail: bool,
    calls: AtomicUsize,
}

impl StubAudioModel {
    pub fn new() -> Self {
        Self::with_scores(vec![
            LabelScore::new("neutral", 0.6),
            LabelScore::new("calm", 0.3),
            LabelScore::new("happy", 0.1),
        ])
    }

    pub fn with_scores(scores: Vec<LabelScore>) -> Self {
        Self {
            scores,
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::with_scores(Vec::new())
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for StubAudioModel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AudioEmotionModel for StubAudioModel {
    fn name(&self) -> &str {
        "stub-audio-emotion"
    }

    async fn classify(&self, _audio: &Path) -> Result<Vec<LabelScore>, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(stub_failure(self.name()));
        }
        Ok(self.scores.clone())
    }
}

/// Text emotion stub returning a fixed distribution
pub struct StubTextModel {
    scores: Vec<LabelScore>,
    fail: bool,
    calls: AtomicUsize,
}

impl StubTextModel {
    pub fn new() -> Self {
        Self::with_scores(vec![
            LabelScore::new("joy", 0.55),
            LabelScore::new("surprise", 0.25),
            LabelScore::new("sadness", 0.2),
        ])
    }

    pub fn with_scores(scores: Vec<LabelScore>) -> Self {
        Self {
            scores,
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::with_scores(Vec::new())
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for StubTextModel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TextEmotionModel for StubTextModel {
    fn name(&self) -> &str {
        "stub-text-emotion"
    }

    async fn classify(&self, _text: &str) -> Result<Vec<LabelScore>, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(stub_failure(self.name()));
        }
        Ok(self.scores.clone())
    }
}

// ============================================================================
// Speech
// ============================================================================

/// Speech stub cycling through canned transcripts
///
/// Call `n` returns transcript `n % len`, so chunked transcription order is
/// observable.
pub struct StubSpeechModel {
    transcripts: Vec<RawTranscript>,
    fail_on_call: Option<usize>,
    fail_all: bool,
    calls: AtomicUsize,
    options_seen: Mutex<Vec<TranscribeOptions>>,
}

impl StubSpeechModel {
    pub fn new() -> Self {
        Self::with_transcripts(vec![RawTranscript {
            text: "hola, me llamo Ana".to_string(),
            language: Some("es".to_string()),
            segments: vec![RawSegment {
                text: "hola, me llamo Ana".to_string(),
                start: 0.0,
                end: 1.5,
                no_speech_prob: Some(0.1),
            }],
        }])
    }

    pub fn with_transcripts(transcripts: Vec<RawTranscript>) -> Self {
        Self {
            transcripts,
            fail_on_call: None,
            fail_all: false,
            calls: AtomicUsize::new(0),
            options_seen: Mutex::new(Vec::new()),
        }
    }

    /// Single transcript with one segment per `(text, no_speech_prob)`
    pub fn with_segments(language: &str, segments: &[(&str, Option<f64>)]) -> Self {
        let segments: Vec<RawSegment> = segments
            .iter()
            .enumerate()
            .map(|(i, (text, nsp))| RawSegment {
                text: text.to_string(),
                start: i as f64,
                end: i as f64 + 1.0,
                no_speech_prob: *nsp,
            })
            .collect();
        let text = segments
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");

        Self::with_transcripts(vec![RawTranscript {
            text,
            language: Some(language.to_string()),
            segments,
        }])
    }

    pub fn failing() -> Self {
        Self {
            fail_all: true,
            ..Self::with_transcripts(Vec::new())
        }
    }

    /// Fail only the call with this zero-based index
    pub fn fail_on_call(mut self, index: usize) -> Self {
        self.fail_on_call = Some(index);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Options of every call so far
    pub async fn options_seen(&self) -> Vec<TranscribeOptions> {
        self.options_seen.lock().await.clone()
    }
}

impl Default for StubSpeechModel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SpeechModel for StubSpeechModel {
    fn name(&self) -> &str {
        "stub-speech"
    }

    async fn transcribe(
        &self,
        _audio: &Path,
        options: &TranscribeOptions,
    ) -> Result<RawTranscript, BackendError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        self.options_seen.lock().await.push(options.clone());

        if self.fail_all || self.fail_on_call == Some(call) || self.transcripts.is_empty() {
            return Err(stub_failure(self.name()));
        }

        Ok(self.transcripts[call % self.transcripts.len()].clone())
    }
}

// ============================================================================
// Language model
// ============================================================================

/// Language model stub replaying queued completions
///
/// Once the queue is empty every call returns the default reply.
pub struct StubLanguageModel {
    queue: Mutex<VecDeque<Result<Completion, String>>>,
    default_reply: String,
    fail: bool,
    calls: AtomicUsize,
    requests: Mutex<Vec<StubRequest>>,
}

/// What the stub language model was asked
#[derive(Debug, Clone)]
pub struct StubRequest {
    pub messages: Vec<ChatMessage>,
    pub tool_names: Vec<String>,
}

impl StubLanguageModel {
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            default_reply: "¡Muy bien! Sigamos practicando juntos.".to_string(),
            fail: false,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_reply(reply: impl Into<String>) -> Self {
        Self {
            default_reply: reply.into(),
            ..Self::new()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    /// Queue completions returned before the default reply
    pub fn with_script(script: Vec<Result<Completion, String>>) -> Self {
        Self {
            queue: Mutex::new(script.into()),
            ..Self::new()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub async fn requests(&self) -> Vec<StubRequest> {
        self.requests.lock().await.clone()
    }
}

impl Default for StubLanguageModel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LanguageModel for StubLanguageModel {
    fn name(&self) -> &str {
        "stub-language-model"
    }

    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolSpec],
    ) -> Result<Completion, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().await.push(StubRequest {
            messages: messages.to_vec(),
            tool_names: tools.iter().map(|t| t.name.clone()).collect(),
        });

        if self.fail {
            return Err(stub_failure(self.name()));
        }

        match self.queue.lock().await.pop_front() {
            Some(Ok(completion)) => Ok(completion),
            Some(Err(message)) => Err(BackendError::Api(500, message)),
            None => Ok(Completion::text(self.default_reply.clone())),
        }
    }
}

// ============================================================================
// Factory
// ============================================================================

/// Factory handing out shared stub instances
///
/// Counts loads per model and can fail the next `n` loads of a model, with
/// an optional delay to widen the window for concurrent first calls.
pub struct StubModelFactory {
    pub audio: Arc<StubAudioModel>,
    pub text: Arc<StubTextModel>,
    pub speech: Arc<StubSpeechModel>,
    pub llm: Arc<StubLanguageModel>,
    loads: [AtomicUsize; 4],
    pending_failures: [AtomicUsize; 4],
    load_delay: Duration,
}

fn slot(kind: ModelKind) -> usize {
    match kind {
        ModelKind::AudioEmotion => 0,
        ModelKind::TextEmotion => 1,
        ModelKind::Speech => 2,
        ModelKind::LanguageModel => 3,
    }
}

impl StubModelFactory {
    pub fn new() -> Self {
        Self {
            audio: Arc::new(StubAudioModel::new()),
            text: Arc::new(StubTextModel::new()),
            speech: Arc::new(StubSpeechModel::new()),
            llm: Arc::new(StubLanguageModel::new()),
            loads: Default::default(),
            pending_failures: Default::default(),
            load_delay: Duration::ZERO,
        }
    }

    pub fn with_audio(mut self, audio: StubAudioModel) -> Self {
        self.audio = Arc::new(audio);
        self
    }

    pub fn with_text(mut self, text: StubTextModel) -> Self {
        self.text = Arc::new(text);
        self
    }

    pub fn with_speech(mut self, speech: StubSpeechModel) -> Self {
        self.speech = Arc::new(speech);
        self
    }

    pub fn with_llm(mut self, llm: StubLanguageModel) -> Self {
        self.llm = Arc::new(llm);
        self
    }

    pub fn with_load_delay(mut self, delay: Duration) -> Self {
        self.load_delay = delay;
        self
    }

    /// Make the next `count` loads of `kind` fail
    pub fn fail_loads(self, kind: ModelKind, count: usize) -> Self {
        self.pending_failures[slot(kind)].store(count, Ordering::SeqCst);
        self
    }

    /// Successful and failed load attempts of `kind`
    pub fn loads(&self, kind: ModelKind) -> usize {
        self.loads[slot(kind)].load(Ordering::SeqCst)
    }

    async fn load(&self, kind: ModelKind) -> Result<(), BackendError> {
        self.loads[slot(kind)].fetch_add(1, Ordering::SeqCst);
        if !self.load_delay.is_zero() {
            tokio::time::sleep(self.load_delay).await;
        }

        let pending = &self.pending_failures[slot(kind)];
        let failed = pending
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            return Err(BackendError::Config(format!("stub {} load failure", kind)));
        }
        Ok(())
    }
}

impl Default for StubModelFactory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ModelFactory for StubModelFactory {
    async fn audio_emotion(&self) -> Result<Arc<dyn AudioEmotionModel>, BackendError> {
        self.load(ModelKind::AudioEmotion).await?;
        Ok(self.audio.clone())
    }

    async fn text_emotion(&self) -> Result<Arc<dyn TextEmotionModel>, BackendError> {
        self.load(ModelKind::TextEmotion).await?;
        Ok(self.text.clone())
    }

    async fn speech(&self) -> Result<Arc<dyn SpeechModel>, BackendError> {
        self.load(ModelKind::Speech).await?;
        Ok(self.speech.clone())
    }

    async fn language_model(&self) -> Result<Arc<dyn LanguageModel>, BackendError> {
        self.load(ModelKind::LanguageModel).await?;
        Ok(self.llm.clone())
    }
}
