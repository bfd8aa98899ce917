//! Speech transcription
//!
//! Wraps a [`SpeechModel`] with the service's input policy:
//! - Inputs above the upload limit are rejected before the model is called
//! - Duration is measured by decoding the audio (0.0 when undecodable)
//! - Inputs longer than the chunk length are cut into fixed windows, each
//!   transcribed on its own and joined in order
//! - Confidence is the mean of (1 - no-speech probability) over segments
//!
//! Model failures surface as [`ServiceError::InferenceFailure`].

use crate::backends::{RawSegment, RawTranscript, SpeechModel, TranscribeOptions};
use crate::error::{ServiceError, ServiceResult};
use crate::utils::{
    audio_duration_secs, decode_audio_file, write_wav_mono, DecodedAudio, TempAudioFile,
};
use edugame_common::config::{DEFAULT_CHUNK_LENGTH_SECS, DEFAULT_MAX_UPLOAD_BYTES};
use edugame_common::{
    TimedSegment, TimedTranscription, TranscriptChunk, TranscriptionResult, TranscriptionTask,
};
use serde::Serialize;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Confidence assumed when the model reports no probability
const UNKNOWN_CONFIDENCE: f64 = 0.5;

/// Language label used when neither the model nor the caller named one
pub const UNKNOWN_LANGUAGE: &str = "unknown";

/// Transcriber limits and chunking policy
#[derive(Debug, Clone)]
pub struct TranscriberSettings {
    pub max_upload_bytes: u64,
    pub chunk_length_secs: u32,
    pub chunking_enabled: bool,
    /// Directory for chunk files (system temp dir when `None`)
    pub temp_dir: Option<PathBuf>,
}

impl Default for TranscriberSettings {
    fn default() -> Self {
        Self {
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            chunk_length_secs: DEFAULT_CHUNK_LENGTH_SECS,
            chunking_enabled: true,
            temp_dir: None,
        }
    }
}

/// Spoken language of an audio input
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LanguageDetection {
    pub language: String,
    pub confidence: f64,
}

/// Mean of (1 - no_speech_prob), clamped to [0, 1]
///
/// A segment without a probability counts as 0.5; no segments gives 0.5.
pub fn segment_confidence(segments: &[RawSegment]) -> f64 {
    if segments.is_empty() {
        return UNKNOWN_CONFIDENCE;
    }
    let total: f64 = segments
        .iter()
        .map(|s| s.no_speech_prob.unwrap_or(UNKNOWN_CONFIDENCE))
        .sum();
    (1.0 - total / segments.len() as f64).clamp(0.0, 1.0)
}

/// Consecutive sample windows of `window` samples; the last may be shorter
pub fn chunk_windows(total_samples: usize, window: usize) -> Vec<Range<usize>> {
    if window == 0 {
        return vec![0..total_samples];
    }
    (0..total_samples)
        .step_by(window)
        .map(|start| start..(start + window).min(total_samples))
        .collect()
}

fn round_duration(secs: f64) -> f64 {
    (secs * 100.0).round() / 100.0
}

/// Audio → text transcriber
pub struct SpeechTranscriber {
    model: Arc<dyn SpeechModel>,
    settings: TranscriberSettings,
}

impl SpeechTranscriber {
    pub fn new(model: Arc<dyn SpeechModel>, settings: TranscriberSettings) -> Self {
        Self { model, settings }
    }

    pub fn settings(&self) -> &TranscriberSettings {
        &self.settings
    }

    async fn check_size(&self, audio: &Path) -> ServiceResult<()> {
        let size = tokio::fs::metadata(audio).await?.len();
        if size > self.settings.max_upload_bytes {
            return Err(ServiceError::PayloadTooLarge {
                size,
                limit: self.settings.max_upload_bytes,
            });
        }
        Ok(())
    }

    /// Decode off the async runtime; `None` when the audio is undecodable
    async fn decode(&self, audio: &Path) -> Option<DecodedAudio> {
        let path = audio.to_path_buf();
        match tokio::task::spawn_blocking(move || decode_audio_file(&path)).await {
            Ok(Ok(decoded)) => Some(decoded),
            Ok(Err(e)) => {
                warn!(
                    path = %audio.display(),
                    error = %e,
                    "Could not decode audio, duration unknown"
                );
                None
            }
            Err(e) => {
                warn!(error = %e, "Audio decode task failed");
                None
            }
        }
    }

    /// Duration without keeping the samples; 0.0 when undecodable
    async fn probe_duration(&self, audio: &Path) -> f64 {
        let path = audio.to_path_buf();
        match tokio::task::spawn_blocking(move || audio_duration_secs(&path)).await {
            Ok(Ok(duration)) => duration,
            Ok(Err(e)) => {
                warn!(
                    path = %audio.display(),
                    error = %e,
                    "Could not read audio duration"
                );
                0.0
            }
            Err(e) => {
                warn!(error = %e, "Audio duration task failed");
                0.0
            }
        }
    }

    async fn call_model(
        &self,
        audio: &Path,
        options: &TranscribeOptions,
    ) -> ServiceResult<RawTranscript> {
        self.model.transcribe(audio, options).await.map_err(|e| {
            warn!(model = self.model.name(), error = %e, "Transcription failed");
            ServiceError::InferenceFailure(e.to_string())
        })
    }

    /// Write one window of samples to a scoped WAV file
    async fn write_window(
        &self,
        samples: Vec<f32>,
        sample_rate: u32,
    ) -> ServiceResult<TempAudioFile> {
        let temp = TempAudioFile::create(self.settings.temp_dir.as_deref(), Some("wav"))?;
        let path = temp.to_path_buf();
        tokio::task::spawn_blocking(move || write_wav_mono(&path, &samples, sample_rate))
            .await
            .map_err(|e| ServiceError::Internal(format!("chunk writer task failed: {}", e)))?
            .map_err(|e| ServiceError::Internal(format!("failed to write audio chunk: {:#}", e)))?;
        Ok(temp)
    }

    /// Transcribe (or translate to English) an audio file
    pub async fn transcribe(
        &self,
        audio: &Path,
        language: Option<&str>,
        task: TranscriptionTask,
    ) -> ServiceResult<TranscriptionResult> {
        self.check_size(audio).await?;

        let options = TranscribeOptions {
            language: language.map(str::to_string),
            task,
        };
        let decoded = self.decode(audio).await;
        let duration = decoded.as_ref().map_or(0.0, |d| d.duration_seconds);

        info!(
            path = %audio.display(),
            task = %task,
            language = language.unwrap_or("auto"),
            duration = format!("{:.2}", duration),
            "Transcribing audio"
        );

        let chunk_length = self.settings.chunk_length_secs as f64;
        if let Some(decoded) = decoded {
            if self.settings.chunking_enabled && chunk_length > 0.0 && duration > chunk_length {
                return self.transcribe_chunked(decoded, &options).await;
            }
        }

        let raw = self.call_model(audio, &options).await?;
        Ok(TranscriptionResult {
            transcription: raw.text.trim().to_string(),
            detected_language: raw
                .language
                .or(options.language)
                .unwrap_or_else(|| UNKNOWN_LANGUAGE.to_string()),
            confidence: segment_confidence(&raw.segments),
            duration: round_duration(duration),
            chunks: None,
            error: None,
        })
    }

    /// Transcribe fixed windows independently and join the texts in order
    ///
    /// A failed window contributes empty text; if every window fails the
    /// whole transcription fails.
    async fn transcribe_chunked(
        &self,
        decoded: DecodedAudio,
        options: &TranscribeOptions,
    ) -> ServiceResult<TranscriptionResult> {
        let rate = decoded.sample_rate;
        let window = self.settings.chunk_length_secs as usize * rate as usize;
        let windows = chunk_windows(decoded.samples.len(), window);

        info!(
            chunks = windows.len(),
            chunk_length_secs = self.settings.chunk_length_secs,
            "Transcribing in chunks"
        );

        let mut chunks = Vec::with_capacity(windows.len());
        let mut segments: Vec<RawSegment> = Vec::new();
        let mut detected_language: Option<String> = None;
        let mut failures = 0usize;
        let mut last_error: Option<ServiceError> = None;

        for (index, range) in windows.iter().enumerate() {
            let start = range.start as f64 / rate as f64;
            let end = (range.end as f64 / rate as f64).min(decoded.duration_seconds);

            let temp = self
                .write_window(decoded.samples[range.clone()].to_vec(), rate)
                .await?;
            let text = match self.call_model(temp.path(), options).await {
                Ok(raw) => {
                    if detected_language.is_none() {
                        detected_language = raw.language.clone();
                    }
                    segments.extend(raw.segments);
                    raw.text.trim().to_string()
                }
                Err(e) => {
                    warn!(chunk = index, start, end, error = %e, "Chunk transcription failed");
                    failures += 1;
                    last_error = Some(e);
                    String::new()
                }
            };
            debug!(chunk = index, start, end, chars = text.len(), "Chunk transcribed");

            chunks.push(TranscriptChunk { start, end, text });
        }

        if failures == windows.len() {
            return Err(last_error
                .unwrap_or_else(|| ServiceError::InferenceFailure("no audio chunks".to_string())));
        }

        let transcription = chunks
            .iter()
            .map(|c| c.text.as_str())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        Ok(TranscriptionResult {
            transcription,
            detected_language: detected_language
                .or_else(|| options.language.clone())
                .unwrap_or_else(|| UNKNOWN_LANGUAGE.to_string()),
            confidence: segment_confidence(&segments),
            duration: round_duration(decoded.duration_seconds),
            chunks: Some(chunks),
            error: None,
        })
    }

    /// Transcribe with per-segment timing
    pub async fn transcribe_with_timestamps(
        &self,
        audio: &Path,
        language: Option<&str>,
    ) -> ServiceResult<TimedTranscription> {
        self.check_size(audio).await?;

        let options = TranscribeOptions {
            language: language.map(str::to_string),
            task: TranscriptionTask::Transcribe,
        };
        let duration = self.probe_duration(audio).await;
        let raw = self.call_model(audio, &options).await?;

        let segments = raw
            .segments
            .iter()
            .map(|s| TimedSegment {
                text: s.text.trim().to_string(),
                start: s.start,
                end: s.end,
                confidence: segment_confidence(std::slice::from_ref(s)),
            })
            .collect();

        Ok(TimedTranscription {
            transcription: raw.text.trim().to_string(),
            segments,
            detected_language: raw
                .language
                .or(options.language)
                .unwrap_or_else(|| UNKNOWN_LANGUAGE.to_string()),
            duration: round_duration(duration),
        })
    }

    /// Identify the spoken language
    ///
    /// Only the first window is sent when the audio is longer than the
    /// chunk length.
    pub async fn detect_language(&self, audio: &Path) -> ServiceResult<LanguageDetection> {
        self.check_size(audio).await?;

        let options = TranscribeOptions::default();
        let window_secs = self.settings.chunk_length_secs.max(1) as f64;

        let raw = match self.decode(audio).await {
            Some(decoded) if decoded.duration_seconds > window_secs => {
                let window = (window_secs as usize) * decoded.sample_rate as usize;
                let head = decoded.samples[..window.min(decoded.samples.len())].to_vec();
                let temp = self.write_window(head, decoded.sample_rate).await?;
                self.call_model(temp.path(), &options).await?
            }
            _ => self.call_model(audio, &options).await?,
        };

        let detection = LanguageDetection {
            language: raw.language.unwrap_or_else(|| UNKNOWN_LANGUAGE.to_string()),
            confidence: segment_confidence(&raw.segments),
        };
        info!(language = %detection.language, confidence = detection.confidence, "Detected language");
        Ok(detection)
    }
}
