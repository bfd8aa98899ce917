//! Audio emotion classification
//!
//! Turns the backend's label scores into a distribution over the closed
//! audio label set and attaches the interventions for the dominant label.
//! Inference failures never escape: the caller gets a neutral stand-in
//! with an error note.

use super::recommender::PedagogicalRecommender;
use crate::backends::{AudioEmotionModel, LabelScore};
use edugame_common::{AudioEmotion, EmotionLabel, EmotionResult, Modality, Probabilities};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Audio → emotion classifier
pub struct AudioEmotionClassifier {
    model: Arc<dyn AudioEmotionModel>,
    recommender: Arc<PedagogicalRecommender>,
}

impl AudioEmotionClassifier {
    pub fn new(model: Arc<dyn AudioEmotionModel>, recommender: Arc<PedagogicalRecommender>) -> Self {
        Self { model, recommender }
    }

    /// Detect the emotion in an audio file
    pub async fn analyze(&self, audio: &Path) -> EmotionResult {
        let scores = match self.model.classify(audio).await {
            Ok(scores) => scores,
            Err(e) => {
                warn!(model = self.model.name(), error = %e, "Audio emotion inference failed");
                return EmotionResult::failed(Modality::Audio, e.to_string());
            }
        };

        let Some((emotion, confidence, probabilities)) = audio_distribution(&scores) else {
            warn!(
                model = self.model.name(),
                labels = ?scores.iter().map(|s| s.label.as_str()).collect::<Vec<_>>(),
                "Audio emotion model returned no recognised labels"
            );
            return EmotionResult::failed(Modality::Audio, "no recognised audio emotion labels");
        };

        let mut result = EmotionResult::new(EmotionLabel::Audio(emotion), confidence, probabilities);
        result.recommendations = Some(
            self.recommender
                .recommendations_for(emotion.as_str(), result.confidence),
        );

        info!(emotion = %emotion, confidence = result.confidence, "Detected audio emotion");
        result
    }
}

/// Distribution over every audio label plus the dominant one
///
/// Labels outside the audio set are dropped; labels the model omitted get
/// probability 0. Returns `None` when no score maps to an audio label.
pub fn audio_distribution(scores: &[LabelScore]) -> Option<(AudioEmotion, f64, Probabilities)> {
    let mut probabilities: Probabilities = AudioEmotion::ALL
        .iter()
        .map(|e| (e.as_str().to_string(), 0.0))
        .collect();
    let mut best: Option<(AudioEmotion, f64)> = None;

    for score in scores {
        let Ok(emotion) = score.label.parse::<AudioEmotion>() else {
            debug!(label = %score.label, "Ignoring label outside the audio set");
            continue;
        };
        let value = if score.score.is_finite() {
            score.score.clamp(0.0, 1.0)
        } else {
            0.0
        };
        probabilities.insert(emotion.as_str().to_string(), value);

        if best.map_or(true, |(_, top)| value > top) {
            best = Some((emotion, value));
        }
    }

    best.map(|(emotion, confidence)| (emotion, confidence, probabilities))
}
