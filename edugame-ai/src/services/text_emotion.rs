//! Text emotion classification with sentiment scoring

use crate::backends::TextEmotionModel;
use edugame_common::{EmotionLabel, EmotionResult, Modality, Probabilities};
use std::sync::Arc;
use tracing::{info, warn};

/// Polarity of each text emotion label; unknown labels are neutral (0.0)
fn sentiment_polarity(label: &str) -> f64 {
    match label {
        "joy" => 1.0,
        "love" => 0.8,
        "surprise" => 0.3,
        "neutral" => 0.0,
        "fear" => -0.5,
        "sadness" => -0.7,
        "anger" => -0.9,
        _ => 0.0,
    }
}

/// Sentiment in [-1, 1]: label polarity scaled by confidence
pub fn sentiment_score(label: &str, confidence: f64) -> f64 {
    sentiment_polarity(&label.to_ascii_lowercase()) * confidence
}

/// Text → emotion classifier
pub struct TextEmotionClassifier {
    model: Arc<dyn TextEmotionModel>,
}

impl TextEmotionClassifier {
    pub fn new(model: Arc<dyn TextEmotionModel>) -> Self {
        Self { model }
    }

    /// Detect the emotion of a piece of text
    ///
    /// Blank text is neutral with confidence 0 and no distribution, without
    /// calling the model.
    pub async fn analyze(&self, text: &str) -> EmotionResult {
        if text.trim().is_empty() {
            return EmotionResult::new(EmotionLabel::neutral(Modality::Text), 0.0, Probabilities::new());
        }

        let scores = match self.model.classify(text).await {
            Ok(scores) => scores,
            Err(e) => {
                warn!(model = self.model.name(), error = %e, "Text emotion inference failed");
                return EmotionResult::failed(Modality::Text, e.to_string());
            }
        };

        let mut probabilities = Probabilities::new();
        let mut best: Option<(String, f64)> = None;
        for score in &scores {
            let label = score.label.trim().to_ascii_lowercase();
            let value = if score.score.is_finite() {
                score.score.clamp(0.0, 1.0)
            } else {
                0.0
            };
            if best.as_ref().map_or(true, |(_, top)| value > *top) {
                best = Some((label.clone(), value));
            }
            probabilities.insert(label, value);
        }

        let Some((label, confidence)) = best else {
            warn!(model = self.model.name(), "Text emotion model returned no labels");
            return EmotionResult::failed(Modality::Text, "text emotion model returned no labels");
        };

        let sentiment = sentiment_score(&label, confidence);
        info!(emotion = %label, confidence, sentiment, "Detected text emotion");

        let mut result = EmotionResult::new(EmotionLabel::Text(label), confidence, probabilities);
        result.sentiment_score = Some(sentiment);
        result
    }
}
