//! Multimodal emotion fusion
//!
//! Combines the audio and text detections of one utterance into a single
//! emotion, then asks the [`PedagogicalRecommender`] what to do about it.
//!
//! # Decision rules
//! - Both modalities: audio wins only with strictly greater confidence; ties
//!   go to text
//! - Audio wins, or audio alone: audio's own recommendations
//! - Text wins: the audio recommendation table looked up with the text label
//!   (see [`text_to_audio_vocabulary`])
//! - Text alone: no recommendations
//! - Neither: neutral at confidence 0.0
//!
//! Results carrying an error note are stand-ins for failed inference and
//! take no part in the decision, though they are still reported.

use super::recommender::PedagogicalRecommender;
use edugame_common::{EmotionLabel, EmotionResult, FusionResult, Modality, RecommendationSet};
use std::sync::Arc;
use tracing::debug;

/// Map a text-model label onto the audio table's key space
///
/// The two models share no vocabulary beyond a few coincidences, so this is
/// the identity: a text label such as "joy" is not an audio key and the
/// table lookup falls through to the defaults.
pub fn text_to_audio_vocabulary(label: &str) -> &str {
    label
}

/// Key used for recommendation table lookups
fn table_key(label: &EmotionLabel) -> &str {
    match label {
        EmotionLabel::Audio(emotion) => emotion.as_str(),
        EmotionLabel::Text(label) => text_to_audio_vocabulary(label),
    }
}

/// Fuses per-modality detections into one pedagogical decision
#[derive(Debug, Clone)]
pub struct MultimodalFusionPolicy {
    recommender: Arc<PedagogicalRecommender>,
}

impl MultimodalFusionPolicy {
    pub fn new(recommender: Arc<PedagogicalRecommender>) -> Self {
        Self { recommender }
    }

    pub fn recommender(&self) -> &PedagogicalRecommender {
        &self.recommender
    }

    fn audio_recommendations(&self, audio: &EmotionResult) -> RecommendationSet {
        audio.recommendations.clone().unwrap_or_else(|| {
            self.recommender
                .recommendations_for(table_key(&audio.emotion), audio.confidence)
        })
    }

    /// Combine the detections; never fails
    pub fn fuse(&self, audio: Option<EmotionResult>, text: Option<EmotionResult>) -> FusionResult {
        let usable_audio = audio.as_ref().filter(|r| !r.is_failure());
        let usable_text = text.as_ref().filter(|r| !r.is_failure());

        let (combined_emotion, confidence, recommendations) = match (usable_audio, usable_text) {
            (Some(a), Some(t)) if a.confidence > t.confidence => {
                (a.emotion.clone(), a.confidence, self.audio_recommendations(a))
            }
            (Some(_), Some(t)) => {
                let recommendations = self
                    .recommender
                    .recommendations_for(table_key(&t.emotion), t.confidence);
                (t.emotion.clone(), t.confidence, recommendations)
            }
            (Some(a), None) => (a.emotion.clone(), a.confidence, self.audio_recommendations(a)),
            (None, Some(t)) => (t.emotion.clone(), t.confidence, Vec::new()),
            (None, None) => (EmotionLabel::neutral(Modality::Audio), 0.0, Vec::new()),
        };

        let adjustments = self
            .recommender
            .adjustments_for(table_key(&combined_emotion), confidence);

        debug!(
            combined = %combined_emotion,
            modality = %combined_emotion.modality(),
            confidence,
            audio_present = usable_audio.is_some(),
            text_present = usable_text.is_some(),
            "Fused emotion"
        );

        FusionResult {
            audio_emotion: audio,
            text_emotion: text,
            combined_emotion,
            confidence,
            recommendations,
            adjustments,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use edugame_common::{AdjustmentRecord, AudioEmotion, Probabilities};

    fn policy() -> MultimodalFusionPolicy {
        MultimodalFusionPolicy::new(Arc::new(PedagogicalRecommender::builtin().unwrap()))
    }

    fn audio(emotion: AudioEmotion, confidence: f64) -> EmotionResult {
        let mut result =
            EmotionResult::new(EmotionLabel::Audio(emotion), confidence, Probabilities::new());
        result.recommendations = Some(
            PedagogicalRecommender::builtin()
                .unwrap()
                .recommendations_for(emotion.as_str(), confidence),
        );
        result
    }

    fn text(label: &str, confidence: f64) -> EmotionResult {
        EmotionResult::new(EmotionLabel::Text(label.to_string()), confidence, Probabilities::new())
    }

    fn defaults() -> RecommendationSet {
        vec!["Continue with current approach".to_string()]
    }

    #[test]
    fn neither_modality_is_neutral() {
        let fused = policy().fuse(None, None);
        assert_eq!(fused.combined_emotion.as_str(), "neutral");
        assert_eq!(fused.confidence, 0.0);
        assert!(fused.recommendations.is_empty());
        assert_eq!(fused.adjustments, AdjustmentRecord::neutral());
    }

    #[test]
    fn confident_audio_wins() {
        let fused = policy().fuse(Some(audio(AudioEmotion::Happy, 0.9)), Some(text("sadness", 0.4)));
        assert_eq!(fused.combined_emotion, EmotionLabel::Audio(AudioEmotion::Happy));
        assert_eq!(fused.confidence, 0.9);
        assert_eq!(fused.adjustments.difficulty_adjustment, 1);
        assert_eq!(fused.recommendations[0], "Maintain current difficulty");
    }

    #[test]
    fn text_wins_with_cross_vocabulary_default() {
        let fused = policy().fuse(Some(audio(AudioEmotion::Calm, 0.3)), Some(text("joy", 0.8)));
        assert_eq!(fused.combined_emotion, EmotionLabel::Text("joy".into()));
        assert_eq!(fused.confidence, 0.8);
        assert_eq!(fused.recommendations, defaults());
        assert_eq!(fused.adjustments, AdjustmentRecord::neutral());
    }

    #[test]
    fn tie_goes_to_text() {
        let fused = policy().fuse(Some(audio(AudioEmotion::Sad, 0.6)), Some(text("fear", 0.6)));
        assert_eq!(fused.combined_emotion, EmotionLabel::Text("fear".into()));
        assert_eq!(fused.confidence, 0.6);
    }

    #[test]
    fn text_label_shared_with_audio_table_hits_it() {
        // A text model emitting an audio key reaches the audio row
        let fused = policy().fuse(Some(audio(AudioEmotion::Neutral, 0.2)), Some(text("calm", 0.7)));
        assert_eq!(fused.recommendations[0], "Maintain current pace");
    }

    #[test]
    fn audio_alone_keeps_its_recommendations() {
        let fused = policy().fuse(Some(audio(AudioEmotion::Angry, 0.75)), None);
        assert_eq!(fused.recommendations[0], "Take a short break");
        assert_eq!(fused.adjustments.break_recommended, Some(true));
        assert!(fused.text_emotion.is_none());
    }

    #[test]
    fn text_alone_has_no_recommendations() {
        let fused = policy().fuse(None, Some(text("anger", 0.9)));
        assert_eq!(fused.combined_emotion.as_str(), "anger");
        assert!(fused.recommendations.is_empty());
        assert_eq!(fused.adjustments, AdjustmentRecord::neutral());
    }

    #[test]
    fn failed_results_are_reported_but_ignored() {
        let failed_audio = EmotionResult::failed(Modality::Audio, "backend down");
        let fused = policy().fuse(Some(failed_audio), Some(text("sadness", 0.3)));

        assert_eq!(fused.combined_emotion.as_str(), "sadness");
        assert!(fused.recommendations.is_empty());
        assert!(fused.audio_emotion.as_ref().is_some_and(|a| a.is_failure()));
    }

    #[test]
    fn serializes_with_adjustment_key() {
        let fused = policy().fuse(Some(audio(AudioEmotion::Fearful, 0.8)), None);
        let json = serde_json::to_value(&fused).unwrap();
        assert_eq!(json["combined_emotion"], "fearful");
        assert_eq!(json["pedagogical_adjustments"]["support_level"], "very_high");
        assert_eq!(json["text_emotion"], serde_json::Value::Null);
    }
}
