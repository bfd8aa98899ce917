//! Emotion detection, recommendation and fusion types
//!
//! Audio and text emotion models use different vocabularies. Audio labels are
//! a closed set ([`AudioEmotion`]); text labels are whatever the text model
//! emits. [`EmotionLabel`] keeps the modality attached to every label so the
//! two vocabularies never mix silently.

use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Ordered list of interventions; earlier entries are tried first
pub type RecommendationSet = Vec<String>;

/// Label → probability distribution
pub type Probabilities = BTreeMap<String, f64>;

/// Input channel for emotion detection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Modality {
    Audio,
    Text,
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Modality::Audio => write!(f, "audio"),
            Modality::Text => write!(f, "text"),
        }
    }
}

// ============================================================================
// Labels
// ============================================================================

/// Closed label set of the audio emotion model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioEmotion {
    Angry,
    Calm,
    Disgust,
    Fearful,
    Happy,
    Neutral,
    Sad,
    Surprised,
}

impl AudioEmotion {
    /// Every audio label, in model output order
    pub const ALL: [AudioEmotion; 8] = [
        AudioEmotion::Angry,
        AudioEmotion::Calm,
        AudioEmotion::Disgust,
        AudioEmotion::Fearful,
        AudioEmotion::Happy,
        AudioEmotion::Neutral,
        AudioEmotion::Sad,
        AudioEmotion::Surprised,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AudioEmotion::Angry => "angry",
            AudioEmotion::Calm => "calm",
            AudioEmotion::Disgust => "disgust",
            AudioEmotion::Fearful => "fearful",
            AudioEmotion::Happy => "happy",
            AudioEmotion::Neutral => "neutral",
            AudioEmotion::Sad => "sad",
            AudioEmotion::Surprised => "surprised",
        }
    }
}

impl FromStr for AudioEmotion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        AudioEmotion::ALL
            .iter()
            .copied()
            .find(|e| e.as_str() == normalized)
            .ok_or_else(|| format!("unknown audio emotion label: {}", s))
    }
}

impl fmt::Display for AudioEmotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Emotion label tagged with the vocabulary it came from
///
/// Serializes as the bare label string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EmotionLabel {
    Audio(AudioEmotion),
    Text(String),
}

impl EmotionLabel {
    /// Neutral label of the given modality
    pub fn neutral(modality: Modality) -> Self {
        match modality {
            Modality::Audio => EmotionLabel::Audio(AudioEmotion::Neutral),
            Modality::Text => EmotionLabel::Text("neutral".to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            EmotionLabel::Audio(emotion) => emotion.as_str(),
            EmotionLabel::Text(label) => label.as_str(),
        }
    }

    pub fn modality(&self) -> Modality {
        match self {
            EmotionLabel::Audio(_) => Modality::Audio,
            EmotionLabel::Text(_) => Modality::Text,
        }
    }
}

impl fmt::Display for EmotionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for EmotionLabel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

// ============================================================================
// Per-modality results
// ============================================================================

/// Emotion detected from a single modality
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmotionResult {
    /// Dominant label
    pub emotion: EmotionLabel,

    /// Probability of the dominant label (0.0-1.0)
    pub confidence: f64,

    /// Full distribution over the model's labels
    pub probabilities: Probabilities,

    /// Interventions attached by the audio classifier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommendations: Option<RecommendationSet>,

    /// Sentiment in [-1, 1] derived by the text classifier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sentiment_score: Option<f64>,

    /// Set when this is a stand-in for a failed inference
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl EmotionResult {
    /// Result with a label and distribution and no extras
    pub fn new(emotion: EmotionLabel, confidence: f64, probabilities: Probabilities) -> Self {
        Self {
            emotion,
            confidence: confidence.clamp(0.0, 1.0),
            probabilities,
            recommendations: None,
            sentiment_score: None,
            error: None,
        }
    }

    /// Neutral stand-in returned when inference fails
    pub fn failed(modality: Modality, error: impl Into<String>) -> Self {
        let mut result = Self::new(EmotionLabel::neutral(modality), 0.0, Probabilities::new());
        result.error = Some(error.into());
        if modality == Modality::Audio {
            result.recommendations = Some(Vec::new());
        }
        result
    }

    pub fn modality(&self) -> Modality {
        self.emotion.modality()
    }

    /// True for stand-ins produced after an inference failure
    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }
}

// ============================================================================
// Pedagogical adjustments
// ============================================================================

/// How much extra support the learner should receive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SupportLevel {
    #[default]
    Normal,
    High,
    VeryHigh,
}

/// How much encouragement the learner should receive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Encouragement {
    #[default]
    Standard,
    High,
    VeryHigh,
}

/// Structured change to learning-session parameters
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AdjustmentRecord {
    /// -1 easier, 0 unchanged, +1 harder
    pub difficulty_adjustment: i8,
    pub support_level: SupportLevel,
    pub encouragement: Encouragement,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub break_recommended: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hints_enabled: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_achievements: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub challenge_increase: Option<bool>,
}

impl AdjustmentRecord {
    /// No change: difficulty 0, normal support, standard encouragement
    pub fn neutral() -> Self {
        Self::default()
    }
}

// ============================================================================
// Fusion
// ============================================================================

/// Combined result of multimodal emotion analysis
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FusionResult {
    pub audio_emotion: Option<EmotionResult>,
    pub text_emotion: Option<EmotionResult>,
    pub combined_emotion: EmotionLabel,
    pub confidence: f64,
    pub recommendations: RecommendationSet,
    #[serde(rename = "pedagogical_adjustments")]
    pub adjustments: AdjustmentRecord,
}
