//! Service components wrapping the models
//!
//! Leaf-first: the recommender and fusion policy are pure; the classifiers,
//! transcriber and agent each wrap one backend; the registry owns the
//! lazily built handles shared by every request.

pub mod agent;
pub mod audio_emotion;
pub mod fusion;
pub mod recommender;
pub mod registry;
pub mod speech;
pub mod text_emotion;

pub use agent::{AgentSettings, ConversationalAgent};
pub use audio_emotion::AudioEmotionClassifier;
pub use fusion::{text_to_audio_vocabulary, MultimodalFusionPolicy};
pub use recommender::{PedagogicalRecommender, RecommendationTable, TableError};
pub use registry::{ModelRegistry, ModelsLoaded};
pub use speech::{LanguageDetection, SpeechTranscriber, TranscriberSettings};
pub use text_emotion::{sentiment_score, TextEmotionClassifier};
