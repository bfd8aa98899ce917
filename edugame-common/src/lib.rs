//! # EduGame Common Library
//!
//! Shared code for the EduGame services including:
//! - Emotion, recommendation and fusion data types
//! - Learner context, session statistics and feedback types
//! - Transcription result types
//! - Configuration loading
//! - Common error type

pub mod config;
pub mod emotion;
pub mod error;
pub mod learner;
pub mod transcription;

pub use emotion::{
    AdjustmentRecord, AudioEmotion, Encouragement, EmotionLabel, EmotionResult, FusionResult,
    Modality, Probabilities, RecommendationSet, SupportLevel,
};
pub use error::{Error, Result};
pub use learner::{AgeGroup, ChatReply, DifficultyLevel, FeedbackResult, SessionStats, UserContext};
pub use transcription::{
    TimedSegment, TimedTranscription, TranscriptChunk, TranscriptionResult, TranscriptionTask,
};
